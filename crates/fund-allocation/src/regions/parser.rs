use crate::allocation::domain::RegionRecord;
use std::io::Read;

/// Reads region rows keyed by header name. Unknown columns are ignored so
/// exports carrying extra program fields load without preprocessing.
pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<RegionRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<RegionRecord>() {
        let mut row = record?;
        row.region_id = clean_label(&row.region_id);
        row.region_name = clean_label(&row.region_name);
        records.push(row);
    }

    Ok(records)
}

pub(super) fn clean_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
