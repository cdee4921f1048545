mod parser;
mod validation;

pub use validation::{RegionValidationError, ValidationIssue};

use crate::allocation::domain::RegionRecord;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum RegionIngestError {
    Io(std::io::Error),
    Csv(csv::Error),
    Validation(RegionValidationError),
}

impl std::fmt::Display for RegionIngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionIngestError::Io(err) => write!(f, "failed to read region data: {}", err),
            RegionIngestError::Csv(err) => write!(f, "invalid region CSV data: {}", err),
            RegionIngestError::Validation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RegionIngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionIngestError::Io(err) => Some(err),
            RegionIngestError::Csv(err) => Some(err),
            RegionIngestError::Validation(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RegionIngestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RegionIngestError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RegionValidationError> for RegionIngestError {
    fn from(err: RegionValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Validated, fixed-cardinality collection of region rows. Row order is kept
/// for display; no computation depends on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RegionTable {
    rows: Vec<RegionRecord>,
}

impl RegionTable {
    pub fn new(rows: Vec<RegionRecord>) -> Result<Self, RegionValidationError> {
        validation::validate_rows(&rows)?;
        Ok(Self { rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegionIngestError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegionIngestError> {
        let rows = parser::parse_records(reader)?;
        Ok(Self::new(rows)?)
    }

    pub fn rows(&self) -> &[RegionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Applies `adjust` to a copy of every row and re-validates the result.
    pub fn map_rows<F>(&self, mut adjust: F) -> Result<Self, RegionValidationError>
    where
        F: FnMut(&mut RegionRecord),
    {
        let mut rows = self.rows.clone();
        rows.iter_mut().for_each(|row| adjust(row));
        Self::new(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    pub(crate) fn sample_record(id: &str, name: &str) -> RegionRecord {
        RegionRecord {
            region_id: id.to_string(),
            region_name: name.to_string(),
            total_population: 120_000.0,
            low_income_population: 24_000.0,
            poverty_rate: 0.18,
            median_income: 41_000.0,
            energy_burden_pct: 0.14,
            households_served: 2_100.0,
            avg_benefit: 360.0,
            compliance_score: 0.91,
            utilization_rate: 0.86,
            seniors_65_plus: 19_000.0,
            disabled_population: 12_000.0,
            children_under_18: 27_000.0,
        }
    }

    const HEADER: &str = "region_id,region_name,total_population,low_income_population,poverty_rate,median_income,energy_burden_pct,households_served,avg_benefit,compliance_score,utilization_rate,seniors_65_plus,disabled_population,children_under_18";

    #[test]
    fn reads_rows_and_ignores_extra_columns() {
        let csv = format!(
            "{HEADER},unemployment_rate\n\
REG_001, Jefferson  County ,658000,125000,0.16,52000,0.11,4100,410,0.95,0.92,98000,72000,150000,0.05\n\
REG_002,Marshall County,97000,21000,0.21,39000,0.19,1200,300,0.88,0.81,17000,11000,23000,0.07\n"
        );

        let table = RegionTable::from_reader(Cursor::new(csv)).expect("table parses");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].region_name, "Jefferson County");
        assert_eq!(table.rows()[1].households_served, 1200.0);
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let csv = "region_id,region_name,total_population\nREG_001,Alpha,1000\n";
        match RegionTable::from_reader(Cursor::new(csv)) {
            Err(RegionIngestError::Csv(_)) => {}
            other => panic!("expected csv error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_cell_is_a_csv_error() {
        let csv = format!(
            "{HEADER}\nREG_001,Alpha,lots,125000,0.16,52000,0.11,4100,410,0.95,0.92,98000,72000,150000\n"
        );
        let error = RegionTable::from_reader(Cursor::new(csv)).expect_err("non numeric rejected");
        assert!(matches!(error, RegionIngestError::Csv(_)));
    }

    #[test]
    fn invalid_values_surface_as_validation_errors() {
        let csv = format!(
            "{HEADER}\nREG_001,Alpha,1000,2000,0.16,52000,0.11,4100,410,0.95,0.92,100,100,100\n"
        );
        match RegionTable::from_reader(Cursor::new(csv)) {
            Err(RegionIngestError::Validation(err)) => {
                assert_eq!(err.issues[0].column, "low_income_population");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn from_path_reads_files_and_propagates_io_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "{HEADER}").expect("write header");
        writeln!(
            file,
            "REG_001,Alpha,1000,200,0.16,52000,0.11,40,410,0.95,0.92,100,100,100"
        )
        .expect("write row");

        let table = RegionTable::from_path(file.path()).expect("file loads");
        assert_eq!(table.len(), 1);

        let error = RegionTable::from_path("./does-not-exist.csv").expect_err("missing file");
        assert!(matches!(error, RegionIngestError::Io(_)));
    }

    #[test]
    fn labels_are_cleaned_of_invisible_characters() {
        assert_eq!(
            parser::clean_label("\u{feff}Mobile   County"),
            "Mobile County"
        );
    }

    #[test]
    fn map_rows_revalidates() {
        let table = RegionTable::new(vec![sample_record("REG_001", "Alpha")]).expect("valid");
        let scaled = table
            .map_rows(|row| row.median_income *= 1.1)
            .expect("still valid");
        assert!((scaled.rows()[0].median_income - 45_100.0).abs() < 1e-6);

        assert!(table.map_rows(|row| row.poverty_rate = 2.0).is_err());
    }
}
