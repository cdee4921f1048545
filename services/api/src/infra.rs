use fund_allocation::allocation::RegionRecord;
use fund_allocation::analysis::SensitivityParameter;
use fund_allocation::config::AllocationConfig;
use fund_allocation::error::AppError;
use fund_allocation::regions::RegionTable;
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    /// Configuration used when a request does not carry its own.
    pub(crate) allocation: Arc<AllocationConfig>,
}

/// Builds a table from exactly one of inline records or CSV text.
pub(crate) fn region_table(
    regions: Option<Vec<RegionRecord>>,
    regions_csv: Option<String>,
) -> Result<RegionTable, AppError> {
    match (regions, regions_csv) {
        (Some(records), None) => Ok(RegionTable::new(records)
            .map_err(fund_allocation::regions::RegionIngestError::from)?),
        (None, Some(csv)) => Ok(RegionTable::from_reader(Cursor::new(csv.into_bytes()))?),
        (Some(_), Some(_)) => Err(AppError::InvalidRequest(
            "provide either `regions` or `regions_csv`, not both".to_string(),
        )),
        (None, None) => Err(AppError::InvalidRequest(
            "one of `regions` or `regions_csv` is required".to_string(),
        )),
    }
}

/// Explicit `--config` wins over the environment-provided configuration.
pub(crate) fn allocation_config(
    path: Option<&Path>,
    fallback: AllocationConfig,
) -> Result<AllocationConfig, AppError> {
    match path {
        Some(path) => AllocationConfig::from_path(path).map_err(|err| {
            AppError::Config(fund_allocation::config::ConfigError::Allocation(err))
        }),
        None => Ok(fallback),
    }
}

pub(crate) fn parse_parameter(raw: &str) -> Result<SensitivityParameter, String> {
    SensitivityParameter::from_name(raw).ok_or_else(|| {
        let known: Vec<_> = SensitivityParameter::all()
            .iter()
            .map(|parameter| parameter.name())
            .collect();
        format!("unknown parameter '{raw}' (expected one of: {})", known.join(", "))
    })
}
