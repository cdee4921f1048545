use crate::allocation::domain::RegionRecord;
use std::collections::HashSet;
use std::fmt;

/// A single problem found while validating the region table.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub region_id: Option<String>,
    pub column: &'static str,
    pub detail: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region_id {
            Some(id) => write!(f, "{} [{}]: {}", id, self.column, self.detail),
            None => write!(f, "[{}]: {}", self.column, self.detail),
        }
    }
}

/// Fatal input error. Every issue found is reported, not only the first.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("region table failed validation: {}", summarize(.issues))]
pub struct RegionValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

const FRACTION_COLUMNS: [&str; 4] = [
    "poverty_rate",
    "energy_burden_pct",
    "compliance_score",
    "utilization_rate",
];

const SUBPOPULATION_COLUMNS: [&str; 4] = [
    "low_income_population",
    "seniors_65_plus",
    "disabled_population",
    "children_under_18",
];

pub(crate) fn validate_rows(rows: &[RegionRecord]) -> Result<(), RegionValidationError> {
    let mut issues = Vec::new();

    if rows.is_empty() {
        issues.push(ValidationIssue {
            region_id: None,
            column: "region_id",
            detail: "table contains no regions".to_string(),
        });
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();

    for row in rows {
        let id = Some(row.region_id.clone());

        if row.region_id.trim().is_empty() {
            issues.push(ValidationIssue {
                region_id: None,
                column: "region_id",
                detail: format!("blank region id for '{}'", row.region_name),
            });
        } else if !ids.insert(row.region_id.as_str()) {
            issues.push(ValidationIssue {
                region_id: id.clone(),
                column: "region_id",
                detail: "duplicate region id".to_string(),
            });
        }

        if row.region_name.trim().is_empty() {
            issues.push(ValidationIssue {
                region_id: id.clone(),
                column: "region_name",
                detail: "blank region name".to_string(),
            });
        } else if !names.insert(row.region_name.as_str()) {
            issues.push(ValidationIssue {
                region_id: id.clone(),
                column: "region_name",
                detail: format!("duplicate region name '{}'", row.region_name),
            });
        }

        for (column, value) in row.numeric_fields() {
            if !value.is_finite() {
                issues.push(ValidationIssue {
                    region_id: id.clone(),
                    column,
                    detail: format!("value {value} is not a finite number"),
                });
            } else if value < 0.0 {
                issues.push(ValidationIssue {
                    region_id: id.clone(),
                    column,
                    detail: format!("value {value} is negative"),
                });
            } else if FRACTION_COLUMNS.contains(&column) && value > 1.0 {
                issues.push(ValidationIssue {
                    region_id: id.clone(),
                    column,
                    detail: format!("fraction {value} exceeds 1.0"),
                });
            }
        }

        if row.total_population == 0.0 {
            issues.push(ValidationIssue {
                region_id: id.clone(),
                column: "total_population",
                detail: "total population must be positive".to_string(),
            });
        }
        if !row.total_population.is_finite() || row.total_population <= 0.0 {
            continue;
        }

        let subpopulations = [
            row.low_income_population,
            row.seniors_65_plus,
            row.disabled_population,
            row.children_under_18,
        ];
        for (column, value) in SUBPOPULATION_COLUMNS.iter().zip(subpopulations) {
            if value > row.total_population {
                issues.push(ValidationIssue {
                    region_id: id.clone(),
                    column,
                    detail: format!(
                        "{value} exceeds total population {}",
                        row.total_population
                    ),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(RegionValidationError { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::tests::sample_record;

    #[test]
    fn accepts_well_formed_rows() {
        let rows = vec![sample_record("REG_001", "Alpha"), sample_record("REG_002", "Beta")];
        assert!(validate_rows(&rows).is_ok());
    }

    #[test]
    fn rejects_empty_table() {
        let error = validate_rows(&[]).expect_err("empty table rejected");
        assert_eq!(error.issues.len(), 1);
    }

    #[test]
    fn reports_every_issue_found() {
        let mut negative = sample_record("REG_001", "Alpha");
        negative.total_population = -5.0;
        let mut fraction = sample_record("REG_002", "Beta");
        fraction.poverty_rate = 1.4;
        let mut oversized = sample_record("REG_003", "Gamma");
        oversized.low_income_population = oversized.total_population + 1.0;
        let duplicate = sample_record("REG_003", "Delta");

        let error = validate_rows(&[negative, fraction, oversized, duplicate])
            .expect_err("invalid rows rejected");

        let columns: Vec<_> = error.issues.iter().map(|issue| issue.column).collect();
        assert!(columns.contains(&"total_population"));
        assert!(columns.contains(&"poverty_rate"));
        assert!(columns.contains(&"low_income_population"));
        assert!(columns.contains(&"region_id"));
        assert!(error.to_string().contains("REG_002 [poverty_rate]"));
    }

    #[test]
    fn rejects_non_finite_and_zero_population() {
        let mut nan = sample_record("REG_001", "Alpha");
        nan.median_income = f64::NAN;
        let mut empty = sample_record("REG_002", "Beta");
        empty.total_population = 0.0;

        let error = validate_rows(&[nan, empty]).expect_err("invalid rows rejected");
        assert!(error
            .issues
            .iter()
            .any(|issue| issue.column == "median_income" && issue.detail.contains("finite")));
        assert!(error
            .issues
            .iter()
            .any(|issue| issue.column == "total_population" && issue.detail.contains("positive")));
    }
}
