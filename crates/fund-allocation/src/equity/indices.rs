//! Inequality measures over an allocation vector.

const ATKINSON_LOG_GUARD: f64 = 1e-10;

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    if values.len() < 2 {
        return None;
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation over the mean; 0 when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    match (mean(values), std_dev(values)) {
        (Some(mean), Some(std_dev)) if mean > 0.0 => std_dev / mean,
        _ => 0.0,
    }
}

/// Gini coefficient over ascending values: `Σ (2i − n − 1)·x_i / (n Σ x)`.
pub fn gini(values: &[f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(index, value)| (2.0 * (index as f64 + 1.0) - n - 1.0) * value)
        .sum();

    weighted / (n * total)
}

pub fn theil(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    if mean <= 0.0 {
        return 0.0;
    }

    let theil = values
        .iter()
        .map(|value| {
            let relative = value / mean;
            // x·ln(x) tends to 0 as x tends to 0.
            if relative > 0.0 {
                relative * relative.ln()
            } else {
                0.0
            }
        })
        .sum::<f64>()
        / values.len() as f64;

    if theil.is_nan() {
        0.0
    } else {
        theil
    }
}

pub fn atkinson(values: &[f64], epsilon: f64) -> f64 {
    let total: f64 = values.iter().sum();
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    if total <= 0.0 {
        return 0.0;
    }

    let log_mean = values
        .iter()
        .map(|value| (value + ATKINSON_LOG_GUARD).ln())
        .sum::<f64>()
        / values.len() as f64;
    let geometric_mean = log_mean.exp();

    (1.0 - (geometric_mean / mean).powf(epsilon)).max(0.0)
}

/// Share of the pool that would have to move to reach equal shares.
pub fn hoover(values: &[f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }

    let equal_share = 1.0 / values.len() as f64;
    0.5 * values
        .iter()
        .map(|value| (equal_share - value / total).abs())
        .sum::<f64>()
}

/// Pearson correlation; `None` when either series has no variation.
pub fn pearson(left: &[f64], right: &[f64]) -> Option<f64> {
    if left.len() != right.len() || left.len() < 2 {
        return None;
    }
    let left_mean = mean(left)?;
    let right_mean = mean(right)?;

    let mut covariance = 0.0;
    let mut left_spread = 0.0;
    let mut right_spread = 0.0;
    for (l, r) in left.iter().zip(right) {
        covariance += (l - left_mean) * (r - right_mean);
        left_spread += (l - left_mean).powi(2);
        right_spread += (r - right_mean).powi(2);
    }

    if left_spread == 0.0 || right_spread == 0.0 {
        return None;
    }
    Some(covariance / (left_spread.sqrt() * right_spread.sqrt()))
}
