//! Exponential moving average recursions.
//!
//! EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], seeded with the first
//! defined input (no SMA seed, no look-ahead). Leading `NaN` inputs stay
//! `NaN`; a `NaN` after the seed taints every later value.

/// EMA with smoothing factor `2 / (span + 1)`.
pub fn ema_span(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; values.len()];
    }
    ema_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// EMA with an explicit smoothing factor in `(0, 1]`.
pub fn ema_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if !(alpha > 0.0 && alpha <= 1.0) {
        return result;
    }

    let Some(seed_idx) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };

    let mut prev = values[seed_idx];
    result[seed_idx] = prev;

    for i in (seed_idx + 1)..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
