/// Add two log-scale values: `ln(exp(x) + exp(y))`.
///
/// Computed as `max(x, y) + ln(1 + exp(-|x - y|))` so that neither operand is
/// ever exponentiated directly.
#[inline]
pub fn logspace_add(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return y;
    }
    if y == f64::NEG_INFINITY {
        return x;
    }
    let larger = x.max(y);
    let diff = (x - y).abs();
    larger + (-diff).exp().ln_1p()
}

/// `ln(sum(exp(values)))`, folded pairwise with [`logspace_add`].
///
/// Returns negative infinity for an empty slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    values
        .iter()
        .fold(f64::NEG_INFINITY, |acc, &v| logspace_add(acc, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_negative_infinity_is_identity() {
        assert_eq!(logspace_add(f64::NEG_INFINITY, -3.0), -3.0);
        assert_eq!(logspace_add(2.5, f64::NEG_INFINITY), 2.5);
        assert_eq!(
            logspace_add(f64::NEG_INFINITY, f64::NEG_INFINITY),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn empty_slice() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }
}
