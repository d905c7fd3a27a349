/// Detection decision: found when the accepted match count reaches the
/// threshold. Non-positive thresholds always succeed, a NaN threshold never does.
#[inline]
pub fn is_found(accepted: usize, point_threshold: f64) -> bool {
    accepted as f64 >= point_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(is_found(30, 30.0));
        assert!(!is_found(29, 30.0));
        assert!(is_found(30, 29.5));
        assert!(!is_found(30, 30.5));
    }

    #[test]
    fn test_degenerate_thresholds() {
        assert!(is_found(0, 0.0));
        assert!(is_found(0, -5.0));
        assert!(!is_found(usize::MAX, f64::NAN));
        assert!(!is_found(1_000_000, f64::INFINITY));
    }
}
