/// Formats a value for titles and labels.
///
/// Magnitudes outside `[1e-2, 1e4]` use scientific notation with 4 significant digits,
/// everything else uses up to 4 decimal places with trailing zeros removed.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    if !(1e-2..=1e4).contains(&value.abs()) {
        format!("{:.4e}", value)
    } else {
        let formatted = format!("{:.4}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

pub fn assert_equal(left: f64, right: f64) {
    let max = left.abs().max(right.abs());
    if max < f64::EPSILON {
        // If both values are close to zero, we consider them equal
        return;
    }
    let rel_diff = (left - right).abs() / max;
    assert!(
        rel_diff < 1e-9,
        "Assertion failed: left ({}) and right ({}) are not approximately equal. Relative difference: {}",
        left,
        right,
        rel_diff
    );
}

pub fn assert_equal_reltol(left: f64, right: f64, reltol: f64) {
    let max = left.abs().max(right.abs());
    if max < f64::EPSILON {
        // If both values are close to zero, we consider them equal
        return;
    }
    let abs_diff = (left - right).abs();
    let rel_diff = abs_diff / max;

    assert!(
        rel_diff < reltol,
        "Assertion failed: left ({}) and right ({}) are not approximately equal. Relative difference: {}. Absolute difference: {}",
        left,
        right,
        rel_diff,
        abs_diff,
    );
}

pub fn assert_equal_abstol(left: f64, right: f64, abstol: f64) {
    let abs_diff = (left - right).abs();
    assert!(
        abs_diff < abstol,
        "Assertion failed: left ({}) and right ({}) differ by {} which exceeds {}",
        left,
        right,
        abs_diff,
        abstol,
    );
}
