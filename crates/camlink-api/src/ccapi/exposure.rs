// Shutter-speed (`tv`) notation.
//
// The camera reports exposure time as `"1/125"` for fractions,
// `"0\"5"` / `"30\""` for whole and fractional seconds, and `"bulb"` for
// bulb mode. Plain decimals (`"0.5"`) are accepted too.

/// Parse a shutter-speed string into seconds.
///
/// Returns `None` for bulb, empty input and anything unparseable.
pub fn parse_shutter_speed(raw: &str) -> Option<f64> {
    let tv = raw.trim();
    if tv.is_empty() || tv.eq_ignore_ascii_case("bulb") {
        return None;
    }

    let seconds = if let Some((num, den)) = tv.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else if let Some((whole, frac)) = tv.split_once('"') {
        let whole = if whole.is_empty() { "0" } else { whole };
        if frac.is_empty() {
            whole.parse().ok()?
        } else {
            format!("{whole}.{frac}").parse().ok()?
        }
    } else {
        tv.parse().ok()?
    };

    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(raw: &str, expected: f64) {
        let got = parse_shutter_speed(raw).unwrap_or(f64::NAN);
        assert!((got - expected).abs() < 1e-9, "{raw}: got {got}, want {expected}");
    }

    #[test]
    fn fraction_notation() {
        approx("1/125", 1.0 / 125.0);
        approx("1/4000", 1.0 / 4000.0);
    }

    #[test]
    fn seconds_notation() {
        approx("0\"5", 0.5);
        approx("1\"3", 1.3);
        approx("30\"", 30.0);
    }

    #[test]
    fn plain_decimal() {
        approx("0.5", 0.5);
        approx("2", 2.0);
    }

    #[test]
    fn unparseable_values() {
        assert_eq!(parse_shutter_speed("bulb"), None);
        assert_eq!(parse_shutter_speed(""), None);
        assert_eq!(parse_shutter_speed("1/0"), None);
        assert_eq!(parse_shutter_speed("fast"), None);
    }
}
