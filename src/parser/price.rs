/// Turn a displayed price ("1 456 €") into a plain decimal string ("1456.0").
///
/// Returns an empty string for anything that does not parse. Only `.` is
/// accepted as a decimal separator, so "1 990,00 €" yields "".
pub fn normalize_price(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '€'))
        .collect();

    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => format_price(value),
        _ => String::new(),
    }
}

fn format_price(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separator_and_symbol() {
        assert_eq!(normalize_price("1 456 €"), "1456.0");
        assert_eq!(normalize_price("1\u{a0}456\u{a0}€"), "1456.0");
        assert_eq!(normalize_price("1\u{202f}456 €"), "1456.0");
    }

    #[test]
    fn decimals_kept() {
        assert_eq!(normalize_price("199.90 €"), "199.9");
        assert_eq!(normalize_price("0.5"), "0.5");
    }

    #[test]
    fn comma_decimal_is_unknown() {
        assert_eq!(normalize_price("1\u{202f}990,00 €"), "");
    }

    #[test]
    fn garbage_is_unknown() {
        assert_eq!(normalize_price(""), "");
        assert_eq!(normalize_price("€"), "");
        assert_eq!(normalize_price("Prix sur demande"), "");
        assert_eq!(normalize_price("inf"), "");
        assert_eq!(normalize_price("NaN"), "");
    }

    #[test]
    fn idempotent_on_output() {
        for raw in ["1 456 €", "199.90 €", "12", "0", "3.25"] {
            let once = normalize_price(raw);
            assert_eq!(normalize_price(&once), once, "input {:?}", raw);
        }
    }
}
