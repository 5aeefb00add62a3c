pub mod panels;
pub mod plot;
pub mod table;

/// `1234567.891` → `1,234,568`
pub fn thousands(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let rounded = v.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// Currency amount rounded to whole units, or "N/A" when undefined.
pub fn money(currency: &str, v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{currency}{}", thousands(v)),
        None => "N/A".to_string(),
    }
}

/// Two-decimal figure, or "N/A" when undefined.
pub fn decimal(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.4), "999");
        assert_eq!(thousands(1000.0), "1,000");
        assert_eq!(thousands(1234567.891), "1,234,568");
        assert_eq!(thousands(-25000.0), "-25,000");
    }

    #[test]
    fn missing_values_read_na() {
        assert_eq!(money("₹", None), "N/A");
        assert_eq!(money("₹", Some(1500000.0)), "₹1,500,000");
        assert_eq!(decimal(Some(2.346)), "2.35");
        assert_eq!(decimal(None), "N/A");
    }
}
