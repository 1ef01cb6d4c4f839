use crate::models::PriceRange;

/// Groups thousands with dots: `1500000` → `1.500.000`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// `min - max CUR`, with `?` for a missing bound. `None` when both are missing.
pub fn price_label(range: &PriceRange) -> Option<String> {
    if range.min.is_none() && range.max.is_none() {
        return None;
    }
    let bound = |v: Option<i64>| v.map(format_amount).unwrap_or_else(|| "?".to_string());
    Some(format!(
        "{} - {} {}",
        bound(range.min),
        bound(range.max),
        range.currency
    ))
}
