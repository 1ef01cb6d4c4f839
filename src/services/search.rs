/// Case-insensitive substring match; a blank query matches everything.
pub fn matches_search(field: Option<&str>, query: Option<&str>) -> bool {
    let query = match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_lowercase(),
        _ => return true,
    };
    field
        .map(|f| f.to_lowercase().contains(&query))
        .unwrap_or(false)
}
