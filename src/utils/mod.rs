pub mod validation;

/// Share of distinct themes among the items that have one. 0.0 for lists
/// of fewer than two themed items, 1.0 when every theme is different.
pub fn theme_diversity<'a, I>(themes: I) -> f32
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut distinct = std::collections::HashSet::new();
    let mut total = 0usize;
    for theme in themes.into_iter().flatten() {
        let theme = theme.trim();
        if !theme.is_empty() {
            distinct.insert(theme.to_lowercase());
            total += 1;
        }
    }
    if total <= 1 {
        0.0
    } else {
        distinct.len() as f32 / total as f32
    }
}

/// Percentage of up votes, or None when nobody has voted yet.
pub fn approval_rating(thumbs_up: i64, thumbs_down: i64) -> Option<f64> {
    let total = thumbs_up + thumbs_down;
    if total > 0 {
        Some(thumbs_up as f64 / total as f64 * 100.0)
    } else {
        None
    }
}
