use crate::models::InteractionKind;

/// Reading time beyond this window earns no further points.
pub const MAX_READING_SECS: f64 = 600.0;
/// One reading point per complete interval of this length.
pub const READING_INTERVAL_SECS: f64 = 30.0;

/// Points from reading time: +1 per complete 30-second interval, capped.
pub fn reading_points(duration_secs: f64) -> i64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    let capped = duration_secs.min(MAX_READING_SECS);
    (capped / READING_INTERVAL_SECS).floor() as i64
}

/// Points for one interaction. Deterministic, no side effects, no I/O.
///
/// Unknown kinds score zero rather than failing the caller; a removed
/// favorite contributes zero so replayed totals never go negative, and a
/// thumbs down carries no weight so it can never raise popularity.
pub fn interaction_points(kind: InteractionKind, duration_secs: Option<f64>) -> i64 {
    match kind {
        InteractionKind::CardClick => 1,
        InteractionKind::DetailOpen => 2,
        InteractionKind::FavoriteAdded => 3,
        InteractionKind::FavoriteRemoved => 0,
        InteractionKind::Reading => reading_points(duration_secs.unwrap_or(0.0)),
        InteractionKind::ThumbsUp => 3,
        InteractionKind::ThumbsDown => 0,
        InteractionKind::WebsiteVisit => 1,
        InteractionKind::Unknown => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_points_per_interval() {
        assert_eq!(reading_points(0.0), 0);
        assert_eq!(reading_points(29.0), 0);
        assert_eq!(reading_points(30.0), 1);
        assert_eq!(reading_points(90.0), 3);
        assert_eq!(reading_points(599.0), 19);
    }

    #[test]
    fn test_reading_points_capped_at_window() {
        assert_eq!(reading_points(600.0), 20);
        assert_eq!(reading_points(3600.0), 20);
        assert_eq!(reading_points(f64::INFINITY), 0);
    }

    #[test]
    fn test_reading_points_negative_duration() {
        assert_eq!(reading_points(-45.0), 0);
    }

    #[test]
    fn test_interaction_points_table() {
        assert_eq!(interaction_points(InteractionKind::CardClick, None), 1);
        assert_eq!(interaction_points(InteractionKind::DetailOpen, None), 2);
        assert_eq!(interaction_points(InteractionKind::FavoriteAdded, None), 3);
        assert_eq!(interaction_points(InteractionKind::FavoriteRemoved, None), 0);
        assert_eq!(interaction_points(InteractionKind::ThumbsUp, None), 3);
        assert_eq!(interaction_points(InteractionKind::ThumbsDown, None), 0);
        assert_eq!(interaction_points(InteractionKind::WebsiteVisit, None), 1);
    }

    #[test]
    fn test_unknown_kind_scores_zero() {
        assert_eq!(interaction_points(InteractionKind::Unknown, Some(120.0)), 0);
        assert_eq!(interaction_points(InteractionKind::parse("swipe-left"), None), 0);
    }

    #[test]
    fn test_reading_uses_duration() {
        assert_eq!(interaction_points(InteractionKind::Reading, Some(90.0)), 3);
        assert_eq!(interaction_points(InteractionKind::Reading, None), 0);
    }

    #[test]
    fn test_no_kind_scores_negative() {
        let kinds = [
            InteractionKind::CardClick,
            InteractionKind::DetailOpen,
            InteractionKind::FavoriteAdded,
            InteractionKind::FavoriteRemoved,
            InteractionKind::Reading,
            InteractionKind::ThumbsUp,
            InteractionKind::ThumbsDown,
            InteractionKind::WebsiteVisit,
            InteractionKind::Unknown,
        ];
        for kind in kinds {
            assert!(interaction_points(kind, Some(45.0)) >= 0);
        }
    }
}
