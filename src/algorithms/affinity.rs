use crate::algorithms::scorer::interaction_points;
use crate::models::InteractionEvent;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Per-user view derived entirely from the event log.
///
/// `theme_scores` sums points over events whose museum has a known theme;
/// `engagement` sums points over every event. Both are recomputable by
/// replaying the log, so aggregating twice without new events is identical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffinityProfile {
    pub theme_scores: BTreeMap<String, i64>,
    pub engagement: i64,
}

/// Fold a user's events into theme affinities and an engagement scalar.
/// `item_themes` maps museum id to its theme tag; events for museums with
/// no known theme still count toward engagement.
pub fn fold_events(
    events: &[InteractionEvent],
    item_themes: &HashMap<i64, String>,
) -> AffinityProfile {
    let mut profile = AffinityProfile::default();
    for event in events {
        let points = interaction_points(event.kind, event.duration_secs);
        profile.engagement += points;
        if let Some(theme) = item_themes.get(&event.museum_id) {
            let theme = theme.trim();
            if !theme.is_empty() {
                *profile.theme_scores.entry(theme.to_string()).or_insert(0) += points;
            }
        }
    }
    profile
}

/// Same fold restricted to events at or after `cutoff`; drives the
/// promotion of recently-hot themes into the preferred set.
pub fn recent_theme_scores(
    events: &[InteractionEvent],
    item_themes: &HashMap<i64, String>,
    cutoff: DateTime<Utc>,
) -> BTreeMap<String, i64> {
    let recent: Vec<InteractionEvent> = events
        .iter()
        .filter(|e| e.recorded_at >= cutoff)
        .cloned()
        .collect();
    fold_events(&recent, item_themes).theme_scores
}

/// Ranked top-N themes: score descending, theme name ascending on ties.
pub fn top_themes(scores: &BTreeMap<String, i64>, n: usize) -> Vec<(String, i64)> {
    let mut ranked: Vec<(String, i64)> = scores
        .iter()
        .map(|(theme, score)| (theme.clone(), *score))
        .collect();
    // BTreeMap iteration is already name-ascending; a stable sort on the
    // score keeps that order among equals.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// Popularity of one museum: the sum of points over events referencing it.
pub fn item_popularity(events: &[InteractionEvent]) -> i64 {
    events
        .iter()
        .map(|e| interaction_points(e.kind, e.duration_secs))
        .sum()
}

/// Popularity view for a whole catalog from one pass over the event log.
pub fn popularity_by_museum(events: &[InteractionEvent]) -> HashMap<i64, i64> {
    let mut popularity = HashMap::new();
    for event in events {
        *popularity.entry(event.museum_id).or_insert(0) +=
            interaction_points(event.kind, event.duration_secs);
    }
    popularity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionKind;
    use chrono::Duration;

    fn event(museum_id: i64, kind: InteractionKind, duration: Option<f64>) -> InteractionEvent {
        InteractionEvent {
            id: 0,
            user_id: "u1".to_string(),
            museum_id,
            kind,
            duration_secs: duration,
            recorded_at: Utc::now(),
        }
    }

    fn themes() -> HashMap<i64, String> {
        let mut map = HashMap::new();
        map.insert(1, "Art".to_string());
        map.insert(6, "Science".to_string());
        map
    }

    #[test]
    fn test_fold_matches_event_sum_invariant() {
        let events = vec![
            event(1, InteractionKind::CardClick, None),
            event(1, InteractionKind::Reading, Some(90.0)),
            event(6, InteractionKind::FavoriteAdded, None),
        ];
        let profile = fold_events(&events, &themes());
        assert_eq!(profile.theme_scores.get("Art"), Some(&4));
        assert_eq!(profile.theme_scores.get("Science"), Some(&3));
        assert_eq!(profile.engagement, 7);
    }

    #[test]
    fn test_events_without_theme_count_engagement_only() {
        let events = vec![
            event(99, InteractionKind::DetailOpen, None),
            event(1, InteractionKind::CardClick, None),
        ];
        let profile = fold_events(&events, &themes());
        assert_eq!(profile.theme_scores.len(), 1);
        assert_eq!(profile.engagement, 3);
    }

    #[test]
    fn test_empty_history_is_empty_profile() {
        let profile = fold_events(&[], &themes());
        assert!(profile.theme_scores.is_empty());
        assert_eq!(profile.engagement, 0);
    }

    #[test]
    fn test_fold_is_idempotent() {
        let events = vec![
            event(1, InteractionKind::Reading, Some(200.0)),
            event(6, InteractionKind::ThumbsUp, None),
        ];
        let first = fold_events(&events, &themes());
        let second = fold_events(&events, &themes());
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_themes_ties_break_by_name() {
        let mut scores = BTreeMap::new();
        scores.insert("Science".to_string(), 5);
        scores.insert("Art".to_string(), 5);
        scores.insert("History".to_string(), 9);
        let ranked = top_themes(&scores, 3);
        assert_eq!(
            ranked,
            vec![
                ("History".to_string(), 9),
                ("Art".to_string(), 5),
                ("Science".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_recent_scores_respect_cutoff() {
        let mut old = event(1, InteractionKind::FavoriteAdded, None);
        old.recorded_at = Utc::now() - Duration::days(90);
        let fresh = event(6, InteractionKind::FavoriteAdded, None);
        let cutoff = Utc::now() - Duration::days(30);

        let recent = recent_theme_scores(&[old, fresh], &themes(), cutoff);
        assert!(recent.get("Art").is_none());
        assert_eq!(recent.get("Science"), Some(&3));
    }

    #[test]
    fn test_thumbs_down_never_raises_popularity() {
        let ups = vec![
            event(1, InteractionKind::ThumbsUp, None),
            event(1, InteractionKind::ThumbsUp, None),
        ];
        let downs = vec![
            event(1, InteractionKind::ThumbsDown, None),
            event(1, InteractionKind::ThumbsDown, None),
        ];
        assert!(item_popularity(&downs) <= item_popularity(&ups));
        assert_eq!(item_popularity(&downs), 0);
    }

    #[test]
    fn test_popularity_by_museum() {
        let events = vec![
            event(1, InteractionKind::CardClick, None),
            event(1, InteractionKind::Reading, Some(90.0)),
            event(6, InteractionKind::FavoriteAdded, None),
        ];
        let popularity = popularity_by_museum(&events);
        assert_eq!(popularity.get(&1), Some(&4));
        assert_eq!(popularity.get(&6), Some(&3));
    }
}
