use crate::models::{InterestMode, Museum, RankedMuseum};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Everything the mixer needs besides the candidate pool. All views are
/// supplied by the caller; the mixer itself touches no state.
pub struct MixContext<'a> {
    pub preferred_themes: &'a [String],
    pub interest_mode: Option<InterestMode>,
    /// All-time theme affinity, used for ordering inside slices.
    pub affinity: &'a BTreeMap<String, i64>,
    /// Recent-window theme affinity, used for theme promotion.
    pub recent_affinity: &'a BTreeMap<String, i64>,
    /// Event-log popularity view per museum id.
    pub popularity: &'a HashMap<i64, i64>,
    pub engagement: i64,
    pub default_exploration: f64,
    pub promote_top_themes: usize,
}

/// Share of the feed drawn from outside the preferred themes. Base and cap
/// depend on the discovery style; engagement nudges the share up a little.
pub fn exploration_ratio(
    mode: Option<InterestMode>,
    engagement: i64,
    default_ratio: f64,
) -> f64 {
    let (base, cap) = match mode {
        Some(InterestMode::Classics) => (0.10, 0.15),
        Some(InterestMode::Balanced) => (0.20, 0.25),
        Some(InterestMode::HiddenGems) => (0.50, 0.55),
        None => (default_ratio, 0.25),
    };
    let bump = (engagement.max(0) as f64 / 2000.0).min(0.05);
    (base + bump).clamp(0.0, cap)
}

/// The effective preferred set: onboarding themes plus the top themes by
/// recent affinity. Returns the set and the newly promoted themes.
pub fn effective_preferred(
    static_themes: &[String],
    recent_affinity: &BTreeMap<String, i64>,
    promote_n: usize,
) -> (BTreeSet<String>, Vec<String>) {
    let mut preferred: BTreeSet<String> = static_themes
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut promoted = Vec::new();
    for (theme, _) in super::affinity::top_themes(recent_affinity, promote_n) {
        if preferred.insert(theme.clone()) {
            promoted.push(theme);
        }
    }
    (preferred, promoted)
}

/// Produce the ranked discovery list and its explanation trail.
///
/// The output holds at most `max_results` museums, never fewer than the
/// candidate pool allows, and never a duplicate: the preferred and
/// exploration slices partition the pool, and a deficit in one slice is
/// topped up from the other.
pub fn mix(
    candidates: Vec<(Museum, Option<f64>)>,
    ctx: &MixContext<'_>,
    max_results: usize,
) -> (Vec<RankedMuseum>, Vec<String>) {
    let mut trail = Vec::new();
    if candidates.is_empty() || max_results == 0 {
        return (Vec::new(), trail);
    }

    let (preferred_set, promoted) = effective_preferred(
        ctx.preferred_themes,
        ctx.recent_affinity,
        ctx.promote_top_themes,
    );
    if !promoted.is_empty() {
        trail.push(format!(
            "promoted from your recent activity: {}",
            promoted.join(", ")
        ));
    }

    let affinity_of = |m: &Museum| -> i64 {
        m.theme
            .as_deref()
            .map(|t| ctx.affinity.get(t.trim()).copied().unwrap_or(0))
            .unwrap_or(0)
    };
    let popularity_of = |m: &Museum| -> i64 { ctx.popularity.get(&m.id).copied().unwrap_or(0) };

    // No preferences at all: most popular first.
    if preferred_set.is_empty() {
        trail.push("no theme preferences yet, showing the most popular museums".to_string());
        let mut pool = candidates;
        pool.sort_by(|(a, _), (b, _)| {
            popularity_of(b)
                .cmp(&popularity_of(a))
                .then(a.id.cmp(&b.id))
        });
        pool.truncate(max_results);
        let ranked = pool
            .into_iter()
            .map(|(m, d)| to_ranked(m, d, &affinity_of, &popularity_of))
            .collect();
        return (ranked, trail);
    }

    let ratio = exploration_ratio(ctx.interest_mode, ctx.engagement, ctx.default_exploration);

    let in_preferred = |m: &Museum| -> bool {
        m.theme
            .as_deref()
            .map(|t| preferred_set.contains(t.trim()))
            .unwrap_or(false)
    };
    let (mut matched, mut others): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(|(m, _)| in_preferred(m));

    // Ordering inside the preferred slice. Classics readers want the
    // best-known museums first; everyone else gets affinity-led order with
    // popularity then id as the deterministic tie-break.
    match ctx.interest_mode {
        Some(InterestMode::Classics) => {
            matched.sort_by(|(a, _), (b, _)| {
                popularity_of(b)
                    .cmp(&popularity_of(a))
                    .then(a.id.cmp(&b.id))
            });
        }
        _ => {
            matched.sort_by(|(a, _), (b, _)| {
                affinity_of(b)
                    .cmp(&affinity_of(a))
                    .then(popularity_of(b).cmp(&popularity_of(a)))
                    .then(a.id.cmp(&b.id))
            });
        }
    }

    // Exploration slice: hidden-gem hunters see the quiet half of the
    // catalog first; the ordering inside each half stays deterministic.
    match ctx.interest_mode {
        Some(InterestMode::HiddenGems) => {
            let median = median_popularity(&matched, &others, &popularity_of);
            others.sort_by(|(a, _), (b, _)| {
                let gem_a = popularity_of(a) < median;
                let gem_b = popularity_of(b) < median;
                gem_b
                    .cmp(&gem_a)
                    .then(affinity_of(b).cmp(&affinity_of(a)))
                    .then(popularity_of(b).cmp(&popularity_of(a)))
                    .then(a.id.cmp(&b.id))
            });
        }
        _ => {
            others.sort_by(|(a, _), (b, _)| {
                affinity_of(b)
                    .cmp(&affinity_of(a))
                    .then(popularity_of(b).cmp(&popularity_of(a)))
                    .then(a.id.cmp(&b.id))
            });
        }
    }

    let n_explore_target = ((max_results as f64 * ratio).round() as usize).max(1);
    let take_matched = matched
        .len()
        .min(max_results.saturating_sub(n_explore_target));
    let take_others = others.len().min(max_results - take_matched);

    let mut result: Vec<(Museum, Option<f64>)> = Vec::with_capacity(max_results);
    let mut rest_matched = matched.split_off(take_matched);
    let mut rest_others = others.split_off(take_others);
    result.extend(matched);
    result.extend(others);

    // Top up from whichever slice still has candidates.
    while result.len() < max_results && !rest_matched.is_empty() {
        result.push(rest_matched.remove(0));
    }
    while result.len() < max_results && !rest_others.is_empty() {
        result.push(rest_others.remove(0));
    }
    result.truncate(max_results);

    let n_preferred = result.iter().filter(|(m, _)| in_preferred(m)).count();
    trail.push(format!(
        "exploring {:.0}% outside your themes ({} preferred, {} discovery picks)",
        ratio * 100.0,
        n_preferred,
        result.len() - n_preferred,
    ));

    let ranked = result
        .into_iter()
        .map(|(m, d)| to_ranked(m, d, &affinity_of, &popularity_of))
        .collect();
    (ranked, trail)
}

fn median_popularity(
    matched: &[(Museum, Option<f64>)],
    others: &[(Museum, Option<f64>)],
    popularity_of: &dyn Fn(&Museum) -> i64,
) -> i64 {
    let mut values: Vec<i64> = matched
        .iter()
        .chain(others.iter())
        .map(|(m, _)| popularity_of(m))
        .collect();
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    values[values.len() / 2]
}

fn to_ranked(
    museum: Museum,
    distance_km: Option<f64>,
    affinity_of: &dyn Fn(&Museum) -> i64,
    popularity_of: &dyn Fn(&Museum) -> i64,
) -> RankedMuseum {
    let popularity = popularity_of(&museum);
    let theme_affinity = affinity_of(&museum);
    RankedMuseum {
        museum,
        distance_km,
        popularity,
        theme_affinity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn museum(id: i64, theme: &str) -> (Museum, Option<f64>) {
        (Museum::new(id, format!("Museum {id}")).with_theme(theme), None)
    }

    fn context<'a>(
        preferred: &'a [String],
        affinity: &'a BTreeMap<String, i64>,
        recent: &'a BTreeMap<String, i64>,
        popularity: &'a HashMap<i64, i64>,
    ) -> MixContext<'a> {
        MixContext {
            preferred_themes: preferred,
            interest_mode: Some(InterestMode::Balanced),
            affinity,
            recent_affinity: recent,
            popularity,
            engagement: 0,
            default_exploration: 0.2,
            promote_top_themes: 2,
        }
    }

    fn ten_candidates() -> Vec<(Museum, Option<f64>)> {
        let mut pool = Vec::new();
        for id in 1..=6 {
            pool.push(museum(id, "Art"));
        }
        for id in 7..=10 {
            pool.push(museum(id, "Science"));
        }
        pool
    }

    #[test]
    fn test_output_size_is_min_of_pool_and_max() {
        let preferred = vec!["Art".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let popularity = HashMap::new();
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        let (out, _) = mix(ten_candidates(), &ctx, 4);
        assert_eq!(out.len(), 4);

        let (out, _) = mix(ten_candidates(), &ctx, 25);
        assert_eq!(out.len(), 10);

        let (out, _) = mix(Vec::new(), &ctx, 5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_duplicates() {
        let preferred = vec!["Art".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let popularity = HashMap::new();
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        let (out, _) = mix(ten_candidates(), &ctx, 10);
        let mut ids: Vec<i64> = out.iter().map(|r| r.museum.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), out.len());
    }

    #[test]
    fn test_balanced_split_is_eighty_twenty() {
        let preferred = vec!["Art".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let popularity = HashMap::new();
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        let (out, _) = mix(ten_candidates(), &ctx, 10);
        let art = out
            .iter()
            .filter(|r| r.museum.theme.as_deref() == Some("Art"))
            .count();
        // Six Art museums fill the preferred slots, the four Science ones
        // cover the exploration share and the top-up.
        assert_eq!(art, 6);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_deficit_filled_from_other_slice() {
        let preferred = vec!["History".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let popularity = HashMap::new();
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        // Nothing matches the preferred theme; the feed still fills up.
        let (out, _) = mix(ten_candidates(), &ctx, 8);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_classics_orders_preferred_by_popularity() {
        let preferred = vec!["Art".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let mut popularity = HashMap::new();
        popularity.insert(1, 2);
        popularity.insert(2, 9);
        popularity.insert(3, 5);
        let mut ctx = context(&preferred, &affinity, &recent, &popularity);
        ctx.interest_mode = Some(InterestMode::Classics);

        let pool = vec![museum(1, "Art"), museum(2, "Art"), museum(3, "Art")];
        let (out, _) = mix(pool, &ctx, 3);
        let ids: Vec<i64> = out.iter().map(|r| r.museum.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_hidden_gems_surfaces_quiet_museums_first() {
        let preferred = vec!["Art".to_string()];
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let mut popularity = HashMap::new();
        popularity.insert(1, 50);
        popularity.insert(7, 40); // loud exploration candidate
        popularity.insert(8, 0); // quiet exploration candidate
        let mut ctx = context(&preferred, &affinity, &recent, &popularity);
        ctx.interest_mode = Some(InterestMode::HiddenGems);

        let pool = vec![museum(1, "Art"), museum(7, "Science"), museum(8, "Science")];
        let (out, _) = mix(pool, &ctx, 3);
        let pos_quiet = out.iter().position(|r| r.museum.id == 8).unwrap();
        let pos_loud = out.iter().position(|r| r.museum.id == 7).unwrap();
        assert!(pos_quiet < pos_loud);
    }

    #[test]
    fn test_recent_affinity_promotes_theme() {
        let preferred: Vec<String> = Vec::new();
        let affinity = BTreeMap::from([("Science".to_string(), 12)]);
        let recent = BTreeMap::from([("Science".to_string(), 12)]);
        let popularity = HashMap::new();
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        let (out, trail) = mix(ten_candidates(), &ctx, 5);
        // Science was promoted, so the preferred slice leads with it.
        assert_eq!(out[0].museum.theme.as_deref(), Some("Science"));
        assert!(trail.iter().any(|t| t.contains("Science")));
    }

    #[test]
    fn test_no_preferences_falls_back_to_popularity() {
        let preferred: Vec<String> = Vec::new();
        let affinity = BTreeMap::new();
        let recent = BTreeMap::new();
        let mut popularity = HashMap::new();
        popularity.insert(9, 30);
        popularity.insert(2, 11);
        let ctx = context(&preferred, &affinity, &recent, &popularity);

        let (out, trail) = mix(ten_candidates(), &ctx, 3);
        let ids: Vec<i64> = out.iter().map(|r| r.museum.id).collect();
        assert_eq!(ids, vec![9, 2, 1]);
        assert!(trail.iter().any(|t| t.contains("most popular")));
    }

    #[test]
    fn test_exploration_ratio_bases_and_caps() {
        assert!((exploration_ratio(Some(InterestMode::Classics), 0, 0.2) - 0.10).abs() < 1e-9);
        assert!((exploration_ratio(Some(InterestMode::Balanced), 0, 0.2) - 0.20).abs() < 1e-9);
        assert!((exploration_ratio(Some(InterestMode::HiddenGems), 0, 0.2) - 0.50).abs() < 1e-9);
        // Heavy engagement bumps but never past the cap.
        assert!(exploration_ratio(Some(InterestMode::Balanced), 100_000, 0.2) <= 0.25);
        assert!(exploration_ratio(None, 0, 0.2) <= 0.25);
    }
}
