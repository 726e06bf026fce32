use crate::algorithms::{adaptation, affinity, distance, mixer, scorer};
use crate::config::Config;
use crate::models::*;
use crate::services::store::EventStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates the ranking core over the collaborator store. Each request
/// is an independent computation: the service holds no mutable state and
/// every derived score is recomputed from the event log.
pub struct DiscoveryService {
    store: Arc<dyn EventStore>,
    config: Arc<Config>,
}

/// Dashboard view of a visitor's derived interests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeProfileView {
    pub user_id: String,
    pub theme_affinities: BTreeMap<String, i64>,
    pub top_themes: Vec<(String, i64)>,
    pub engagement: i64,
    pub engagement_level: String,
}

/// A quiet museum worth surfacing: few interactions, good approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenGem {
    #[serde(flatten)]
    pub museum: Museum,
    pub total_interactions: usize,
    pub approval_rating: Option<f64>,
}

impl DiscoveryService {
    pub fn new(store: Arc<dyn EventStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Map environmental signals to presentation settings. Pure.
    pub fn compute_adaptation(&self, signals: &ContextSignals) -> AdaptationSettings {
        adaptation::compute_adaptation(signals, &self.config.adaptation)
    }

    /// Record one interaction, best-effort. Storage trouble degrades to a
    /// `failed` outcome instead of an error; a repeated thumbs vote reports
    /// `already_voted` (the uniqueness policy lives in the store).
    pub async fn record_interaction(
        &self,
        user_id: &str,
        museum_id: i64,
        kind: InteractionKind,
        duration_secs: Option<f64>,
    ) -> RecordOutcome {
        if kind.is_feedback() {
            match self.store.feedback_for(user_id, museum_id).await {
                Ok(Some(existing)) => return RecordOutcome::AlreadyVoted { existing },
                Ok(None) => {}
                Err(e) => {
                    warn!("Vote check failed for user {}: {}", user_id, e);
                    return RecordOutcome::Failed;
                }
            }
        }

        let points = scorer::interaction_points(kind, duration_secs);
        let mut event = NewEvent::new(user_id, museum_id, kind);
        event.duration_secs = duration_secs;

        match self.store.append_event(&event, points).await {
            Ok(event_id) => {
                info!(
                    "Recorded {} for museum {} by {} (+{} points)",
                    kind.as_str(),
                    museum_id,
                    user_id,
                    points
                );
                RecordOutcome::Recorded { points, event_id }
            }
            Err(e) => {
                warn!("Event recording failed (non-fatal): {}", e);
                RecordOutcome::Failed
            }
        }
    }

    /// Rank catalog candidates for one user. Never fails: when the event
    /// log cannot be read the feed degrades to a popularity-only ordering
    /// of the supplied candidates and the trail says so.
    pub async fn rank_discovery(
        &self,
        user: &User,
        candidates: Vec<Museum>,
        settings: &AdaptationSettings,
    ) -> (Vec<RankedMuseum>, Vec<String>) {
        let disc = &self.config.discovery;
        let mut trail = Vec::new();

        // Distance annotation uses the configured hub; bucketing only
        // applies when the user also picked a distance preference.
        let reference = user
            .hub_city
            .as_deref()
            .and_then(distance::hub_coordinates);
        let annotated: Vec<(Museum, Option<f64>)> = match reference {
            Some(hub) => distance::annotate(hub, candidates),
            None => candidates.into_iter().map(|m| (m, None)).collect(),
        };
        let annotated = match (reference, user.distance_pref) {
            (Some(_), Some(pref)) => {
                trail.push(match pref {
                    DistancePref::Nearby => {
                        format!("keeping museums within {:.0} km of your hub", disc.nearby_km)
                    }
                    DistancePref::Medium => {
                        format!("keeping museums within {:.0} km of your hub", disc.medium_km)
                    }
                    DistancePref::FarOk => "including museums at any distance".to_string(),
                });
                distance::filter_by_preference(annotated, pref, disc.nearby_km, disc.medium_km)
            }
            _ => annotated,
        };

        match self.views_for(user).await {
            Ok((profile, recent, popularity)) => {
                let ctx = mixer::MixContext {
                    preferred_themes: &user.preferred_themes,
                    interest_mode: user.interest_mode,
                    affinity: &profile.theme_scores,
                    recent_affinity: &recent,
                    popularity: &popularity,
                    engagement: profile.engagement,
                    default_exploration: disc.exploration_ratio,
                    promote_top_themes: disc.promote_top_themes,
                };
                let (ranked, mix_trail) = mixer::mix(annotated, &ctx, settings.max_results);
                trail.extend(mix_trail);

                let diversity = crate::utils::theme_diversity(
                    ranked.iter().map(|r| r.museum.theme.as_deref()),
                );
                info!(
                    "Ranked {} museums for {} (theme diversity {:.2})",
                    ranked.len(),
                    user.user_id,
                    diversity
                );
                (ranked, trail)
            }
            Err(e) => {
                warn!(
                    "Event log unavailable, serving unpersonalized feed: {}",
                    e
                );
                trail.push("personalization unavailable, showing the most popular museums".to_string());
                let mut pool = annotated;
                pool.sort_by(|(a, _), (b, _)| {
                    b.popularity_score
                        .cmp(&a.popularity_score)
                        .then(a.id.cmp(&b.id))
                });
                pool.truncate(settings.max_results);
                let ranked = pool
                    .into_iter()
                    .map(|(m, d)| {
                        let popularity = m.popularity_score;
                        RankedMuseum {
                            museum: m,
                            distance_km: d,
                            popularity,
                            theme_affinity: 0,
                        }
                    })
                    .collect();
                (ranked, trail)
            }
        }
    }

    /// The full feed for one visitor: adaptation settings plus the ranked
    /// catalog. An unknown user gets an unpersonalized feed; a missing
    /// catalog yields an empty one, never an error.
    pub async fn discovery_feed(&self, user_id: &str, signals: &ContextSignals) -> DiscoveryFeed {
        let settings = self.compute_adaptation(signals);

        let user = match self.store.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => User::new(user_id, user_id),
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", user_id, e);
                User::new(user_id, user_id)
            }
        };

        let (museums, trail) = match self.store.get_catalog().await {
            Ok(catalog) => self.rank_discovery(&user, catalog, &settings).await,
            Err(e) => {
                warn!("Catalog unavailable: {}", e);
                (
                    Vec::new(),
                    vec!["catalog unavailable, please try again".to_string()],
                )
            }
        };

        DiscoveryFeed {
            user_id: user_id.to_string(),
            museums,
            settings,
            trail,
            generated_at: Utc::now(),
        }
    }

    /// Derived interests for the profile dashboard. Unknown users get an
    /// empty profile.
    pub async fn theme_profile(&self, user_id: &str) -> Result<ThemeProfileView> {
        let events = self.store.events_for_user(user_id).await?;
        let themes = self.catalog_themes().await?;
        let profile = affinity::fold_events(&events, &themes);
        let top = affinity::top_themes(&profile.theme_scores, 5);

        let engagement_level = if profile.engagement >= 20 {
            "high"
        } else if profile.engagement >= 10 {
            "medium"
        } else {
            "low"
        };

        Ok(ThemeProfileView {
            user_id: user_id.to_string(),
            theme_affinities: profile.theme_scores,
            top_themes: top,
            engagement: profile.engagement,
            engagement_level: engagement_level.to_string(),
        })
    }

    /// Popularity view and feedback tallies for one museum. Unknown
    /// museums report zeros.
    pub async fn museum_stats(&self, museum_id: i64) -> Result<MuseumStats> {
        let events = self.store.events_for_museum(museum_id).await?;
        let museum = self.store.get_museum(museum_id).await?;
        let (theme, thumbs_up, thumbs_down) = museum
            .map(|m| (m.theme, m.thumbs_up, m.thumbs_down))
            .unwrap_or((None, 0, 0));

        Ok(MuseumStats {
            museum_id,
            theme,
            popularity: affinity::item_popularity(&events),
            thumbs_up,
            thumbs_down,
            total_interactions: events.len(),
            approval_rating: crate::utils::approval_rating(thumbs_up, thumbs_down),
        })
    }

    /// Museums similar to the given one: same theme in the same city
    /// first, then same theme anywhere, best-known first.
    pub async fn similar_museums(&self, museum_id: i64) -> Result<Vec<Museum>> {
        let Some(base) = self.store.get_museum(museum_id).await? else {
            return Ok(Vec::new());
        };
        let max = self.config.discovery.similar_results;
        let base_theme = normalized(base.theme.as_deref());
        let base_city = city_of(&base);

        let candidates: Vec<Museum> = self
            .store
            .get_catalog()
            .await?
            .into_iter()
            .filter(|m| m.id != museum_id)
            .collect();

        let same_theme = |m: &Museum| {
            let theme = normalized(m.theme.as_deref());
            !base_theme.is_empty() && theme == base_theme
        };
        let by_renown = |a: &Museum, b: &Museum| {
            b.popularity_score
                .cmp(&a.popularity_score)
                .then(a.name.cmp(&b.name))
        };

        let mut strict: Vec<Museum> = candidates
            .iter()
            .filter(|m| same_theme(m) && !base_city.is_empty() && city_of(m) == base_city)
            .cloned()
            .collect();
        strict.sort_by(|a, b| by_renown(a, b));
        if strict.len() >= max {
            strict.truncate(max);
            return Ok(strict);
        }

        let mut fallback: Vec<Museum> = candidates
            .iter()
            .filter(|m| same_theme(m) && strict.iter().all(|s| s.id != m.id))
            .cloned()
            .collect();
        fallback.sort_by(|a, b| by_renown(a, b));
        fallback.truncate(max - strict.len());
        strict.extend(fallback);
        Ok(strict)
    }

    /// Quiet museums in the user's preferred themes: few interactions,
    /// ordered by approval rating. Without a profile the list is global.
    pub async fn hidden_gems(
        &self,
        user_id: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<HiddenGem>> {
        let preferred: Vec<String> = match user_id {
            Some(uid) => self
                .store
                .get_user(uid)
                .await?
                .map(|u| u.preferred_themes)
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let catalog = self.store.get_catalog().await?;
        let events = self.store.all_events().await?;
        let mut interaction_counts: HashMap<i64, usize> = HashMap::new();
        for event in &events {
            *interaction_counts.entry(event.museum_id).or_insert(0) += 1;
        }

        let threshold = self.config.discovery.hidden_gem_max_interactions;
        let mut gems: Vec<HiddenGem> = catalog
            .into_iter()
            .filter(|m| {
                preferred.is_empty()
                    || m.theme
                        .as_deref()
                        .map(|t| preferred.iter().any(|p| p.trim() == t.trim()))
                        .unwrap_or(false)
            })
            .filter(|m| interaction_counts.get(&m.id).copied().unwrap_or(0) < threshold)
            .map(|m| {
                let total_interactions = interaction_counts.get(&m.id).copied().unwrap_or(0);
                let approval_rating = crate::utils::approval_rating(m.thumbs_up, m.thumbs_down);
                HiddenGem {
                    museum: m,
                    total_interactions,
                    approval_rating,
                }
            })
            .collect();

        gems.sort_by(|a, b| {
            let approval_a = a.approval_rating.unwrap_or(0.0);
            let approval_b = b.approval_rating.unwrap_or(0.0);
            approval_b
                .partial_cmp(&approval_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.total_interactions.cmp(&b.total_interactions))
                .then(a.museum.name.cmp(&b.museum.name))
        });
        gems.truncate(max_results);
        Ok(gems)
    }

    /// Fetch the event-log views for one user: all-time profile, the
    /// recent-window theme scores, and the catalog-wide popularity map.
    async fn views_for(
        &self,
        user: &User,
    ) -> Result<
        (
            affinity::AffinityProfile,
            BTreeMap<String, i64>,
            HashMap<i64, i64>,
        ),
        crate::services::store::StoreError,
    > {
        let themes = self.catalog_themes_raw().await?;
        let user_events = self.store.events_for_user(&user.user_id).await?;
        let all_events = self.store.all_events().await?;

        let profile = affinity::fold_events(&user_events, &themes);
        let cutoff = Utc::now() - Duration::days(self.config.discovery.recent_window_days);
        let recent = affinity::recent_theme_scores(&user_events, &themes, cutoff);
        let popularity = affinity::popularity_by_museum(&all_events);
        Ok((profile, recent, popularity))
    }

    async fn catalog_themes(&self) -> Result<HashMap<i64, String>> {
        Ok(self.catalog_themes_raw().await?)
    }

    async fn catalog_themes_raw(
        &self,
    ) -> Result<HashMap<i64, String>, crate::services::store::StoreError> {
        let catalog = self.store.get_catalog().await?;
        Ok(catalog
            .into_iter()
            .filter_map(|m| m.theme.map(|t| (m.id, t)))
            .collect())
    }
}

fn normalized(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_lowercase()
}

/// City is the part of the display location before the first comma.
fn city_of(museum: &Museum) -> String {
    museum
        .location
        .as_deref()
        .or(museum.region.as_deref())
        .unwrap_or("")
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}
