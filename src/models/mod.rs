use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visitor profile captured at onboarding and mutated by profile edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub pseudo: String,
    pub ui_language: String,
    pub visitor_type: String,
    pub distance_pref: Option<DistancePref>,
    pub interest_mode: Option<InterestMode>,
    pub preferred_themes: Vec<String>,
    pub hub_city: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistancePref {
    Nearby,
    Medium,
    FarOk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMode {
    Classics,
    Balanced,
    HiddenGems,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Museum {
    pub id: i64,
    pub name: String,
    pub region: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    /// Write-through activity counter; ranking uses the event-log view.
    pub popularity_score: i64,
    pub thumbs_up: i64,
    pub thumbs_down: i64,
}

/// One row of the append-only interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: i64,
    pub user_id: String,
    pub museum_id: i64,
    pub kind: InteractionKind,
    pub duration_secs: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Event as submitted by a caller, before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub user_id: String,
    pub museum_id: i64,
    pub kind: InteractionKind,
    pub duration_secs: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    CardClick,
    DetailOpen,
    FavoriteAdded,
    FavoriteRemoved,
    Reading,
    ThumbsUp,
    ThumbsDown,
    WebsiteVisit,
    /// Unrecognized wire strings land here and score zero points.
    #[serde(other)]
    Unknown,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::CardClick => "card_click",
            InteractionKind::DetailOpen => "detail_open",
            InteractionKind::FavoriteAdded => "favorite_added",
            InteractionKind::FavoriteRemoved => "favorite_removed",
            InteractionKind::Reading => "reading",
            InteractionKind::ThumbsUp => "thumbs_up",
            InteractionKind::ThumbsDown => "thumbs_down",
            InteractionKind::WebsiteVisit => "website_visit",
            InteractionKind::Unknown => "unknown",
        }
    }

    /// Parse a stored or wire string; unrecognized values become `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "card_click" | "click" => InteractionKind::CardClick,
            "detail_open" | "view-details" => InteractionKind::DetailOpen,
            "favorite_added" | "favorite" => InteractionKind::FavoriteAdded,
            "favorite_removed" => InteractionKind::FavoriteRemoved,
            "reading" => InteractionKind::Reading,
            "thumbs_up" => InteractionKind::ThumbsUp,
            "thumbs_down" => InteractionKind::ThumbsDown,
            "website_visit" => InteractionKind::WebsiteVisit,
            _ => InteractionKind::Unknown,
        }
    }

    pub fn is_feedback(&self) -> bool {
        matches!(self, InteractionKind::ThumbsUp | InteractionKind::ThumbsDown)
    }
}

/// Environmental signals supplied by the presentation layer. Every field is
/// optional; the adapter fills in `good` / 60 minutes / `desktop`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSignals {
    pub connection_quality: Option<ConnectionQuality>,
    pub time_available_minutes: Option<u32>,
    pub device: Option<DeviceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Good,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Desktop,
    Mobile,
    Tablet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionLength {
    Long,
    Short,
}

/// Per-request presentation parameters; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationSettings {
    pub max_results: usize,
    pub layout: Layout,
    pub description_length: DescriptionLength,
    pub show_images: bool,
    pub trail: Vec<AdaptationNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationNote {
    pub effect: String,
    pub reason: String,
}

/// Outcome of a best-effort recording attempt. Never an error to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Recorded { points: i64, event_id: i64 },
    AlreadyVoted { existing: InteractionKind },
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMuseum {
    #[serde(flatten)]
    pub museum: Museum,
    pub distance_km: Option<f64>,
    /// Event-log popularity view at ranking time.
    pub popularity: i64,
    pub theme_affinity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryFeed {
    pub user_id: String,
    pub museums: Vec<RankedMuseum>,
    pub settings: AdaptationSettings,
    pub trail: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuseumStats {
    pub museum_id: i64,
    pub theme: Option<String>,
    pub popularity: i64,
    pub thumbs_up: i64,
    pub thumbs_down: i64,
    pub total_interactions: usize,
    /// Percentage of up votes, or None when nobody has voted.
    pub approval_rating: Option<f64>,
}

impl User {
    pub fn new(user_id: impl Into<String>, pseudo: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            pseudo: pseudo.into(),
            ui_language: String::new(),
            visitor_type: String::new(),
            distance_pref: None,
            interest_mode: None,
            preferred_themes: Vec::new(),
            hub_city: None,
        }
    }

    /// Mint a fresh guest identity for a visitor without a session.
    pub fn guest() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let id = format!("guest_{}", &hex[..12]);
        Self::new(id.clone(), id)
    }

    pub fn with_themes(mut self, themes: Vec<String>) -> Self {
        self.preferred_themes = themes;
        self
    }

    pub fn with_hub_city(mut self, hub_city: impl Into<String>) -> Self {
        self.hub_city = Some(hub_city.into());
        self
    }
}

impl Museum {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            region: None,
            location: None,
            description: None,
            theme: None,
            latitude: None,
            longitude: None,
            website: None,
            image_url: None,
            popularity_score: 0,
            thumbs_up: 0,
            thumbs_down: 0,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_popularity(mut self, score: i64) -> Self {
        self.popularity_score = score;
        self
    }
}

impl NewEvent {
    pub fn new(user_id: impl Into<String>, museum_id: i64, kind: InteractionKind) -> Self {
        Self {
            user_id: user_id.into(),
            museum_id,
            kind,
            duration_secs: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

impl DistancePref {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistancePref::Nearby => "nearby",
            DistancePref::Medium => "medium",
            DistancePref::FarOk => "far_ok",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearby" => Some(DistancePref::Nearby),
            "medium" => Some(DistancePref::Medium),
            "far_ok" | "far" => Some(DistancePref::FarOk),
            _ => None,
        }
    }
}

impl ConnectionQuality {
    /// Lenient parse for query parameters; unknown values mean "unstated".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Some(ConnectionQuality::Good),
            "poor" => Some(ConnectionQuality::Poor),
            _ => None,
        }
    }
}

impl DeviceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(DeviceKind::Desktop),
            "mobile" => Some(DeviceKind::Mobile),
            "tablet" => Some(DeviceKind::Tablet),
            _ => None,
        }
    }
}

impl InterestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestMode::Classics => "classics",
            InterestMode::Balanced => "balanced",
            InterestMode::HiddenGems => "hidden_gems",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classics" => Some(InterestMode::Classics),
            "balanced" => Some(InterestMode::Balanced),
            "hidden_gems" => Some(InterestMode::HiddenGems),
            _ => None,
        }
    }
}
