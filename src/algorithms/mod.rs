pub mod adaptation;
pub mod affinity;
pub mod distance;
pub mod mixer;
pub mod scorer;

pub use adaptation::compute_adaptation;
pub use affinity::{fold_events, item_popularity, popularity_by_museum, top_themes, AffinityProfile};
pub use distance::{annotate, filter_by_preference, haversine_km, hub_coordinates};
pub use mixer::{exploration_ratio, mix, MixContext};
pub use scorer::{interaction_points, reading_points};
