use crate::config::Config;
use crate::models::{InteractionEvent, InteractionKind, Museum, NewEvent, User};
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The collaborator store: an append-only interaction log plus read-mostly
/// catalog and profile tables. Affinity and popularity are recomputed from
/// the log; the counters kept on `museums` are write-through conveniences.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one interaction row and bump the museum's counters. The
    /// precomputed `points` value is what the scorer awarded the event.
    async fn append_event(&self, event: &NewEvent, points: i64) -> Result<i64, StoreError>;
    async fn all_events(&self) -> Result<Vec<InteractionEvent>, StoreError>;
    async fn events_for_user(&self, user_id: &str) -> Result<Vec<InteractionEvent>, StoreError>;
    async fn events_for_museum(&self, museum_id: i64)
        -> Result<Vec<InteractionEvent>, StoreError>;
    /// Earliest thumbs vote this user cast for this museum, if any.
    async fn feedback_for(
        &self,
        user_id: &str,
        museum_id: i64,
    ) -> Result<Option<InteractionKind>, StoreError>;
    async fn get_catalog(&self) -> Result<Vec<Museum>, StoreError>;
    async fn get_museum(&self, museum_id: i64) -> Result<Option<Museum>, StoreError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
    async fn insert_museum(&self, museum: &Museum) -> Result<i64, StoreError>;
    async fn distinct_themes(&self) -> Result<Vec<String>, StoreError>;
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        info!("Connected to {}", config.database.url);
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                pseudo TEXT NOT NULL,
                ui_language TEXT NOT NULL DEFAULT '',
                visitor_type TEXT NOT NULL DEFAULT '',
                distance_pref TEXT,
                interest_mode TEXT,
                theme_pref TEXT,
                hub_city TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS museums (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                region TEXT,
                location TEXT,
                description TEXT,
                theme TEXT,
                latitude REAL,
                longitude REAL,
                website TEXT,
                image_url TEXT,
                popularity_score INTEGER NOT NULL DEFAULT 0,
                thumbs_up INTEGER NOT NULL DEFAULT 0,
                thumbs_down INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                museum_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                duration_secs REAL,
                recorded_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<InteractionEvent, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        Ok(InteractionEvent {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            museum_id: row.try_get("museum_id")?,
            kind: InteractionKind::parse(&kind),
            duration_secs: row.try_get("duration_secs")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }

    fn museum_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Museum, sqlx::Error> {
        Ok(Museum {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            region: row.try_get("region")?,
            location: row.try_get("location")?,
            description: row.try_get("description")?,
            theme: row.try_get("theme")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            website: row.try_get("website")?,
            image_url: row.try_get("image_url")?,
            popularity_score: row.try_get("popularity_score")?,
            thumbs_up: row.try_get("thumbs_up")?,
            thumbs_down: row.try_get("thumbs_down")?,
        })
    }

    fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, sqlx::Error> {
        let distance_pref: Option<String> = row.try_get("distance_pref")?;
        let interest_mode: Option<String> = row.try_get("interest_mode")?;
        let theme_pref: Option<String> = row.try_get("theme_pref")?;
        Ok(User {
            user_id: row.try_get("user_id")?,
            pseudo: row.try_get("pseudo")?,
            ui_language: row.try_get("ui_language")?,
            visitor_type: row.try_get("visitor_type")?,
            distance_pref: distance_pref
                .as_deref()
                .and_then(crate::models::DistancePref::parse),
            interest_mode: interest_mode
                .as_deref()
                .and_then(crate::models::InterestMode::parse),
            preferred_themes: split_themes(theme_pref.as_deref()),
            hub_city: row.try_get("hub_city")?,
        })
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn append_event(&self, event: &NewEvent, points: i64) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO interactions (user_id, museum_id, kind, duration_secs, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.user_id)
        .bind(event.museum_id)
        .bind(event.kind.as_str())
        .bind(event.duration_secs)
        .bind(event.recorded_at)
        .execute(&self.pool)
        .await?;

        if points > 0 {
            sqlx::query("UPDATE museums SET popularity_score = popularity_score + ? WHERE id = ?")
                .bind(points)
                .bind(event.museum_id)
                .execute(&self.pool)
                .await?;
        }
        match event.kind {
            InteractionKind::ThumbsUp => {
                sqlx::query("UPDATE museums SET thumbs_up = thumbs_up + 1 WHERE id = ?")
                    .bind(event.museum_id)
                    .execute(&self.pool)
                    .await?;
            }
            InteractionKind::ThumbsDown => {
                sqlx::query("UPDATE museums SET thumbs_down = thumbs_down + 1 WHERE id = ?")
                    .bind(event.museum_id)
                    .execute(&self.pool)
                    .await?;
            }
            _ => {}
        }

        Ok(result.last_insert_rowid())
    }

    async fn all_events(&self) -> Result<Vec<InteractionEvent>, StoreError> {
        let rows = sqlx::query("SELECT * FROM interactions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| Self::event_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn events_for_user(&self, user_id: &str) -> Result<Vec<InteractionEvent>, StoreError> {
        let rows = sqlx::query("SELECT * FROM interactions WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| Self::event_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn events_for_museum(
        &self,
        museum_id: i64,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        let rows = sqlx::query("SELECT * FROM interactions WHERE museum_id = ? ORDER BY id")
            .bind(museum_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| Self::event_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn feedback_for(
        &self,
        user_id: &str,
        museum_id: i64,
    ) -> Result<Option<InteractionKind>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT kind FROM interactions
            WHERE user_id = ? AND museum_id = ? AND kind IN ('thumbs_up', 'thumbs_down')
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(museum_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| {
            let kind: String = r.get("kind");
            InteractionKind::parse(&kind)
        }))
    }

    async fn get_catalog(&self) -> Result<Vec<Museum>, StoreError> {
        let rows = sqlx::query("SELECT * FROM museums ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| Self::museum_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn get_museum(&self, museum_id: i64) -> Result<Option<Museum>, StoreError> {
        let row = sqlx::query("SELECT * FROM museums WHERE id = ?")
            .bind(museum_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::museum_from_row(&r).map_err(StoreError::from))
            .transpose()
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::user_from_row(&r).map_err(StoreError::from))
            .transpose()
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, pseudo, ui_language, visitor_type,
                               distance_pref, interest_mode, theme_pref, hub_city)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                pseudo = excluded.pseudo,
                ui_language = excluded.ui_language,
                visitor_type = excluded.visitor_type,
                distance_pref = excluded.distance_pref,
                interest_mode = excluded.interest_mode,
                theme_pref = excluded.theme_pref,
                hub_city = COALESCE(excluded.hub_city, users.hub_city)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.pseudo)
        .bind(&user.ui_language)
        .bind(&user.visitor_type)
        .bind(user.distance_pref.map(|p| p.as_str()))
        .bind(user.interest_mode.map(|m| m.as_str()))
        .bind(join_themes(&user.preferred_themes))
        .bind(&user.hub_city)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_museum(&self, museum: &Museum) -> Result<i64, StoreError> {
        if museum.id > 0 {
            sqlx::query(
                r#"
                INSERT INTO museums (id, name, region, location, description, theme,
                                     latitude, longitude, website, image_url,
                                     popularity_score, thumbs_up, thumbs_down)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(museum.id)
            .bind(&museum.name)
            .bind(&museum.region)
            .bind(&museum.location)
            .bind(&museum.description)
            .bind(&museum.theme)
            .bind(museum.latitude)
            .bind(museum.longitude)
            .bind(&museum.website)
            .bind(&museum.image_url)
            .bind(museum.popularity_score)
            .bind(museum.thumbs_up)
            .bind(museum.thumbs_down)
            .execute(&self.pool)
            .await?;
            Ok(museum.id)
        } else {
            let result = sqlx::query(
                r#"
                INSERT INTO museums (name, region, location, description, theme,
                                     latitude, longitude, website, image_url,
                                     popularity_score, thumbs_up, thumbs_down)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&museum.name)
            .bind(&museum.region)
            .bind(&museum.location)
            .bind(&museum.description)
            .bind(&museum.theme)
            .bind(museum.latitude)
            .bind(museum.longitude)
            .bind(&museum.website)
            .bind(&museum.image_url)
            .bind(museum.popularity_score)
            .bind(museum.thumbs_up)
            .bind(museum.thumbs_down)
            .execute(&self.pool)
            .await?;
            Ok(result.last_insert_rowid())
        }
    }

    async fn distinct_themes(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT TRIM(theme) AS theme FROM museums
            WHERE theme IS NOT NULL AND TRIM(theme) != ''
            ORDER BY TRIM(theme)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("theme")).collect())
    }
}

/// In-memory store used by the integration tests and seeder dry runs.
pub struct MemoryStore {
    users: DashMap<String, User>,
    museums: DashMap<i64, Museum>,
    events: DashMap<i64, InteractionEvent>,
    next_event_id: AtomicI64,
    next_museum_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            museums: DashMap::new(),
            events: DashMap::new(),
            next_event_id: AtomicI64::new(1),
            next_museum_id: AtomicI64::new(1),
        }
    }

    fn events_where<F>(&self, predicate: F) -> Vec<InteractionEvent>
    where
        F: Fn(&InteractionEvent) -> bool,
    {
        let mut events: Vec<InteractionEvent> = self
            .events
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| e.value().clone())
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_event(&self, event: &NewEvent, points: i64) -> Result<i64, StoreError> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.events.insert(
            id,
            InteractionEvent {
                id,
                user_id: event.user_id.clone(),
                museum_id: event.museum_id,
                kind: event.kind,
                duration_secs: event.duration_secs,
                recorded_at: event.recorded_at,
            },
        );
        if let Some(mut museum) = self.museums.get_mut(&event.museum_id) {
            if points > 0 {
                museum.popularity_score += points;
            }
            match event.kind {
                InteractionKind::ThumbsUp => museum.thumbs_up += 1,
                InteractionKind::ThumbsDown => museum.thumbs_down += 1,
                _ => {}
            }
        }
        Ok(id)
    }

    async fn all_events(&self) -> Result<Vec<InteractionEvent>, StoreError> {
        Ok(self.events_where(|_| true))
    }

    async fn events_for_user(&self, user_id: &str) -> Result<Vec<InteractionEvent>, StoreError> {
        Ok(self.events_where(|e| e.user_id == user_id))
    }

    async fn events_for_museum(
        &self,
        museum_id: i64,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        Ok(self.events_where(|e| e.museum_id == museum_id))
    }

    async fn feedback_for(
        &self,
        user_id: &str,
        museum_id: i64,
    ) -> Result<Option<InteractionKind>, StoreError> {
        Ok(self
            .events_where(|e| {
                e.user_id == user_id && e.museum_id == museum_id && e.kind.is_feedback()
            })
            .first()
            .map(|e| e.kind))
    }

    async fn get_catalog(&self) -> Result<Vec<Museum>, StoreError> {
        let mut catalog: Vec<Museum> = self.museums.iter().map(|m| m.value().clone()).collect();
        catalog.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(catalog)
    }

    async fn get_museum(&self, museum_id: i64) -> Result<Option<Museum>, StoreError> {
        Ok(self.museums.get(&museum_id).map(|m| m.value().clone()))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn insert_museum(&self, museum: &Museum) -> Result<i64, StoreError> {
        let id = if museum.id > 0 {
            museum.id
        } else {
            self.next_museum_id.fetch_add(1, Ordering::SeqCst)
        };
        let mut stored = museum.clone();
        stored.id = id;
        self.museums.insert(id, stored);
        Ok(id)
    }

    async fn distinct_themes(&self) -> Result<Vec<String>, StoreError> {
        let mut themes: Vec<String> = self
            .museums
            .iter()
            .filter_map(|m| m.value().theme.as_ref().map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .collect();
        themes.sort();
        themes.dedup();
        Ok(themes)
    }
}

fn join_themes(themes: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = themes
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(","))
    }
}

fn split_themes(joined: Option<&str>) -> Vec<String> {
    joined
        .unwrap_or("")
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_round_trip() {
        let themes = vec!["Art".to_string(), " History ".to_string(), String::new()];
        let joined = join_themes(&themes);
        assert_eq!(joined.as_deref(), Some("Art,History"));
        assert_eq!(split_themes(joined.as_deref()), vec!["Art", "History"]);
        assert!(split_themes(None).is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_counters_follow_events() {
        let store = MemoryStore::new();
        store
            .insert_museum(&Museum::new(1, "Louvre").with_theme("Art"))
            .await
            .unwrap();

        store
            .append_event(&NewEvent::new("u1", 1, InteractionKind::FavoriteAdded), 3)
            .await
            .unwrap();
        store
            .append_event(&NewEvent::new("u1", 1, InteractionKind::ThumbsDown), 0)
            .await
            .unwrap();

        let museum = store.get_museum(1).await.unwrap().unwrap();
        assert_eq!(museum.popularity_score, 3);
        assert_eq!(museum.thumbs_down, 1);
        assert_eq!(museum.thumbs_up, 0);

        let events = store.events_for_user("u1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            store.feedback_for("u1", 1).await.unwrap(),
            Some(InteractionKind::ThumbsDown)
        );
    }
}
