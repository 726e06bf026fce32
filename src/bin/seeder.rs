use anyhow::Result;
use clap::Parser;
use musea::algorithms::scorer;
use musea::services::discovery::DiscoveryService;
use musea::services::store::{EventStore, MemoryStore, SqliteStore};
use musea::{init_tracing, Config, ContextSignals, InteractionKind, Museum, NewEvent, User};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// How many ghost visitors to create.
    #[arg(short, long, default_value_t = 6)]
    users: usize,

    /// How many baseline interactions to generate.
    #[arg(short, long, default_value_t = 70)]
    events: usize,

    /// Seed an in-memory store and print a sample feed instead of writing
    /// to the database.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

const GHOST_PSEUDOS: &[&str] = &[
    "ArtLover99",
    "HistoryBuff",
    "TechExplorer",
    "QuietCurator",
    "WeekendWanderer",
    "ScienceGeek",
    "HiddenGemHunter",
    "FamilyTripPlanner",
];

const UI_LANGUAGES: &[&str] = &["English", "French"];
const VISITOR_TYPES: &[&str] = &["Student", "Tourist", "Local", "Family", "Researcher"];
const DISTANCE_PREFS: &[&str] = &["nearby", "medium", "far_ok"];
const INTEREST_MODES: &[&str] = &["classics", "balanced", "hidden_gems"];
const THEMES: &[&str] = &["Art", "History", "Science", "Local Heritage"];
const HUB_CITIES: &[&str] = &["Lyon", "Clermont-Ferrand", "Saint-Étienne", "Grenoble"];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    if args.dry_run {
        let store: Arc<dyn EventStore> = Arc::new(MemoryStore::new());
        let user_ids = seed(store.clone(), &args).await?;
        print_sample_feed(store, Arc::new(config), &user_ids).await;
        return Ok(());
    }

    let sqlite = SqliteStore::new(&config).await?;
    sqlite.init_schema().await?;
    let store: Arc<dyn EventStore> = Arc::new(sqlite);
    seed(store, &args).await?;
    info!("Seeding complete");
    Ok(())
}

async fn seed(store: Arc<dyn EventStore>, args: &Args) -> Result<Vec<String>> {
    let catalog = ensure_catalog(store.as_ref()).await?;
    let user_ids = create_ghost_users(store.as_ref(), args.users).await?;
    seed_random_interactions(store.as_ref(), &user_ids, &catalog, args.events).await?;
    seed_biased_feedback(store.as_ref(), &user_ids, &catalog).await?;
    Ok(user_ids)
}

/// Regional demo catalog around the four hub cities. Inserted only when
/// the museums table is still empty.
async fn ensure_catalog(store: &dyn EventStore) -> Result<Vec<Museum>> {
    let existing = store.get_catalog().await?;
    if !existing.is_empty() {
        info!("Catalog already has {} museums, keeping it", existing.len());
        return Ok(existing);
    }

    let rows: Vec<(i64, &str, &str, &str, f64, f64)> = vec![
        (1, "Musée des Beaux-Arts de Lyon", "Lyon", "Art", 45.7673, 4.8338),
        (2, "Musée des Confluences", "Lyon", "Science", 45.7327, 4.8180),
        (3, "Musée Gallo-Romain de Fourvière", "Lyon", "History", 45.7601, 4.8199),
        (4, "Musée Lumière", "Lyon", "Science", 45.7459, 4.8707),
        (5, "Musée d'Art Contemporain de Lyon", "Lyon", "Art", 45.7850, 4.8530),
        (6, "Musée Gadagne", "Lyon", "Local Heritage", 45.7640, 4.8277),
        (7, "Musée de Grenoble", "Grenoble", "Art", 45.1947, 5.7321),
        (8, "Musée Dauphinois", "Grenoble", "Local Heritage", 45.1939, 5.7241),
        (9, "Musée d'Art Roger-Quilliot", "Clermont-Ferrand", "Art", 45.7876, 3.0900),
        (10, "Muséum Henri-Lecoq", "Clermont-Ferrand", "Science", 45.7731, 3.0862),
        (11, "Musée d'Art Moderne et Contemporain", "Saint-Étienne", "Art", 45.4616, 4.3807),
        (12, "Musée de la Mine", "Saint-Étienne", "Local Heritage", 45.4262, 4.3708),
        (13, "Musée Gallo-Romain de Saint-Romain-en-Gal", "Vienne", "History", 45.5256, 4.8727),
    ];

    let mut catalog = Vec::new();
    for (id, name, city, theme, lat, lon) in rows {
        let mut museum = Museum::new(id, name)
            .with_theme(theme)
            .with_coordinates(lat, lon);
        museum.region = Some("Auvergne-Rhône-Alpes".to_string());
        museum.location = Some(format!("{city}, Auvergne-Rhône-Alpes"));
        store.insert_museum(&museum).await?;
        catalog.push(museum);
    }
    info!("Inserted {} demo museums", catalog.len());
    Ok(catalog)
}

async fn create_ghost_users(store: &dyn EventStore, count: usize) -> Result<Vec<String>> {
    let mut rng = rand::thread_rng();
    let count = count.min(GHOST_PSEUDOS.len()).max(1);
    let mut pseudos = GHOST_PSEUDOS.to_vec();
    pseudos.shuffle(&mut rng);

    let mut user_ids = Vec::new();
    for pseudo in pseudos.into_iter().take(count) {
        let theme_count = rng.gen_range(1..=3.min(THEMES.len()));
        let mut themes = THEMES.to_vec();
        themes.shuffle(&mut rng);

        let mut user = User::new(pseudo, pseudo)
            .with_themes(themes.into_iter().take(theme_count).map(String::from).collect())
            .with_hub_city(*HUB_CITIES.choose(&mut rng).expect("hub cities"));
        user.ui_language = UI_LANGUAGES.choose(&mut rng).expect("languages").to_string();
        user.visitor_type = VISITOR_TYPES.choose(&mut rng).expect("types").to_string();
        user.distance_pref =
            musea::DistancePref::parse(DISTANCE_PREFS.choose(&mut rng).expect("prefs"));
        user.interest_mode =
            musea::InterestMode::parse(INTEREST_MODES.choose(&mut rng).expect("modes"));

        store.save_user(&user).await?;
        user_ids.push(user.user_id);
    }
    info!("Created {} ghost users", user_ids.len());
    Ok(user_ids)
}

async fn seed_random_interactions(
    store: &dyn EventStore,
    user_ids: &[String],
    catalog: &[Museum],
    count: usize,
) -> Result<()> {
    let kinds = [
        InteractionKind::CardClick,
        InteractionKind::DetailOpen,
        InteractionKind::Reading,
        InteractionKind::FavoriteAdded,
        InteractionKind::WebsiteVisit,
    ];

    let mut rng = rand::thread_rng();
    for _ in 0..count {
        let user_id = user_ids.choose(&mut rng).expect("users").clone();
        let museum = catalog.choose(&mut rng).expect("catalog");
        let kind = *kinds.choose(&mut rng).expect("kinds");

        let mut event = NewEvent::new(user_id, museum.id, kind);
        if kind == InteractionKind::Reading {
            event = event.with_duration(rng.gen_range(15.0..600.0));
        }
        let points = scorer::interaction_points(kind, event.duration_secs);
        store.append_event(&event, points).await?;
    }
    info!("Inserted {} baseline interactions", count);
    Ok(())
}

/// Strategic bias so the demo shows both sides of the hidden-gems logic:
/// the busiest museum gets mediocre approval, a quiet one gets perfect
/// approval.
async fn seed_biased_feedback(
    store: &dyn EventStore,
    user_ids: &[String],
    catalog: &[Museum],
) -> Result<()> {
    let find = |keyword: &str| {
        catalog
            .iter()
            .find(|m| m.name.to_lowercase().contains(keyword))
            .map(|m| m.id)
    };

    let mut rng = rand::thread_rng();

    if let Some(busy_id) = find("confluences") {
        for user_id in user_ids {
            for kind in [InteractionKind::CardClick, InteractionKind::Reading] {
                let mut event = NewEvent::new(user_id.clone(), busy_id, kind);
                if kind == InteractionKind::Reading {
                    event = event.with_duration(rng.gen_range(30.0..600.0));
                }
                let points = scorer::interaction_points(kind, event.duration_secs);
                store.append_event(&event, points).await?;
            }
        }
        // Roughly half the visitors are unimpressed.
        for (i, user_id) in user_ids.iter().enumerate() {
            let kind = if i % 2 == 0 {
                InteractionKind::ThumbsUp
            } else {
                InteractionKind::ThumbsDown
            };
            let points = scorer::interaction_points(kind, None);
            store
                .append_event(&NewEvent::new(user_id.clone(), busy_id, kind), points)
                .await?;
        }
        info!("Seeded biased feedback for museum {}", busy_id);
    } else {
        warn!("No busy-museum candidate found, skipping bias");
    }

    if let Some(gem_id) = find("gadagne") {
        for user_id in user_ids.iter().take(3) {
            for kind in [InteractionKind::CardClick, InteractionKind::ThumbsUp] {
                let points = scorer::interaction_points(kind, None);
                store
                    .append_event(&NewEvent::new(user_id.clone(), gem_id, kind), points)
                    .await?;
            }
        }
        info!("Seeded perfect approval for museum {}", gem_id);
    }

    Ok(())
}

async fn print_sample_feed(
    store: Arc<dyn EventStore>,
    config: Arc<Config>,
    user_ids: &[String],
) {
    let Some(user_id) = user_ids.first() else {
        return;
    };
    let service = DiscoveryService::new(store, config);
    let feed = service
        .discovery_feed(user_id, &ContextSignals::default())
        .await;

    info!("Sample feed for {} ({} museums):", user_id, feed.museums.len());
    for entry in &feed.museums {
        info!(
            "  #{:<3} {:<45} theme={:<15} popularity={:<4} affinity={}",
            entry.museum.id,
            entry.museum.name,
            entry.museum.theme.as_deref().unwrap_or("-"),
            entry.popularity,
            entry.theme_affinity,
        );
    }
    for note in &feed.trail {
        info!("  why: {}", note);
    }
}
