#[macro_use]
extern crate rocket;

mod api;

use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use rocket::{
    figment::{
        providers::{Format, Toml},
        Figment, Profile,
    },
    Build, Config, Rocket,
};

use picfeed::cors::CORS;
use picfeed::{
    AppConfig, Clock, FeedContext, FeedSettings, FileStore, KeyValueStore, MemoryStore, PageCache,
    PhotoSource, SearchHistory, SessionRegistry, SystemClock, UnsplashClient,
};

#[launch]
async fn rocket() -> _ {
    dotenv().ok();

    // Load config
    let mut figment = Figment::from(Config::default()).merge(Toml::file("App.toml").nested());

    // Environment overrides for secrets and deployment paths
    for (var, key) in [
        ("UNSPLASH_ACCESS_KEY", "unsplash_access_key"),
        ("PROXY", "proxy"),
        ("SESSION_STORE_DIR", "session_store_dir"),
        ("HISTORY_STORE_DIR", "history_store_dir"),
    ] {
        if let Ok(value) = env::var(var) {
            figment = figment.merge((key, value));
        }
    }

    figment = figment.select(Profile::from_env_or("APP_PROFILE", "default"));

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match figment.extract::<AppConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded successfully");

    if config.unsplash_access_key.is_empty() {
        warn!("No UNSPLASH_ACCESS_KEY configured, the photo API will refuse requests");
    }

    let client = match UnsplashClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build photo API client: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting picfeed on {}:{}", config.address, config.port);

    assemble(figment, &config, Arc::new(client))
}

fn open_store(dir: Option<&str>, name: &str) -> Arc<dyn KeyValueStore> {
    match dir {
        Some(dir) => match FileStore::open(dir) {
            Ok(store) => {
                info!("Using {} store at {}", name, dir);
                Arc::new(store)
            }
            Err(e) => {
                warn!("Cannot open {} store at {}, keeping it in memory: {}", name, dir, e);
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            info!("Using in-memory {} store", name);
            Arc::new(MemoryStore::new())
        }
    }
}

/// Wires the shared cache, sessions and history into a rocket instance.
fn assemble(figment: Figment, config: &AppConfig, source: Arc<dyn PhotoSource>) -> Rocket<Build> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache = PageCache::hydrate(
        open_store(config.session_store_dir.as_deref(), "session"),
        config.cache_max_entries,
    );
    let context = FeedContext::new(
        Arc::new(cache),
        source,
        clock.clone(),
        FeedSettings::from_config(config),
    );
    let mut registry = SessionRegistry::new(context);
    if let Some(seconds) = config.session_idle_timeout {
        registry = registry.with_idle_timeout(chrono::Duration::seconds(seconds as i64));
    }
    let history = SearchHistory::load(
        open_store(config.history_store_dir.as_deref(), "history"),
        clock,
        config.history_limit,
    );

    rocket::custom(figment)
        .attach(CORS)
        .manage(registry)
        .manage(history)
        .mount(
            "/feed",
            routes![
                api::feed::load_feed,
                api::feed::load_more,
                api::feed::snapshot,
                api::feed::close_session,
            ],
        )
        .mount(
            "/history",
            routes![
                api::history::list,
                api::history::add,
                api::history::remove,
                api::history::clear,
            ],
        )
        .mount("/cache", routes![api::cache::stats, api::cache::clear])
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::Value;

    use picfeed::models::{PhotoUrls, RequestKey};
    use picfeed::{Photo, SourceError};

    use super::*;

    struct FixedSource;

    #[async_trait]
    impl PhotoSource for FixedSource {
        async fn fetch_page(&self, key: &RequestKey, per_page: u32) -> Result<Vec<Photo>, SourceError> {
            Ok((0..per_page)
                .map(|i| {
                    let id = format!("{}-{}", key, i);
                    Photo {
                        id: id.clone(),
                        urls: PhotoUrls {
                            thumb: id.clone(),
                            small: id.clone(),
                            regular: id.clone(),
                            full: id,
                        },
                        description: None,
                        alt_description: None,
                        likes: None,
                        views: None,
                        downloads: None,
                        links: None,
                        user: None,
                    }
                })
                .collect())
        }
    }

    async fn client() -> Client {
        let figment = Figment::from(Config::debug_default());
        let rocket = assemble(figment, &AppConfig::default(), Arc::new(FixedSource));
        Client::tracked(rocket).await.unwrap()
    }

    #[rocket::async_test]
    async fn test_feed_then_cache_hit() {
        let client = client().await;

        let response = client.get("/feed/tab-1?query=cats").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.headers().get_one("X-Feed-Outcome"), Some("fetched"));
        assert_eq!(response.headers().get_one("Cache-Control"), Some("no-store"));
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 20);
        assert_eq!(body["hasMore"], Value::Bool(true));
        assert_eq!(body["mode"], "search");

        let again = client.get("/feed/tab-2?query=cats&page=1").dispatch().await;
        assert_eq!(again.headers().get_one("X-Feed-Outcome"), Some("cache-hit"));

        let more = client.post("/feed/tab-1/more").dispatch().await;
        let body: Value = more.into_json().await.unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 40);
        assert_eq!(body["page"], 2);

        let history: Value = client.get("/history").dispatch().await.into_json().await.unwrap();
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["term"], "cats");
    }

    #[rocket::async_test]
    async fn test_blank_query_lists_popular() {
        let client = client().await;

        let body: Value = client
            .get("/feed/tab-1")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        assert_eq!(body["mode"], "popular");
        assert!(body["items"][0]["id"].as_str().unwrap().starts_with("popular:popular:page:1"));
    }

    #[rocket::async_test]
    async fn test_load_more_past_last_page_number() {
        let client = client().await;

        let response = client.get("/feed/tab-1?query=cats&page=4294967295").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let more = client.post("/feed/tab-1/more").dispatch().await;
        assert_eq!(more.status(), Status::Ok);
        assert_eq!(more.headers().get_one("X-Feed-Outcome"), Some("skipped"));
        let body: Value = more.into_json().await.unwrap();
        assert_eq!(body["page"], 4294967295u64);
    }

    #[rocket::async_test]
    async fn test_invalid_mode_rejected() {
        let client = client().await;
        let response = client.get("/feed/tab-1?mode=latest").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_unknown_session() {
        let client = client().await;

        assert_eq!(client.post("/feed/nope/more").dispatch().await.status(), Status::NotFound);
        assert_eq!(client.delete("/feed/nope").dispatch().await.status(), Status::NotFound);

        client.get("/feed/tab-1?query=owls").dispatch().await;
        assert_eq!(client.delete("/feed/tab-1").dispatch().await.status(), Status::NoContent);
        assert_eq!(client.get("/feed/tab-1/snapshot").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_history_routes() {
        let client = client().await;

        let blank = client
            .post("/history")
            .header(ContentType::JSON)
            .body(r#"{"term": "  "}"#)
            .dispatch()
            .await;
        assert_eq!(blank.status(), Status::BadRequest);

        let added = client
            .post("/history")
            .header(ContentType::JSON)
            .body(r#"{"term": "forest"}"#)
            .dispatch()
            .await;
        assert_eq!(added.status(), Status::Ok);

        assert_eq!(client.delete("/history/forest").dispatch().await.status(), Status::NoContent);
        assert_eq!(client.delete("/history/forest").dispatch().await.status(), Status::NotFound);
        assert_eq!(client.delete("/history").dispatch().await.status(), Status::NoContent);
    }

    #[rocket::async_test]
    async fn test_cache_stats() {
        let client = client().await;
        client.get("/feed/tab-1?query=cats").dispatch().await;

        let stats: Value = client.get("/cache/stats").dispatch().await.into_json().await.unwrap();
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["fresh"], 1);

        assert_eq!(client.delete("/cache").dispatch().await.status(), Status::NoContent);
        let stats: Value = client.get("/cache/stats").dispatch().await.into_json().await.unwrap();
        assert_eq!(stats["total"], 0);
    }
}
