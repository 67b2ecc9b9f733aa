use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    pub timeout: u64,
    pub user_agent: String,
    #[serde(default)]
    pub unsplash_access_key: String,
    #[serde(default = "default_unsplash_base_url")]
    pub unsplash_base_url: String,
    #[serde(default)]
    pub proxy: Option<String>,
    /// Seconds a fetched page is served without going back to the API
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: Option<usize>,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Seconds before an untouched feed session is reclaimed
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout: Option<u64>,
    #[serde(default)]
    pub session_store_dir: Option<String>,
    #[serde(default)]
    pub history_store_dir: Option<String>,
}

fn default_unsplash_base_url() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_cache_ttl() -> u64 {
    5 * 60
}

fn default_cache_max_entries() -> Option<usize> {
    Some(500)
}

fn default_per_page() -> u32 {
    20
}

fn default_history_limit() -> usize {
    200
}

fn default_session_idle_timeout() -> Option<u64> {
    Some(30 * 60)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
            timeout: 10,
            user_agent: format!("picfeed/{}", env!("CARGO_PKG_VERSION")),
            unsplash_access_key: String::new(),
            unsplash_base_url: default_unsplash_base_url(),
            proxy: None,
            cache_ttl: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
            per_page: default_per_page(),
            history_limit: default_history_limit(),
            session_idle_timeout: default_session_idle_timeout(),
            session_store_dir: None,
            history_store_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let json = r#"{"port": 9000, "address": "0.0.0.0", "timeout": 5, "user_agent": "ua"}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.per_page, 20);
        assert_eq!(config.history_limit, 200);
        assert_eq!(config.cache_max_entries, Some(500));
        assert_eq!(config.unsplash_base_url, "https://api.unsplash.com");
        assert!(config.session_store_dir.is_none());
        assert_eq!(config.session_idle_timeout, Some(1800));
    }
}
