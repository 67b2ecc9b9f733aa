use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use reqwest::{Client, StatusCode, Url};

use super::{PhotoSource, SourceError};
use crate::config::AppConfig;
use crate::models::{FeedMode, Photo, RequestKey, SearchEnvelope};

pub struct UnsplashClient {
    client: Client,
    base_url: String,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(config: &AppConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            info!("Routing photo API requests through proxy {}", proxy);
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.unsplash_base_url.trim_end_matches('/').to_string(),
            access_key: config.unsplash_access_key.clone(),
        })
    }

    /// Search pages come from `/search/photos`, popular pages from `/photos`
    /// ordered by popularity.
    pub fn request_url(&self, key: &RequestKey, per_page: u32) -> Result<Url, SourceError> {
        let page = key.page.to_string();
        let per_page = per_page.to_string();

        let url = match key.mode {
            FeedMode::Search => {
                let query = key.query.as_deref().ok_or_else(|| {
                    SourceError::InvalidRequest("search without a query".to_string())
                })?;
                Url::parse_with_params(
                    &format!("{}/search/photos", self.base_url),
                    &[("query", query), ("page", page.as_str()), ("per_page", per_page.as_str())],
                )
            }
            FeedMode::Popular => Url::parse_with_params(
                &format!("{}/photos", self.base_url),
                &[("page", page.as_str()), ("per_page", per_page.as_str()), ("order_by", "popular")],
            ),
        };

        url.map_err(|e| SourceError::InvalidRequest(e.to_string()))
    }

    fn parse_page(mode: FeedMode, body: &str) -> Result<Vec<Photo>, SourceError> {
        let parsed = match mode {
            FeedMode::Search => serde_json::from_str::<SearchEnvelope>(body).map(|e| e.results),
            FeedMode::Popular => serde_json::from_str::<Vec<Photo>>(body),
        };
        parsed.map_err(|e| SourceError::ParsingError(e.to_string()))
    }
}

#[async_trait]
impl PhotoSource for UnsplashClient {
    async fn fetch_page(&self, key: &RequestKey, per_page: u32) -> Result<Vec<Photo>, SourceError> {
        let url = self.request_url(key, per_page)?;
        info!("Fetching {}", key);

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!("Rate limited while fetching {}", key);
            return Err(SourceError::RateLimited);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_else(|_| "<failed to read body>".to_string());
            error!("Photo API refused credentials, status: {}. Body: {}", status, body);
            return Err(SourceError::Unauthorized(format!("status {}", status.as_u16())));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<failed to read body>".to_string());
            error!("Failed to fetch {}, status: {}. Body: {}", key, status, body);
            return Err(SourceError::Http { status: status.as_u16() });
        }

        let body = response.text().await?;
        let photos = Self::parse_page(key.mode, &body)?;
        info!("Fetched {} photos for {}", photos.len(), key);
        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UnsplashClient {
        let config = AppConfig {
            unsplash_base_url: "https://api.example.com/".to_string(),
            ..AppConfig::default()
        };
        UnsplashClient::new(&config).unwrap()
    }

    #[test]
    fn test_search_url() {
        let url = client().request_url(&RequestKey::search("red cars", 2), 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/search/photos?query=red+cars&page=2&per_page=20"
        );
    }

    #[test]
    fn test_popular_url_always_orders() {
        let url = client().request_url(&RequestKey::popular(1), 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/photos?page=1&per_page=20&order_by=popular"
        );
    }

    #[test]
    fn test_blank_search_rejected() {
        let result = client().request_url(&RequestKey::search(" ", 1), 20);
        assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_page_shapes() {
        let photo = r#"{"id":"a","urls":{"thumb":"t","small":"s","regular":"r","full":"f"}}"#;

        let search = UnsplashClient::parse_page(
            FeedMode::Search,
            &format!(r#"{{"total":1,"total_pages":1,"results":[{}]}}"#, photo),
        )
        .unwrap();
        assert_eq!(search.len(), 1);

        let popular = UnsplashClient::parse_page(FeedMode::Popular, &format!("[{}]", photo)).unwrap();
        assert_eq!(popular[0].id, "a");

        let wrong = UnsplashClient::parse_page(FeedMode::Popular, r#"{"results":[]}"#);
        assert!(matches!(wrong, Err(SourceError::ParsingError(_))));
    }
}
