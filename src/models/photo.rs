use serde::{Deserialize, Serialize};

/// Resolution variants served for a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUrls {
    pub thumb: String,
    pub small: String,
    pub regular: String,
    pub full: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoLinks {
    #[serde(default)]
    pub download: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

/// A single image record as returned by the remote endpoint.
///
/// Records are never modified after they are received; two records with the
/// same `id` are considered the same photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub urls: PhotoUrls,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub alt_description: Option<String>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub links: Option<PhotoLinks>,
    #[serde(default)]
    pub user: Option<PhotoAuthor>,
}

impl Photo {
    // Best text to show for the photo, if any
    pub fn caption(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.alt_description.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Envelope wrapping search-mode results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub results: Vec<Photo>,
}

#[cfg(test)]
pub(crate) fn sample_photo(id: &str) -> Photo {
    Photo {
        id: id.to_string(),
        urls: PhotoUrls {
            thumb: format!("https://images.example.com/{}?w=200", id),
            small: format!("https://images.example.com/{}?w=400", id),
            regular: format!("https://images.example.com/{}?w=1080", id),
            full: format!("https://images.example.com/{}", id),
        },
        description: None,
        alt_description: Some(format!("photo {}", id)),
        likes: Some(1),
        views: None,
        downloads: None,
        links: None,
        user: None,
    }
}
