use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

pub mod http;

pub type ProductId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub product_price: f64,
    #[serde(default)]
    pub product_images_urls: Vec<String>,
    #[serde(default)]
    pub product_rank: Option<f64>,
    #[serde(default)]
    pub product_characteristics: Vec<String>,
}

impl ProductSummary {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.product_name.to_lowercase().contains(&needle)
            || self
                .product_description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle))
            || self
                .product_characteristics
                .iter()
                .any(|characteristic| characteristic.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserMood {
    #[serde(default)]
    pub mood_phrase: String,
    #[serde(default)]
    pub related_products_query: Option<String>,
}

impl UserMood {
    /// The suggestion query, if the server derived a usable one.
    pub fn usable_query(&self) -> Option<&str> {
        self.related_products_query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CustomizedProduct {
    #[serde(default, alias = "imageUrls", alias = "product_images_urls")]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn read(path: &Path) -> Result<Self, ApiError> {
        let bytes = fs::read(path).map_err(|source| ApiError::Image {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn mime_type(&self) -> &'static str {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("heic") => "image/heic",
            _ => "image/jpeg",
        }
    }
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn upload_user_image(
        &self,
        user_id: UserId,
        images_kind: &str,
        photo: &PhotoFile,
    ) -> Result<(), ApiError>;
}

#[async_trait]
pub trait MoodApi: Send + Sync {
    async fn latest_user_mood(&self) -> Result<Option<UserMood>, ApiError>;

    fn invalidate_cache(&self) {}
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn suggested_products(&self, query: &str) -> Result<Vec<ProductSummary>, ApiError>;

    async fn catalog_products(&self) -> Result<Vec<ProductSummary>, ApiError>;

    fn invalidate_cache(&self) {}
}

#[async_trait]
pub trait CustomizeApi: Send + Sync {
    async fn customize_product(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<CustomizedProduct, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::{CustomizedProduct, PhotoFile, ProductSummary, UserMood};

    #[test]
    fn product_summary_tolerates_missing_optional_fields() {
        let product: ProductSummary = serde_json::from_str(
            r#"{"product_id": 7, "product_name": "Linen shirt", "product_price": 39.9}"#,
        )
        .expect("minimal product should deserialize");
        assert_eq!(product.product_id, 7);
        assert!(product.product_images_urls.is_empty());
        assert!(product.product_description.is_none());
    }

    #[test]
    fn product_filter_checks_name_description_and_characteristics() {
        let product = ProductSummary {
            product_id: 1,
            product_name: "Jogger".to_string(),
            product_description: Some("Relaxed cotton trousers".to_string()),
            product_price: 29.0,
            product_images_urls: Vec::new(),
            product_rank: None,
            product_characteristics: vec!["elastic waist".to_string()],
        };
        assert!(product.matches("jog"));
        assert!(product.matches("COTTON"));
        assert!(product.matches("elastic"));
        assert!(product.matches("  "));
        assert!(!product.matches("denim"));
    }

    #[test]
    fn blank_mood_query_is_not_usable() {
        let mood: UserMood =
            serde_json::from_str(r#"{"mood_phrase": "calm", "related_products_query": "   "}"#)
                .expect("mood should deserialize");
        assert!(mood.usable_query().is_none());

        let mood: UserMood = serde_json::from_str(
            r#"{"mood_phrase": "bold", "related_products_query": " bright jackets "}"#,
        )
        .expect("mood should deserialize");
        assert_eq!(mood.usable_query(), Some("bright jackets"));
    }

    #[test]
    fn customized_product_accepts_both_image_field_spellings() {
        let camel: CustomizedProduct = serde_json::from_str(r#"{"imageUrls": ["a.png"]}"#)
            .expect("camel case should deserialize");
        let product: CustomizedProduct =
            serde_json::from_str(r#"{"product_images_urls": ["b.png"], "product_id": 3}"#)
                .expect("product shape should deserialize");
        assert_eq!(camel.image_urls, vec!["a.png".to_string()]);
        assert_eq!(product.image_urls, vec!["b.png".to_string()]);
    }

    #[test]
    fn photo_mime_type_follows_extension() {
        let photo = PhotoFile {
            file_name: "me.PNG".to_string(),
            bytes: Vec::new(),
        };
        assert_eq!(photo.mime_type(), "image/png");
        let photo = PhotoFile {
            file_name: "me".to_string(),
            bytes: Vec::new(),
        };
        assert_eq!(photo.mime_type(), "image/jpeg");
    }
}
