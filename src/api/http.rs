use crate::api::{
    CatalogApi, CustomizeApi, CustomizedProduct, MoodApi, PhotoFile, ProductId, ProductSummary,
    UploadApi, UserId, UserMood,
};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::session::{AuthSession, SessionHandle, SCHEMA_VERSION};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

// The token endpoint does not always echo a user id; the API serves a
// single storefront user in that case.
const FALLBACK_USER_ID: UserId = UserId(1);

#[derive(Debug, Default)]
struct QueryCache {
    latest_mood: Option<Option<UserMood>>,
    suggestions: HashMap<String, Vec<ProductSummary>>,
}

pub struct AirisClient {
    http: Client,
    api_url: String,
    loader_url: String,
    session: SessionHandle,
    cache: Mutex<QueryCache>,
}

impl AirisClient {
    pub fn new(config: &AppConfig, session: SessionHandle) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("airis-studio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            loader_url: config.loader_url.clone(),
            session,
            cache: Mutex::new(QueryCache::default()),
        })
    }

    fn cache(&self) -> MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let endpoint = "/auth/token";
        info!(email, "requesting auth token");
        let response = self
            .http
            .post(self.api(endpoint))
            .query(&[("user_email", email), ("user_password", password)])
            .send()
            .await?;
        let body: Value = read_json(endpoint, response).await?;
        parse_login_response(email, &body, unix_timestamp())
    }

    pub fn clear_cache(&self) {
        *self.cache() = QueryCache::default();
    }
}

fn unix_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs().to_string(),
        Err(_) => "0".to_string(),
    }
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::Malformed {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

fn parse_login_response(
    email: &str,
    body: &Value,
    created_at: String,
) -> Result<AuthSession, ApiError> {
    let token = ["access_token", "token"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Malformed {
            endpoint: "/auth/token".to_string(),
            message: "response carries no token".to_string(),
        })?;

    let user_id = body
        .get("user_id")
        .or_else(|| body.get("user").and_then(|user| user.get("id")))
        .or_else(|| body.get("user").and_then(|user| user.get("user_id")))
        .and_then(Value::as_i64)
        .map(UserId)
        .unwrap_or(FALLBACK_USER_ID);

    Ok(AuthSession {
        schema_version: SCHEMA_VERSION,
        user_id,
        email: email.to_string(),
        token: token.to_string(),
        created_at,
    })
}

#[async_trait]
impl UploadApi for AirisClient {
    async fn upload_user_image(
        &self,
        user_id: UserId,
        images_kind: &str,
        photo: &PhotoFile,
    ) -> Result<(), ApiError> {
        let endpoint = "/users/user-images";
        let part = Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(photo.mime_type())?;
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .text("images_kind", images_kind.to_string())
            .part("images", part);

        info!(%user_id, images_kind, file = %photo.file_name, "uploading user image");
        let response = self
            .http
            .post(format!("{}{endpoint}", self.loader_url))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MoodApi for AirisClient {
    async fn latest_user_mood(&self) -> Result<Option<UserMood>, ApiError> {
        if let Some(cached) = self.cache().latest_mood.clone() {
            debug!("latest mood served from cache");
            return Ok(cached);
        }

        let endpoint = "/operation/latest-user-mood";
        let response = self
            .authorized(self.http.get(self.api(endpoint)))
            .send()
            .await?;
        let mood = if response.status() == StatusCode::NOT_FOUND {
            None
        } else {
            read_json::<Option<UserMood>>(endpoint, response).await?
        };

        self.cache().latest_mood = Some(mood.clone());
        Ok(mood)
    }

    fn invalidate_cache(&self) {
        self.cache().latest_mood = None;
    }
}

#[async_trait]
impl CatalogApi for AirisClient {
    async fn suggested_products(&self, query: &str) -> Result<Vec<ProductSummary>, ApiError> {
        if let Some(cached) = self.cache().suggestions.get(query).cloned() {
            debug!(query, "suggested products served from cache");
            return Ok(cached);
        }

        let endpoint = "/operation/suggested-products";
        let response = self
            .authorized(self.http.get(self.api(endpoint)))
            .query(&[("query", query)])
            .send()
            .await?;
        let products: Vec<ProductSummary> = read_json(endpoint, response).await?;

        self.cache()
            .suggestions
            .insert(query.to_string(), products.clone());
        Ok(products)
    }

    async fn catalog_products(&self) -> Result<Vec<ProductSummary>, ApiError> {
        let endpoint = "/operation/get_catalog_products";
        let response = self
            .authorized(self.http.get(self.api(endpoint)))
            .send()
            .await?;
        read_json(endpoint, response).await
    }

    fn invalidate_cache(&self) {
        self.cache().suggestions.clear();
    }
}

#[async_trait]
impl CustomizeApi for AirisClient {
    async fn customize_product(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<CustomizedProduct, ApiError> {
        let endpoint = "/operation/customize_product_by_user";
        let response = self
            .authorized(self.http.post(self.api(endpoint)))
            .query(&[("product_id", product_id), ("user_id", user_id.0)])
            .send()
            .await?;
        read_json(endpoint, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_login_response, AirisClient, FALLBACK_USER_ID};
    use crate::api::{CatalogApi, MoodApi, UserId, UserMood};
    use crate::config::AppConfig;
    use crate::session::SessionHandle;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config() -> AppConfig {
        AppConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            loader_url: "http://127.0.0.1:9".to_string(),
            data_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(1),
            images_kind: "profile".to_string(),
            log_json: false,
            ephemeral: true,
        }
    }

    #[test]
    fn login_prefers_access_token_and_reads_nested_user_id() {
        let body = json!({"access_token": "abc", "token": "ignored", "user": {"id": 12}});
        let session = parse_login_response("ana@example.com", &body, "5".to_string())
            .expect("login body should parse");
        assert_eq!(session.token, "abc");
        assert_eq!(session.user_id, UserId(12));
        assert_eq!(session.email, "ana@example.com");
        assert_eq!(session.created_at, "5");
    }

    #[test]
    fn login_falls_back_to_plain_token_and_default_user() {
        let body = json!({"token": "xyz"});
        let session = parse_login_response("ana@example.com", &body, "5".to_string())
            .expect("login body should parse");
        assert_eq!(session.token, "xyz");
        assert_eq!(session.user_id, FALLBACK_USER_ID);
    }

    #[test]
    fn login_without_token_is_malformed() {
        let error = parse_login_response("ana@example.com", &json!({"detail": "bad"}), "5".into())
            .expect_err("missing token should fail");
        assert!(error.to_string().contains("no token"));
    }

    #[tokio::test]
    async fn cached_queries_are_served_until_invalidated() {
        let client =
            AirisClient::new(&config(), SessionHandle::default()).expect("client should build");
        let mood = UserMood {
            mood_phrase: "sunny".to_string(),
            related_products_query: Some("linen".to_string()),
        };
        {
            let mut cache = client.cache();
            cache.latest_mood = Some(Some(mood.clone()));
            cache.suggestions.insert("linen".to_string(), Vec::new());
        }

        let served = client
            .latest_user_mood()
            .await
            .expect("cached mood should not hit the network");
        assert_eq!(served, Some(mood));
        let products = client
            .suggested_products("linen")
            .await
            .expect("cached suggestions should not hit the network");
        assert!(products.is_empty());

        MoodApi::invalidate_cache(&client);
        CatalogApi::invalidate_cache(&client);
        let cache = client.cache();
        assert!(cache.latest_mood.is_none());
        assert!(cache.suggestions.is_empty());
    }
}
