//! PostgREST-style table endpoint (`{base}/rest/v1/{table}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::{validate_table, CatalogError, CatalogRow, CatalogSource};

#[derive(Clone)]
pub struct RestCatalogSource {
    client: reqwest::Client,
    base_url: String,
}

impl RestCatalogSource {
    /// Builds a client that sends the anon key as both `apikey` and bearer token.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, anon_key: &SecretString, timeout: Duration) -> Result<Self, CatalogError> {
        let key = anon_key.expose_secret();
        let mut headers = HeaderMap::new();
        let invalid_key = |e: reqwest::header::InvalidHeaderValue| CatalogError::Malformed(format!("invalid API key: {e}"));
        headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid_key)?);
        headers.insert("Authorization", HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid_key)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl CatalogSource for RestCatalogSource {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list(&self, table: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        validate_table(table)?;
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let response = self.client.get(&url).query(&[("select", "*"), ("order", "id.asc")]).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api { status: status.as_u16(), message });
        }

        response.json::<Vec<CatalogRow>>().await.map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str { "rest" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    async fn products(headers: AxumHeaders, Query(q): Query<HashMap<String, String>>) -> Result<Json<serde_json::Value>, StatusCode> {
        if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("anon-key") { return Err(StatusCode::UNAUTHORIZED); }
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer anon-key") { return Err(StatusCode::UNAUTHORIZED); }
        if q.get("order").map(String::as_str) != Some("id.asc") { return Err(StatusCode::BAD_REQUEST); }
        Ok(Json(serde_json::json!([{ "id": 1, "name": "iPhone 13", "programada_price": 2599, "market_price": 4299 }])))
    }

    fn key(k: &str) -> SecretString { SecretString::from(k.to_string()) }

    #[tokio::test]
    async fn test_lists_rows_with_auth_and_ordering() {
        let base = serve(Router::new().route("/rest/v1/products", get(products))).await;
        let source = RestCatalogSource::new(format!("{base}/"), &key("anon-key"), Duration::from_secs(2)).unwrap();
        let rows = source.list("products").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let base = serve(Router::new().route("/rest/v1/products", get(products))).await;
        let source = RestCatalogSource::new(base, &key("wrong"), Duration::from_secs(2)).unwrap();
        assert!(matches!(source.list("products").await, Err(CatalogError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let base = serve(Router::new().route("/rest/v1/products", get(|| async { "not json" }))).await;
        let source = RestCatalogSource::new(base, &key("k"), Duration::from_secs(2)).unwrap();
        assert!(matches!(source.list("products").await, Err(CatalogError::Malformed(_))));
    }
}
