//! AI product advisor backed by the Gemini `generateContent` API.
//!
//! The advisor never fails towards the caller: without a key it answers with a
//! canned demo reply, and transport or API errors become an apology string.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, instrument};

use crate::domain::aggregates::Product;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 200;

pub const DEMO_REPLY: &str = "Estou em modo de demonstração sem uma chave de API. Imagine que eu acabei de te dar uma recomendação brilhante para o iPhone 15 Pro Max!";
pub const EMPTY_REPLY: &str = "Estou tendo dificuldades para pensar agora. Por favor, tente novamente.";
pub const CONNECTION_REPLY: &str = "Estou com dificuldades para conectar ao servidor. Verifique sua conexão.";

#[async_trait]
pub trait ProductAdvisor: Send + Sync {
    /// Answers `query` using only `inventory`. Always returns user-facing text.
    async fn ask(&self, query: &str, inventory: &[Product]) -> String;
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("invalid API key: {0}")]
    InvalidKey(String),
}

#[derive(Clone)]
pub struct GeminiAdvisor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    has_key: bool,
}

impl GeminiAdvisor {
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP client fails to build.
    pub fn new(api_key: Option<&SecretString>, model: impl Into<String>, timeout: Duration) -> Result<Self, AdvisorError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, model, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: Option<&SecretString>, model: impl Into<String>, timeout: Duration) -> Result<Self, AdvisorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "x-goog-api-key",
                HeaderValue::from_str(key.expose_secret()).map_err(|e| AdvisorError::InvalidKey(e.to_string()))?,
            );
        }
        let client = reqwest::Client::builder().default_headers(headers).timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            has_key: api_key.is_some(),
        })
    }

    async fn generate(&self, query: &str, inventory: &[Product]) -> Result<Option<String>, AdvisorError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model);
        let request = GenerateRequest {
            system_instruction: Content::text(None, system_prompt(inventory)),
            contents: vec![Content::text(Some("user"), query.to_string())],
            generation_config: GenerationConfig { temperature: TEMPERATURE, max_output_tokens: MAX_OUTPUT_TOKENS },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api { status: status.as_u16(), message });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .filter(|t| !t.trim().is_empty());
        Ok(text)
    }
}

#[async_trait]
impl ProductAdvisor for GeminiAdvisor {
    #[instrument(skip(self, inventory), fields(model = %self.model, products = inventory.len()))]
    async fn ask(&self, query: &str, inventory: &[Product]) -> String {
        if !self.has_key {
            return DEMO_REPLY.to_string();
        }
        match self.generate(query, inventory).await {
            Ok(Some(text)) => text,
            Ok(None) => EMPTY_REPLY.to_string(),
            Err(e) => {
                error!(error = %e, "advisor request failed");
                CONNECTION_REPLY.to_string()
            }
        }
    }
}

/// One line per product: name, programada price, description and stock state.
pub fn inventory_context(inventory: &[Product]) -> String {
    inventory
        .iter()
        .map(|p| {
            let price = p.resolve_price(None).map(|r| r.unit_price.to_string()).unwrap_or_else(|_| "sob consulta".to_string());
            let stock = if p.is_in_stock() { "Em estoque" } else { "Esgotado" };
            format!("{} ({price}): {} - {stock}", p.name(), p.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(inventory: &[Product]) -> String {
    format!(
        "Você é um Especialista da Apple Store Brasil (Icrazybr).
Seu objetivo é ajudar clientes a escolherem produtos baseados em suas necessidades e no catálogo da Icrazybr.

Aqui está o inventário atual da loja (Preços de Compra Programada):
{}

Regras:
1. Apenas recomende produtos que estão na lista de inventário.
2. Seja conciso, amigável e profissional (tom de voz da Apple).
3. Explique POR QUE o produto se encaixa na necessidade do usuário.
4. Se o usuário perguntar por algo fora de estoque, informe educadamente.
5. Reforce que os preços são para \"Compra Programada\" com entrega de 15 a 30 dias.
6. Responda sempre em Português do Brasil.",
        inventory_context(inventory)
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Self {
        Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text) }] }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fallback_products;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    async fn generate(headers: AxumHeaders, Json(body): Json<serde_json::Value>) -> Result<Json<serde_json::Value>, StatusCode> {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") { return Err(StatusCode::FORBIDDEN); }
        let prompt = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap_or_default();
        assert!(prompt.contains("iPhone 13 (R$ 2599.00)"));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 200);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Qual iPhone tem a melhor bateria?");
        Ok(Json(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "O iPhone 17 Pro Max." }] } }]
        })))
    }

    fn key() -> SecretString { SecretString::from("test-key".to_string()) }

    #[tokio::test]
    async fn test_no_key_returns_demo_reply() {
        let advisor = GeminiAdvisor::new(None, DEFAULT_MODEL, Duration::from_secs(1)).unwrap();
        assert_eq!(advisor.ask("oi", &fallback_products()).await, DEMO_REPLY);
    }

    #[tokio::test]
    async fn test_answer_is_returned() {
        let base = serve(Router::new().route("/v1beta/models/gemini-2.5-flash:generateContent", post(generate))).await;
        let advisor = GeminiAdvisor::with_endpoint(base, Some(&key()), DEFAULT_MODEL, Duration::from_secs(2)).unwrap();
        let answer = advisor.ask("Qual iPhone tem a melhor bateria?", &fallback_products()).await;
        assert_eq!(answer, "O iPhone 17 Pro Max.");
    }

    #[tokio::test]
    async fn test_api_error_becomes_apology() {
        let base = serve(Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )).await;
        let advisor = GeminiAdvisor::with_endpoint(base, Some(&key()), DEFAULT_MODEL, Duration::from_secs(2)).unwrap();
        assert_eq!(advisor.ask("oi", &[]).await, CONNECTION_REPLY);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let base = serve(Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|| async { Json(serde_json::json!({ "candidates": [] })) }),
        )).await;
        let advisor = GeminiAdvisor::with_endpoint(base, Some(&key()), DEFAULT_MODEL, Duration::from_secs(2)).unwrap();
        assert_eq!(advisor.ask("oi", &[]).await, EMPTY_REPLY);
    }

    #[test]
    fn test_inventory_context_marks_stock() {
        let products: Vec<Product> = fallback_products().into_iter().take(1).map(|p| p.with_stock(false)).collect();
        assert_eq!(
            inventory_context(&products),
            "iPhone 13 (R$ 2599.00): Chip A15 Bionic. Sistema de câmera dupla. O melhor custo-benefício. - Esgotado"
        );
    }
}
