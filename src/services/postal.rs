//! ViaCEP postal-code lookup used to pre-fill checkout addresses.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::aggregates::Address;
use crate::domain::value_objects::{Cep, CepError};

pub const DEFAULT_BASE_URL: &str = "https://viacep.com.br/ws";

#[derive(Debug, Error)]
pub enum PostalError {
    #[error("invalid postal code: {0}")]
    InvalidCep(#[from] CepError),
    #[error("postal code {0} not found")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status}")]
    Api { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub cep: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepResponse {
    /// ViaCEP has answered both `"erro": true` and `"erro": "true"`.
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct PostalLookup {
    client: reqwest::Client,
    base_url: String,
}

impl PostalLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PostalError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, cep: &str) -> Result<PostalAddress, PostalError> {
        let cep = Cep::new(cep)?;
        let url = format!("{}/{}/json/", self.base_url, cep);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PostalError::Api { status: status.as_u16() });
        }

        let body: ViaCepResponse = response.json().await?;
        if body.is_error() {
            debug!(%cep, "postal code not found");
            return Err(PostalError::NotFound(cep.formatted()));
        }
        Ok(PostalAddress {
            cep: cep.formatted(), street: body.logradouro, neighborhood: body.bairro, city: body.localidade, state: body.uf,
        })
    }
}

impl Address {
    /// Copies looked-up fields into the form; number and complement stay as typed.
    pub fn prefill(&mut self, postal: &PostalAddress) {
        self.street = postal.street.clone();
        self.neighborhood = Some(postal.neighborhood.clone()).filter(|n| !n.is_empty());
        self.city = postal.city.clone();
        self.state = postal.state.clone();
        self.zip = postal.cep.clone();
    }
}
