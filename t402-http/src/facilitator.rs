//! A [`FacilitatorClient`] that talks to a remote t402 facilitator over HTTP.
//!
//! [`HttpFacilitatorClient`] posts to `/verify` and `/settle` and reads
//! `/supported`, so a [`T402ResourceServer`](t402::server::T402ResourceServer)
//! can delegate chain work to a hosted facilitator.

use std::time::Duration;

use http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use t402::proto::{
    PaymentPayload, PaymentRequirements, SettleResponse, SupportedResponse, VerifyResponse,
};
use t402::scheme::{BoxFuture, SchemeError};
use t402::server::FacilitatorClient;
use url::Url;

use crate::constants::DEFAULT_FACILITATOR_URL;

const fn default_timeout_secs() -> u64 {
    30
}

fn default_url() -> String {
    DEFAULT_FACILITATOR_URL.to_owned()
}

/// Connection settings for [`HttpFacilitatorClient`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFacilitatorConfig {
    /// Facilitator base URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for HttpFacilitatorConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            bearer_token: None,
        }
    }
}

impl HttpFacilitatorConfig {
    /// Config for `url` with the default timeout and no auth.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds a bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for HttpFacilitatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFacilitatorConfig")
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Errors raised while talking to a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    /// The base URL or an endpoint URL is malformed.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// What was being built.
        context: &'static str,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The bearer token cannot be sent as a header.
    #[error("invalid bearer token")]
    InvalidToken(#[source] http::header::InvalidHeaderValue),
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// The request did not complete.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Endpoint.
        context: &'static str,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The facilitator answered with a non-200 status.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Endpoint.
        context: &'static str,
        /// Status code.
        status: StatusCode,
        /// Response body.
        body: String,
    },
    /// The 200 body is not the expected JSON.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Endpoint.
        context: &'static str,
        /// Decode error.
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FacilitatorRequest<'a> {
    #[serde(rename = "t402Version")]
    t402_version: u32,
    payment_payload: &'a PaymentPayload,
    payment_requirements: &'a PaymentRequirements,
}

/// HTTP client for a remote facilitator.
#[derive(Clone, Debug)]
pub struct HttpFacilitatorClient {
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    supported_url: Url,
    client: Client,
    headers: HeaderMap,
}

impl HttpFacilitatorClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed URL, a token that is not a valid header value,
    /// or a reqwest builder error.
    pub fn new(config: &HttpFacilitatorConfig) -> Result<Self, FacilitatorClientError> {
        let mut normalized = config.url.trim_end_matches('/').to_owned();
        normalized.push('/');
        let base_url = Url::parse(&normalized).map_err(|source| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source,
        })?;
        let join = |path: &str, context: &'static str| {
            base_url
                .join(path)
                .map_err(|source| FacilitatorClientError::UrlParse { context, source })
        };
        let verify_url = join("./verify", "Failed to construct ./verify URL")?;
        let settle_url = join("./settle", "Failed to construct ./settle URL")?;
        let supported_url = join("./supported", "Failed to construct ./supported URL")?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(FacilitatorClientError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FacilitatorClientError::Build)?;

        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            supported_url,
            client,
            headers,
        })
    }

    /// Base URL, always with a trailing slash.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Adds custom headers to every request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// `POST /verify`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport, status, or decode
    /// failure.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "t402.facilitator_client.verify", skip_all, err)
    )]
    pub async fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        let body = FacilitatorRequest {
            t402_version: payload.t402_version,
            payment_payload: payload,
            payment_requirements: requirements,
        };
        self.send(self.client.post(self.verify_url.clone()).json(&body), "POST /verify")
            .await
    }

    /// `POST /settle`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport, status, or decode
    /// failure.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "t402.facilitator_client.settle", skip_all, err)
    )]
    pub async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        let body = FacilitatorRequest {
            t402_version: payload.t402_version,
            payment_payload: payload,
            payment_requirements: requirements,
        };
        self.send(self.client.post(self.settle_url.clone()).json(&body), "POST /settle")
            .await
    }

    /// `GET /supported`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] on transport, status, or decode
    /// failure.
    pub async fn supported(&self) -> Result<SupportedResponse, FacilitatorClientError> {
        self.send(self.client.get(self.supported_url.clone()), "GET /supported")
            .await
    }

    async fn send<R: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &'static str,
    ) -> Result<R, FacilitatorClientError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|source| FacilitatorClientError::Http { context, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, context, "facilitator request failed");
            return Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|source| FacilitatorClientError::JsonDeserialization { context, source })
    }
}

impl TryFrom<&str> for HttpFacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        Self::new(&HttpFacilitatorConfig::new(url))
    }
}

impl FacilitatorClient for HttpFacilitatorClient {
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
        Box::pin(async move { Ok(self.verify_payment(payload, requirements).await?) })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
        Box::pin(async move { Ok(self.settle_payment(payload, requirements).await?) })
    }

    fn get_supported(&self) -> BoxFuture<'_, Result<SupportedResponse, SchemeError>> {
        Box::pin(async move { Ok(self.supported().await?) })
    }
}
