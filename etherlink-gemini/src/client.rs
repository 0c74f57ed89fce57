//! A [`RouteEstimator`] that asks Gemini for a structured route estimate.
//!
//! The request uses `generateContent` with a JSON response schema, so the
//! model's text is itself a [`RouteEstimate`] document.
//!
//! ## Error Handling
//!
//! Failures surface as [`GeminiError`] from [`GeminiEstimator::analyze`] and as
//! [`EstimationFailure`] through the [`RouteEstimator`] trait, where
//! [`etherlink::estimate::estimate_or_fallback`] replaces them with the fallback.

use std::fmt::Display;

use async_trait::async_trait;
use etherlink::estimate::{EstimationFailure, RouteEstimate, RouteEstimator, RouteQuery};
use reqwest::{Client, StatusCode};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::config::GeminiConfig;
use crate::error::GeminiError;
use crate::types::{GenerateContentRequest, GenerateContentResponse, route_estimate_schema};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini-backed route estimator.
#[derive(Clone, Debug)]
pub struct GeminiEstimator {
    client: Client,
    config: GeminiConfig,
    generate_url: Url,
}

impl GeminiEstimator {
    /// Builds an estimator for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::UrlParse`] if the model endpoint URL cannot be built.
    pub fn try_new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let generate_url = config
            .base_url
            .join(&format!("models/{}:generateContent", config.model))
            .map_err(|e| GeminiError::UrlParse {
                context: "Failed to construct generateContent URL",
                source: e,
            })?;
        Ok(Self {
            client: Client::new(),
            config,
            generate_url,
        })
    }

    /// Builds an estimator from `API_KEY` (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::MissingApiKey`] when no key is configured.
    pub fn from_env() -> Result<Self, GeminiError> {
        Self::try_new(GeminiConfig::from_env()?)
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Returns the computed `generateContent` URL.
    pub const fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    /// Requests an estimate for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError`] on transport failure, a non-200 status, an empty
    /// answer, or an answer that is not a route estimate.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "etherlink.gemini.analyze",
            skip_all,
            fields(token = %query.token_symbol, from = %query.from_network, to = %query.to_network),
            err
        )
    )]
    pub async fn analyze(&self, query: &RouteQuery) -> Result<RouteEstimate, GeminiError> {
        let request =
            GenerateContentRequest::json_prompt(build_prompt(query), route_estimate_schema());
        let response: GenerateContentResponse = self
            .post_json(&self.generate_url, "POST generateContent", &request)
            .await?;
        let text = response.text().ok_or(GeminiError::EmptyResponse)?;
        serde_json::from_str(&text).map_err(GeminiError::InvalidEstimate)
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, GeminiError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let req = self
            .client
            .post(url.clone())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(payload);
        #[cfg(not(target_arch = "wasm32"))]
        let req = match self.config.timeout {
            Some(timeout) => req.timeout(timeout),
            None => req,
        };
        let http_response = req
            .send()
            .await
            .map_err(|e| GeminiError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| GeminiError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| GeminiError::ResponseBodyRead { context, source: e })?;
            Err(GeminiError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

impl TryFrom<GeminiConfig> for GeminiEstimator {
    type Error = GeminiError;

    fn try_from(config: GeminiConfig) -> Result<Self, Self::Error> {
        Self::try_new(config)
    }
}

#[async_trait(?Send)]
impl RouteEstimator for GeminiEstimator {
    async fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure> {
        self.analyze(query).await.map_err(EstimationFailure::new)
    }
}

fn build_prompt(query: &RouteQuery) -> String {
    format!(
        "Analyze the following cross-chain bridge transaction in real-time.\n\
         Details:\n\
         - Amount: {amount}\n\
         - Token: {token}\n\
         - From: {from}\n\
         - To: {to}\n\
         \n\
         Please provide an analysis of this transaction.\n\
         1. Estimate the current gas fee (in ETH) based on network conditions.\n\
         2. Estimate transaction time in minutes.\n\
         3. Give a risk score (Low/Medium/High) for this bridge route.\n\
         4. A brief, professional comment about the transaction state or network status.\n",
        amount = query.amount,
        token = query.token_symbol,
        from = query.from_network,
        to = query.to_network,
    )
}

#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to Gemini failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use etherlink::estimate::{RiskScore, estimate_or_fallback};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn query() -> RouteQuery {
        RouteQuery {
            amount: "1.5".into(),
            token_symbol: "ETH".into(),
            from_network: "Sepolia Testnet".into(),
            to_network: "Ethereum Mainnet".into(),
        }
    }

    fn estimator(server: &MockServer) -> GeminiEstimator {
        let config = GeminiConfig::new("test-key")
            .unwrap()
            .with_base_url(&format!("{}/v1beta", server.uri()))
            .unwrap();
        GeminiEstimator::try_new(config).unwrap()
    }

    fn answer(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
    }

    #[tokio::test]
    async fn test_analyze_parses_structured_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(
                r#"{"estimatedGas":"0.0031","estimatedTime":"7","riskScore":"medium","message":"Busy mempool."}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let estimate = estimator(&server).analyze(&query()).await.unwrap();
        assert_eq!(estimate.estimated_gas, "0.0031");
        assert_eq!(estimate.estimated_time, "7");
        assert_eq!(estimate.risk_score, RiskScore::Medium);
        assert_eq!(estimate.message, "Busy mempool.");
    }

    #[tokio::test]
    async fn test_prompt_carries_route_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(
                r#"{"estimatedGas":"0.001","estimatedTime":"3","riskScore":"Low","message":"ok"}"#,
            )))
            .mount(&server)
            .await;

        estimator(&server).analyze(&query()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("- Amount: 1.5"));
        assert!(prompt.contains("- Token: ETH"));
        assert!(prompt.contains("- From: Sepolia Testnet"));
        assert!(prompt.contains("- To: Ethereum Mainnet"));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = estimator(&server).analyze(&query()).await.unwrap_err();
        match err {
            GeminiError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = estimator(&server).analyze(&query()).await.unwrap_err();
        assert!(matches!(err, GeminiError::EmptyResponse));
        assert_eq!(err.to_string(), "No response from model");
    }

    #[tokio::test]
    async fn test_answer_that_is_not_an_estimate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(answer(r#"{"estimatedGas":"0.1","riskScore":"Extreme"}"#)),
            )
            .mount(&server)
            .await;

        let err = estimator(&server).analyze(&query()).await.unwrap_err();
        assert!(matches!(err, GeminiError::InvalidEstimate(_)));
    }

    #[tokio::test]
    async fn test_failure_falls_back_through_trait() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let estimator = estimator(&server);
        assert!(estimator.estimate(&query()).await.is_err());
        let estimate = estimate_or_fallback(&estimator, &query()).await;
        assert_eq!(estimate, RouteEstimate::fallback());
    }

    #[test]
    fn test_generate_url() {
        let config = GeminiConfig::new("k").unwrap().with_model("gemini-pro");
        let estimator = GeminiEstimator::try_from(config).unwrap();
        assert_eq!(
            estimator.generate_url().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }
}
