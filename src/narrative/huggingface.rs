// =============================================================================
// Hugging Face Inference API client
// =============================================================================
//
// POST {base}/models/{model}
//   Authorization: Bearer <token>
//   { "inputs": <prompt>, "parameters": { temperature, max_new_tokens, top_p,
//     return_full_text: false } }
//
// The response is `[{ "generated_text": "..." }]` (some deployments return
// the bare object). The token is supplied per request and never logged.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::NarrativeGenerator;
use crate::error::NarrativeServiceError;
use crate::runtime_config::GenerationParams;

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    temperature: f64,
    max_new_tokens: u32,
    top_p: f64,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<Generation>),
    Single(Generation),
}

pub struct HuggingFaceClient {
    endpoint: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        params: GenerationParams,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let model = model.into();
        let endpoint = format!("{}/models/{}", base_url.trim_end_matches('/'), model);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(endpoint = %endpoint, "HuggingFaceClient initialised");

        Ok(Self {
            endpoint,
            model,
            params,
            client,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> InferenceRequest<'a> {
        InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                temperature: self.params.temperature,
                max_new_tokens: self.params.max_new_tokens,
                top_p: self.params.top_p,
                return_full_text: false,
            },
        }
    }
}

#[async_trait]
impl NarrativeGenerator for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt, credential), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<String, NarrativeServiceError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(NarrativeServiceError::MissingCredential)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "inference request rejected");
            return Err(classify_status(status, text));
        }

        let narrative = parse_generation(&text)?;
        debug!(chars = narrative.len(), "narrative generated");
        Ok(narrative)
    }
}

impl std::fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClient")
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .finish()
    }
}

fn classify_status(status: StatusCode, body: String) -> NarrativeServiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NarrativeServiceError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
            NarrativeServiceError::QuotaExceeded
        }
        _ => NarrativeServiceError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

fn parse_generation(body: &str) -> Result<String, NarrativeServiceError> {
    let parsed: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| NarrativeServiceError::MalformedResponse(e.to_string()))?;

    let text = match parsed {
        InferenceResponse::Single(g) => g.generated_text,
        InferenceResponse::Batch(gens) => gens
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| NarrativeServiceError::MalformedResponse("empty generation list".into()))?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(NarrativeServiceError::MalformedResponse(
            "model returned empty text".into(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HuggingFaceClient {
        HuggingFaceClient::new(
            "https://api-inference.example/",
            "org/model",
            GenerationParams::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(client().endpoint, "https://api-inference.example/models/org/model");
    }

    #[test]
    fn request_body_carries_generation_params() {
        let c = client();
        let json = serde_json::to_value(c.request_body("hello")).unwrap();
        assert_eq!(json["inputs"], "hello");
        assert_eq!(json["parameters"]["temperature"], 0.2);
        assert_eq!(json["parameters"]["max_new_tokens"], 2048);
        assert_eq!(json["parameters"]["top_p"], 0.9);
        assert_eq!(json["parameters"]["return_full_text"], false);
    }

    #[test]
    fn parses_batch_and_single_responses() {
        let batch = r#"[{"generated_text": "  ## BTC vs ETH\n- point  "}]"#;
        assert_eq!(parse_generation(batch).unwrap(), "## BTC vs ETH\n- point");

        let single = "{\"generated_text\": \"## Summary\"}";
        assert_eq!(parse_generation(single).unwrap(), "## Summary");
    }

    #[test]
    fn empty_or_garbled_responses_are_malformed() {
        assert!(matches!(
            parse_generation("[]"),
            Err(NarrativeServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_generation(r#"[{"generated_text": "   "}]"#),
            Err(NarrativeServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_generation("<html>"),
            Err(NarrativeServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            NarrativeServiceError::Unauthorized { status: 401 }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            NarrativeServiceError::Unauthorized { status: 403 }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            NarrativeServiceError::QuotaExceeded
        ));
        match classify_status(StatusCode::SERVICE_UNAVAILABLE, "loading".into()) {
            NarrativeServiceError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "loading");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_before_network() {
        let c = client();
        let err = c.generate("prompt", None).await.unwrap_err();
        assert!(matches!(err, NarrativeServiceError::MissingCredential));
        let err = c.generate("prompt", Some("   ")).await.unwrap_err();
        assert!(matches!(err, NarrativeServiceError::MissingCredential));
    }
}
