//! SafetyScorer bridge: the remote instruction-following model (IBM watsonx deployment).
//!
//! One IAM token exchange, then one chat call with the fixed system instruction. The
//! bridge only returns the raw reply text; classifying and coercing it is the
//! normalizer's job.

use crate::config::AqrayConfig;
use crate::error::{AqrayError, AqrayResult};
use crate::prompt::SCORER_SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote reasoning service: prompt in, raw reply content out.
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn score(&self, prompt: &str) -> AqrayResult<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IamToken {
    access_token: String,
}

/// watsonx deployment client.
pub struct WatsonxScorer {
    client: reqwest::Client,
    api_key: String,
    iam_url: String,
    deployment_url: String,
}

impl WatsonxScorer {
    /// `None` when no IBM credential is configured; the service then always uses the
    /// local heuristic.
    pub fn from_config(config: &AqrayConfig) -> AqrayResult<Option<Self>> {
        let Some(api_key) = config.ibm_api_key.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: config.http_client()?,
            api_key,
            iam_url: config.watsonx_iam_url.clone(),
            deployment_url: config.watsonx_deployment_url.clone(),
        }))
    }

    async fn iam_token(&self) -> AqrayResult<String> {
        let res = self
            .client
            .post(&self.iam_url)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(AqrayError::Upstream {
                service: "iam",
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        let token: IamToken = res.json().await?;
        Ok(token.access_token)
    }
}

/// First choice's message content; empty when the payload carries none.
fn reply_content(body: &str) -> AqrayResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

#[async_trait]
impl ReasoningModel for WatsonxScorer {
    async fn score(&self, prompt: &str) -> AqrayResult<String> {
        let token = self.iam_token().await?;
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SCORER_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let res = self
            .client
            .post(&self.deployment_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(AqrayError::Upstream {
                service: "watsonx",
                status: status.as_u16(),
                body: text,
            });
        }
        reply_content(&text)
    }
}
