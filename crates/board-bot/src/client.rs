//! HTTP clients for the third-party APIs behind the keyword and talk bots.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProcessError;

pub const DEFAULT_KEYWORD_API_URL: &str = "https://jlp.yahooapis.jp/KeyphraseService/V1/extract";
pub const DEFAULT_TALK_API_URL: &str = "https://api.a3rt.recruit-tech.co.jp/talk/v1/smalltalk";

/// Shared reqwest client; `timeout` bounds every outbound call so a hung API
/// cannot stall a bot forever.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Keyphrase extraction API.
#[derive(Debug, Clone)]
pub struct KeywordClient {
    client: reqwest::Client,
    url: String,
    app_id: String,
}

impl KeywordClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            app_id: app_id.into(),
        }
    }

    /// Extract keyphrases from `sentence`, sorted by key.
    pub async fn extract(&self, sentence: &str) -> Result<Vec<String>, ProcessError> {
        debug!("Sending keyword request to {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("sentence", sentence),
                ("output", "json"),
            ])
            .send()
            .await?
            .error_for_status()?;

        // keyphrase -> score, or a single "Error" entry
        let body: Map<String, Value> = response.json().await?;
        if let Some(err) = body.get("Error") {
            return Err(ProcessError::Remote(remote_message(err)));
        }

        Ok(body.into_iter().map(|(keyword, _)| keyword).collect())
    }
}

fn remote_message(err: &Value) -> String {
    err.get("Message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

/// Small-talk API.
#[derive(Debug, Clone)]
pub struct TalkClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TalkResponse {
    status: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    results: Vec<TalkResult>,
}

#[derive(Debug, Deserialize)]
struct TalkResult {
    reply: String,
    #[serde(default)]
    perplexity: f64,
}

impl TalkClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Ask for a reply to `query`. A non-zero `status` in the body is an error even
    /// when the HTTP status is 200.
    pub async fn reply(&self, query: &str) -> Result<String, ProcessError> {
        debug!("Sending talk request to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .form(&[("apikey", self.api_key.as_str()), ("query", query)])
            .send()
            .await?
            .error_for_status()?;

        let talk: TalkResponse = response.json().await?;
        if talk.status != 0 {
            return Err(ProcessError::Remote(format!(
                "{} (status {})",
                talk.message, talk.status
            )));
        }

        let first = talk
            .results
            .into_iter()
            .next()
            .ok_or(ProcessError::EmptyReply)?;
        debug!(perplexity = first.perplexity, "Talk API replied");
        Ok(first.reply)
    }
}
