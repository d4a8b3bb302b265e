use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use super::retry::{
    RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES, is_rate_limited, retry_after, wait_with_backoff,
};
use super::{Provider, ProviderFuture, TranslationRequest};

const DEFAULT_BASE_URL: &str = "https://api.mymemory.translated.net";

/// The free MyMemory translation API. An email raises the anonymous daily
/// quota; a key selects a registered account.
#[derive(Debug, Clone)]
pub struct MyMemory {
    email: Option<String>,
    key: Option<String>,
    client: reqwest::Client,
}

impl MyMemory {
    pub fn new(email: Option<String>, key: Option<String>) -> Self {
        Self {
            email: email.filter(|value| !value.trim().is_empty()),
            key,
            client: reqwest::Client::new(),
        }
    }

    fn query(&self, request: &TranslationRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("q", request.text.clone()),
            (
                "langpair",
                format!("{}|{}", request.source_lang, request.target_lang),
            ),
        ];
        if let Some(email) = &self.email {
            query.push(("de", email.clone()));
        }
        if let Some(key) = &self.key {
            query.push(("key", key.clone()));
        }
        query
    }
}

impl Provider for MyMemory {
    fn name(&self) -> &'static str {
        "mymemory"
    }

    fn translate(&self, request: TranslationRequest) -> ProviderFuture {
        let client = self.client.clone();
        let query = self.query(&request);
        Box::pin(async move {
            let url = format!("{}/get", base_url());
            let mut attempt = 0usize;
            let mut delay = RATE_LIMIT_BASE_DELAY;
            loop {
                attempt += 1;
                let response = client.get(&url).query(&query).send().await?;

                let status = response.status();
                let retry_after = retry_after(response.headers());
                let text = response.text().await.unwrap_or_default();
                if status.is_success() {
                    return extract_translation(&text);
                }
                if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
                    delay = wait_with_backoff("MyMemory", attempt, delay, retry_after).await;
                    continue;
                }
                return Err(anyhow!("MyMemory API error ({}): {}", status, text.trim()));
            }
        })
    }
}

fn base_url() -> String {
    std::env::var("MYMEMORY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: Option<MyMemoryData>,
    response_status: Option<serde_json::Value>,
    response_details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

/// MyMemory answers HTTP 200 even for quota and language errors; the real
/// status is `responseStatus`, sent as a number or a string.
fn extract_translation(body: &str) -> Result<String> {
    let payload: MyMemoryResponse =
        serde_json::from_str(body).with_context(|| "failed to parse MyMemory response JSON")?;
    let status = payload
        .response_status
        .as_ref()
        .and_then(status_code)
        .unwrap_or(200);
    if status != 200 {
        let details = payload
            .response_details
            .as_ref()
            .map(detail_text)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "no details".to_string());
        return Err(anyhow!("MyMemory error ({}): {}", status, details));
    }
    payload
        .response_data
        .and_then(|data| data.translated_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| anyhow!("MyMemory returned no translation"))
}

fn status_code(value: &serde_json::Value) -> Option<u16> {
    match value {
        serde_json::Value::Number(number) => number.as_u64().map(|code| code as u16),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn detail_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
