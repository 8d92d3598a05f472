use async_trait::async_trait;
use kanpan_core::config::NarratorConfig;
use kanpan_core::narrative::entity::NarrativeRequest;
use kanpan_core::narrative::error::NarrativeError;
use kanpan_core::narrative::port::Narrator;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "你是一名专业的金融分析师，擅长从海量信息中提炼核心观点，并为投资者提供有价值的决策参考。";

/// # Summary
/// A narrator that asks the DeepSeek chat-completions API for a markdown diagnosis.
///
/// # Invariants
/// * `api_key` is non-empty.
pub struct DeepSeekNarrator {
    /// The bearer token.
    api_key: String,
    /// API root, e.g. `https://api.deepseek.com/v1`.
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    /// The HTTP client used for requests.
    client: reqwest::Client,
}

/// # Summary
/// Payload for the `chat/completions` endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl DeepSeekNarrator {
    /// # Summary
    /// Creates a new `DeepSeekNarrator` from the narrator settings.
    ///
    /// # Arguments
    /// * `config` - Narrator settings; `api_key` must be present.
    ///
    /// # Returns
    /// * `Err(NarrativeError::NotConfigured)` when no API key is set.
    /// * `Err(NarrativeError::Upstream)` when the HTTP client cannot be built.
    pub fn new(config: &NarratorConfig) -> Result<Self, NarrativeError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NarrativeError::NotConfigured("missing api_key".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NarrativeError::Upstream(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

/// # Summary
/// Builds the user prompt from the recent bars, flow records and headlines.
///
/// # Logic
/// Bars and flow are embedded as pretty JSON; fewer than 30 bars are reported
/// as insufficient instead of being embedded.
pub fn build_user_prompt(request: &NarrativeRequest) -> String {
    let bars_json = if request.recent_bars.len() >= 30 {
        serde_json::to_string_pretty(&request.recent_bars).unwrap_or_default()
    } else {
        "无足够K线数据".to_string()
    };
    let flow_json = if request.flow.is_empty() {
        "无资金流向数据".to_string()
    } else {
        serde_json::to_string_pretty(&request.flow).unwrap_or_default()
    };
    let headlines = if request.headlines.is_empty() {
        "暂无资讯".to_string()
    } else {
        request.headlines.join("\n")
    };

    format!(
        "你是一名资深金融分析师，请结合以下个股行情走势、技术指标、资金面和最新资讯，为投资者生成一份全面的诊断报告：\n\n\
         【行情与技术指标】\n股票代码：{}\n近30日K线与EMA数据（JSON）：\n{}\n\n\
         【资金面数据】\n近30日资金流向（JSON）：\n{}\n\n\
         【新闻资讯】\n{}\n\n\
         【分析要求】\n1. 先解读行情走势和技术面。\n2. 再解读资金面。\n3. 再解读新闻资讯及其对个股的潜在影响。\n\
         4. 最后给出投资建议和风险提示。\n5. 输出分层清晰、适合 markdown 展示的内容。",
        request.symbol, bars_json, flow_json, headlines
    )
}

#[async_trait]
impl Narrator for DeepSeekNarrator {
    /// # Summary
    /// Requests a markdown diagnosis for the given context.
    ///
    /// # Logic
    /// 1. Builds system and user messages.
    /// 2. POSTs to `{base_url}/chat/completions` with a bearer token.
    /// 3. Non-success status maps to `NarrativeError::Upstream` carrying the body.
    /// 4. Returns the first choice's content.
    async fn narrate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_user_prompt(request),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Requesting narrative for {} from {}", request.symbol, url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NarrativeError::Upstream(e.to_string()))?;

        let status = response.status();
        info!("Narrative response for {}: HTTP {}", request.symbol, status);
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Upstream(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::Malformed(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| NarrativeError::Malformed("no choices".to_string()))
    }
}
