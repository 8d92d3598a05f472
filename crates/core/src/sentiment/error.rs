use thiserror::Error;

/// # Summary
/// 资讯情绪数据源错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentimentError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
}
