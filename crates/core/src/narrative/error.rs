use thiserror::Error;

/// # Summary
/// 叙述生成服务错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrativeError {
    // 未配置访问凭证
    #[error("Narrator not configured: {0}")]
    NotConfigured(String),
    // 网络错误或非 200 响应
    #[error("Upstream error: {0}")]
    Upstream(String),
    // 响应缺少正文
    #[error("Malformed response: {0}")]
    Malformed(String),
}
