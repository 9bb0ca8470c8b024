use serde::{Deserialize, Serialize};

/// 客户端配置 每个字段对应一个可注册的供应商
///
/// 字段缺省表示该供应商未配置；空配置是合法的，此时所有调用都会以
/// "provider not configured" 失败。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfigs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<AnthropicConfig>,
}

/// OpenAI Chat Completions 接入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API 密钥
    pub api_key: String,
    /// 自定义 base_url 便于接入代理或兼容层
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// 组织 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl OpenAiConfig {
    /// 仅携带 API 密钥的最简配置
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            organization: None,
        }
    }
}

/// Anthropic Messages 接入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API 密钥
    pub api_key: String,
    /// 自定义 base_url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// anthropic-version 请求头 留空时使用默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl AnthropicConfig {
    /// 仅携带 API 密钥的最简配置
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            version: None,
        }
    }
}
