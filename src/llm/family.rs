//! 模型请求格式族
//!
//! 不同模型族的请求体与响应体结构不同：Anthropic Messages 与 Amazon Nova。
//! 每个族实现 encode / decode，启动时按配置选定一次，调用时不再做字符串判断。

use serde_json::{json, Value};

use crate::core::AgentError;
use crate::llm::{CompletionRequest, LlmError};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// 请求编码与响应解码
pub trait ModelFamily: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn encode(&self, request: &CompletionRequest) -> Value;

    fn decode(&self, response: &Value) -> Result<String, LlmError>;
}

/// Anthropic Messages 格式：content 为字符串，响应取 content[0].text
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicMessages;

impl ModelFamily for AnthropicMessages {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn encode(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "temperature": request.temperature,
        });
        if let Some(system) = &request.system {
            body["system"] = Value::String(system.clone());
        }
        body
    }

    fn decode(&self, response: &Value) -> Result<String, LlmError> {
        response
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing content[0].text".to_string()))
    }
}

/// Amazon Nova 格式：content 为 [{text}]，参数放 inferenceConfig，响应取 output.message.content[0].text
#[derive(Debug, Default, Clone, Copy)]
pub struct NovaMessages;

impl ModelFamily for NovaMessages {
    fn name(&self) -> &'static str {
        "nova"
    }

    fn encode(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "messages": [
                { "role": "user", "content": [{ "text": request.prompt }] }
            ],
            "inferenceConfig": {
                "maxTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        });
        if let Some(system) = &request.system {
            body["system"] = json!([{ "text": system }]);
        }
        body
    }

    fn decode(&self, response: &Value) -> Result<String, LlmError> {
        response
            .pointer("/output/message/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing output.message.content[0].text".to_string()))
    }
}

/// 根据配置选择模型族：auto 时 model_id 含 anthropic（不区分大小写）即为 Anthropic，否则 Nova
pub fn select_family(setting: &str, model_id: &str) -> Result<Box<dyn ModelFamily>, AgentError> {
    match setting.to_ascii_lowercase().as_str() {
        "anthropic" => Ok(Box::new(AnthropicMessages)),
        "nova" => Ok(Box::new(NovaMessages)),
        "auto" | "" => {
            if model_id.to_ascii_lowercase().contains("anthropic") {
                Ok(Box::new(AnthropicMessages))
            } else {
                Ok(Box::new(NovaMessages))
            }
        }
        other => Err(AgentError::Config(format!("unknown model family: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_encodes_system_as_string() {
        let req = CompletionRequest::new("hi", 4000, 0.3).with_system("be terse");
        let body = AnthropicMessages.encode(&req);
        assert_eq!(body["anthropic_version"], ANTHROPIC_VERSION);
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["system"], "be terse");
    }

    #[test]
    fn nova_encodes_inference_config_and_omits_missing_system() {
        let req = CompletionRequest::new("hi", 2000, 0.7);
        let body = NovaMessages.encode(&req);
        assert_eq!(body["messages"][0]["content"][0]["text"], "hi");
        assert_eq!(body["inferenceConfig"]["maxTokens"], 2000);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn decodes_each_response_shape() {
        let anthropic = json!({"content": [{"type": "text", "text": "a"}]});
        assert_eq!(AnthropicMessages.decode(&anthropic).unwrap(), "a");

        let nova = json!({"output": {"message": {"content": [{"text": "n"}]}}});
        assert_eq!(NovaMessages.decode(&nova).unwrap(), "n");

        assert!(matches!(NovaMessages.decode(&anthropic), Err(LlmError::Decode(_))));
    }

    #[test]
    fn auto_selection_follows_model_id() {
        let f = select_family("auto", "anthropic.claude-3-sonnet-20240229-v1:0").unwrap();
        assert_eq!(f.name(), "anthropic");
        let f = select_family("auto", "amazon.nova-pro-v1:0").unwrap();
        assert_eq!(f.name(), "nova");
        let f = select_family("Nova", "anthropic.claude").unwrap();
        assert_eq!(f.name(), "nova");
        assert!(select_family("gpt", "x").is_err());
    }
}
