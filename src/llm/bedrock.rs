//! Bedrock Runtime HTTP 客户端
//!
//! POST {endpoint}/model/{model_id}/invoke，Bearer API Key 认证；请求体/响应体格式由 ModelFamily 决定。
//! 端点默认 https://bedrock-runtime.{region}.amazonaws.com。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::config::ModelSection;
use crate::core::AgentError;
use crate::llm::{select_family, CompletionRequest, LlmClient, LlmError, ModelFamily};

pub const API_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

pub struct BedrockClient {
    http: reqwest::Client,
    invoke_url: Url,
    model_id: String,
    api_key: Option<String>,
    family: Box<dyn ModelFamily>,
}

impl BedrockClient {
    pub fn new(
        endpoint: &str,
        model_id: &str,
        api_key: Option<String>,
        family: Box<dyn ModelFamily>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let invoke_url = invoke_url(endpoint, model_id)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            invoke_url,
            model_id: model_id.to_string(),
            api_key,
            family,
        })
    }

    /// 从 [model] 段构建；api_key 未配置时回退到环境变量
    pub fn from_config(cfg: &ModelSection) -> Result<Self, AgentError> {
        let endpoint = cfg
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&cfg.region));
        let api_key = resolve_api_key(cfg);
        let family = select_family(&cfg.family, &cfg.model_id)?;
        tracing::info!(
            model_id = %cfg.model_id,
            family = family.name(),
            endpoint = %endpoint,
            "Using Bedrock model"
        );
        Self::new(
            &endpoint,
            &cfg.model_id,
            api_key,
            family,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn invoke_url(&self) -> &Url {
        &self.invoke_url
    }
}

pub fn default_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com")
}

pub fn resolve_api_key(cfg: &ModelSection) -> Option<String> {
    cfg.api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
}

fn invoke_url(endpoint: &str, model_id: &str) -> Result<Url, AgentError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| AgentError::Config(format!("invalid model endpoint {endpoint:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AgentError::Config(format!("model endpoint cannot be a base: {endpoint}")))?
        .pop_if_empty()
        .push("model")
        .push(model_id)
        .push("invoke");
    Ok(url)
}

#[async_trait]
impl LlmClient for BedrockClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.family.encode(request);
        let mut builder = self.http.post(self.invoke_url.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        self.family.decode(&value)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
