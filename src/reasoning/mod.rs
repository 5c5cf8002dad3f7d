//! 推理层：把用户请求 + 最近历史 + 工具目录 + 上下文转成 {reasoning, plan}
//!
//! - `PlanStep`：计划中的一步，宽松反序列化（除 tool 外均有默认值，标量类型可互转）
//! - `parse`：从模型输出中容错提取 JSON
//! - `prompt`：规划与叙述两套 prompt 模板
//! - `engine`：基于 LlmClient 的 Reasoner 实现，模型失败时降级为空计划

pub mod engine;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::storage::Message;
use crate::tools::ToolDefinition;

pub use engine::ReasoningEngine;
pub use parse::parse_reasoning_output;
pub use prompt::{build_narration_prompt, build_reasoning_prompt, SYSTEM_PROMPT};

/// 计划中的一步：调用哪个工具、传什么参数、是否需要人工审批
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 1-based position in the plan
    #[serde(default, deserialize_with = "lenient_u32")]
    #[schemars(with = "u32")]
    pub step: u32,
    /// Name of a registered tool
    pub tool: String,
    /// Tool input object
    #[serde(default = "empty_object", deserialize_with = "object_or_empty")]
    #[schemars(with = "serde_json::Map<String, Value>")]
    pub input: Value,
    /// Why this step is needed
    #[serde(default, deserialize_with = "lenient_string")]
    #[schemars(with = "String")]
    pub rationale: String,
    /// Whether a human must approve the step before it runs
    #[serde(default, deserialize_with = "lenient_bool")]
    #[schemars(with = "bool")]
    pub requires_approval: bool,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// null 视为空对象；内容为 JSON 对象的字符串会被展开
fn object_or_empty<'de, D>(d: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Null => empty_object(),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(obj @ Value::Object(_)) => obj,
            _ => Value::String(s),
        },
        other => other,
    })
}

/// 数字或数字字符串；其他取 0，由解析阶段按位置重新编号
fn lenient_u32<'de, D>(d: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(n.and_then(|n| u32::try_from(n).ok()).unwrap_or(0))
}

/// 布尔、"true"/"yes"/"1" 等字符串或数字；null 为 false
fn lenient_bool<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// 推理结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutcome {
    pub reasoning: String,
    pub plan: Vec<PlanStep>,
}

impl ReasoningOutcome {
    pub fn new(reasoning: impl Into<String>, plan: Vec<PlanStep>) -> Self {
        Self {
            reasoning: reasoning.into(),
            plan,
        }
    }
}

/// 一次推理的输入
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub query: &'a str,
    pub history: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub context: Option<&'a Value>,
}

/// 规划接口；编排器只依赖这个 trait，测试中可替换为固定计划
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, request: ReasoningRequest<'_>) -> Result<ReasoningOutcome, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_step_tolerates_missing_and_null_fields() {
        let step: PlanStep = serde_json::from_value(json!({
            "tool": "cost_analysis",
            "input": null,
            "rationale": null
        }))
        .unwrap();
        assert_eq!(step.step, 0);
        assert_eq!(step.input, json!({}));
        assert_eq!(step.rationale, "");
        assert!(!step.requires_approval);
    }

    #[test]
    fn plan_step_coerces_scalar_types() {
        let step: PlanStep = serde_json::from_value(json!({
            "step": "2",
            "tool": "cost_analysis",
            "input": "{\"time_period\": \"last_month\"}",
            "rationale": 42,
            "requires_approval": "true"
        }))
        .unwrap();
        assert_eq!(step.step, 2);
        assert_eq!(step.input, json!({"time_period": "last_month"}));
        assert_eq!(step.rationale, "42");
        assert!(step.requires_approval);

        let step: PlanStep = serde_json::from_value(json!({
            "step": "second",
            "tool": "web_search",
            "requires_approval": "no"
        }))
        .unwrap();
        assert_eq!(step.step, 0);
        assert!(!step.requires_approval);
    }

    #[test]
    fn plan_step_requires_tool() {
        assert!(serde_json::from_value::<PlanStep>(json!({"step": 1})).is_err());
    }
}
