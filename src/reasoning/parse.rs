//! 模型输出的容错解析
//!
//! 依次尝试：```json 代码块、任意 ``` 代码块（跳过语言标注行）、第一个 '{' 到最后一个 '}'。
//! 全部失败时把原文作为 reasoning、计划为空，不返回错误。
//! 计划逐项解码：个别步骤格式错误只丢弃该步骤，保留 reasoning 与其余步骤。

use serde::Deserialize;
use serde_json::Value;

use crate::reasoning::{PlanStep, ReasoningOutcome};

#[derive(Debug, Deserialize)]
struct RawOutcome {
    #[serde(default)]
    reasoning: Option<Value>,
    #[serde(default)]
    plan: Option<Value>,
}

/// 从模型文本中提取 {reasoning, plan}
pub fn parse_reasoning_output(text: &str) -> ReasoningOutcome {
    for candidate in candidates(text) {
        if let Ok(raw) = serde_json::from_str::<RawOutcome>(candidate) {
            return into_outcome(raw);
        }
    }
    tracing::warn!(
        len = text.len(),
        "Could not parse reasoning output as JSON, using raw text"
    );
    ReasoningOutcome::new(text, Vec::new())
}

fn into_outcome(raw: RawOutcome) -> ReasoningOutcome {
    let reasoning = match raw.reasoning {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    let mut plan = match raw.plan {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => decode_steps(entries),
        Some(other) => {
            tracing::warn!(kind = value_kind(&other), "Plan is not an array, ignoring it");
            Vec::new()
        }
    };
    for (i, step) in plan.iter_mut().enumerate() {
        if step.step == 0 {
            step.step = (i + 1) as u32;
        }
    }
    ReasoningOutcome { reasoning, plan }
}

fn decode_steps(entries: Vec<Value>) -> Vec<PlanStep> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<PlanStep>(entry) {
            Ok(step) => Some(step),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Dropping malformed plan step");
                None
            }
        })
        .collect()
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(3);
    if let Some(body) = fenced(text, "```json") {
        out.push(body);
    }
    if let Some(body) = fenced(text, "```") {
        out.push(skip_info_string(body));
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            out.push(&text[start..=end]);
        }
    }
    out
}

/// 开标记之后到下一个 ``` 之间的内容；没有闭合标记时取到结尾
fn fenced<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn skip_info_string(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with('{') => rest.trim(),
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_fence() {
        let out = parse_reasoning_output("Sure:\n```json\n{\"reasoning\":\"x\",\"plan\":[]}\n```\nDone.");
        assert_eq!(out, ReasoningOutcome::new("x", vec![]));
    }

    #[test]
    fn parses_other_fence_with_info_string() {
        let text = "```javascript\n{\"reasoning\":\"r\",\"plan\":[{\"tool\":\"web_search\",\"input\":{\"query\":\"k8s\"}}]}\n```";
        let out = parse_reasoning_output(text);
        assert_eq!(out.reasoning, "r");
        assert_eq!(out.plan.len(), 1);
        assert_eq!(out.plan[0].step, 1);
        assert_eq!(out.plan[0].input, json!({"query": "k8s"}));
    }

    #[test]
    fn parses_bare_object_in_prose() {
        let text = r#"Here is my plan {"reasoning": "costs", "plan": [
            {"step": 1, "tool": "cost_analysis", "input": {"time_period": "last_month"}},
            {"tool": "code_analysis"}
        ]} hope that helps"#;
        let out = parse_reasoning_output(text);
        assert_eq!(out.reasoning, "costs");
        assert_eq!(out.plan[0].step, 1);
        assert_eq!(out.plan[1].step, 2);
        assert_eq!(out.plan[1].input, json!({}));
    }

    #[test]
    fn malformed_step_keeps_reasoning_and_valid_siblings() {
        let text = r#"```json
{"reasoning": "check ec2 then costs", "plan": [
  {"step": 1, "tool": "aws_infrastructure", "input": {"action": "list", "service": "ec2"}, "requires_approval": false},
  {"step": "2", "tool": "cost_analysis", "input": {"time_period": "last_month"}, "requires_approval": "true"},
  {"step": 3, "input": {"query": "no tool here"}}
]}
```"#;
        let out = parse_reasoning_output(text);
        assert_eq!(out.reasoning, "check ec2 then costs");
        assert_eq!(out.plan.len(), 2);
        assert_eq!(out.plan[0].tool, "aws_infrastructure");
        assert_eq!(out.plan[1].tool, "cost_analysis");
        assert_eq!(out.plan[1].step, 2);
        assert!(out.plan[1].requires_approval);
    }

    #[test]
    fn non_array_plan_is_ignored() {
        let out = parse_reasoning_output(r#"{"reasoning": "r", "plan": {"tool": "web_search"}}"#);
        assert_eq!(out, ReasoningOutcome::new("r", vec![]));
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let out = parse_reasoning_output(r#"{"plan": null}"#);
        assert_eq!(out, ReasoningOutcome::default());
    }

    #[test]
    fn unparsable_text_becomes_reasoning() {
        let text = "I cannot produce a plan for that.";
        let out = parse_reasoning_output(text);
        assert_eq!(out.reasoning, text);
        assert!(out.plan.is_empty());

        let broken = "{\"reasoning\": \"half";
        assert_eq!(parse_reasoning_output(broken).reasoning, broken);
    }
}
