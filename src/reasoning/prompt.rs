//! Prompt 模板：规划（带 system prompt）与叙述

use serde_json::Value;

use crate::reasoning::PlanStep;
use crate::storage::Message;
use crate::tools::{schema_json_for, ToolDefinition};

/// 规划时带入的历史条数
pub const HISTORY_WINDOW: usize = 5;

pub const SYSTEM_PROMPT: &str = r#"You are an expert DevOps Intelligence Agent with deep knowledge of:
- Cloud infrastructure (AWS, Azure, GCP)
- CI/CD pipelines and deployment strategies
- Code analysis and security best practices
- Performance optimization and cost management
- Troubleshooting and incident response

CRITICAL RULES:
1. You MUST use the available tools to answer questions. Do not just provide instructions.
2. When asked about cloud resources (EC2, Lambda, S3), use the aws_infrastructure tool.
3. When asked about costs, use the cost_analysis tool.
4. When asked to review code, use the code_analysis tool.
5. Do not tell users to run the AWS CLI. You have direct access via tools.

Your role is to analyze user requests carefully, break complex tasks into actionable steps,
select the appropriate tool for each step, and base your answer on actual tool results.
Consider security, cost and performance implications.

Always think step-by-step and always use tools when available."#;

const EXAMPLES: &str = r#"EXAMPLES OF CORRECT TOOL USAGE:

Example 1 - List EC2 instances:
{
    "reasoning": "User wants to see EC2 instances. I'll use aws_infrastructure tool.",
    "plan": [
        {
            "step": 1,
            "tool": "aws_infrastructure",
            "input": {"action": "list", "service": "ec2"},
            "rationale": "Query AWS EC2",
            "requires_approval": false
        }
    ]
}

Example 2 - Analyze costs:
{
    "reasoning": "User wants cost analysis. I'll use cost_analysis tool.",
    "plan": [
        {
            "step": 1,
            "tool": "cost_analysis",
            "input": {"time_period": "last_month"},
            "rationale": "Get cost data",
            "requires_approval": false
        }
    ]
}"#;

fn history_text(history: &[Message]) -> String {
    if history.is_empty() {
        return "No previous conversation".to_string();
    }
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn context_text(context: Option<&Value>) -> String {
    match context {
        None | Some(Value::Null) => "No additional context".to_string(),
        Some(Value::Object(map)) if map.is_empty() => "No additional context".to_string(),
        Some(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
    }
}

fn tools_text(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool_inputs_text(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.parameters))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 规划 prompt：请求、最近 5 条历史、上下文、工具目录与各工具输入 schema、计划步骤 schema
pub fn build_reasoning_prompt(
    query: &str,
    history: &[Message],
    tools: &[ToolDefinition],
    context: Option<&Value>,
) -> String {
    format!(
        r#"Analyze the following user request and create a detailed action plan.

User Request: {query}

Conversation History:
{history}

Additional Context:
{context}

Available Tools:
{tools}

Tool input schemas (the "input" of a step must match the schema of its tool; enum fields list the only accepted values):
{inputs}

IMPORTANT: You must respond with a JSON object containing your reasoning and a plan with tool calls.
Each element of "plan" must match this JSON Schema:
{step_schema}

{examples}

Your response format:
{{
    "reasoning": "Your step-by-step reasoning",
    "plan": [
        {{
            "step": 1,
            "tool": "tool_name",
            "input": {{"param": "value"}},
            "rationale": "Why this step is needed",
            "requires_approval": false
        }}
    ]
}}

RULES:
1. Always use tools. Never suggest manual steps or CLI commands.
2. Only use tools from the list above.
3. Set requires_approval to true for any step that changes or executes something."#,
        query = query,
        history = history_text(history),
        context = context_text(context),
        tools = tools_text(tools),
        inputs = tool_inputs_text(tools),
        step_schema = schema_json_for::<PlanStep>(),
        examples = EXAMPLES,
    )
}

/// 叙述 prompt：把推理、计划与执行结果交给模型生成面向用户的回复
pub fn build_narration_prompt(reasoning: &str, plan: &[PlanStep], results: &Value) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_else(|_| "[]".to_string());
    let results_json = serde_json::to_string_pretty(results).unwrap_or_else(|_| results.to_string());
    format!(
        r#"You are a DevOps Intelligence Agent. Based on the following information,
generate a clear, helpful response to the user.

Reasoning: {reasoning}

Plan:
{plan_json}

Actions Taken:
{results_json}

Provide a natural, conversational response that:
1. Summarizes what you understood about their request
2. Explains what actions you took or plan to take
3. Provides any relevant insights or recommendations
4. If actions are pending approval, clearly state this

Response:"#
    )
}
