//! code_execution 工具（沙箱执行的模拟实现）
//!
//! 任意代码执行都视为破坏性操作：开启 require_approval_for_destructive 时必须经人工审批。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecutionArgs {
    /// Code to execute
    pub code: String,
    /// Programming language
    pub language: String,
}

pub struct CodeExecutionTool {
    enabled: bool,
}

impl CodeExecutionTool {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn name(&self) -> &str {
        "code_execution"
    }

    fn description(&self) -> &str {
        "Execute code in a sandboxed environment"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<ExecutionArgs>()
    }

    fn is_destructive(&self, _args: &Value) -> bool {
        true
    }

    async fn execute(&self, _args: Value) -> Result<Value, String> {
        if !self.enabled {
            return Ok(json!({
                "success": false,
                "message": "Code execution is disabled"
            }));
        }
        Ok(json!({
            "success": true,
            "output": "Code execution result would appear here",
            "message": "Code executed successfully (simulated)"
        }))
    }
}
