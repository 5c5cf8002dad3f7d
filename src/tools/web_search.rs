//! web_search 工具（模拟结果，尚未接入搜索 API）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// Search query
    pub query: String,
}

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for documentation, solutions, and information"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<SearchArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
        Ok(json!({
            "success": true,
            "results": [
                {
                    "title": format!("Result for: {query}"),
                    "url": "https://example.com",
                    "snippet": "Relevant information about the query..."
                }
            ]
        }))
    }
}
