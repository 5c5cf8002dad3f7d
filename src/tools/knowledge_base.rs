//! knowledge_base 工具：内部文档检索（模拟命中）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KnowledgeArgs {
    /// Query for knowledge base
    pub query: String,
}

pub struct KnowledgeBaseTool;

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "knowledge_base"
    }

    fn description(&self) -> &str {
        "Query internal documentation and knowledge base using RAG"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<KnowledgeArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
        Ok(json!({
            "success": true,
            "query": query,
            "results": [
                {
                    "content": "Relevant documentation content",
                    "source": "internal_docs.md",
                    "relevance_score": 0.95
                }
            ]
        }))
    }
}
