pub mod code_analysis;
pub mod code_execution;
pub mod cost_analysis;
pub mod executor;
pub mod infrastructure;
pub mod inventory;
pub mod knowledge_base;
pub mod registry;
pub mod schema;
pub mod web_search;

use std::sync::Arc;

pub use code_analysis::CodeAnalysisTool;
pub use code_execution::CodeExecutionTool;
pub use cost_analysis::CostAnalysisTool;
pub use executor::ToolExecutor;
pub use infrastructure::InfrastructureTool;
pub use inventory::{CloudInventory, InventorySnapshot, StaticInventory};
pub use knowledge_base::KnowledgeBaseTool;
pub use registry::{Tool, ToolDefinition, ToolRegistry};
pub use schema::{parameters_schema_for, schema_json_for};
pub use web_search::WebSearchTool;

use crate::config::FeatureFlags;

/// 注册全部内置工具；功能开关在构造时传入
pub fn default_registry(features: &FeatureFlags, inventory: Arc<dyn CloudInventory>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(InfrastructureTool::new(inventory, features.enable_cloud_actions));
    tools.register(CodeAnalysisTool);
    tools.register(WebSearchTool);
    tools.register(CodeExecutionTool::new(features.enable_code_execution));
    tools.register(KnowledgeBaseTool);
    tools.register(CostAnalysisTool);
    tracing::info!("Registered {} tools", tools.len());
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_tool_appears_once() {
        let registry = default_registry(&FeatureFlags::default(), Arc::new(StaticInventory::default()));
        let defs = registry.definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "aws_infrastructure",
                "code_analysis",
                "code_execution",
                "cost_analysis",
                "knowledge_base",
                "web_search",
            ]
        );
        for def in &defs {
            assert_eq!(def.parameters["type"], "object", "{} schema", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
