//! aws_infrastructure 工具：列出 EC2 实例、Lambda 函数、S3 存储桶
//!
//! 仅支持 list（list_instances / describe / get 归一为 list）；云操作开关关闭时直接返回 success=false。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::inventory::CloudInventory;
use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InfrastructureArgs {
    /// Action to perform: 'list' (to list/describe resources)
    pub action: String,
    /// AWS service: 'ec2' (EC2 instances), 'lambda' (Lambda functions), 's3' (S3 buckets)
    pub service: String,
    /// Specific resource ID (optional, for describe operations)
    #[serde(default)]
    pub resource_id: Option<String>,
}

pub struct InfrastructureTool {
    inventory: Arc<dyn CloudInventory>,
    enabled: bool,
}

impl InfrastructureTool {
    pub fn new(inventory: Arc<dyn CloudInventory>, enabled: bool) -> Self {
        Self { inventory, enabled }
    }

    async fn list(&self, service: &str, resource_id: Option<&str>) -> Result<Value, String> {
        match service {
            "ec2" => {
                let mut instances = self.inventory.list_instances().await?;
                if let Some(id) = resource_id {
                    instances.retain(|i| i.id == id);
                }
                Ok(json!({ "success": true, "count": instances.len(), "instances": instances }))
            }
            "lambda" => {
                let functions = self.inventory.list_functions().await?;
                Ok(json!({ "success": true, "count": functions.len(), "functions": functions }))
            }
            "s3" => {
                let buckets = self.inventory.list_buckets().await?;
                Ok(json!({ "success": true, "count": buckets.len(), "buckets": buckets }))
            }
            other => Ok(unsupported("list", other)),
        }
    }
}

fn unsupported(action: &str, service: &str) -> Value {
    json!({
        "success": false,
        "message": format!(
            "Unsupported action '{action}' for service '{service}'. Try: action='list', service='ec2'"
        )
    })
}

fn normalize_action(action: &str) -> String {
    let action = action.trim().to_lowercase();
    match action.as_str() {
        "list" | "list_instances" | "describe" | "get" => "list".to_string(),
        _ => action,
    }
}

#[async_trait]
impl Tool for InfrastructureTool {
    fn name(&self) -> &str {
        "aws_infrastructure"
    }

    fn description(&self) -> &str {
        "Query and manage AWS infrastructure (EC2, Lambda, S3, etc.)"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<InfrastructureArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        if !self.enabled {
            return Ok(json!({
                "success": false,
                "message": "AWS actions are disabled in configuration"
            }));
        }
        let args: InfrastructureArgs =
            serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))?;
        let action = normalize_action(&args.action);
        let service = args.service.trim().to_lowercase();

        if action != "list" {
            return Ok(unsupported(&action, &service));
        }

        match self.list(&service, args.resource_id.as_deref()).await {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::error!("Error executing AWS tool: {}", e);
                Ok(json!({ "success": false, "error": e }))
            }
        }
    }
}
