//! 云资源清单来源
//!
//! aws_infrastructure 工具通过 CloudInventory 列出 EC2 / Lambda / S3 资源。
//! StaticInventory 从 JSON 快照文件加载（未配置时为空清单）。

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ec2Instance {
    pub id: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub state: String,
    pub launch_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaFunction {
    pub name: String,
    pub runtime: String,
    pub memory: u32,
    pub timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
    pub creation_date: String,
}

/// 资源清单快照（文件格式）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySnapshot {
    pub instances: Vec<Ec2Instance>,
    pub functions: Vec<LambdaFunction>,
    pub buckets: Vec<S3Bucket>,
}

#[async_trait]
pub trait CloudInventory: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<Ec2Instance>, String>;

    async fn list_functions(&self) -> Result<Vec<LambdaFunction>, String>;

    async fn list_buckets(&self) -> Result<Vec<S3Bucket>, String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    snapshot: InventorySnapshot,
}

impl StaticInventory {
    pub fn new(snapshot: InventorySnapshot) -> Self {
        Self { snapshot }
    }

    /// 从 JSON 文件加载；path 为 None 时返回空清单
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("cannot read inventory {}: {e}", path.display()))
        })?;
        let snapshot: InventorySnapshot = serde_json::from_str(&data).map_err(|e| {
            AgentError::Config(format!("invalid inventory {}: {e}", path.display()))
        })?;
        tracing::info!(
            instances = snapshot.instances.len(),
            functions = snapshot.functions.len(),
            buckets = snapshot.buckets.len(),
            "Loaded cloud inventory from {}",
            path.display()
        );
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl CloudInventory for StaticInventory {
    async fn list_instances(&self) -> Result<Vec<Ec2Instance>, String> {
        Ok(self.snapshot.instances.clone())
    }

    async fn list_functions(&self) -> Result<Vec<LambdaFunction>, String> {
        Ok(self.snapshot.functions.clone())
    }

    async fn list_buckets(&self) -> Result<Vec<S3Bucket>, String> {
        Ok(self.snapshot.buckets.clone())
    }
}
