//! DevOps 智能体后端
//!
//! 接收自然语言运维请求，调用远端模型生成结构化计划，按计划执行工具（需审批的步骤挂起），
//! 再由模型把结果叙述成回复，并持久化对话。
//!
//! 模块划分：
//! - **api**: HTTP 接口（axum）与错误映射
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、Agent 构建器与编排流程
//! - **llm**: 模型客户端抽象、Bedrock HTTP 实现、请求格式族与 Mock
//! - **observability**: tracing 初始化
//! - **reasoning**: 规划 prompt、模型输出容错解析、推理引擎
//! - **storage**: 对话与待审批动作存储（SQLite / 内存）
//! - **tools**: 工具注册表、执行器与内置工具

pub mod api;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod reasoning;
pub mod storage;
pub mod tools;

pub use crate::core::{AgentBuilder, AgentError, DevOpsAgent};
