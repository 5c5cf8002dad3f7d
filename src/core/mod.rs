//! 核心编排层：错误类型、Agent 构建与主处理流程

pub mod builder;
pub mod error;
pub mod orchestrator;

pub use builder::AgentBuilder;
pub use error::AgentError;
pub use orchestrator::{
    ApprovalPolicy, ChatOutcome, ChatResponse, DegradedResponse, DevOpsAgent, ExecutionResult,
    StepOutcome,
};
