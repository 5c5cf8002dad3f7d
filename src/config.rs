//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DEVOPS_AGENT__*` 覆盖
//! （双下划线表示嵌套，如 `DEVOPS_AGENT__FEATURES__ENABLE_HUMAN_APPROVAL=false`）。
//! 启动时加载一次，之后以引用传给各组件，不存在全局配置对象。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerSection,
    pub model: ModelSection,
    pub storage: StorageSection,
    pub features: FeatureFlags,
    pub tools: ToolsSection,
    pub cloud: CloudSection,
}

/// [app] 段：服务名、运行环境、日志级别
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// development 时 500 响应带原始错误信息，其余环境脱敏
    pub environment: String,
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "devops-intelligence-agent".to_string(),
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppSection {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// [server] 段：监听地址与 CORS
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// [model] 段：远端模型标识、请求格式族、端点与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// auto / anthropic / nova；auto 时按 model_id 推断，仅在启动时决定一次
    pub family: String,
    pub model_id: String,
    pub region: String,
    /// 未设置时使用 https://bedrock-runtime.{region}.amazonaws.com
    pub endpoint: Option<String>,
    /// 未设置时读取环境变量 AWS_BEARER_TOKEN_BEDROCK
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            family: "auto".to_string(),
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

/// [storage] 段：会话存储后端与表名
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// sqlite / memory
    pub backend: String,
    pub database_path: PathBuf,
    pub conversations_table: String,
    pub sessions_table: String,
    pub actions_table: String,
    /// get_history 的默认条数
    pub history_limit: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database_path: PathBuf::from("data/devops-agent.db"),
            conversations_table: "devops_agent_conversations".to_string(),
            sessions_table: "devops_agent_sessions".to_string(),
            actions_table: "devops_agent_actions".to_string(),
            history_limit: 50,
        }
    }
}

/// [features] 段：功能开关
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub enable_code_execution: bool,
    pub enable_cloud_actions: bool,
    pub enable_human_approval: bool,
    /// 工具声明为破坏性的输入也强制走审批
    pub require_approval_for_destructive: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_code_execution: true,
            enable_cloud_actions: true,
            enable_human_approval: true,
            require_approval_for_destructive: true,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self { tool_timeout_secs: 30 }
    }
}

/// [cloud] 段：云资源清单来源
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudSection {
    /// JSON 快照文件（instances / functions / buckets），未设置时清单为空
    pub inventory_path: Option<PathBuf>,
}

impl AppConfig {
    /// 启动时校验：表名会拼进 SQL，只允许字母、数字、下划线
    pub fn validate(&self) -> Result<(), AgentError> {
        for table in [
            &self.storage.conversations_table,
            &self.storage.sessions_table,
            &self.storage.actions_table,
        ] {
            if !is_sql_identifier(table) {
                return Err(AgentError::Config(format!("invalid table name: {table:?}")));
            }
        }
        if self.storage.history_limit == 0 {
            return Err(AgentError::Config("storage.history_limit must be > 0".into()));
        }
        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 从 config 目录加载配置，环境变量 DEVOPS_AGENT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DEVOPS_AGENT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DEVOPS_AGENT")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.features.enable_human_approval);
        assert_eq!(cfg.storage.history_limit, 50);
        assert!(cfg.app.is_development());
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        let mut cfg = AppConfig::default();
        cfg.storage.actions_table = "actions; DROP TABLE x".to_string();
        assert!(matches!(cfg.validate(), Err(AgentError::Config(_))));

        cfg.storage.actions_table = "devops-agent-actions".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_explicit_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[features]\nenable_human_approval = false\n\n[storage]\nbackend = \"memory\"\n\n[cloud]\ninventory_path = \"snapshots/inventory.json\"\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(
            cfg.cloud.inventory_path.as_deref(),
            Some(std::path::Path::new("snapshots/inventory.json"))
        );
        assert!(!cfg.features.enable_human_approval);
        assert!(cfg.features.enable_cloud_actions);
        assert_eq!(cfg.storage.backend, "memory");
    }
}
