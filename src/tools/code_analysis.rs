//! code_analysis 工具：基于规则的轻量静态检查
//!
//! 目前只对 Python 生效两条规则：eval() 调用（high）与通配符导入（medium）；每个问题带 1 起始的行号。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CodeArgs {
    /// Code to analyze
    pub code: String,
    /// Programming language
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "python".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: &'static str,
    pub message: &'static str,
    pub line: usize,
}

struct LintRule {
    pattern: Regex,
    severity: &'static str,
    message: &'static str,
}

fn python_rules() -> &'static [LintRule] {
    static RULES: OnceLock<Vec<LintRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            LintRule {
                pattern: Regex::new(r"\beval\s*\(").expect("valid lint pattern"),
                severity: "high",
                message: "Use of eval() is a security risk",
            },
            LintRule {
                pattern: Regex::new(r"\bimport\s+\*").expect("valid lint pattern"),
                severity: "medium",
                message: "Wildcard imports are discouraged",
            },
        ]
    })
}

/// 对代码逐行套用规则
pub fn analyze(code: &str, language: &str) -> Vec<Issue> {
    if !language.eq_ignore_ascii_case("python") {
        return Vec::new();
    }
    let mut issues = Vec::new();
    for (idx, line) in code.lines().enumerate() {
        for rule in python_rules() {
            if rule.pattern.is_match(line) {
                issues.push(Issue {
                    severity: rule.severity,
                    message: rule.message,
                    line: idx + 1,
                });
            }
        }
    }
    issues
}

pub struct CodeAnalysisTool;

#[async_trait]
impl Tool for CodeAnalysisTool {
    fn name(&self) -> &str {
        "code_analysis"
    }

    fn description(&self) -> &str {
        "Analyze code for bugs, security issues, and best practices"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<CodeArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: CodeArgs =
            serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))?;
        let issues = analyze(&args.code, &args.language);
        Ok(json!({
            "success": true,
            "language": args.language,
            "issue_count": issues.len(),
            "issues": issues,
            "recommendations": [
                "Use proper error handling",
                "Add type hints",
                "Include docstrings"
            ]
        }))
    }
}
