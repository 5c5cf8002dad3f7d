//! cost_analysis 工具：按时间段返回费用明细与优化建议（固定数据）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parameters_schema_for, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CostArgs {
    /// Time period: last_month, last_week, today
    pub time_period: String,
}

pub struct CostAnalysisTool;

#[async_trait]
impl Tool for CostAnalysisTool {
    fn name(&self) -> &str {
        "cost_analysis"
    }

    fn description(&self) -> &str {
        "Analyze AWS costs and provide optimization recommendations"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<CostArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let time_period = args
            .get("time_period")
            .and_then(|v| v.as_str())
            .unwrap_or("last_month");

        Ok(json!({
            "success": true,
            "time_period": time_period,
            "total_cost": 1250.50,
            "top_services": [
                { "service": "EC2", "cost": 450.25 },
                { "service": "S3", "cost": 125.50 },
                { "service": "Lambda", "cost": 75.00 }
            ],
            "recommendations": [
                "Consider using Reserved Instances for EC2",
                "Enable S3 Intelligent-Tiering",
                "Optimize Lambda memory allocation"
            ]
        }))
    }
}
