//! 参数 JSON Schema 生成（schemars）
//!
//! 工具的参数结构体派生 JsonSchema，由此生成 parameters_schema，保证 prompt 与实际反序列化一致。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 生成 T 的 JSON Schema（去掉 $schema 元字段，减少 prompt 噪音）
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}

/// 以 pretty JSON 输出 T 的 Schema，可拼入 prompt
pub fn schema_json_for<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&parameters_schema_for::<T>()).unwrap_or_default()
}
