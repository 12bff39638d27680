//! 工具参数 JSON Schema 生成（schemars）
//!
//! 每个工具把参数声明成一个 `#[derive(JsonSchema, Deserialize)]` 结构体，
//! parameters_schema 由此自动生成，parse_args 负责把 JSON 参数转为该结构体。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 由参数结构体生成 JSON Schema
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {}, "required": [] })
    })
}

/// 解析工具参数；失败信息作为工具错误原样返回
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("invalid arguments for {}: {}", tool, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Debug, JsonSchema, Deserialize)]
    struct QueryArgs {
        /// 检索关键词
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn test_schema_marks_required_fields() {
        let schema = parameters_schema::<QueryArgs>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["query"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "query"));
        assert!(!required.iter().any(|v| v == "limit"));
    }

    #[test]
    fn test_parse_args_error_names_tool() {
        let err = parse_args::<QueryArgs>("literature_search", serde_json::json!({})).unwrap_err();
        assert!(err.contains("literature_search"));
    }
}
