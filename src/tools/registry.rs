//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时加超时并统一转 AgentError。工具无状态，不缓存、不重试；错误原样返回。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// 工具描述：供内省或暴露给 LLM function calling
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具 trait：名称、描述、参数 schema、异步执行（args 为 JSON 对象）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（Agent 按名调用）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认空对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, String>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，保留注册顺序用于 schema 输出
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name.clone());
        }
        tracing::debug!("Registered tool: {}", name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 按注册顺序返回工具名
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.schema())
            .collect()
    }

    /// 全部工具 schema 的 JSON（function calling 格式）
    pub fn to_schema_json(&self) -> String {
        serde_json::to_string_pretty(&self.schemas()).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase text"
        }

        async fn execute(&self, args: Value) -> Result<Value, String> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| "missing text".to_string())?;
            Ok(Value::String(text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Upper);
        assert!(registry.contains("upper"));
        let tool = registry.get("upper").unwrap();
        let out = tool.execute(serde_json::json!({"text": "amphora"})).await.unwrap();
        assert_eq!(out, "AMPHORA");
        assert_eq!(
            tool.execute(serde_json::json!({})).await.unwrap_err(),
            "missing text"
        );
    }

    #[test]
    fn test_schema_json_lists_tools_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Upper);
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "upper");
        assert_eq!(schemas[0].parameters["type"], "object");
        assert!(registry.to_schema_json().contains("Uppercase text"));
    }
}
