//! 工具执行器
//!
//! ToolExecutor 持有 ToolRegistry 与单次调用超时，execute(tool_name, args) 超时或失败时转为 AgentError
//! （ToolTimeout / ToolExecutionFailed），每次调用输出结构化审计日志（JSON）。
//! ToolInvoker 是一次处理尝试内的调用入口：检查开关与调用预算，并记录用到的工具。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{Tool, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// 执行指定工具；未注册返回 UnknownTool，超时返回 ToolTimeout，工具返回 Err 转为 ToolExecutionFailed
    pub async fn execute(&self, tool_name: &str, args: Value) -> Result<Value, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(AgentError::ToolExecutionFailed {
                tool: tool_name.to_string(),
                message,
            }),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

/// 单次处理尝试内的工具调用入口
///
/// 每次重试尝试都新建一个，因此 tools_used / calls 只反映该尝试。
pub struct ToolInvoker {
    executor: Arc<ToolExecutor>,
    enabled: bool,
    max_calls: usize,
    calls: usize,
    tools_used: Vec<String>,
}

impl ToolInvoker {
    pub fn new(executor: Arc<ToolExecutor>, enabled: bool, max_calls: usize) -> Self {
        Self {
            executor,
            enabled,
            max_calls,
            calls: 0,
            tools_used: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    /// 去重后的工具名，按首次调用顺序
    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    pub fn into_usage(self) -> (Vec<String>, usize) {
        (self.tools_used, self.calls)
    }

    /// 调用工具：工具关闭返回 ToolsDisabled，超出预算返回 ToolBudgetExceeded
    pub async fn call(&mut self, tool_name: &str, args: Value) -> Result<Value, AgentError> {
        if !self.enabled {
            return Err(AgentError::ToolsDisabled(tool_name.to_string()));
        }
        if !self.executor.has_tool(tool_name) {
            return Err(AgentError::UnknownTool(tool_name.to_string()));
        }
        if self.calls >= self.max_calls {
            return Err(AgentError::ToolBudgetExceeded(self.max_calls));
        }

        self.calls += 1;
        if !self.tools_used.iter().any(|t| t == tool_name) {
            self.tools_used.push(tool_name.to_string());
        }
        self.executor.execute(tool_name, args).await
    }

    /// 强类型调用：参数序列化为 JSON，结果反序列化为 T；结构不符返回 InvalidToolOutput
    pub async fn call_typed<A, T>(&mut self, tool_name: &str, args: &A) -> Result<T, AgentError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let args = serde_json::to_value(args)?;
        let value = self.call(tool_name, args).await?;
        serde_json::from_value(value).map_err(|e| AgentError::InvalidToolOutput {
            tool: tool_name.to_string(),
            message: e.to_string(),
        })
    }
}
