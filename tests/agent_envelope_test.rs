//! Agent 信封集成测试：重试、缓存开关、分数范围、无图像的文物分析

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use archaeo::agent::{
        AgentConfig, AgentOutput, AgentRequest, AgentResponse, AgentType, BaseAgent, DomainAgent,
    };
    use archaeo::agents::build_agent;
    use archaeo::cache::InMemoryCache;
    use archaeo::config::AppConfig;
    use archaeo::core::AgentError;
    use archaeo::models::ArtifactAnalysis;
    use archaeo::tools::{Tool, ToolInvoker};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Unreliable {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Tool for Unreliable {
        fn name(&self) -> &str {
            "unreliable"
        }

        fn description(&self) -> &str {
            "Fails before it succeeds"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err("upstream unavailable".to_string())
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    struct Counter {
        tool: Arc<Unreliable>,
        runs: Arc<AtomicU32>,
    }

    #[async_trait]
    impl DomainAgent for Counter {
        fn agent_type(&self) -> &str {
            "counter"
        }

        fn name(&self) -> &str {
            "CounterAgent"
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            vec![self.tool.clone()]
        }

        async fn run(
            &self,
            invoker: &mut ToolInvoker,
            _request: &AgentRequest,
        ) -> Result<AgentOutput, AgentError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let value = invoker.call("unreliable", json!({})).await?;
            Ok(AgentOutput::new(value, 1.4, -0.2, 0.5))
        }
    }

    fn counter(failures: u32, max_retries: u32) -> (BaseAgent, Arc<AtomicU32>) {
        let runs = Arc::new(AtomicU32::new(0));
        let domain = Counter {
            tool: Arc::new(Unreliable {
                failures,
                calls: AtomicU32::new(0),
            }),
            runs: runs.clone(),
        };
        let config = AgentConfig::new("CounterAgent").with_retries(max_retries, Duration::from_millis(1));
        (BaseAgent::new(config, domain), runs)
    }

    fn assert_scores_in_range(response: &AgentResponse) {
        for score in [response.confidence, response.quality_score, response.completeness_score] {
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
        assert!(response.processing_time >= 0.0);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_allowed_attempt() {
        let (agent, runs) = counter(2, 3);
        let response = agent.process(&AgentRequest::new("counter", json!({}))).await;
        assert!(response.is_success(), "{:?}", response.error);
        assert!(response.tool_calls >= 1);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_scores_in_range(&response);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_error_response() {
        let (agent, runs) = counter(3, 3);
        let response = agent.process(&AgentRequest::new("counter", json!({}))).await;
        assert!(!response.is_success());
        assert!(response.error.unwrap().contains("upstream unavailable"));
        assert_eq!(response.confidence, 0.0);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cache_disabled_runs_domain_logic_each_time() {
        let (agent, runs) = counter(0, 1);
        let agent = agent.with_cache(Arc::new(InMemoryCache::new()));
        let request = AgentRequest::new("counter", json!({"q": 1})).with_cache(false);
        agent.process(&request).await;
        agent.process(&request).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        let cached = AgentRequest::new("counter", json!({"q": 1}));
        agent.process(&cached).await;
        let hit = agent.process(&cached).await;
        assert!(hit.cached);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_artifact_without_image_falls_back() {
        let agent = build_agent(AgentType::ArtifactAnalysis, &AppConfig::default());
        let artifact = |images: Vec<&str>| {
            json!({"artifact_data": {
                "name": "Storage jar",
                "material": "ceramic",
                "period": "Bronze Age",
                "image_urls": images,
            }})
        };
        let with_image = agent
            .process(&AgentRequest::new("artifact_analysis", artifact(vec!["jar.jpg"])).with_cache(false))
            .await;
        let without = agent
            .process(&AgentRequest::new("artifact_analysis", artifact(vec![])).with_cache(false))
            .await;
        assert!(without.is_success(), "{:?}", without.error);
        assert_scores_in_range(&without);

        let with_image: ArtifactAnalysis = serde_json::from_value(with_image.data).unwrap();
        let without: ArtifactAnalysis = serde_json::from_value(without.data).unwrap();
        assert_eq!(without.visual_analysis.source, "material_fallback");
        assert!(without.visual_analysis.confidence < with_image.visual_analysis.confidence);
    }
}
