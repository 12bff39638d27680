//! 工作流集成测试

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use archaeo::agent::{AgentConfig, AgentOutput, AgentRequest, BaseAgent, DomainAgent};
    use archaeo::config::AppConfig;
    use archaeo::core::AgentError;
    use archaeo::tools::{Tool, ToolInvoker};
    use archaeo::workflow::*;
    use archaeo::Orchestrator;
    use async_trait::async_trait;
    use serde_json::json;

    struct Counting {
        kind: &'static str,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DomainAgent for Counting {
        fn agent_type(&self) -> &str {
            self.kind
        }

        fn name(&self) -> &str {
            "CountingAgent"
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            Vec::new()
        }

        async fn run(
            &self,
            _invoker: &mut ToolInvoker,
            _request: &AgentRequest,
        ) -> Result<AgentOutput, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(AgentOutput::new(json!({ "kind": self.kind }), 0.8, 0.8, 1.0))
        }
    }

    fn register(
        orchestrator: &mut Orchestrator,
        kind: &'static str,
        delay: Duration,
    ) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let domain = Counting {
            kind,
            delay,
            calls: calls.clone(),
        };
        orchestrator.register(kind, Arc::new(BaseAgent::new(AgentConfig::new("CountingAgent"), domain)));
        calls
    }

    #[tokio::test]
    async fn test_timeout_then_dependency_skip_then_independent_step() {
        let mut orchestrator = Orchestrator::empty(Duration::from_millis(50));
        let slow = register(&mut orchestrator, "slow", Duration::from_secs(5));
        let dependent = register(&mut orchestrator, "dependent", Duration::ZERO);
        let independent = register(&mut orchestrator, "independent", Duration::ZERO);

        let report = orchestrator
            .process_complex_request(vec![
                WorkflowStep::new("slow", "run", json!({})),
                WorkflowStep::new("dependent", "run", json!({})).depends_on("slow"),
                WorkflowStep::new("independent", "run", json!({})),
            ])
            .await;

        assert_eq!(report.workflow_summary.total_steps, 3);
        assert!(report.workflow_summary.failed_steps >= 2);
        let ids: Vec<&str> = report.step_results.iter().map(|s| s.step_id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "dependent", "independent"]);
        assert_eq!(report.step_results[0].error.as_deref(), Some("Timeout"));
        assert!(report.step_results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("Dependencies not met"));
        assert!(report.step_results[2].success);
        assert_eq!(slow.load(Ordering::SeqCst), 1);
        assert_eq!(dependent.load(Ordering::SeqCst), 0);
        assert_eq!(independent.load(Ordering::SeqCst), 1);
        assert_eq!(report.status, WorkflowStatus::Failed);
        assert!(orchestrator.workflow_status().is_empty());
    }

    #[tokio::test]
    async fn test_forward_dependency_recorded_as_unmet() {
        let mut orchestrator = Orchestrator::empty(Duration::from_secs(1));
        let research = register(&mut orchestrator, "research", Duration::ZERO);
        let report_calls = register(&mut orchestrator, "report", Duration::ZERO);

        let report = orchestrator
            .process_complex_request(vec![
                WorkflowStep::new("research", "run", json!({})).depends_on("report"),
                WorkflowStep::new("report", "run", json!({})),
            ])
            .await;

        assert_eq!(report.workflow_summary.total_steps, 2);
        assert!(!report.step_results[0].success);
        assert!(report.step_results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("Dependencies not met"));
        assert!(report.step_results[1].success);
        assert_eq!(research.load(Ordering::SeqCst), 0);
        assert_eq!(report_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_steps_failing_still_reports() {
        let orchestrator = Orchestrator::empty(Duration::from_secs(1));
        let report = orchestrator
            .process_complex_request(vec![
                WorkflowStep::new("ghost", "run", json!({})),
                WorkflowStep::new("phantom", "run", json!({})).depends_on("ghost"),
            ])
            .await;
        assert_eq!(report.workflow_summary.failed_steps, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(report.combined_data.is_empty());
    }

    #[tokio::test]
    async fn test_excavation_workflow_feeds_report() {
        let orchestrator = Orchestrator::new(&AppConfig::default(), None);
        let workflow = excavation_planning_workflow(&json!({
            "site_name": "Tell Brak",
            "width_m": 20.0,
            "length_m": 10.0,
        }))
        .unwrap();
        let report = orchestrator.run_workflow(&workflow).await;
        assert_eq!(report.status, WorkflowStatus::Completed, "{:?}", report.errors);
        let generated = &report.combined_data["report_generation"];
        assert_eq!(generated["data_sources"], json!(["excavation_planning"]));
        assert!(generated["full_text"].as_str().unwrap().contains("Tell Brak"));
    }

    #[tokio::test]
    async fn test_artifact_workflow_with_dating_and_context() {
        let orchestrator = Orchestrator::new(&AppConfig::default(), None);
        let workflow = artifact_analysis_workflow(&json!({
            "name": "Bronze mirror",
            "material": "bronze",
            "period": "Han dynasty",
            "culture": "Chinese",
            "dating_sample": {"c14_ratio": 0.78, "sample_type": "charcoal"},
            "civilization_context": {
                "name": "Han Dynasty",
                "time_period": {"start_year": -206, "end_year": 220},
            },
        }))
        .unwrap();
        let report = orchestrator.run_workflow(&workflow).await;
        assert_eq!(report.workflow_summary.total_steps, 3);
        assert_eq!(report.workflow_summary.successful_steps, 3, "{:?}", report.errors);
        assert!(report.combined_data.contains_key("carbon_dating"));
        assert!(report.combined_data.contains_key("civilization_research"));
    }
}
