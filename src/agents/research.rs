//! 研究助手 Agent：文献检索、假设生成、统计分析，可单独或组合调用
//!
//! 请求了统计分析但没有数据时不做替代，结果中以 not_performed 标明原因。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{mean, AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::core::AgentError;
use crate::models::{
    Capability, Hypothesis, LiteratureSource, ResearchQuery, ResearchResult, SkippedCapability,
    StatisticalReport,
};
use crate::tools::research::{HypothesisGeneratorArgs, LiteratureSearchArgs, StatisticalAnalysisArgs};
use crate::tools::{
    HypothesisGeneratorTool, LiteratureSearchTool, StatisticalAnalysisTool, Tool, ToolInvoker,
};

pub struct ResearchAssistantAgent;

impl ResearchAssistantAgent {
    pub const NAME: &'static str = "ResearchAssistantAgent";
}

fn parse_query(request: &AgentRequest) -> Result<ResearchQuery, AgentError> {
    let query: ResearchQuery = serde_json::from_value(request.payload.clone())
        .map_err(|e| AgentError::validation(format!("invalid research request: {}", e)))?;
    if query.research_query.trim().is_empty() {
        return Err(AgentError::validation("research_query must not be empty"));
    }
    Ok(query)
}

/// 保留首次出现的顺序去重
fn requested_capabilities(query: &ResearchQuery) -> Vec<Capability> {
    let mut requested = Vec::new();
    for capability in query.capabilities.clone().unwrap_or_else(Capability::all) {
        if !requested.contains(&capability) {
            requested.push(capability);
        }
    }
    requested
}

#[async_trait]
impl DomainAgent for ResearchAssistantAgent {
    fn agent_type(&self) -> &str {
        AgentType::ResearchAssistant.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(LiteratureSearchTool),
            Arc::new(HypothesisGeneratorTool),
            Arc::new(StatisticalAnalysisTool),
        ]
    }

    fn capabilities(&self) -> Vec<String> {
        Capability::all().iter().map(|c| c.as_str().to_string()).collect()
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let query = parse_query(request)?;
        let requested = requested_capabilities(&query);
        if requested.is_empty() {
            return Err(AgentError::validation("no research capabilities requested"));
        }

        let mut result = ResearchResult {
            query: query.research_query.clone(),
            requested: requested.clone(),
            performed: Vec::new(),
            not_performed: Vec::new(),
            literature: None,
            hypotheses: None,
            statistical_analysis: None,
        };
        let mut confidences = Vec::new();

        for capability in &requested {
            match capability {
                Capability::LiteratureSearch => {
                    let sources: Vec<LiteratureSource> = invoker
                        .call_typed(
                            "literature_search",
                            &LiteratureSearchArgs {
                                query: query.research_query.clone(),
                                limit: None,
                            },
                        )
                        .await?;
                    let relevance: Vec<f64> = sources.iter().map(|s| s.relevance_score).collect();
                    confidences.push(mean(&relevance));
                    result.literature = Some(sources);
                }
                Capability::HypothesisGeneration => {
                    let hypotheses: Vec<Hypothesis> = invoker
                        .call_typed(
                            "hypothesis_generator",
                            &HypothesisGeneratorArgs {
                                query: query.research_query.clone(),
                                observations: query.research_context.observations.clone(),
                            },
                        )
                        .await?;
                    let scores: Vec<f64> = hypotheses.iter().map(|h| h.confidence).collect();
                    confidences.push(mean(&scores));
                    result.hypotheses = Some(hypotheses);
                }
                Capability::StatisticalAnalysis => {
                    let data = &query.research_context.data;
                    if data.values().all(Vec::is_empty) {
                        tracing::info!(query = %query.research_query, "Statistical analysis skipped: no data");
                        result.not_performed.push(SkippedCapability {
                            capability: *capability,
                            reason: "no numeric data supplied in research_context.data".to_string(),
                        });
                        continue;
                    }
                    let report: StatisticalReport = invoker
                        .call_typed("statistical_analysis", &StatisticalAnalysisArgs { data: data.clone() })
                        .await?;
                    confidences.push(report.confidence);
                    result.statistical_analysis = Some(report);
                }
            }
            result.performed.push(*capability);
        }

        let confidence = mean(&confidences);
        let completeness = result.performed.len() as f64 / requested.len() as f64;
        Ok(AgentOutput::new(
            serde_json::to_value(&result)?,
            confidence,
            mean(&[confidence, completeness]),
            completeness,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, BaseAgent};
    use serde_json::json;

    async fn ask(payload: serde_json::Value) -> crate::agent::AgentResponse {
        BaseAgent::new(AgentConfig::new(ResearchAssistantAgent::NAME), ResearchAssistantAgent)
            .process(&AgentRequest::new("research_assistant", payload))
            .await
    }

    #[tokio::test]
    async fn test_statistics_skipped_without_data() {
        let response = ask(json!({
            "research_query": "bronze age trade in the mediterranean",
            "research_context": {"observations": ["copper ingots found at the harbour"]},
        }))
        .await;
        assert!(response.is_success(), "{:?}", response.error);
        let result: ResearchResult = serde_json::from_value(response.data).unwrap();
        assert!(result.statistical_analysis.is_none());
        assert_eq!(result.not_performed.len(), 1);
        assert_eq!(result.not_performed[0].capability, Capability::StatisticalAnalysis);
        assert!((response.completeness_score - 2.0 / 3.0).abs() < 1e-12);
        assert!(!response.tools_used.contains(&"statistical_analysis".to_string()));
    }

    #[tokio::test]
    async fn test_statistics_only() {
        let response = ask(json!({
            "research_query": "sherd density by depth",
            "capabilities": ["statistical_analysis"],
            "research_context": {"data": {
                "depth": [0.1, 0.2, 0.3, 0.4, 0.5],
                "sherds": [12.0, 15.0, 19.0, 22.0, 30.0],
            }},
        }))
        .await;
        let result: ResearchResult = serde_json::from_value(response.data).unwrap();
        assert_eq!(result.performed, vec![Capability::StatisticalAnalysis]);
        let stats = result.statistical_analysis.unwrap();
        assert_eq!(stats.correlations.len(), 1);
        assert_eq!(stats.trends["sherds"], "increasing");
        assert_eq!(response.confidence, 0.75);
        assert!(result.literature.is_none());
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let response = ask(json!({"research_query": "  "})).await;
        assert!(response.error.unwrap().starts_with("Validation error"));
    }
}
