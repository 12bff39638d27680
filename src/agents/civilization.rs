//! 文明研究 Agent：文化、地理、年表三项分析
//!
//! 任一子分析置信度低于 0.8 时，在 research_gaps 中给出可执行的补充建议。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{mean, AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::core::AgentError;
use crate::models::{
    extract, CivilizationData, CivilizationResearch, CulturalAnalysis, GeographicAnalysis,
    TimelineAnalysis,
};
use crate::tools::civilization::{DatabaseQueryArgs, MapVisualizationArgs, TimelineBuilderArgs};
use crate::tools::{DatabaseQueryTool, MapVisualizationTool, TimelineBuilderTool, Tool, ToolInvoker};

const GAP_THRESHOLD: f64 = 0.8;

pub struct CivilizationResearchAgent;

impl CivilizationResearchAgent {
    pub const NAME: &'static str = "CivilizationResearchAgent";
}

fn research_gaps(
    cultural: &CulturalAnalysis,
    geographic: &GeographicAnalysis,
    timeline: &TimelineAnalysis,
) -> Vec<String> {
    let mut gaps = Vec::new();
    if cultural.confidence < GAP_THRESHOLD {
        gaps.push("Cultural analysis needs more primary sources and material evidence".to_string());
    }
    if geographic.confidence < GAP_THRESHOLD {
        gaps.push("Geographic analysis needs site coordinates or a GIS survey".to_string());
    }
    if timeline.confidence < GAP_THRESHOLD {
        gaps.push("Timeline needs an absolute chronology (radiocarbon or dendrochronology)".to_string());
    }
    gaps
}

fn recommendations(data: &CivilizationData, gaps: &[String]) -> Vec<String> {
    let mut recs = Vec::new();
    if data.coordinates.is_none() {
        recs.push(format!("Record reference coordinates for {}", data.name));
    }
    if data.time_period.is_none() {
        recs.push("Provide start and end years to build a phased timeline".to_string());
    }
    if !gaps.is_empty() {
        recs.push("Commission a targeted literature review for the identified gaps".to_string());
    }
    recs
}

#[async_trait]
impl DomainAgent for CivilizationResearchAgent {
    fn agent_type(&self) -> &str {
        AgentType::CivilizationResearch.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(DatabaseQueryTool),
            Arc::new(MapVisualizationTool),
            Arc::new(TimelineBuilderTool),
        ]
    }

    fn capabilities(&self) -> Vec<String> {
        ["cultural_analysis", "geographic_analysis", "timeline_analysis"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let data: CivilizationData = extract(&request.payload, "civilization_data")?;
        if data.name.trim().is_empty() {
            return Err(AgentError::validation("civilization name must not be empty"));
        }
        if let Some(period) = &data.time_period {
            if period.span() < 0 {
                return Err(AgentError::validation(format!(
                    "time period ends ({}) before it starts ({})",
                    period.end_year, period.start_year
                )));
            }
        }

        let cultural: CulturalAnalysis = invoker
            .call_typed("database_query", &DatabaseQueryArgs { name: data.name.clone() })
            .await?;
        let geographic: GeographicAnalysis = invoker
            .call_typed(
                "map_visualization",
                &MapVisualizationArgs {
                    name: data.name.clone(),
                    region: data.region.clone(),
                    coordinates: data.coordinates,
                },
            )
            .await?;
        let timeline: TimelineAnalysis = invoker
            .call_typed(
                "timeline_builder",
                &TimelineBuilderArgs {
                    time_period: data.time_period,
                },
            )
            .await?;

        let overall_confidence =
            mean(&[cultural.confidence, geographic.confidence, timeline.confidence]);
        let present = [
            cultural.significance.is_some(),
            geographic.strategic_location.is_some(),
            timeline.peak_period.is_some(),
        ];
        let completeness = present.iter().filter(|p| **p).count() as f64 / present.len() as f64;
        let research_gaps = research_gaps(&cultural, &geographic, &timeline);
        if !research_gaps.is_empty() {
            tracing::debug!(civilization = %data.name, gaps = research_gaps.len(), "Research gaps found");
        }

        let research = CivilizationResearch {
            civilization_id: data.id.clone(),
            name: data.name.clone(),
            recommendations: recommendations(&data, &research_gaps),
            cultural_analysis: cultural,
            geographic_analysis: geographic,
            timeline_analysis: timeline,
            overall_confidence,
            research_gaps,
        };

        Ok(AgentOutput::new(
            serde_json::to_value(&research)?,
            overall_confidence,
            mean(&[overall_confidence, completeness]),
            completeness,
        ))
    }
}
