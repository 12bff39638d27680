//! 发掘计划 Agent：网格 -> 资源 -> 风险，组合成带阶段与里程碑的计划

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{mean, AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::core::AgentError;
use crate::models::{
    extract, ExcavationData, ExcavationPlan, GridPlan, Milestone, Phase, ResourcePlan,
    RiskAssessment, RiskLevel,
};
use crate::tools::excavation::{
    grid_dimensions, GridPlanningArgs, ResourceCalculatorArgs, RiskAssessmentArgs, MAX_UNITS,
    SETUP_DAYS,
};
use crate::tools::{GridPlanningTool, ResourceCalculatorTool, RiskAssessmentTool, Tool, ToolInvoker};

pub struct ExcavationPlanningAgent;

impl ExcavationPlanningAgent {
    pub const NAME: &'static str = "ExcavationPlanningAgent";
}

fn validate(data: &ExcavationData) -> Result<(), AgentError> {
    if data.site_name.trim().is_empty() {
        return Err(AgentError::validation("site_name must not be empty"));
    }
    let dims = [data.width_m, data.length_m, data.unit_size_m];
    if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(AgentError::validation(
            "width_m, length_m and unit_size_m must be positive",
        ));
    }
    let (rows, columns) = grid_dimensions(data.width_m, data.length_m, data.unit_size_m);
    if rows.saturating_mul(columns) > MAX_UNITS {
        return Err(AgentError::validation(format!(
            "site requires {} units, more than the {} a single plan supports",
            rows.saturating_mul(columns),
            MAX_UNITS
        )));
    }
    Ok(())
}

/// 四个阶段，天数之和等于总工期
fn phases(resources: &ResourcePlan) -> Vec<Phase> {
    let post_excavation = resources
        .duration_days
        .saturating_sub(SETUP_DAYS + resources.excavation_days);
    let reporting = post_excavation.div_ceil(3).max(1).min(post_excavation);
    let processing = post_excavation - reporting;
    let phase = |n: u32, name: &str, days: u32, description: &str| Phase {
        phase: format!("Phase {}", n),
        name: name.to_string(),
        duration_days: days,
        description: description.to_string(),
    };
    vec![
        phase(1, "Site preparation", SETUP_DAYS, "Survey, grid layout, site facilities and safety briefing"),
        phase(2, "Excavation", resources.excavation_days, "Stratigraphic excavation of grid units by priority"),
        phase(3, "Finds processing", processing, "Cleaning, cataloguing and sampling of finds"),
        phase(4, "Documentation and reporting", reporting, "Site archive, plans and preliminary report"),
    ]
}

fn milestones(phases: &[Phase]) -> Vec<Milestone> {
    let mut day = 0;
    let ends: Vec<u32> = phases
        .iter()
        .map(|p| {
            day += p.duration_days;
            day
        })
        .collect();
    let end = |i: usize| ends.get(i).copied().unwrap_or(day);
    let milestone = |name: &str, target_day: u32, description: &str| Milestone {
        milestone: name.to_string(),
        target_day,
        description: description.to_string(),
    };
    vec![
        milestone("Site ready", end(0), "Grid pegged out and site facilities in place"),
        milestone(
            "Excavation midpoint",
            end(0) + phases.get(1).map(|p| p.duration_days / 2).unwrap_or(0),
            "High-priority units completed",
        ),
        milestone("Excavation complete", end(1), "All planned units excavated and backfill agreed"),
        milestone("Final report", end(3), "Preliminary report submitted"),
    ]
}

fn compose(
    data: &ExcavationData,
    grid: &GridPlan,
    resources: ResourcePlan,
    risks: RiskAssessment,
) -> ExcavationPlan {
    let phases = phases(&resources);
    let milestones = milestones(&phases);
    ExcavationPlan {
        excavation_id: data.id.clone(),
        plan_name: format!("{} excavation plan", data.site_name),
        plan_version: "1.0".to_string(),
        objectives: vec![
            format!("Establish the stratigraphic sequence at {}", data.site_name),
            "Recover and record artifacts in context".to_string(),
            "Collect samples for absolute dating".to_string(),
        ],
        methodology: format!(
            "{} excavation on a {}m {} grid",
            data.excavation_method.as_str(),
            grid.unit_size,
            grid.grid_system
        ),
        expected_duration: resources.duration_days,
        total_units: grid.total_units,
        high_priority_units: grid
            .units
            .iter()
            .filter(|u| u.priority == "high")
            .map(|u| u.unit_id.clone())
            .collect(),
        personnel_requirements: resources.personnel_requirements,
        equipment_requirements: resources.equipment_requirements,
        budget_estimate: resources.budget_estimate,
        phases,
        milestones,
        risks: risks.risks,
        overall_risk_level: risks.overall_risk_level,
        mitigation_strategies: risks.mitigation_strategies,
        quality_standards: vec![
            "Single-context recording".to_string(),
            "Total-station survey of all small finds".to_string(),
            "Daily photographic record".to_string(),
        ],
        documentation_requirements: vec![
            "Context sheets".to_string(),
            "Section and plan drawings".to_string(),
            "Finds register".to_string(),
            "Sample register".to_string(),
        ],
        status: "draft".to_string(),
    }
}

#[async_trait]
impl DomainAgent for ExcavationPlanningAgent {
    fn agent_type(&self) -> &str {
        AgentType::ExcavationPlanning.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(GridPlanningTool),
            Arc::new(ResourceCalculatorTool),
            Arc::new(RiskAssessmentTool),
        ]
    }

    fn capabilities(&self) -> Vec<String> {
        ["grid_planning", "resource_planning", "risk_assessment", "scheduling"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let data: ExcavationData = extract(&request.payload, "excavation_data")?;
        validate(&data)?;

        let grid: GridPlan = invoker
            .call_typed(
                "grid_planning",
                &GridPlanningArgs {
                    width_m: data.width_m,
                    length_m: data.length_m,
                    unit_size_m: data.unit_size_m,
                },
            )
            .await?;
        let resources: ResourcePlan = invoker
            .call_typed(
                "resource_calculator",
                &ResourceCalculatorArgs {
                    total_units: grid.total_units,
                    method: data.excavation_method,
                    conditions: data.site_conditions,
                },
            )
            .await?;
        let risks: RiskAssessment = invoker
            .call_typed(
                "risk_assessment",
                &RiskAssessmentArgs {
                    conditions: data.site_conditions,
                    total_units: grid.total_units,
                },
            )
            .await?;

        let high_impact = risks
            .risks
            .iter()
            .filter(|r| r.impact == RiskLevel::High)
            .count();
        let confidence = (0.9 - 0.1 * high_impact as f64).max(0.5);
        let plan = compose(&data, &grid, resources, risks);

        let present = [
            plan.total_units > 0,
            plan.total_personnel() > 0,
            plan.budget_estimate > 0.0,
            !plan.risks.is_empty(),
        ];
        let completeness = present.iter().filter(|p| **p).count() as f64 / present.len() as f64;
        tracing::debug!(
            site = %data.site_name,
            units = plan.total_units,
            personnel = plan.total_personnel(),
            risk = ?plan.overall_risk_level,
            "Excavation plan composed"
        );

        let mut value = serde_json::to_value(&plan)?;
        value["total_personnel"] = serde_json::json!(plan.total_personnel());
        value["grid_plan"] = serde_json::to_value(&grid)?;

        Ok(AgentOutput::new(
            value,
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

    async fn plan(data: serde_json::Value) -> crate::agent::AgentResponse {
        BaseAgent::new(AgentConfig::new(ExcavationPlanningAgent::NAME), ExcavationPlanningAgent)
            .process(&AgentRequest::new(
                "excavation_planning",
                json!({ "excavation_data": data }),
            ))
            .await
    }

    #[tokio::test]
    async fn test_plan_phases_sum_to_duration() {
        let response = plan(json!({"site_name": "Tell Brak", "width_m": 30.0, "length_m": 30.0})).await;
        assert!(response.is_success(), "{:?}", response.error);
        let plan: ExcavationPlan = serde_json::from_value(response.data.clone()).unwrap();
        assert_eq!(plan.total_units, 36);
        assert_eq!(plan.phases.len(), 4);
        let days: u32 = plan.phases.iter().map(|p| p.duration_days).sum();
        assert_eq!(days, plan.expected_duration);
        assert_eq!(plan.milestones.last().unwrap().target_day, plan.expected_duration);
        assert_eq!(response.data["total_personnel"], json!(plan.total_personnel()));
        assert_eq!(plan.overall_risk_level, RiskLevel::Medium);
        assert!((response.confidence - 0.9).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_risk_level_is_max_impact() {
        let response = plan(json!({
            "site_name": "Harbour Street",
            "width_m": 10.0,
            "length_m": 10.0,
            "site_conditions": {"waterlogged": true, "urban": true},
        }))
        .await;
        let plan: ExcavationPlan = serde_json::from_value(response.data).unwrap();
        assert_eq!(plan.overall_risk_level, RiskLevel::High);
        assert!((response.confidence - 0.7).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_total_personnel_sums_roles() {
        let response = plan(json!({"site_name": "Site A", "width_m": 5.0, "length_m": 5.0})).await;
        let plan: ExcavationPlan = serde_json::from_value(response.data).unwrap();
        // 1 director + 2 field + 4 students + 1 technician + 1 photographer
        assert_eq!(plan.total_personnel(), 9);
    }

    #[tokio::test]
    async fn test_invalid_extent_rejected() {
        let response = plan(json!({"site_name": "Site A", "width_m": -5.0, "length_m": 5.0})).await;
        assert!(response.error.unwrap().starts_with("Validation error"));
        let response = plan(json!({"site_name": "Huge", "width_m": 10000.0, "length_m": 10000.0})).await;
        assert!(response.error.unwrap().contains("units"));
    }
}
