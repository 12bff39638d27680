//! 工作流构建器与预定义工作流
//!
//! build 时校验：至少一个步骤、步骤 id 唯一、依赖只能指向更早声明的步骤（因此不会成环）。

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::agent::AgentType;
use crate::workflow::types::*;

/// 工作流构建器
pub struct WorkflowBuilder {
    id: WorkflowId,
    name: String,
    steps: Vec<WorkflowStep>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("wf_{}", uuid::Uuid::new_v4()),
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// 追加步骤；执行顺序即追加顺序
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = WorkflowStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn build(self) -> Result<Workflow, WorkflowError> {
        validate(&self.steps)?;
        Ok(Workflow {
            id: self.id,
            name: self.name,
            steps: self.steps,
        })
    }

    /// 不做定义校验：重复或为空的步骤 id 自动编号，依赖问题留给执行时记为失败步骤
    pub fn build_lenient(mut self) -> Workflow {
        assign_unique_ids(&mut self.steps);
        Workflow {
            id: self.id,
            name: self.name,
            steps: self.steps,
        }
    }
}

/// 空 id 取 agent_type；与前面重复的 id 依次改为 `{id}#2`、`{id}#3`…
pub fn assign_unique_ids(steps: &mut [WorkflowStep]) {
    let mut seen: HashSet<String> = HashSet::new();
    for step in steps.iter_mut() {
        if step.id.trim().is_empty() {
            step.id = step.agent_type.clone();
        }
        if seen.contains(&step.id) {
            let base = step.id.clone();
            let mut n = 2;
            while seen.contains(&format!("{}#{}", base, n)) {
                n += 1;
            }
            step.id = format!("{}#{}", base, n);
        }
        seen.insert(step.id.clone());
    }
}

/// 校验步骤列表
pub fn validate(steps: &[WorkflowStep]) -> Result<(), WorkflowError> {
    if steps.is_empty() {
        return Err(WorkflowError::EmptyWorkflow);
    }
    let mut declared: HashSet<&str> = HashSet::new();
    for step in steps {
        if step.id.trim().is_empty() || step.agent_type.trim().is_empty() {
            return Err(WorkflowError::InvalidConfiguration(
                "step id and agent_type must not be empty".to_string(),
            ));
        }
        if step.timeout.is_some_and(|t| t.is_zero()) {
            return Err(WorkflowError::InvalidConfiguration(format!(
                "step {} has a zero timeout",
                step.id
            )));
        }
        for dependency in &step.depends_on {
            if !declared.contains(dependency.as_str()) {
                return Err(WorkflowError::UnknownDependency {
                    step: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
        if !declared.insert(step.id.as_str()) {
            return Err(WorkflowError::DuplicateStep(step.id.clone()));
        }
    }
    Ok(())
}

fn text(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 文物综合分析：文物分析，随后（载荷中提供时）测年与文明背景研究
///
/// `artifact` 为 ArtifactData，可附带 `dating_sample`（CarbonSample）与 `civilization_context`（CivilizationData）。
pub fn artifact_analysis_workflow(artifact: &Value) -> Result<Workflow, WorkflowError> {
    let analysis = AgentType::ArtifactAnalysis.as_str();
    let mut builder = WorkflowBuilder::new("artifact_analysis").step(WorkflowStep::new(
        analysis,
        "analyze_artifact",
        json!({ "artifact_data": artifact }),
    ));
    if let Some(sample) = artifact.get("dating_sample") {
        builder = builder.step(
            WorkflowStep::new(
                AgentType::CarbonDating.as_str(),
                "calculate_dating",
                json!({ "sample_data": sample }),
            )
            .depends_on(analysis),
        );
    }
    if let Some(civilization) = artifact.get("civilization_context") {
        builder = builder.step(
            WorkflowStep::new(
                AgentType::CivilizationResearch.as_str(),
                "research_context",
                json!({ "civilization_data": civilization }),
            )
            .depends_on(analysis),
        );
    }
    builder.build()
}

/// 发掘计划：生成计划，再据此生成计划报告
pub fn excavation_planning_workflow(excavation: &Value) -> Result<Workflow, WorkflowError> {
    let planning = AgentType::ExcavationPlanning.as_str();
    let site = text(excavation, "site_name").unwrap_or_else(|| "the site".to_string());
    let report = json!({ "report_data": {
        "title": format!("Excavation plan for {}", site),
        "report_type": "excavation",
        "sections": ["abstract", "introduction", "methodology", "results", "conclusion"],
        "facts": {
            "site_name": site,
            "summary": format!("It sets out the grid, resources, schedule and risks for {}.", site),
        },
    }});
    WorkflowBuilder::new("excavation_planning")
        .step(WorkflowStep::new(
            planning,
            "generate_plan",
            json!({ "excavation_data": excavation }),
        ))
        .step(
            WorkflowStep::new(AgentType::ReportGeneration.as_str(), "generate_plan_report", report)
                .depends_on(planning),
        )
        .build()
}

/// 综合研究：研究助手，再生成研究报告
pub fn research_workflow(query: &str, context: &Value) -> Result<Workflow, WorkflowError> {
    let research = AgentType::ResearchAssistant.as_str();
    let report = json!({ "report_data": {
        "title": query,
        "report_type": "research",
        "sections": ["abstract", "introduction", "results", "discussion", "conclusion"],
        "facts": {
            "summary": format!("It reviews the evidence bearing on: {}.", query),
            "site_name": text(context, "site_name").unwrap_or_else(|| "the study area".to_string()),
            "objectives": format!("address the question \"{}\"", query),
        },
    }});
    WorkflowBuilder::new("research")
        .step(WorkflowStep::new(
            research,
            "comprehensive_research",
            json!({ "research_query": query, "research_context": context }),
        ))
        .step(
            WorkflowStep::new(AgentType::ReportGeneration.as_str(), "generate_research_report", report)
                .depends_on(research),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_workflow_rejected() {
        assert!(matches!(
            WorkflowBuilder::new("empty").build(),
            Err(WorkflowError::EmptyWorkflow)
        ));
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let result = WorkflowBuilder::new("dup")
            .step(WorkflowStep::new("a", "run", json!({})))
            .step(WorkflowStep::new("a", "run", json!({})))
            .build();
        assert!(matches!(result, Err(WorkflowError::DuplicateStep(id)) if id == "a"));
    }

    #[test]
    fn test_forward_and_self_dependencies_rejected() {
        let forward = WorkflowBuilder::new("fwd")
            .step(WorkflowStep::new("a", "run", json!({})).depends_on("b"))
            .step(WorkflowStep::new("b", "run", json!({})))
            .build();
        assert!(matches!(forward, Err(WorkflowError::UnknownDependency { .. })));

        let own = WorkflowBuilder::new("self")
            .step(WorkflowStep::new("a", "run", json!({})).depends_on("a"))
            .build();
        assert!(matches!(own, Err(WorkflowError::UnknownDependency { .. })));
    }

    #[test]
    fn test_lenient_build_numbers_repeated_ids() {
        let workflow = WorkflowBuilder::new("repeat")
            .step(WorkflowStep::new("carbon_dating", "date", json!({})))
            .step(WorkflowStep::new("carbon_dating", "date", json!({})))
            .step(WorkflowStep::new("carbon_dating", "date", json!({})).with_id(""))
            .step(WorkflowStep::new("report_generation", "write", json!({})).depends_on("later"))
            .build_lenient();
        let ids: Vec<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["carbon_dating", "carbon_dating#2", "carbon_dating#3", "report_generation"]
        );
        assert_eq!(workflow.steps[3].depends_on, vec!["later".to_string()]);

        assert!(WorkflowBuilder::new("empty").build_lenient().steps.is_empty());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = WorkflowBuilder::new("t")
            .step(WorkflowStep::new("a", "run", json!({})).with_timeout(Duration::ZERO))
            .build();
        assert!(matches!(result, Err(WorkflowError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_artifact_workflow_optional_steps() {
        let bare = artifact_analysis_workflow(&json!({"material": "bronze"})).unwrap();
        assert_eq!(bare.steps.len(), 1);

        let full = artifact_analysis_workflow(&json!({
            "material": "bronze",
            "dating_sample": {"c14_ratio": 0.7},
            "civilization_context": {"name": "Maya"},
        }))
        .unwrap();
        let ids: Vec<&str> = full.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["artifact_analysis", "carbon_dating", "civilization_research"]);
        assert_eq!(full.steps[1].depends_on, vec!["artifact_analysis".to_string()]);
    }

    #[test]
    fn test_report_steps_depend_on_producer() {
        let excavation = excavation_planning_workflow(&json!({"site_name": "Tell Brak"})).unwrap();
        assert_eq!(excavation.steps[1].agent_type, "report_generation");
        assert_eq!(excavation.steps[1].depends_on, vec!["excavation_planning".to_string()]);

        let research = research_workflow("harbour trade", &json!({})).unwrap();
        assert_eq!(research.steps[0].payload["research_query"], "harbour trade");
    }
}
