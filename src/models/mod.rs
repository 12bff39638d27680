//! 领域记录：各 Agent 在请求边界把 JSON 载荷反序列化为这些强类型结构

pub mod artifact;
pub mod civilization;
pub mod dating;
pub mod excavation;
pub mod report;
pub mod research;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;

pub use artifact::{
    ArtifactAnalysis, ArtifactData, CulturalContext, DatingEstimate, MaterialAnalysis,
    VisualAnalysis,
};
pub use civilization::{
    CivilizationData, CivilizationResearch, Coordinates, CulturalAnalysis, GeographicAnalysis,
    TimePeriod, TimelineAnalysis, TimelinePhase,
};
pub use dating::{CalibrationCurve, CalibrationResult, CarbonDatingResult, CarbonSample, RadiocarbonAge};
pub use excavation::{
    ExcavationData, ExcavationMethod, ExcavationPlan, GridPlan, GridUnit, Milestone, Phase,
    ResourcePlan, RiskAssessment, RiskItem, RiskLevel, SiteConditions,
};
pub use report::{
    CitationStyle, GeneratedReport, OutputFormat, Reference, ReportData, ReportSection, ReportType,
    SectionKind, SkippedSection,
};
pub use research::{
    Capability, DescriptiveStats, Hypothesis, LiteratureSource, ResearchContext, ResearchQuery,
    ResearchResult, SkippedCapability, StatisticalReport,
};

/// 新记录 id（serde default 用）
pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 从载荷中取出 `field` 并反序列化；字段缺失或结构不符均为校验错误
pub fn extract<T: DeserializeOwned>(payload: &Value, field: &str) -> Result<T, AgentError> {
    let raw = payload
        .get(field)
        .ok_or_else(|| AgentError::validation(format!("missing '{}' in request payload", field)))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| AgentError::validation(format!("invalid '{}': {}", field, e)))
}
