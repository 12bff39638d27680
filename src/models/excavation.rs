//! 发掘计划记录

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::new_record_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExcavationMethod {
    #[default]
    Grid,
    OpenArea,
    Trench,
    TestPit,
}

impl ExcavationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcavationMethod::Grid => "grid",
            ExcavationMethod::OpenArea => "open_area",
            ExcavationMethod::Trench => "trench",
            ExcavationMethod::TestPit => "test_pit",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SiteConditions {
    #[serde(default)]
    pub waterlogged: bool,
    #[serde(default)]
    pub urban: bool,
    #[serde(default)]
    pub protected_site: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcavationData {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub site_name: String,
    /// 场地宽度（米，东西向）
    pub width_m: f64,
    /// 场地长度（米，南北向）
    pub length_m: f64,
    #[serde(default = "default_unit_size")]
    pub unit_size_m: f64,
    #[serde(default)]
    pub excavation_method: ExcavationMethod,
    #[serde(default)]
    pub site_conditions: SiteConditions,
}

fn default_unit_size() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridUnit {
    pub unit_id: String,
    /// 单元西南角坐标（米）
    pub x: f64,
    pub y: f64,
    pub area: f64,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPlan {
    pub grid_system: String,
    pub unit_size: f64,
    pub rows: usize,
    pub columns: usize,
    pub total_units: usize,
    pub units: Vec<GridUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub personnel_requirements: BTreeMap<String, u32>,
    pub equipment_requirements: Vec<String>,
    pub budget_estimate: f64,
    pub daily_costs: f64,
    pub excavation_days: u32,
    pub duration_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    pub risk: String,
    pub probability: RiskLevel,
    pub impact: RiskLevel,
    pub mitigation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risks: Vec<RiskItem>,
    pub overall_risk_level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub phase: String,
    pub name: String,
    pub duration_days: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone: String,
    pub target_day: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcavationPlan {
    pub excavation_id: String,
    pub plan_name: String,
    pub plan_version: String,
    pub objectives: Vec<String>,
    pub methodology: String,
    pub expected_duration: u32,
    pub total_units: usize,
    pub high_priority_units: Vec<String>,
    pub personnel_requirements: BTreeMap<String, u32>,
    pub equipment_requirements: Vec<String>,
    pub budget_estimate: f64,
    pub phases: Vec<Phase>,
    pub milestones: Vec<Milestone>,
    pub risks: Vec<RiskItem>,
    pub overall_risk_level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
    pub quality_standards: Vec<String>,
    pub documentation_requirements: Vec<String>,
    pub status: String,
}

impl ExcavationPlan {
    /// 所有岗位人数之和
    pub fn total_personnel(&self) -> u32 {
        self.personnel_requirements.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert_eq!(
            [RiskLevel::Low, RiskLevel::High, RiskLevel::Medium].into_iter().max(),
            Some(RiskLevel::High)
        );
    }

    #[test]
    fn test_unit_size_default() {
        let data: ExcavationData = serde_json::from_value(serde_json::json!({
            "site_name": "Tell Example",
            "width_m": 20.0,
            "length_m": 10.0
        }))
        .unwrap();
        assert_eq!(data.unit_size_m, 5.0);
        assert_eq!(data.excavation_method, ExcavationMethod::Grid);
    }
}
