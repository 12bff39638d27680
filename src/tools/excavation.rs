//! 发掘规划工具：探方网格、资源测算、风险评估

use std::collections::BTreeMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    ExcavationMethod, GridPlan, GridUnit, ResourcePlan, RiskAssessment, RiskItem, RiskLevel,
    SiteConditions,
};
use crate::tools::schema::{parameters_schema, parse_args};
use crate::tools::Tool;

/// 单个场地允许的最大探方数
pub const MAX_UNITS: usize = 10_000;

/// 进场准备天数
pub const SETUP_DAYS: u32 = 3;

/// 0 -> A, 25 -> Z, 26 -> AA
pub fn row_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

/// 网格行列数
pub fn grid_dimensions(width_m: f64, length_m: f64, unit_size_m: f64) -> (usize, usize) {
    let columns = (width_m / unit_size_m).ceil() as usize;
    let rows = (length_m / unit_size_m).ceil() as usize;
    (rows, columns)
}

fn priority(fx: f64, fy: f64) -> &'static str {
    let within = |f: f64, lo: f64, hi: f64| f >= lo && f <= hi;
    if within(fx, 1.0 / 3.0, 2.0 / 3.0) && within(fy, 1.0 / 3.0, 2.0 / 3.0) {
        "high"
    } else if within(fx, 1.0 / 6.0, 5.0 / 6.0) && within(fy, 1.0 / 6.0, 5.0 / 6.0) {
        "medium"
    } else {
        "low"
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GridPlanningArgs {
    pub width_m: f64,
    pub length_m: f64,
    pub unit_size_m: f64,
}

/// 探方网格：行用字母、列用数字编号，中心区域优先
pub struct GridPlanningTool;

impl GridPlanningTool {
    pub fn plan(width: f64, length: f64, unit: f64) -> Result<GridPlan, String> {
        if !(width > 0.0 && length > 0.0 && unit > 0.0)
            || !width.is_finite()
            || !length.is_finite()
            || !unit.is_finite()
        {
            return Err("site extent and unit size must be positive".to_string());
        }
        let (rows, columns) = grid_dimensions(width, length, unit);
        if rows.saturating_mul(columns) > MAX_UNITS {
            return Err(format!("grid of {}x{} units exceeds {}", rows, columns, MAX_UNITS));
        }

        let mut units = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            let y = row as f64 * unit;
            let h = unit.min(length - y);
            for col in 0..columns {
                let x = col as f64 * unit;
                let w = unit.min(width - x);
                units.push(GridUnit {
                    unit_id: format!("{}{}", row_label(row), col + 1),
                    x,
                    y,
                    area: w * h,
                    priority: priority((x + w / 2.0) / width, (y + h / 2.0) / length).to_string(),
                });
            }
        }

        Ok(GridPlan {
            grid_system: "cartesian".to_string(),
            unit_size: unit,
            rows,
            columns,
            total_units: units.len(),
            units,
        })
    }
}

#[async_trait]
impl Tool for GridPlanningTool {
    fn name(&self) -> &str {
        "grid_planning"
    }

    fn description(&self) -> &str {
        "Lay out a cartesian excavation grid over the site extent and prioritise units."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<GridPlanningArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: GridPlanningArgs = parse_args(self.name(), args)?;
        let plan = Self::plan(args.width_m, args.length_m, args.unit_size_m)?;
        serde_json::to_value(plan).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResourceCalculatorArgs {
    pub total_units: usize,
    #[serde(default)]
    pub method: ExcavationMethod,
    #[serde(default)]
    pub conditions: SiteConditions,
}

/// 资源测算：人员、设备、工期、预算
pub struct ResourceCalculatorTool;

/// 各岗位日薪
const DAILY_RATES: &[(&str, f64)] = &[
    ("director", 400.0),
    ("field_archaeologists", 250.0),
    ("students", 80.0),
    ("technicians", 180.0),
    ("photographers", 200.0),
];

const EQUIPMENT_DAILY: f64 = 150.0;

impl ResourceCalculatorTool {
    pub fn calculate(total_units: usize, method: ExcavationMethod, conditions: SiteConditions) -> ResourcePlan {
        let field = (total_units.div_ceil(50) as u32).max(2);
        let mut personnel = BTreeMap::new();
        personnel.insert("director".to_string(), 1);
        personnel.insert("field_archaeologists".to_string(), field);
        personnel.insert("students".to_string(), field * 2);
        personnel.insert("technicians".to_string(), field.div_ceil(2));
        personnel.insert("photographers".to_string(), 1);

        let mut equipment: Vec<String> = [
            "Trowels", "Brushes", "Measuring tapes", "Levels", "Cameras", "GPS units", "Screens",
            "Buckets",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        match method {
            ExcavationMethod::TestPit => equipment.push("Augers".to_string()),
            ExcavationMethod::Trench | ExcavationMethod::OpenArea => {
                equipment.push("Mechanical excavator".to_string())
            }
            ExcavationMethod::Grid => {}
        }
        if conditions.waterlogged {
            equipment.push("Water pumps".to_string());
        }
        if conditions.urban {
            equipment.push("Safety fencing".to_string());
        }

        // 每名田野考古人员带两名学生，每日完成一个探方
        let excavation_days = (total_units.div_ceil(field as usize) as u32).max(5);
        let documentation_days = ((excavation_days as f64 * 0.2).ceil() as u32).max(3);
        let duration_days = SETUP_DAYS + excavation_days + documentation_days;

        let staff: f64 = DAILY_RATES
            .iter()
            .map(|(role, rate)| personnel.get(*role).copied().unwrap_or(0) as f64 * rate)
            .sum();
        let daily_costs =
            staff + EQUIPMENT_DAILY + if conditions.waterlogged { 100.0 } else { 0.0 };

        ResourcePlan {
            personnel_requirements: personnel,
            equipment_requirements: equipment,
            budget_estimate: daily_costs * duration_days as f64,
            daily_costs,
            excavation_days,
            duration_days,
        }
    }
}

#[async_trait]
impl Tool for ResourceCalculatorTool {
    fn name(&self) -> &str {
        "resource_calculator"
    }

    fn description(&self) -> &str {
        "Calculate personnel, equipment, duration and budget for an excavation grid."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ResourceCalculatorArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: ResourceCalculatorArgs = parse_args(self.name(), args)?;
        if args.total_units == 0 {
            return Err("no excavation units to resource".to_string());
        }
        let plan = Self::calculate(args.total_units, args.method, args.conditions);
        serde_json::to_value(plan).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RiskAssessmentArgs {
    #[serde(default)]
    pub conditions: SiteConditions,
    pub total_units: usize,
}

/// 风险评估：按场地条件列出风险，总体等级取最大影响
pub struct RiskAssessmentTool;

impl RiskAssessmentTool {
    pub fn assess(conditions: SiteConditions, total_units: usize) -> RiskAssessment {
        let item = |risk: &str, probability, impact, mitigation: &str| RiskItem {
            risk: risk.to_string(),
            probability,
            impact,
            mitigation: mitigation.to_string(),
        };

        let mut risks = vec![item(
            "Weather delays",
            RiskLevel::Medium,
            RiskLevel::Medium,
            "Flexible scheduling and weather monitoring",
        )];
        if conditions.waterlogged {
            risks.push(item(
                "Flooding and trench wall collapse",
                RiskLevel::High,
                RiskLevel::High,
                "Dewatering pumps, shoring and stepped trench walls",
            ));
        }
        if conditions.urban {
            risks.push(item(
                "Utility strikes and public access",
                RiskLevel::Medium,
                RiskLevel::High,
                "Utility survey before excavation and a secured site perimeter",
            ));
        }
        if conditions.protected_site {
            risks.push(item(
                "Damage to protected features",
                RiskLevel::Low,
                RiskLevel::High,
                "Non-invasive survey first and heritage authority supervision",
            ));
        }
        if total_units > 300 {
            risks.push(item(
                "Schedule overrun",
                RiskLevel::Medium,
                RiskLevel::Medium,
                "Excavate high-priority units first and phase the remaining area",
            ));
        }

        let overall_risk_level = risks
            .iter()
            .map(|r| r.impact)
            .max()
            .unwrap_or(RiskLevel::Low);
        let mitigation_strategies = risks.iter().map(|r| r.mitigation.clone()).collect();
        RiskAssessment {
            risks,
            overall_risk_level,
            mitigation_strategies,
        }
    }
}

#[async_trait]
impl Tool for RiskAssessmentTool {
    fn name(&self) -> &str {
        "risk_assessment"
    }

    fn description(&self) -> &str {
        "Assess excavation risks with probability, impact and mitigation for each."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<RiskAssessmentArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: RiskAssessmentArgs = parse_args(self.name(), args)?;
        serde_json::to_value(Self::assess(args.conditions, args.total_units))
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_labels() {
        assert_eq!(row_label(0), "A");
        assert_eq!(row_label(25), "Z");
        assert_eq!(row_label(26), "AA");
        assert_eq!(row_label(27), "AB");
    }

    #[test]
    fn test_grid_counts_and_priorities() {
        let grid = GridPlanningTool::plan(100.0, 100.0, 5.0).unwrap();
        assert_eq!(grid.total_units, 400);
        assert_eq!(grid.units[0].unit_id, "A1");
        assert_eq!(grid.units[0].priority, "low");
        let centre = grid.units.iter().find(|u| u.unit_id == "J10").unwrap();
        assert_eq!(centre.priority, "high");
    }

    #[test]
    fn test_partial_edge_units() {
        let grid = GridPlanningTool::plan(12.0, 5.0, 5.0).unwrap();
        assert_eq!((grid.rows, grid.columns), (1, 3));
        assert_eq!(grid.units[2].area, 10.0);
    }

    #[test]
    fn test_grid_rejects_degenerate_input() {
        assert!(GridPlanningTool::plan(0.0, 10.0, 5.0).is_err());
        assert!(GridPlanningTool::plan(10_000.0, 10_000.0, 1.0).is_err());
    }

    #[test]
    fn test_personnel_scale_with_units() {
        let plan = ResourceCalculatorTool::calculate(400, ExcavationMethod::Grid, SiteConditions::default());
        assert_eq!(plan.personnel_requirements["field_archaeologists"], 8);
        assert_eq!(plan.personnel_requirements["students"], 16);
        assert_eq!(plan.personnel_requirements["technicians"], 4);
        assert_eq!(plan.excavation_days, 50);
        assert_eq!(plan.duration_days, 3 + 50 + 10);

        let small = ResourceCalculatorTool::calculate(4, ExcavationMethod::TestPit, SiteConditions::default());
        assert_eq!(small.personnel_requirements["field_archaeologists"], 2);
        assert_eq!(small.excavation_days, 5);
        assert!(small.equipment_requirements.contains(&"Augers".to_string()));
    }

    #[test]
    fn test_overall_risk_is_max_impact() {
        let calm = RiskAssessmentTool::assess(SiteConditions::default(), 10);
        assert_eq!(calm.overall_risk_level, RiskLevel::Medium);
        let wet = RiskAssessmentTool::assess(
            SiteConditions {
                waterlogged: true,
                ..Default::default()
            },
            10,
        );
        assert_eq!(wet.overall_risk_level, RiskLevel::High);
        assert_eq!(wet.mitigation_strategies.len(), wet.risks.len());
    }
}
