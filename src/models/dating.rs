//! 放射性碳测年记录

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::new_record_id;

/// 校正曲线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum CalibrationCurve {
    #[default]
    IntCal20,
    SHCal20,
    Marine20,
}

impl CalibrationCurve {
    pub fn name(&self) -> &'static str {
        match self {
            CalibrationCurve::IntCal20 => "IntCal20",
            CalibrationCurve::SHCal20 => "SHCal20",
            CalibrationCurve::Marine20 => "Marine20",
        }
    }

    /// 映射前加到 14C 年龄上的固定偏移（年）
    pub fn offset(&self) -> f64 {
        match self {
            CalibrationCurve::IntCal20 => 0.0,
            CalibrationCurve::SHCal20 => -40.0,
            CalibrationCurve::Marine20 => -400.0,
        }
    }
}

/// 测年样本；c14_ratio 为样本与现代标准的 14C 活度比
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonSample {
    #[serde(default = "new_record_id")]
    pub id: String,
    #[serde(default = "default_sample_type")]
    pub sample_type: String,
    pub c14_ratio: f64,
    /// 比值的 1σ 测量误差；缺省为比值的 0.5%
    #[serde(default)]
    pub ratio_error: Option<f64>,
    #[serde(default)]
    pub calibration_curve: CalibrationCurve,
    #[serde(default)]
    pub laboratory: Option<String>,
}

fn default_sample_type() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RadiocarbonAge {
    pub radiocarbon_age: f64,
    pub radiocarbon_error: f64,
}

/// 校正结果，年龄单位为 cal BP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub curve: CalibrationCurve,
    pub calibrated_age: f64,
    pub age_range_1sigma: (f64, f64),
    pub age_range_2sigma: (f64, f64),
    /// (cal BP, 概率)，概率和为 1
    pub probability_distribution: Vec<(f64, f64)>,
    pub peak_probability: f64,
    pub calibration_quality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonDatingResult {
    pub sample_id: String,
    pub sample_type: String,
    pub method: String,
    pub laboratory: Option<String>,
    pub radiocarbon_age: f64,
    pub radiocarbon_error: f64,
    pub calibration: CalibrationResult,
    /// 天文纪年（负数为公元前，0 为 1 BCE）
    pub calendar_year: f64,
    pub interpretation: String,
    pub recommendations: Vec<String>,
}
