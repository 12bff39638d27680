//! 放射性碳测年工具：14C 年龄计算与曲线校正
//!
//! 年龄公式 `age = -8033 ln(r)`（Libby 平均寿命 8033 年），误差按一阶传播 `8033 σr / r`。
//! 校正曲线为单调分段线性表（14C BP -> cal BP），SHCal20 / Marine20 以固定偏移近似。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{CalibrationCurve, CalibrationResult, RadiocarbonAge};
use crate::tools::schema::{parameters_schema, parse_args};
use crate::tools::Tool;

pub const LIBBY_MEAN_LIFE: f64 = 8033.0;

/// 默认比值误差：比值的 0.5%
const DEFAULT_RELATIVE_RATIO_ERROR: f64 = 0.005;

/// 分布离散点数（覆盖 ±3σ）
const DISTRIBUTION_POINTS: usize = 25;

/// (14C BP, cal BP)
const CURVE: &[(f64, f64)] = &[
    (0.0, 0.0),
    (1000.0, 930.0),
    (2000.0, 1950.0),
    (3000.0, 3200.0),
    (4000.0, 4480.0),
    (5000.0, 5730.0),
    (6000.0, 6850.0),
    (7000.0, 7830.0),
    (8000.0, 8870.0),
    (9000.0, 10200.0),
    (10000.0, 11500.0),
    (12000.0, 13900.0),
    (15000.0, 18250.0),
    (20000.0, 24000.0),
    (30000.0, 34800.0),
    (40000.0, 43500.0),
    (50000.0, 53500.0),
];

/// 曲线覆盖的最大 14C 年龄
pub fn curve_limit() -> f64 {
    CURVE.last().map(|(c14, _)| *c14).unwrap_or(0.0)
}

/// 比值必须有限且落在 (0, 1]
pub fn validate_ratio(ratio: f64, ratio_error: Option<f64>) -> Result<(), String> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(format!("c14_ratio must be in (0, 1], got {}", ratio));
    }
    if let Some(err) = ratio_error {
        if !err.is_finite() || err < 0.0 {
            return Err(format!("ratio_error must be a non-negative number, got {}", err));
        }
    }
    Ok(())
}

pub fn radiocarbon_age(ratio: f64, ratio_error: Option<f64>) -> Result<RadiocarbonAge, String> {
    validate_ratio(ratio, ratio_error)?;
    let sigma = ratio_error.unwrap_or(ratio * DEFAULT_RELATIVE_RATIO_ERROR);
    // ln(1) = -0.0 时取正零
    let age = (-LIBBY_MEAN_LIFE * ratio.ln()).max(0.0);
    Ok(RadiocarbonAge {
        radiocarbon_age: age,
        radiocarbon_error: LIBBY_MEAN_LIFE * sigma / ratio,
    })
}

/// 偏移后的 14C 年龄必须落在曲线范围内
pub fn check_within_curve(age: f64, curve: CalibrationCurve) -> Result<(), String> {
    let adjusted = age + curve.offset();
    if adjusted > curve_limit() {
        return Err(format!(
            "radiocarbon age {:.0} BP is beyond the {} calibration range ({:.0} BP)",
            age,
            curve.name(),
            curve_limit()
        ));
    }
    Ok(())
}

/// 14C BP -> cal BP，分段线性插值，输入截断到曲线范围
fn to_calendar(c14: f64) -> f64 {
    let x = c14.clamp(0.0, curve_limit());
    for pair in CURVE.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return y0 + (x - x0) * (y1 - y0) / (x1 - x0);
        }
    }
    CURVE.last().map(|(_, cal)| *cal).unwrap_or(0.0)
}

pub fn calibration_quality(age: f64, error: f64) -> f64 {
    if age <= 0.0 {
        return 0.5;
    }
    (0.95 - error / age).clamp(0.5, 0.95)
}

pub fn calibrate(age: f64, error: f64, curve: CalibrationCurve) -> Result<CalibrationResult, String> {
    if !age.is_finite() || age < 0.0 || !error.is_finite() || error < 0.0 {
        return Err(format!("invalid radiocarbon age {} ± {}", age, error));
    }
    check_within_curve(age, curve)?;

    let adjusted = (age + curve.offset()).max(0.0);
    let band = |k: f64| (to_calendar(adjusted - k * error), to_calendar(adjusted + k * error));

    let distribution = if error > 0.0 {
        let step = 6.0 * error / (DISTRIBUTION_POINTS - 1) as f64;
        let raw: Vec<(f64, f64)> = (0..DISTRIBUTION_POINTS)
            .map(|i| {
                let x = adjusted - 3.0 * error + i as f64 * step;
                let z = (x - adjusted) / error;
                (to_calendar(x), (-0.5 * z * z).exp())
            })
            .collect();
        let total: f64 = raw.iter().map(|(_, p)| p).sum();
        raw.into_iter().map(|(cal, p)| (cal, p / total)).collect()
    } else {
        vec![(to_calendar(adjusted), 1.0)]
    };
    let peak_probability = distribution.iter().map(|(_, p)| *p).fold(0.0, f64::max);

    Ok(CalibrationResult {
        curve,
        calibrated_age: to_calendar(adjusted),
        age_range_1sigma: band(1.0),
        age_range_2sigma: band(2.0),
        probability_distribution: distribution,
        peak_probability,
        calibration_quality: calibration_quality(age, error),
    })
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct C14CalculationArgs {
    /// 样本/现代标准 14C 活度比，(0, 1]
    pub c14_ratio: f64,
    #[serde(default)]
    pub ratio_error: Option<f64>,
}

pub struct C14CalculationTool;

#[async_trait]
impl Tool for C14CalculationTool {
    fn name(&self) -> &str {
        "c14_calculation"
    }

    fn description(&self) -> &str {
        "Compute the conventional radiocarbon age and its laboratory error from a C-14 ratio."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<C14CalculationArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: C14CalculationArgs = parse_args(self.name(), args)?;
        let age = radiocarbon_age(args.c14_ratio, args.ratio_error)?;
        serde_json::to_value(age).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationArgs {
    pub radiocarbon_age: f64,
    pub radiocarbon_error: f64,
    #[serde(default)]
    pub curve: CalibrationCurve,
}

pub struct CalibrationTool;

#[async_trait]
impl Tool for CalibrationTool {
    fn name(&self) -> &str {
        "calibration"
    }

    fn description(&self) -> &str {
        "Calibrate a radiocarbon age against IntCal20, SHCal20 or Marine20 with 1σ/2σ ranges."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<CalibrationArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: CalibrationArgs = parse_args(self.name(), args)?;
        let result = calibrate(args.radiocarbon_age, args.radiocarbon_error, args.curve)?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_formula() {
        let age = radiocarbon_age(0.5, None).unwrap();
        assert!((age.radiocarbon_age - 8033.0 * std::f64::consts::LN_2).abs() < 1e-9);
        assert!((age.radiocarbon_error - 8033.0 * 0.005).abs() < 1e-9);
        assert_eq!(radiocarbon_age(1.0, None).unwrap().radiocarbon_age, 0.0);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(validate_ratio(0.0, None).is_err());
        assert!(validate_ratio(-0.3, None).is_err());
        assert!(validate_ratio(1.2, None).is_err());
        assert!(validate_ratio(f64::NAN, None).is_err());
        assert!(validate_ratio(0.7, Some(-0.01)).is_err());
        assert!(validate_ratio(1.0, None).is_ok());
    }

    #[test]
    fn test_curve_is_monotone() {
        assert!(CURVE.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1));
        assert_eq!(to_calendar(2000.0), 1950.0);
        assert!((to_calendar(2500.0) - 2575.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_bands_nest() {
        let result = calibrate(3000.0, 30.0, CalibrationCurve::IntCal20).unwrap();
        let (lo1, hi1) = result.age_range_1sigma;
        let (lo2, hi2) = result.age_range_2sigma;
        assert!(lo2 < lo1 && lo1 < result.calibrated_age && result.calibrated_age < hi1 && hi1 < hi2);
        let total: f64 = result.probability_distribution.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(result.probability_distribution.len(), DISTRIBUTION_POINTS);
        assert!((result.calibration_quality - 0.94).abs() < 1e-9);
    }

    #[test]
    fn test_marine_offset_shifts_younger() {
        let land = calibrate(5000.0, 40.0, CalibrationCurve::IntCal20).unwrap();
        let marine = calibrate(5000.0, 40.0, CalibrationCurve::Marine20).unwrap();
        assert!(marine.calibrated_age < land.calibrated_age);
    }

    #[test]
    fn test_beyond_curve_rejected() {
        assert!(calibrate(60000.0, 500.0, CalibrationCurve::IntCal20).is_err());
        // Marine20 偏移后仍在范围内
        assert!(calibrate(50300.0, 500.0, CalibrationCurve::Marine20).is_ok());
    }

    #[test]
    fn test_quality_floor() {
        assert_eq!(calibration_quality(100.0, 90.0), 0.5);
        assert_eq!(calibration_quality(0.0, 40.0), 0.5);
    }
}
