//! 放射性碳测年 Agent
//!
//! 比值 -> 14C 年龄（c14_calculation）-> 曲线校正（calibration）。结果完全由比值、误差与曲线决定。
//! 非法比值与超出曲线范围的年龄在调用工具之前作为校验错误拒绝，不进入重试。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::core::AgentError;
use crate::models::{
    extract, CalibrationCurve, CalibrationResult, CarbonDatingResult, CarbonSample, RadiocarbonAge,
};
use crate::tools::dating::{check_within_curve, validate_ratio, CalibrationArgs, C14CalculationArgs};
use crate::tools::{C14CalculationTool, CalibrationTool, Tool, ToolInvoker};

/// cal BP 的零点
const BP_ORIGIN: f64 = 1950.0;

pub struct CarbonDatingAgent;

impl CarbonDatingAgent {
    pub const NAME: &'static str = "CarbonDatingAgent";
}

/// 天文纪年转 "x BCE" / "x CE"
fn calendar_label(year: f64) -> String {
    let year = year.round() as i64;
    if year <= 0 {
        format!("{} BCE", 1 - year)
    } else {
        format!("{} CE", year)
    }
}

fn interpretation(sample: &CarbonSample, age: &RadiocarbonAge, cal: &CalibrationResult) -> String {
    let (young, old) = cal.age_range_2sigma;
    format!(
        "{} sample dated to {:.0} ± {:.0} 14C BP, calibrated with {} to {:.0} cal BP ({}); \
         95% range {:.0}-{:.0} cal BP ({} to {})",
        sample.sample_type,
        age.radiocarbon_age,
        age.radiocarbon_error,
        cal.curve.name(),
        cal.calibrated_age,
        calendar_label(BP_ORIGIN - cal.calibrated_age),
        young,
        old,
        calendar_label(BP_ORIGIN - old),
        calendar_label(BP_ORIGIN - young),
    )
}

fn recommendations(sample: &CarbonSample, age: &RadiocarbonAge, cal: &CalibrationResult) -> Vec<String> {
    let mut recs = Vec::new();
    if cal.calibration_quality < 0.8 {
        recs.push("Remeasure the sample to reduce the counting error".to_string());
    }
    if sample.ratio_error.is_none() {
        recs.push("Report the laboratory measurement error instead of the default estimate".to_string());
    }
    if sample.sample_type == "unknown" {
        recs.push("Record the sample material to check for old-wood or reservoir effects".to_string());
    }
    if sample.calibration_curve == CalibrationCurve::Marine20 {
        recs.push("Apply a local marine reservoir correction (Delta R)".to_string());
    }
    if age.radiocarbon_age < 300.0 {
        recs.push("Young sample: expect wide calibrated ranges on the recent curve plateau".to_string());
    }
    recs
}

#[async_trait]
impl DomainAgent for CarbonDatingAgent {
    fn agent_type(&self) -> &str {
        AgentType::CarbonDating.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(C14CalculationTool), Arc::new(CalibrationTool)]
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["radiocarbon_age".to_string(), "calibration".to_string()]
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let sample: CarbonSample = extract(&request.payload, "sample_data")?;
        validate_ratio(sample.c14_ratio, sample.ratio_error).map_err(AgentError::Validation)?;

        let age: RadiocarbonAge = invoker
            .call_typed(
                "c14_calculation",
                &C14CalculationArgs {
                    c14_ratio: sample.c14_ratio,
                    ratio_error: sample.ratio_error,
                },
            )
            .await?;
        check_within_curve(age.radiocarbon_age, sample.calibration_curve)
            .map_err(AgentError::Validation)?;

        let calibration: CalibrationResult = invoker
            .call_typed(
                "calibration",
                &CalibrationArgs {
                    radiocarbon_age: age.radiocarbon_age,
                    radiocarbon_error: age.radiocarbon_error,
                    curve: sample.calibration_curve,
                },
            )
            .await?;

        let documented = [
            sample.ratio_error.is_some(),
            sample.sample_type != "unknown",
            sample.laboratory.is_some(),
        ];
        // 年龄与校正两项总是存在
        let completeness =
            (2 + documented.iter().filter(|d| **d).count()) as f64 / (2 + documented.len()) as f64;
        let quality = calibration.calibration_quality;

        let result = CarbonDatingResult {
            sample_id: sample.id.clone(),
            sample_type: sample.sample_type.clone(),
            method: format!("AMS radiocarbon, {} calibration", sample.calibration_curve.name()),
            laboratory: sample.laboratory.clone(),
            radiocarbon_age: age.radiocarbon_age,
            radiocarbon_error: age.radiocarbon_error,
            calendar_year: BP_ORIGIN - calibration.calibrated_age,
            interpretation: interpretation(&sample, &age, &calibration),
            recommendations: recommendations(&sample, &age, &calibration),
            calibration,
        };

        Ok(AgentOutput::new(
            serde_json::to_value(&result)?,
            quality,
            quality,
            completeness,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, BaseAgent};
    use crate::tools::dating::LIBBY_MEAN_LIFE;
    use serde_json::json;

    fn agent() -> BaseAgent {
        BaseAgent::new(AgentConfig::new(CarbonDatingAgent::NAME), CarbonDatingAgent)
    }

    async fn date(sample: serde_json::Value) -> crate::agent::AgentResponse {
        agent()
            .process(&AgentRequest::new("carbon_dating", json!({ "sample_data": sample })))
            .await
    }

    #[tokio::test]
    async fn test_raw_age_follows_libby_formula() {
        let response = date(json!({"c14_ratio": 0.75, "sample_type": "charcoal"})).await;
        assert!(response.is_success(), "{:?}", response.error);
        let result: CarbonDatingResult = serde_json::from_value(response.data).unwrap();
        assert!((result.radiocarbon_age - (-LIBBY_MEAN_LIFE * 0.75f64.ln())).abs() < 1e-9);
        assert_eq!(response.confidence, result.calibration.calibration_quality);
        assert_eq!(response.tools_used, vec!["c14_calculation", "calibration"]);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_identical() {
        let sample = json!({"c14_ratio": 0.62, "ratio_error": 0.004, "calibration_curve": "SHCal20"});
        let a: CarbonDatingResult = serde_json::from_value(date(sample.clone()).await.data).unwrap();
        let b: CarbonDatingResult = serde_json::from_value(date(sample).await.data).unwrap();
        assert_eq!(a.calibration.calibrated_age, b.calibration.calibrated_age);
        assert_eq!(a.calibration.age_range_2sigma, b.calibration.age_range_2sigma);
        assert_eq!(a.interpretation, b.interpretation);
    }

    #[tokio::test]
    async fn test_zero_and_negative_ratios_rejected() {
        for ratio in [0.0, -0.3, 1.5] {
            let response = date(json!({ "c14_ratio": ratio })).await;
            let error = response.error.unwrap();
            assert!(error.starts_with("Validation error"), "{}", error);
            assert_eq!(response.tool_calls, 0);
        }
    }

    #[tokio::test]
    async fn test_age_beyond_curve_rejected() {
        // -8033 ln(0.0001) ≈ 74 000 BP
        let response = date(json!({"c14_ratio": 0.0001})).await;
        assert!(response.error.unwrap().contains("calibration range"));
    }

    #[test]
    fn test_calendar_label() {
        assert_eq!(calendar_label(0.0), "1 BCE");
        assert_eq!(calendar_label(-752.0), "753 BCE");
        assert_eq!(calendar_label(1066.0), "1066 CE");
    }
}
