//! 文物分析 Agent
//!
//! 四步串行：视觉分析 -> 材质鉴定 -> 文化背景 -> 风格断代，后一步消费前一步的结果。
//! 没有图像时不调用 image_analysis，改用仅依据材质的描述（置信度更低）。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{mean, AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::core::AgentError;
use crate::models::{
    extract, ArtifactAnalysis, ArtifactData, CulturalContext, DatingEstimate, MaterialAnalysis,
    VisualAnalysis,
};
use crate::tools::artifact::{
    material_only_visual, CulturalContextArgs, DatingEstimationArgs, ImageAnalysisArgs,
    MaterialIdentificationArgs,
};
use crate::tools::{
    CulturalContextTool, DatingEstimationTool, ImageAnalysisTool, MaterialIdentificationTool, Tool,
    ToolInvoker,
};

pub struct ArtifactAnalysisAgent;

impl ArtifactAnalysisAgent {
    pub const NAME: &'static str = "ArtifactAnalysisAgent";

    async fn visual(
        invoker: &mut ToolInvoker,
        artifact: &ArtifactData,
    ) -> Result<VisualAnalysis, AgentError> {
        let image = artifact.image_urls.iter().find(|u| !u.trim().is_empty());
        match image {
            Some(url) => {
                invoker
                    .call_typed(
                        "image_analysis",
                        &ImageAnalysisArgs {
                            image_url: url.clone(),
                            material: artifact.material.clone(),
                            artifact_type: artifact.artifact_type.clone(),
                        },
                    )
                    .await
            }
            None => Ok(material_only_visual(
                &artifact.material,
                artifact.artifact_type.as_deref(),
            )),
        }
    }
}

/// 完整度：视觉描述、主材质、文化、断代四项中非空的比例
fn completeness(
    visual: &VisualAnalysis,
    material: &MaterialAnalysis,
    context: &CulturalContext,
    dating: Option<&DatingEstimate>,
) -> f64 {
    let present = [
        !visual.description.trim().is_empty(),
        !material.primary_material.trim().is_empty(),
        context.culture.as_deref().is_some_and(|c| !c.trim().is_empty()),
        dating.is_some(),
    ];
    present.iter().filter(|p| **p).count() as f64 / present.len() as f64
}

fn key_findings(
    material: &MaterialAnalysis,
    context: &CulturalContext,
    dating: Option<&DatingEstimate>,
) -> Vec<String> {
    let mut findings = vec![format!("Primary material: {}", material.primary_material)];
    if let Some(technique) = &material.manufacturing_technique {
        findings.push(format!("Manufactured by {}", technique));
    }
    if let Some(culture) = &context.culture {
        findings.push(format!("Attributed to {} culture", culture));
    }
    if let Some(function) = &context.function {
        findings.push(format!("Likely used for {}", function));
    }
    if let Some(d) = dating {
        findings.push(format!(
            "Estimated age {:.0} BP ({:.0}-{:.0} BP)",
            d.estimated_age, d.confidence_interval.0, d.confidence_interval.1
        ));
    }
    findings
}

fn recommendations(
    visual: &VisualAnalysis,
    material: &MaterialAnalysis,
    context: &CulturalContext,
    dating: Option<&DatingEstimate>,
) -> Vec<String> {
    let mut recs = Vec::new();
    if visual.source != "image" {
        recs.push("Photograph the artifact to enable a full visual analysis".to_string());
    }
    if material.confidence < 0.8 {
        recs.push("Confirm the material with XRF or petrographic analysis".to_string());
    }
    if context.culture.is_none() {
        recs.push("Compare with regional typologies to establish cultural attribution".to_string());
    }
    if dating.is_none() {
        recs.push("Submit associated organic material for radiocarbon dating".to_string());
    }
    recs
}

#[async_trait]
impl DomainAgent for ArtifactAnalysisAgent {
    fn agent_type(&self) -> &str {
        AgentType::ArtifactAnalysis.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(ImageAnalysisTool),
            Arc::new(MaterialIdentificationTool),
            Arc::new(CulturalContextTool),
            Arc::new(DatingEstimationTool),
        ]
    }

    fn capabilities(&self) -> Vec<String> {
        ["visual_analysis", "material_identification", "cultural_context", "dating_estimation"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let artifact: ArtifactData = extract(&request.payload, "artifact_data")?;
        if artifact.material.trim().is_empty() {
            return Err(AgentError::validation("artifact material must not be empty"));
        }

        let visual = Self::visual(invoker, &artifact).await?;

        let material: MaterialAnalysis = invoker
            .call_typed(
                "material_identification",
                &MaterialIdentificationArgs {
                    material: artifact.material.clone(),
                    visual_description: visual.description.clone(),
                },
            )
            .await?;

        let context: CulturalContext = invoker
            .call_typed(
                "cultural_context",
                &CulturalContextArgs {
                    primary_material: material.primary_material.clone(),
                    artifact_type: artifact.artifact_type.clone(),
                    culture: artifact.culture.clone(),
                    period: artifact.period.clone(),
                    region: artifact.region.clone(),
                },
            )
            .await?;

        let dating: Option<DatingEstimate> = invoker
            .call_typed(
                "dating_estimation",
                &DatingEstimationArgs {
                    period: context.time_period.clone(),
                },
            )
            .await?;

        let mut confidences = vec![visual.confidence, material.confidence, context.confidence];
        if let Some(d) = &dating {
            confidences.push(d.confidence_level);
        }
        let overall_confidence = mean(&confidences);
        let completeness = completeness(&visual, &material, &context, dating.as_ref());

        let analysis = ArtifactAnalysis {
            artifact_id: artifact.id.clone(),
            artifact_name: artifact.name.clone(),
            key_findings: key_findings(&material, &context, dating.as_ref()),
            recommendations: recommendations(&visual, &material, &context, dating.as_ref()),
            visual_analysis: visual,
            material_analysis: material,
            cultural_context: context,
            dating_estimate: dating,
            overall_confidence,
            completeness,
        };

        Ok(AgentOutput::new(
            serde_json::to_value(&analysis)?,
            overall_confidence,
            mean(&[overall_confidence, completeness]),
            completeness,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, BaseAgent};
    use serde_json::json;

    fn agent() -> BaseAgent {
        BaseAgent::new(AgentConfig::new(ArtifactAnalysisAgent::NAME), ArtifactAnalysisAgent)
    }

    fn payload(image_urls: Vec<&str>) -> serde_json::Value {
        json!({"artifact_data": {
            "name": "Amphora",
            "material": "ceramic",
            "artifact_type": "amphora",
            "period": "Roman",
            "culture": "Roman",
            "region": "Campania",
            "image_urls": image_urls,
        }})
    }

    #[tokio::test]
    async fn test_full_analysis_with_image() {
        let response = agent()
            .process(&AgentRequest::new("artifact_analysis", payload(vec!["s3://a/1.jpg"])).with_cache(false))
            .await;
        assert!(response.is_success(), "{:?}", response.error);
        let analysis: ArtifactAnalysis = serde_json::from_value(response.data).unwrap();
        assert_eq!(analysis.visual_analysis.source, "image");
        assert_eq!(analysis.completeness, 1.0);
        assert!(analysis.dating_estimate.is_some());
        assert_eq!(response.tool_calls, 4);
    }

    #[tokio::test]
    async fn test_no_image_uses_material_fallback_with_lower_confidence() {
        let with_image = agent()
            .process(&AgentRequest::new("artifact_analysis", payload(vec!["img.png"])))
            .await;
        let without = agent()
            .process(&AgentRequest::new("artifact_analysis", payload(vec![])))
            .await;
        assert!(without.is_success());
        let a: ArtifactAnalysis = serde_json::from_value(with_image.data).unwrap();
        let b: ArtifactAnalysis = serde_json::from_value(without.data).unwrap();
        assert_eq!(b.visual_analysis.source, "material_fallback");
        assert!(b.visual_analysis.confidence < a.visual_analysis.confidence);
        assert!(!without.tools_used.contains(&"image_analysis".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_period_drops_dating_from_mean() {
        let response = agent()
            .process(&AgentRequest::new(
                "artifact_analysis",
                json!({"artifact_data": {"material": "bronze"}}),
            ))
            .await;
        let analysis: ArtifactAnalysis = serde_json::from_value(response.data).unwrap();
        assert!(analysis.dating_estimate.is_none());
        assert_eq!(analysis.completeness, 0.5);
        let expected = mean(&[
            analysis.visual_analysis.confidence,
            analysis.material_analysis.confidence,
            analysis.cultural_context.confidence,
        ]);
        assert!((analysis.overall_confidence - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_material_is_validation_error() {
        let response = agent()
            .process(&AgentRequest::new("artifact_analysis", json!({"artifact_data": {"name": "x"}})))
            .await;
        assert!(response.error.unwrap().starts_with("Validation error"));
        assert_eq!(response.confidence, 0.0);
    }
}
