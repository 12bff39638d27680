//! 文物分析工具：图像观察、材质鉴定、文化背景、风格断代
//!
//! 全部为输入的确定性函数；材质与断代依据内置参考表。

use std::collections::BTreeMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{CulturalContext, DatingEstimate, MaterialAnalysis, VisualAnalysis};
use crate::tools::schema::{parameters_schema, parse_args};
use crate::tools::Tool;

const IMAGE_CONFIDENCE: f64 = 0.85;
const FALLBACK_CONFIDENCE: f64 = 0.5;

struct MaterialProfile {
    keywords: &'static [&'static str],
    primary: &'static str,
    secondary: &'static [&'static str],
    composition: &'static [(&'static str, f64)],
    technique: &'static str,
    firing: Option<&'static str>,
    decoration: &'static [&'static str],
    marks: &'static [&'static str],
}

const MATERIALS: &[MaterialProfile] = &[
    MaterialProfile {
        keywords: &["ceramic", "pottery", "clay", "terracotta", "earthenware", "stoneware", "porcelain"],
        primary: "ceramic",
        secondary: &["clay", "temper"],
        composition: &[("silica", 0.6), ("alumina", 0.2), ("iron_oxide", 0.1), ("other", 0.1)],
        technique: "wheel-thrown or hand-built, kiln fired",
        firing: Some("800-1000°C"),
        decoration: &["painted bands", "incised lines"],
        marks: &["wheel marks", "finger impressions"],
    },
    MaterialProfile {
        keywords: &["bronze"],
        primary: "bronze",
        secondary: &["copper", "tin"],
        composition: &[("copper", 0.88), ("tin", 0.12)],
        technique: "lost-wax casting",
        firing: None,
        decoration: &["cast relief", "engraved motifs"],
        marks: &["casting seams", "file marks"],
    },
    MaterialProfile {
        keywords: &["copper"],
        primary: "copper",
        secondary: &["arsenic"],
        composition: &[("copper", 0.97), ("arsenic", 0.02), ("other", 0.01)],
        technique: "casting and cold hammering",
        firing: None,
        decoration: &["repoussé"],
        marks: &["hammer facets"],
    },
    MaterialProfile {
        keywords: &["iron", "steel"],
        primary: "iron",
        secondary: &["carbon", "slag inclusions"],
        composition: &[("iron", 0.97), ("carbon", 0.02), ("slag", 0.01)],
        technique: "bloomery smelting and forging",
        firing: None,
        decoration: &["inlay"],
        marks: &["forge welds", "hammer marks"],
    },
    MaterialProfile {
        keywords: &["gold"],
        primary: "gold",
        secondary: &["silver", "copper"],
        composition: &[("gold", 0.9), ("silver", 0.08), ("copper", 0.02)],
        technique: "hammering, filigree and granulation",
        firing: None,
        decoration: &["filigree", "granulation"],
        marks: &["solder joins"],
    },
    MaterialProfile {
        keywords: &["silver"],
        primary: "silver",
        secondary: &["copper", "lead"],
        composition: &[("silver", 0.92), ("copper", 0.06), ("lead", 0.02)],
        technique: "cupellation, casting and chasing",
        firing: None,
        decoration: &["chased motifs"],
        marks: &["tool marks"],
    },
    MaterialProfile {
        keywords: &["stone", "flint", "obsidian", "chert", "marble", "limestone", "basalt", "granite"],
        primary: "stone",
        secondary: &[],
        composition: &[("silicate minerals", 1.0)],
        technique: "knapping, grinding or carving",
        firing: None,
        decoration: &["carved relief"],
        marks: &["flake scars", "chisel marks"],
    },
    MaterialProfile {
        keywords: &["glass", "faience"],
        primary: "glass",
        secondary: &["soda", "lime"],
        composition: &[("silica", 0.7), ("soda", 0.15), ("lime", 0.1), ("other", 0.05)],
        technique: "core-forming or glassblowing",
        firing: Some("1000-1100°C"),
        decoration: &["trailed threads"],
        marks: &["pontil scar"],
    },
    MaterialProfile {
        keywords: &["bone", "ivory", "antler", "horn"],
        primary: "bone",
        secondary: &[],
        composition: &[("hydroxyapatite", 0.7), ("collagen", 0.3)],
        technique: "carving and polishing",
        firing: None,
        decoration: &["incised dot-and-circle"],
        marks: &["saw marks", "polish"],
    },
    MaterialProfile {
        keywords: &["wood", "timber"],
        primary: "wood",
        secondary: &[],
        composition: &[("cellulose", 0.5), ("lignin", 0.3), ("hemicellulose", 0.2)],
        technique: "carving and joinery",
        firing: None,
        decoration: &["carved patterns"],
        marks: &["adze marks"],
    },
];

fn lookup_material(material: &str) -> Option<&'static MaterialProfile> {
    let material = material.to_lowercase();
    MATERIALS
        .iter()
        .find(|p| p.keywords.iter().any(|k| material.contains(k)))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn describe(material: &str, artifact_type: Option<&str>) -> String {
    match artifact_type {
        Some(kind) if !kind.trim().is_empty() => format!("{} {}", material, kind),
        _ => format!("{} artifact", material),
    }
}

/// 无图像时的视觉描述：仅依据材质
pub fn material_only_visual(material: &str, artifact_type: Option<&str>) -> VisualAnalysis {
    VisualAnalysis {
        description: format!("{} described from material only", describe(material, artifact_type)),
        decorative_elements: Vec::new(),
        manufacturing_marks: Vec::new(),
        wear_patterns: Vec::new(),
        preservation_state: None,
        source: "material_fallback".to_string(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImageAnalysisArgs {
    /// 图像 URL 或存储路径
    pub image_url: String,
    pub material: String,
    #[serde(default)]
    pub artifact_type: Option<String>,
}

/// 图像观察：装饰、制作痕迹、磨损
pub struct ImageAnalysisTool;

#[async_trait]
impl Tool for ImageAnalysisTool {
    fn name(&self) -> &str {
        "image_analysis"
    }

    fn description(&self) -> &str {
        "Describe an artifact image: decoration, manufacturing marks, wear and preservation."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ImageAnalysisArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: ImageAnalysisArgs = parse_args(self.name(), args)?;
        if args.image_url.trim().is_empty() {
            return Err("empty image reference".to_string());
        }
        let profile = lookup_material(&args.material);
        let analysis = VisualAnalysis {
            description: format!(
                "Photographed {} showing surface treatment and form",
                describe(&args.material, args.artifact_type.as_deref())
            ),
            decorative_elements: profile.map(|p| strings(p.decoration)).unwrap_or_default(),
            manufacturing_marks: profile.map(|p| strings(p.marks)).unwrap_or_default(),
            wear_patterns: vec!["surface abrasion".to_string(), "edge chipping".to_string()],
            preservation_state: Some("good".to_string()),
            source: "image".to_string(),
            confidence: IMAGE_CONFIDENCE,
        };
        serde_json::to_value(analysis).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MaterialIdentificationArgs {
    pub material: String,
    /// 视觉分析给出的描述
    pub visual_description: String,
}

/// 材质鉴定：成分、工艺、烧成温度
pub struct MaterialIdentificationTool;

#[async_trait]
impl Tool for MaterialIdentificationTool {
    fn name(&self) -> &str {
        "material_identification"
    }

    fn description(&self) -> &str {
        "Identify the primary material, composition and manufacturing technique of an artifact."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<MaterialIdentificationArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: MaterialIdentificationArgs = parse_args(self.name(), args)?;
        let analysis = match lookup_material(&args.material) {
            Some(profile) => MaterialAnalysis {
                primary_material: profile.primary.to_string(),
                secondary_materials: strings(profile.secondary),
                composition: profile
                    .composition
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                manufacturing_technique: Some(profile.technique.to_string()),
                firing_temperature: profile.firing.map(str::to_string),
                confidence: 0.85,
            },
            None => MaterialAnalysis {
                primary_material: args.material.trim().to_lowercase(),
                secondary_materials: Vec::new(),
                composition: BTreeMap::new(),
                manufacturing_technique: None,
                firing_temperature: None,
                confidence: 0.4,
            },
        };
        serde_json::to_value(analysis).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CulturalContextArgs {
    pub primary_material: String,
    #[serde(default)]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

fn infer_function(artifact_type: &str) -> Option<&'static str> {
    let kind = artifact_type.to_lowercase();
    let table: &[(&[&str], &str)] = &[
        (&["vessel", "amphora", "jar", "bowl", "cup", "pot"], "storage, transport or serving of goods"),
        (&["coin"], "currency and political messaging"),
        (&["sword", "spear", "dagger", "arrow", "weapon"], "warfare or status display"),
        (&["figurine", "statue", "idol"], "ritual or votive use"),
        (&["brooch", "ring", "bead", "necklace", "ornament"], "personal adornment"),
        (&["tool", "axe", "sickle", "awl"], "craft or agricultural work"),
    ];
    table
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| kind.contains(k)))
        .map(|(_, function)| *function)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 文化背景：依据文化、时期、地区线索
pub struct CulturalContextTool;

#[async_trait]
impl Tool for CulturalContextTool {
    fn name(&self) -> &str {
        "cultural_context"
    }

    fn description(&self) -> &str {
        "Place an artifact in its cultural, chronological and regional context."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<CulturalContextArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: CulturalContextArgs = parse_args(self.name(), args)?;
        let culture = non_empty(&args.culture);
        let period = non_empty(&args.period);
        let region = non_empty(&args.region);

        let hints = [culture.is_some(), period.is_some(), region.is_some()]
            .iter()
            .filter(|h| **h)
            .count();

        let mut connections = Vec::new();
        if let (Some(c), Some(r)) = (&culture, &region) {
            connections.push(format!("{} presence in {}", c, r));
        }
        if let Some(p) = &period {
            connections.push(format!("{} exchange networks", p));
        }

        let context = CulturalContext {
            significance: culture.as_ref().map(|c| {
                format!("Material evidence of {} {} craft traditions", c, args.primary_material)
            }),
            culture,
            time_period: period,
            geographic_region: region,
            function: args
                .artifact_type
                .as_deref()
                .and_then(infer_function)
                .map(str::to_string),
            cultural_connections: connections,
            confidence: 0.4 + 0.15 * hints as f64,
        };
        serde_json::to_value(context).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DatingEstimationArgs {
    #[serde(default)]
    pub period: Option<String>,
}

/// 时期名 -> 典型年龄（BP）
const PERIOD_AGES: &[(&str, f64)] = &[
    ("neolithic", 7000.0),
    ("bronze age", 4000.0),
    ("iron age", 2800.0),
    ("classical", 2450.0),
    ("hellenistic", 2200.0),
    ("roman", 1900.0),
    ("medieval", 900.0),
];

/// 风格断代：按时期给出年龄范围；时期不明时返回 null
pub struct DatingEstimationTool;

impl DatingEstimationTool {
    pub fn estimate(period: &str) -> Option<DatingEstimate> {
        let period = period.to_lowercase();
        PERIOD_AGES
            .iter()
            .find(|(name, _)| period.contains(name))
            .map(|(_, age)| DatingEstimate {
                method: "stylistic_comparison".to_string(),
                estimated_age: *age,
                confidence_interval: (age * 0.9, age * 1.1),
                confidence_level: 0.75,
            })
    }
}

#[async_trait]
impl Tool for DatingEstimationTool {
    fn name(&self) -> &str {
        "dating_estimation"
    }

    fn description(&self) -> &str {
        "Estimate an artifact's age (years BP) from its stylistic period."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<DatingEstimationArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: DatingEstimationArgs = parse_args(self.name(), args)?;
        let estimate = args.period.as_deref().and_then(Self::estimate);
        serde_json::to_value(estimate).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_material_table_lookup() {
        let out = MaterialIdentificationTool
            .execute(json!({"material": "Red-figure pottery", "visual_description": "vase"}))
            .await
            .unwrap();
        let analysis: MaterialAnalysis = serde_json::from_value(out).unwrap();
        assert_eq!(analysis.primary_material, "ceramic");
        assert_eq!(analysis.firing_temperature.as_deref(), Some("800-1000°C"));
        assert_eq!(analysis.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_unknown_material_lowers_confidence() {
        let out = MaterialIdentificationTool
            .execute(json!({"material": "Amber", "visual_description": ""}))
            .await
            .unwrap();
        let analysis: MaterialAnalysis = serde_json::from_value(out).unwrap();
        assert_eq!(analysis.primary_material, "amber");
        assert!(analysis.confidence < 0.5);
    }

    #[tokio::test]
    async fn test_image_analysis_rejects_empty_reference() {
        let err = ImageAnalysisTool
            .execute(json!({"image_url": " ", "material": "bronze"}))
            .await
            .unwrap_err();
        assert!(err.contains("empty image"));
    }

    #[tokio::test]
    async fn test_cultural_confidence_grows_with_hints() {
        let bare = CulturalContextTool
            .execute(json!({"primary_material": "ceramic"}))
            .await
            .unwrap();
        let rich = CulturalContextTool
            .execute(json!({
                "primary_material": "ceramic",
                "artifact_type": "amphora",
                "culture": "Greek",
                "period": "Classical",
                "region": "Attica"
            }))
            .await
            .unwrap();
        let bare: CulturalContext = serde_json::from_value(bare).unwrap();
        let rich: CulturalContext = serde_json::from_value(rich).unwrap();
        assert!(bare.culture.is_none());
        assert!(rich.confidence > bare.confidence);
        assert_eq!(
            rich.function.as_deref(),
            Some("storage, transport or serving of goods")
        );
    }

    #[test]
    fn test_period_estimate() {
        let estimate = DatingEstimationTool::estimate("Late Roman").unwrap();
        assert_eq!(estimate.estimated_age, 1900.0);
        assert!((estimate.confidence_interval.0 - 1710.0).abs() < 1e-9);
        assert!(DatingEstimationTool::estimate("unknown").is_none());
    }
}
