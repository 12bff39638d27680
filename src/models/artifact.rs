//! 文物记录与分析结果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::new_record_id;

/// 待分析的文物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactData {
    #[serde(default = "new_record_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// 材质描述，如 "ceramic"、"bronze"
    pub material: String,
    #[serde(default)]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualAnalysis {
    pub description: String,
    #[serde(default)]
    pub decorative_elements: Vec<String>,
    #[serde(default)]
    pub manufacturing_marks: Vec<String>,
    #[serde(default)]
    pub wear_patterns: Vec<String>,
    #[serde(default)]
    pub preservation_state: Option<String>,
    /// "image" 或 "material_fallback"
    pub source: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialAnalysis {
    pub primary_material: String,
    #[serde(default)]
    pub secondary_materials: Vec<String>,
    /// 成分占比
    #[serde(default)]
    pub composition: BTreeMap<String, f64>,
    #[serde(default)]
    pub manufacturing_technique: Option<String>,
    #[serde(default)]
    pub firing_temperature: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CulturalContext {
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub geographic_region: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub significance: Option<String>,
    #[serde(default)]
    pub cultural_connections: Vec<String>,
    pub confidence: f64,
}

/// 风格断代估计，年龄单位为 BP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatingEstimate {
    pub method: String,
    pub estimated_age: f64,
    pub confidence_interval: (f64, f64),
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactAnalysis {
    pub artifact_id: String,
    pub artifact_name: String,
    pub visual_analysis: VisualAnalysis,
    pub material_analysis: MaterialAnalysis,
    pub cultural_context: CulturalContext,
    pub dating_estimate: Option<DatingEstimate>,
    pub overall_confidence: f64,
    pub completeness: f64,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}
