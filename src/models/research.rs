//! 研究助手记录

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    LiteratureSearch,
    HypothesisGeneration,
    StatisticalAnalysis,
}

impl Capability {
    pub fn all() -> Vec<Capability> {
        vec![
            Capability::LiteratureSearch,
            Capability::HypothesisGeneration,
            Capability::StatisticalAnalysis,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::LiteratureSearch => "literature_search",
            Capability::HypothesisGeneration => "hypothesis_generation",
            Capability::StatisticalAnalysis => "statistical_analysis",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchContext {
    #[serde(default)]
    pub observations: Vec<String>,
    /// 数列名 -> 数值
    #[serde(default)]
    pub data: BTreeMap<String, Vec<f64>>,
}

/// 研究助手载荷（顶层字段即载荷字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub research_query: String,
    #[serde(default)]
    pub research_context: ResearchContext,
    /// 缺省为全部能力
    #[serde(default)]
    pub capabilities: Option<Vec<Capability>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureSource {
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: String,
    pub keywords: Vec<String>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub hypothesis: String,
    pub confidence: f64,
    pub supporting_evidence: Vec<String>,
    pub testability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub variables: (String, String),
    pub coefficient: f64,
    pub strength: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalReport {
    pub descriptive_statistics: BTreeMap<String, DescriptiveStats>,
    pub correlations: Vec<Correlation>,
    pub trends: BTreeMap<String, String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCapability {
    pub capability: Capability,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub requested: Vec<Capability>,
    pub performed: Vec<Capability>,
    pub not_performed: Vec<SkippedCapability>,
    pub literature: Option<Vec<LiteratureSource>>,
    pub hypotheses: Option<Vec<Hypothesis>>,
    pub statistical_analysis: Option<StatisticalReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query: ResearchQuery =
            serde_json::from_value(serde_json::json!({"research_query": "bronze age trade"}))
                .unwrap();
        assert!(query.capabilities.is_none());
        assert!(query.research_context.data.is_empty());
    }
}
