//! 文明研究记录

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::new_record_id;

/// 年份区间，公元前为负数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimePeriod {
    pub start_year: i32,
    pub end_year: i32,
}

impl TimePeriod {
    pub fn span(&self) -> i32 {
        self.end_year - self.start_year
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivilizationData {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub time_period: Option<TimePeriod>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CulturalAnalysis {
    pub significance: Option<String>,
    pub architecture: Vec<String>,
    pub trade_links: Vec<String>,
    pub key_achievements: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographicAnalysis {
    pub environment: String,
    pub resources: Vec<String>,
    pub strategic_location: Option<String>,
    pub map_center: Option<Coordinates>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePhase {
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineAnalysis {
    pub phases: Vec<TimelinePhase>,
    pub peak_period: Option<String>,
    pub decline_period: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivilizationResearch {
    pub civilization_id: String,
    pub name: String,
    pub cultural_analysis: CulturalAnalysis,
    pub geographic_analysis: GeographicAnalysis,
    pub timeline_analysis: TimelineAnalysis,
    pub overall_confidence: f64,
    pub research_gaps: Vec<String>,
    pub recommendations: Vec<String>,
}

/// 年份显示：负数为 BCE
pub fn format_year(year: i32) -> String {
    if year < 0 {
        format!("{} BCE", -year)
    } else {
        format!("{} CE", year)
    }
}
