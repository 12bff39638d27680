//! 文明研究工具：参考库查询、地理分析、年表构建

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::civilization::format_year;
use crate::models::{Coordinates, CulturalAnalysis, GeographicAnalysis, TimePeriod, TimelineAnalysis, TimelinePhase};
use crate::tools::schema::{parameters_schema, parse_args};
use crate::tools::Tool;

struct ReferenceRecord {
    aliases: &'static [&'static str],
    significance: &'static str,
    architecture: &'static [&'static str],
    trade_links: &'static [&'static str],
    achievements: &'static [&'static str],
}

const REFERENCE: &[ReferenceRecord] = &[
    ReferenceRecord {
        aliases: &["ancient greece", "greece", "greek", "hellenic"],
        significance: "Foundational for Western philosophy, democracy and classical art",
        architecture: &["Doric, Ionic and Corinthian temples", "theatres", "stoas"],
        trade_links: &["Black Sea colonies", "Egypt", "Phoenicia", "Magna Graecia"],
        achievements: &["democratic institutions", "classical sculpture", "geometry"],
    },
    ReferenceRecord {
        aliases: &["roman empire", "roman", "rome"],
        significance: "Unified the Mediterranean under one legal and administrative system",
        architecture: &["aqueducts", "concrete vaulting", "amphitheatres", "road network"],
        trade_links: &["Egypt", "Gaul", "Hispania", "India via the Red Sea"],
        achievements: &["Roman law", "hydraulic engineering", "Latin literacy"],
    },
    ReferenceRecord {
        aliases: &["ancient egypt", "egypt", "egyptian"],
        significance: "One of the longest-lived states with a continuous monumental tradition",
        architecture: &["pyramids", "rock-cut tombs", "temple complexes"],
        trade_links: &["Nubia", "Punt", "Levant", "Crete"],
        achievements: &["hieroglyphic writing", "solar calendar", "monumental stone building"],
    },
    ReferenceRecord {
        aliases: &["maya", "mayan"],
        significance: "Developed the most complete writing system of the pre-Columbian Americas",
        architecture: &["stepped pyramids", "ball courts", "causeways"],
        trade_links: &["Central Mexico", "Caribbean coast", "Highland Guatemala"],
        achievements: &["Long Count calendar", "positional notation with zero", "astronomy"],
    },
    ReferenceRecord {
        aliases: &["indus valley", "indus", "harappa", "harappan"],
        significance: "Early urban civilisation with planned cities and standardised weights",
        architecture: &["grid-planned cities", "covered drains", "great bath"],
        trade_links: &["Mesopotamia", "Oman peninsula", "Central Asia"],
        achievements: &["urban sanitation", "standardised weights", "seal script"],
    },
    ReferenceRecord {
        aliases: &["mesopotamia", "sumer", "sumerian", "babylon", "akkad", "assyria"],
        significance: "Birthplace of writing, cities and codified law",
        architecture: &["ziggurats", "mud-brick city walls", "palaces"],
        trade_links: &["Indus Valley", "Anatolia", "Persian Gulf", "Levant"],
        achievements: &["cuneiform", "law codes", "sexagesimal mathematics"],
    },
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseQueryArgs {
    /// 文明名称
    pub name: String,
}

/// 参考库查询：文化意义、建筑、贸易联系
pub struct DatabaseQueryTool;

impl DatabaseQueryTool {
    pub fn lookup(name: &str) -> CulturalAnalysis {
        let name = name.to_lowercase();
        match REFERENCE
            .iter()
            .find(|r| r.aliases.iter().any(|a| name.contains(a)))
        {
            Some(record) => CulturalAnalysis {
                significance: Some(record.significance.to_string()),
                architecture: strings(record.architecture),
                trade_links: strings(record.trade_links),
                key_achievements: strings(record.achievements),
                confidence: 0.85,
            },
            None => CulturalAnalysis {
                significance: None,
                architecture: Vec::new(),
                trade_links: Vec::new(),
                key_achievements: Vec::new(),
                confidence: 0.6,
            },
        }
    }
}

#[async_trait]
impl Tool for DatabaseQueryTool {
    fn name(&self) -> &str {
        "database_query"
    }

    fn description(&self) -> &str {
        "Look up a civilization in the reference database for cultural significance and trade links."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<DatabaseQueryArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: DatabaseQueryArgs = parse_args(self.name(), args)?;
        serde_json::to_value(Self::lookup(&args.name)).map_err(|e| e.to_string())
    }
}

struct Environment {
    keywords: &'static [&'static str],
    description: &'static str,
    resources: &'static [&'static str],
}

const ENVIRONMENTS: &[Environment] = &[
    Environment {
        keywords: &["mediterranean", "greece", "aegean", "attica", "italy", "latium", "anatolia"],
        description: "Mediterranean coastal climate with hilly hinterland",
        resources: &["olive oil", "wine", "marble", "maritime trade routes"],
    },
    Environment {
        keywords: &["egypt", "nile"],
        description: "Arid river valley with annual flooding",
        resources: &["fertile silt", "papyrus", "limestone", "Nubian gold"],
    },
    Environment {
        keywords: &["mesopotamia", "tigris", "euphrates", "iraq", "sumer"],
        description: "Alluvial plain between two rivers",
        resources: &["barley", "clay", "bitumen", "reeds"],
    },
    Environment {
        keywords: &["yucatan", "mesoamerica", "guatemala", "peten", "belize"],
        description: "Tropical lowland forest on limestone karst",
        resources: &["maize", "limestone", "jade", "cacao"],
    },
    Environment {
        keywords: &["indus", "punjab", "sindh", "pakistan", "gujarat"],
        description: "Monsoonal river floodplain",
        resources: &["cotton", "wheat", "carnelian", "timber"],
    },
];

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MapVisualizationArgs {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// 地理分析：环境、资源、战略位置
pub struct MapVisualizationTool;

fn format_coordinates(c: &Coordinates) -> String {
    let ns = if c.latitude >= 0.0 { 'N' } else { 'S' };
    let ew = if c.longitude >= 0.0 { 'E' } else { 'W' };
    format!("{:.2}°{}, {:.2}°{}", c.latitude.abs(), ns, c.longitude.abs(), ew)
}

#[async_trait]
impl Tool for MapVisualizationTool {
    fn name(&self) -> &str {
        "map_visualization"
    }

    fn description(&self) -> &str {
        "Characterise a civilization's environment, resources and strategic position from its region or coordinates."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<MapVisualizationArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: MapVisualizationArgs = parse_args(self.name(), args)?;
        let region = args
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let environment = region.and_then(|r| {
            let r = r.to_lowercase();
            ENVIRONMENTS
                .iter()
                .find(|e| e.keywords.iter().any(|k| r.contains(k)))
        });

        let strategic_location = match (&args.coordinates, region) {
            (Some(c), Some(r)) => Some(format!("{} in {}", format_coordinates(c), r)),
            (Some(c), None) => Some(format_coordinates(c)),
            (None, Some(r)) => Some(format!("Within {}", r)),
            (None, None) => None,
        };
        let confidence = if args.coordinates.is_some() {
            0.9
        } else if region.is_some() {
            0.7
        } else {
            0.5
        };

        let analysis = GeographicAnalysis {
            environment: environment
                .map(|e| e.description.to_string())
                .unwrap_or_else(|| "Environment not characterised".to_string()),
            resources: environment.map(|e| strings(e.resources)).unwrap_or_default(),
            strategic_location,
            map_center: args.coordinates,
            confidence,
        };
        serde_json::to_value(analysis).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TimelineBuilderArgs {
    #[serde(default)]
    pub time_period: Option<TimePeriod>,
}

/// 年表：把时间区间三等分为兴起、鼎盛、衰落
pub struct TimelineBuilderTool;

impl TimelineBuilderTool {
    pub fn build(period: Option<TimePeriod>) -> TimelineAnalysis {
        let Some(period) = period.filter(|p| p.span() > 0) else {
            return TimelineAnalysis {
                phases: Vec::new(),
                peak_period: None,
                decline_period: None,
                confidence: 0.55,
            };
        };
        let third = period.span() / 3;
        let bounds = [
            ("Early period", period.start_year, period.start_year + third),
            ("Peak period", period.start_year + third, period.start_year + 2 * third),
            ("Decline", period.start_year + 2 * third, period.end_year),
        ];
        let phases: Vec<TimelinePhase> = bounds
            .iter()
            .map(|(name, start, end)| TimelinePhase {
                name: name.to_string(),
                start_year: *start,
                end_year: *end,
            })
            .collect();
        let label = |p: &TimelinePhase| format!("{} to {}", format_year(p.start_year), format_year(p.end_year));
        TimelineAnalysis {
            peak_period: phases.get(1).map(label),
            decline_period: phases.get(2).map(label),
            phases,
            confidence: 0.88,
        }
    }
}

#[async_trait]
impl Tool for TimelineBuilderTool {
    fn name(&self) -> &str {
        "timeline_builder"
    }

    fn description(&self) -> &str {
        "Build an early / peak / decline timeline from a civilization's time period."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<TimelineBuilderArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: TimelineBuilderArgs = parse_args(self.name(), args)?;
        serde_json::to_value(Self::build(args.time_period)).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_lookup_by_alias() {
        let found = DatabaseQueryTool::lookup("Classic Maya");
        assert_eq!(found.confidence, 0.85);
        assert!(found.significance.is_some());
        let missing = DatabaseQueryTool::lookup("Atlantis");
        assert_eq!(missing.confidence, 0.6);
        assert!(missing.significance.is_none());
    }

    #[tokio::test]
    async fn test_geographic_confidence_levels() {
        let with_coords = MapVisualizationTool
            .execute(json!({
                "name": "Rome",
                "region": "Latium, Italy",
                "coordinates": {"latitude": 41.9, "longitude": 12.5}
            }))
            .await
            .unwrap();
        let region_only = MapVisualizationTool
            .execute(json!({"name": "Rome", "region": "Italy"}))
            .await
            .unwrap();
        let nothing = MapVisualizationTool.execute(json!({"name": "Rome"})).await.unwrap();
        assert_eq!(with_coords["confidence"], 0.9);
        assert_eq!(with_coords["strategic_location"], "41.90°N, 12.50°E in Latium, Italy");
        assert_eq!(region_only["confidence"], 0.7);
        assert_eq!(nothing["confidence"], 0.5);
        assert!(nothing["strategic_location"].is_null());
    }

    #[test]
    fn test_timeline_thirds() {
        let timeline = TimelineBuilderTool::build(Some(TimePeriod {
            start_year: -753,
            end_year: 476,
        }));
        assert_eq!(timeline.phases.len(), 3);
        assert_eq!(timeline.phases[0].start_year, -753);
        assert_eq!(timeline.phases[2].end_year, 476);
        assert_eq!(timeline.peak_period.as_deref(), Some("344 BCE to 65 CE"));
        assert!(TimelineBuilderTool::build(None).peak_period.is_none());
    }
}
