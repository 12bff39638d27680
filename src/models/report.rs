//! 报告记录

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::new_record_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Excavation,
    ArtifactAnalysis,
    #[default]
    Research,
    SiteSurvey,
}

impl ReportType {
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Excavation => "excavation",
            ReportType::ArtifactAnalysis => "artifact analysis",
            ReportType::Research => "research",
            ReportType::SiteSurvey => "site survey",
        }
    }
}

/// 报告章节；声明顺序即成文顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Abstract,
    Introduction,
    Methodology,
    Results,
    Discussion,
    Conclusion,
}

impl SectionKind {
    pub fn all() -> Vec<SectionKind> {
        vec![
            SectionKind::Abstract,
            SectionKind::Introduction,
            SectionKind::Methodology,
            SectionKind::Results,
            SectionKind::Discussion,
            SectionKind::Conclusion,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Abstract => "abstract",
            SectionKind::Introduction => "introduction",
            SectionKind::Methodology => "methodology",
            SectionKind::Results => "results",
            SectionKind::Discussion => "discussion",
            SectionKind::Conclusion => "conclusion",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Abstract => "Abstract",
            SectionKind::Introduction => "Introduction",
            SectionKind::Methodology => "Methodology",
            SectionKind::Results => "Results",
            SectionKind::Discussion => "Discussion",
            SectionKind::Conclusion => "Conclusion",
        }
    }

    /// 章节模板，`{name}` 为待填事实
    pub fn template(&self) -> &'static str {
        match self {
            SectionKind::Abstract => "This {report_type} report presents {title}. {summary}",
            SectionKind::Introduction => {
                "The investigation at {site_name} was undertaken to {objectives}."
            }
            SectionKind::Methodology => "Fieldwork and analysis followed a {methodology} methodology.",
            SectionKind::Results => "{findings}",
            SectionKind::Discussion => "{interpretation}",
            SectionKind::Conclusion => "{conclusions}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Harvard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub authors: Vec<String>,
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub publisher: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub authors: Vec<String>,
    /// 缺省为全部六个章节
    #[serde(default)]
    pub sections: Option<Vec<SectionKind>>,
    /// 模板事实；非字符串值按 JSON 文本填入
    #[serde(default)]
    pub facts: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub citation_style: CitationStyle,
    #[serde(default = "default_formats")]
    pub output_formats: Vec<OutputFormat>,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Markdown]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub section: SectionKind,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub quality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSection {
    pub section: SectionKind,
    pub missing_facts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub format: OutputFormat,
    pub path: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_id: String,
    pub title: String,
    pub report_type: ReportType,
    pub authors: Vec<String>,
    pub sections: Vec<ReportSection>,
    pub skipped_sections: Vec<SkippedSection>,
    pub full_text: String,
    pub citations: Vec<String>,
    pub outputs: Vec<OutputFile>,
    pub data_sources: Vec<String>,
    pub quality_score: f64,
    pub completeness_score: f64,
    pub accuracy_score: f64,
}
