//! 报告生成 Agent
//!
//! 按规范顺序逐章调用 writing_assistant；缺事实的章节跳过并记录。引文与格式转换是独立的工具调用，
//! 其结果（引文文本、输出路径）附在生成记录上。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::agent::{mean, AgentOutput, AgentRequest, AgentType, DomainAgent};
use crate::cache::content_key;
use crate::core::AgentError;
use crate::models::report::OutputFile;
use crate::models::{
    extract, GeneratedReport, ReportData, ReportSection, SectionKind, SkippedSection,
};
use crate::tools::report::{CitationManagerArgs, FormatConverterArgs, SectionDraft, WritingAssistantArgs};
use crate::tools::{CitationManagerTool, FormatConverterTool, Tool, ToolInvoker, WritingAssistantTool};

pub struct ReportGenerationAgent;

impl ReportGenerationAgent {
    pub const NAME: &'static str = "ReportGenerationAgent";
}

#[derive(Deserialize)]
struct Citations {
    citations: Vec<String>,
}

/// 去重并排成规范顺序
fn requested_sections(data: &ReportData) -> Vec<SectionKind> {
    let mut sections = data.sections.clone().unwrap_or_else(SectionKind::all);
    sections.sort();
    sections.dedup();
    sections
}

/// 显式事实优先，其次是报告自身的标题与类型，最后是上游步骤输出
fn facts_with_defaults(data: &ReportData, request: &AgentRequest) -> BTreeMap<String, Value> {
    let mut facts = data.facts.clone();
    facts
        .entry("title".to_string())
        .or_insert_with(|| json!(data.title));
    facts
        .entry("report_type".to_string())
        .or_insert_with(|| json!(data.report_type.label()));
    for (id, output) in dependency_outputs(request).into_iter().flatten() {
        for (name, value) in upstream_facts(id, output) {
            let entry = facts.entry(name.to_string()).or_insert(Value::Null);
            if entry.is_null() {
                *entry = value;
            }
        }
    }
    facts
}

fn dependency_outputs(request: &AgentRequest) -> Option<&Map<String, Value>> {
    request
        .context
        .get("dependency_outputs")
        .and_then(Value::as_object)
}

/// 工作流上游步骤的 id
fn data_sources(request: &AgentRequest) -> Vec<String> {
    dependency_outputs(request)
        .map(|outputs| outputs.keys().cloned().collect())
        .unwrap_or_default()
}

fn strings_of(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// 对象数组中每项的某个字符串字段
fn pluck(value: &Value, field: &str, key: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(key).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 从上游步骤输出推导模板事实（按步骤 id 识别来源）
fn upstream_facts(id: &str, data: &Value) -> Vec<(&'static str, Value)> {
    let mut facts = Vec::new();
    match id {
        "excavation_planning" => {
            facts.push(("objectives", json!(strings_of(data, "objectives"))));
            if let Some(methodology) = data.get("methodology") {
                facts.push(("methodology", methodology.clone()));
            }
            let findings = [
                data.get("total_units")
                    .zip(data.get("expected_duration"))
                    .map(|(units, days)| format!("{} grid units planned over {} days", units, days)),
                data.get("budget_estimate")
                    .and_then(Value::as_f64)
                    .map(|b| format!("estimated budget {:.0}", b)),
                data.get("overall_risk_level")
                    .and_then(Value::as_str)
                    .map(|r| format!("overall risk level {}", r)),
            ];
            facts.push(("findings", json!(findings.into_iter().flatten().collect::<Vec<_>>())));
            facts.push(("conclusions", json!(strings_of(data, "mitigation_strategies"))));
        }
        "research_assistant" => {
            facts.push(("findings", json!(pluck(data, "literature", "title"))));
            facts.push(("interpretation", json!(pluck(data, "hypotheses", "hypothesis"))));
            facts.push(("conclusions", json!(pluck(data, "hypotheses", "testability"))));
        }
        _ => {
            facts.push(("findings", json!(strings_of(data, "key_findings"))));
            facts.push(("conclusions", json!(strings_of(data, "recommendations"))));
        }
    }
    facts
}

fn full_text(title: &str, sections: &[ReportSection], citations: &[String]) -> String {
    let mut text = format!("# {}\n", title);
    for section in sections {
        text.push_str(&format!("\n## {}\n\n{}\n", section.title, section.content));
    }
    if !citations.is_empty() {
        text.push_str("\n## References\n\n");
        for citation in citations {
            text.push_str(citation);
            text.push('\n');
        }
    }
    text
}

#[async_trait]
impl DomainAgent for ReportGenerationAgent {
    fn agent_type(&self) -> &str {
        AgentType::ReportGeneration.as_str()
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(WritingAssistantTool),
            Arc::new(CitationManagerTool),
            Arc::new(FormatConverterTool),
        ]
    }

    /// 上游输出参与成文，因此也参与缓存键
    fn cache_key(&self, request: &AgentRequest) -> String {
        let material = json!({
            "payload": request.payload,
            "dependency_outputs": dependency_outputs(request),
        });
        content_key(self.agent_type(), &material)
    }

    fn capabilities(&self) -> Vec<String> {
        ["section_writing", "citation_formatting", "format_conversion"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError> {
        let data: ReportData = extract(&request.payload, "report_data")?;
        if data.title.trim().is_empty() {
            return Err(AgentError::validation("report title must not be empty"));
        }
        let requested = requested_sections(&data);
        if requested.is_empty() {
            return Err(AgentError::validation("no report sections requested"));
        }
        if data.output_formats.is_empty() {
            return Err(AgentError::validation("no output formats requested"));
        }

        let facts = facts_with_defaults(&data, request);
        let mut sections = Vec::new();
        let mut skipped = Vec::new();
        for kind in &requested {
            let draft: SectionDraft = invoker
                .call_typed(
                    "writing_assistant",
                    &WritingAssistantArgs {
                        section: *kind,
                        facts: facts.clone(),
                    },
                )
                .await?;
            if draft.missing_facts.is_empty() {
                sections.push(ReportSection {
                    section: draft.section,
                    title: draft.section.title().to_string(),
                    content: draft.content,
                    word_count: draft.word_count,
                    quality: draft.quality,
                });
            } else {
                tracing::debug!(
                    section = kind.as_str(),
                    missing = ?draft.missing_facts,
                    "Section skipped"
                );
                skipped.push(SkippedSection {
                    section: draft.section,
                    missing_facts: draft.missing_facts,
                });
            }
        }

        let citations = if data.references.is_empty() {
            Vec::new()
        } else {
            let formatted: Citations = invoker
                .call_typed(
                    "citation_manager",
                    &CitationManagerArgs {
                        references: data.references.clone(),
                        style: data.citation_style,
                    },
                )
                .await?;
            formatted.citations
        };

        let text = full_text(&data.title, &sections, &citations);
        let outputs: Vec<OutputFile> = invoker
            .call_typed(
                "format_converter",
                &FormatConverterArgs {
                    report_id: data.id.clone(),
                    content: text.clone(),
                    formats: data.output_formats.clone(),
                },
            )
            .await?;

        let completeness = sections.len() as f64 / requested.len() as f64;
        let section_quality: Vec<f64> = sections.iter().map(|s| s.quality).collect();
        let quality = mean(&section_quality) * completeness;
        let accuracy = 0.9 * completeness;

        let report = GeneratedReport {
            report_id: data.id.clone(),
            title: data.title.clone(),
            report_type: data.report_type,
            authors: data.authors.clone(),
            sections,
            skipped_sections: skipped,
            full_text: text,
            citations,
            outputs,
            data_sources: data_sources(request),
            quality_score: quality,
            completeness_score: completeness,
            accuracy_score: accuracy,
        };

        Ok(AgentOutput::new(
            serde_json::to_value(&report)?,
            accuracy,
            quality,
            completeness,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, BaseAgent};

    fn agent() -> BaseAgent {
        BaseAgent::new(AgentConfig::new(ReportGenerationAgent::NAME), ReportGenerationAgent)
    }

    fn full_facts() -> Value {
        json!({
            "summary": "Three seasons of work are summarised.",
            "site_name": "Tell Brak",
            "objectives": "date the northern mound",
            "methodology": "single-context",
            "findings": ["a kiln", "stamped jar handles"],
            "interpretation": "The kiln points to local production.",
            "conclusions": "Further seasons are justified.",
        })
    }

    #[tokio::test]
    async fn test_sections_in_canonical_order() {
        let request = AgentRequest::new(
            "report_generation",
            json!({"report_data": {
                "title": "Tell Brak 2024",
                "sections": ["conclusion", "results", "abstract"],
                "facts": full_facts(),
                "output_formats": ["markdown", "html"],
            }}),
        );
        let response = agent().process(&request).await;
        assert!(response.is_success(), "{:?}", response.error);
        let report: GeneratedReport = serde_json::from_value(response.data).unwrap();
        let order: Vec<SectionKind> = report.sections.iter().map(|s| s.section).collect();
        assert_eq!(
            order,
            vec![SectionKind::Abstract, SectionKind::Results, SectionKind::Conclusion]
        );
        assert!(report.full_text.find("## Abstract") < report.full_text.find("## Conclusion"));
        assert_eq!(report.outputs.len(), 2);
        assert_eq!(report.completeness_score, 1.0);
    }

    #[tokio::test]
    async fn test_missing_facts_skip_section() {
        let request = AgentRequest::new(
            "report_generation",
            json!({"report_data": {
                "title": "Survey notes",
                "facts": {"findings": "Surface scatter of sherds", "summary": "Short survey."},
            }}),
        );
        let response = agent().process(&request).await;
        let report: GeneratedReport = serde_json::from_value(response.data).unwrap();
        assert_eq!(report.sections.len(), 2);
        assert_eq!(report.skipped_sections.len(), 4);
        assert!((response.completeness_score - 2.0 / 6.0).abs() < 1e-12);
        assert!((report.accuracy_score - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_citations_and_data_sources() {
        let request = AgentRequest::new(
            "report_generation",
            json!({"report_data": {
                "title": "Finds report",
                "sections": ["results"],
                "facts": {"findings": "Two bronze pins"},
                "references": [{"authors": ["Smith, J."], "title": "Pins", "year": 2001}],
                "citation_style": "harvard",
            }}),
        )
        .with_context("dependency_outputs", json!({"artifact_analysis": {"overall_confidence": 0.8}}));
        let response = agent().process(&request).await;
        let report: GeneratedReport = serde_json::from_value(response.data).unwrap();
        assert_eq!(report.citations, vec!["Smith, J. (2001) Pins."]);
        assert!(report.full_text.contains("## References"));
        assert_eq!(report.data_sources, vec!["artifact_analysis"]);
        assert_eq!(response.tools_used.len(), 3);
    }
}
