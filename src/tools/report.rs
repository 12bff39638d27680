//! 报告工具：章节写作、引文格式化、格式转换
//!
//! writing_assistant 用 `{fact}` 占位符模板成文，缺少的事实原样报告（missing_facts），
//! 由 Agent 决定跳过该章节。format_converter 只给出目标路径与大小，不落盘。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::report::OutputFile;
use crate::models::{CitationStyle, OutputFormat, Reference, SectionKind};
use crate::tools::schema::{parameters_schema, parse_args};
use crate::tools::Tool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDraft {
    pub section: SectionKind,
    pub content: String,
    pub word_count: usize,
    pub missing_facts: Vec<String>,
    pub quality: f64,
}

fn fact_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(fact_text).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        other => Some(other.to_string()),
    }
}

/// `{fact}` 占位符，首次使用时编译
static PLACEHOLDER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// 填充模板；返回 (正文, 缺失的事实名)
pub fn fill_template(
    template: &str,
    facts: &BTreeMap<String, Value>,
) -> Result<(String, Vec<String>), String> {
    let placeholder = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}"))
        .as_ref()
        .map_err(|e| e.to_string())?;
    let mut missing: Vec<String> = Vec::new();
    let content = placeholder.replace_all(template, |caps: &regex::Captures| {
        let key = &caps[1];
        match facts.get(key).and_then(fact_text) {
            Some(text) => text,
            None => {
                if !missing.iter().any(|m| m == key) {
                    missing.push(key.to_string());
                }
                String::new()
            }
        }
    });
    Ok((content.trim().to_string(), missing))
}

/// 章节质量：缺事实为 0，否则随篇幅从 0.75 增至 0.95
pub fn section_quality(word_count: usize, missing: bool) -> f64 {
    if missing {
        0.0
    } else {
        0.75 + 0.2 * (word_count as f64 / 100.0).min(1.0)
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WritingAssistantArgs {
    pub section: SectionKind,
    /// 事实名 -> 值
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
}

pub struct WritingAssistantTool;

#[async_trait]
impl Tool for WritingAssistantTool {
    fn name(&self) -> &str {
        "writing_assistant"
    }

    fn description(&self) -> &str {
        "Write one report section by filling its template from structured facts."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<WritingAssistantArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: WritingAssistantArgs = parse_args(self.name(), args)?;
        let (content, missing_facts) = fill_template(args.section.template(), &args.facts)?;
        let word_count = content.split_whitespace().count();
        let draft = SectionDraft {
            section: args.section,
            quality: section_quality(word_count, !missing_facts.is_empty()),
            content,
            word_count,
            missing_facts,
        };
        serde_json::to_value(draft).map_err(|e| e.to_string())
    }
}

fn join_authors(authors: &[String]) -> String {
    match authors {
        [] => "Anonymous".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} & {}", init.join(", "), last),
    }
}

/// 按引文格式输出一条引用
pub fn format_citation(reference: &Reference, style: CitationStyle) -> String {
    let authors = join_authors(&reference.authors);
    let lead = authors.trim_end_matches('.');
    let publisher = reference.publisher.as_deref().unwrap_or("").trim();
    let tail = if publisher.is_empty() {
        String::new()
    } else {
        format!(" {}.", publisher)
    };
    match style {
        CitationStyle::Apa => format!("{} ({}). {}.{}", authors, reference.year, reference.title, tail),
        CitationStyle::Mla => {
            if publisher.is_empty() {
                format!("{}. \"{}.\" {}.", lead, reference.title, reference.year)
            } else {
                format!("{}. \"{}.\" {}, {}.", lead, reference.title, publisher, reference.year)
            }
        }
        CitationStyle::Chicago => format!("{}. {}. {}.{}", lead, reference.year, reference.title, tail),
        CitationStyle::Harvard => format!("{} ({}) {}.{}", authors, reference.year, reference.title, tail),
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CitationManagerArgs {
    pub references: Vec<Reference>,
    #[serde(default)]
    pub style: CitationStyle,
}

pub struct CitationManagerTool;

#[async_trait]
impl Tool for CitationManagerTool {
    fn name(&self) -> &str {
        "citation_manager"
    }

    fn description(&self) -> &str {
        "Format references in APA, MLA, Chicago or Harvard style."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<CitationManagerArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: CitationManagerArgs = parse_args(self.name(), args)?;
        let citations: Vec<String> = args
            .references
            .iter()
            .map(|r| format_citation(r, args.style))
            .collect();
        Ok(serde_json::json!({ "style": args.style, "citations": citations }))
    }
}

/// Markdown 正文转简单 HTML：标题行转 h1/h2，其余非空行为段落
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = String::from("<html><body>\n");
    for line in markdown.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(h) = line.strip_prefix("## ") {
            html.push_str(&format!("<h2>{}</h2>\n", h));
        } else if let Some(h) = line.strip_prefix("# ") {
            html.push_str(&format!("<h1>{}</h1>\n", h));
        } else {
            html.push_str(&format!("<p>{}</p>\n", line));
        }
    }
    html.push_str("</body></html>\n");
    html
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FormatConverterArgs {
    pub report_id: String,
    /// Markdown 正文
    pub content: String,
    pub formats: Vec<OutputFormat>,
}

pub struct FormatConverterTool;

#[async_trait]
impl Tool for FormatConverterTool {
    fn name(&self) -> &str {
        "format_converter"
    }

    fn description(&self) -> &str {
        "Convert a markdown report to the requested output formats and return their paths."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<FormatConverterArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let args: FormatConverterArgs = parse_args(self.name(), args)?;
        if args.formats.is_empty() {
            return Err("no output formats requested".to_string());
        }
        let outputs: Vec<OutputFile> = args
            .formats
            .iter()
            .map(|format| OutputFile {
                format: *format,
                path: format!("reports/{}.{}", args.report_id, format.extension()),
                size_bytes: match format {
                    OutputFormat::Html => markdown_to_html(&args.content).len(),
                    _ => args.content.len(),
                },
            })
            .collect();
        serde_json::to_value(outputs).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_fill_template_reports_missing() {
        let (content, missing) = fill_template(
            "At {site_name} we found {findings}.",
            &facts(&[("site_name", json!("Tell Brak"))]),
        )
        .unwrap();
        assert_eq!(missing, vec!["findings".to_string()]);
        assert!(content.starts_with("At Tell Brak"));
    }

    #[test]
    fn test_fill_template_joins_lists_and_numbers() {
        let (content, missing) = fill_template(
            "{findings} over {days} days",
            &facts(&[("findings", json!(["pits", "a hearth"])), ("days", json!(12))]),
        )
        .unwrap();
        assert!(missing.is_empty());
        assert_eq!(content, "pits; a hearth over 12 days");
    }

    #[test]
    fn test_placeholder_pattern_compiled_once() {
        let first = fill_template("{a}", &facts(&[("a", json!("x"))])).unwrap();
        let second = fill_template("{b}", &facts(&[("b", json!("y"))])).unwrap();
        assert_eq!((first.0.as_str(), second.0.as_str()), ("x", "y"));
        assert!(matches!(PLACEHOLDER.get(), Some(Ok(_))));
    }

    #[test]
    fn test_citation_styles() {
        let reference = Reference {
            authors: vec!["Smith, J.".into(), "Lee, K.".into()],
            title: "Harbours of the Aegean".into(),
            year: 2019,
            publisher: Some("Aegean Press".into()),
        };
        assert_eq!(
            format_citation(&reference, CitationStyle::Apa),
            "Smith, J. & Lee, K. (2019). Harbours of the Aegean. Aegean Press."
        );
        assert_eq!(
            format_citation(&reference, CitationStyle::Mla),
            "Smith, J. & Lee, K. \"Harbours of the Aegean.\" Aegean Press, 2019."
        );
        assert!(format_citation(&reference, CitationStyle::Harvard).starts_with("Smith, J. & Lee, K. (2019) Harbours"));
    }

    #[tokio::test]
    async fn test_format_converter_paths() {
        let out = FormatConverterTool
            .execute(json!({"report_id": "r1", "content": "# T\n\nbody", "formats": ["markdown", "pdf"]}))
            .await
            .unwrap();
        let outputs: Vec<OutputFile> = serde_json::from_value(out).unwrap();
        assert_eq!(outputs[0].path, "reports/r1.md");
        assert_eq!(outputs[1].path, "reports/r1.pdf");
    }

    #[test]
    fn test_quality_grows_with_length() {
        assert_eq!(section_quality(10, true), 0.0);
        assert!(section_quality(200, false) > section_quality(10, false));
        assert!((section_quality(200, false) - 0.95).abs() < 1e-12);
    }
}
