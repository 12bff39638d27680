//! archaeo - 考古研究工作流命令行
//!
//! 用法：`archaeo [artifact|excavation|research] [payload.json]`
//! 加载配置与日志、构建带内存缓存的编排器，运行所选的预定义工作流，并以 JSON 打印工作流报告。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::{json, Value};

use archaeo::cache::InMemoryCache;
use archaeo::config::load_config;
use archaeo::workflow::{
    artifact_analysis_workflow, excavation_planning_workflow, research_workflow, Workflow,
};
use archaeo::Orchestrator;

fn sample_payload(kind: &str) -> Value {
    match kind {
        "excavation" => json!({
            "site_name": "Tell Brak north mound",
            "width_m": 30.0,
            "length_m": 20.0,
            "excavation_method": "grid",
            "site_conditions": {"waterlogged": false, "urban": false, "protected_site": true},
        }),
        "research" => json!({
            "research_query": "bronze age trade networks in the eastern mediterranean",
            "research_context": {
                "observations": ["copper ingots recovered near the harbour"],
                "data": {
                    "depth_m": [0.2, 0.4, 0.6, 0.8, 1.0],
                    "sherd_count": [14.0, 18.0, 21.0, 27.0, 33.0],
                },
            },
        }),
        _ => json!({
            "name": "Painted amphora",
            "material": "ceramic",
            "artifact_type": "vessel",
            "period": "Classical Greek",
            "culture": "Greek",
            "image_urls": ["https://example.org/amphora.jpg"],
            "dating_sample": {"c14_ratio": 0.72, "sample_type": "charcoal", "laboratory": "Oxford"},
            "civilization_context": {
                "name": "Ancient Greece",
                "time_period": {"start_year": -800, "end_year": -146},
                "region": "Aegean",
            },
        }),
    }
}

fn build_workflow(kind: &str, payload: &Value) -> anyhow::Result<Workflow> {
    let workflow = match kind {
        "artifact" => artifact_analysis_workflow(payload)?,
        "excavation" => excavation_planning_workflow(payload)?,
        "research" => {
            let query = payload
                .get("research_query")
                .and_then(Value::as_str)
                .context("research payload needs a research_query string")?;
            let context = payload.get("research_context").cloned().unwrap_or_else(|| json!({}));
            research_workflow(query, &context)?
        }
        other => bail!("unknown workflow '{}', expected artifact, excavation or research", other),
    };
    Ok(workflow)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    archaeo::observability::init("info");

    let mut args = std::env::args().skip(1);
    let kind = args.next().unwrap_or_else(|| "artifact".to_string());
    let payload = match args.next().map(PathBuf::from) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read payload {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Payload {} is not valid JSON", path.display()))?
        }
        None => sample_payload(&kind),
    };

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });
    let orchestrator = Orchestrator::new(&cfg, Some(Arc::new(InMemoryCache::new())));

    let workflow = build_workflow(&kind, &payload).context("Failed to build workflow")?;
    let report = orchestrator.run_workflow(&workflow).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialise workflow report")?
    );
    Ok(())
}
