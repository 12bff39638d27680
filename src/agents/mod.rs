//! 六个领域 Agent
//!
//! 每个 Agent 只实现 DomainAgent（工具列表 + 单次尝试的领域逻辑），缓存、记忆、重试与超时由 BaseAgent 负责。

pub mod artifact;
pub mod civilization;
pub mod dating;
pub mod excavation;
pub mod report;
pub mod research;

use std::sync::Arc;

pub use artifact::ArtifactAnalysisAgent;
pub use civilization::CivilizationResearchAgent;
pub use dating::CarbonDatingAgent;
pub use excavation::ExcavationPlanningAgent;
pub use report::ReportGenerationAgent;
pub use research::ResearchAssistantAgent;

use crate::agent::{AgentConfig, AgentType, BaseAgent, DomainAgent};
use crate::config::AppConfig;

/// 按类型构建内置 Agent 的领域逻辑
pub fn domain_for(agent_type: AgentType) -> Arc<dyn DomainAgent> {
    match agent_type {
        AgentType::ArtifactAnalysis => Arc::new(ArtifactAnalysisAgent),
        AgentType::CarbonDating => Arc::new(CarbonDatingAgent),
        AgentType::CivilizationResearch => Arc::new(CivilizationResearchAgent),
        AgentType::ExcavationPlanning => Arc::new(ExcavationPlanningAgent),
        AgentType::ReportGeneration => Arc::new(ReportGenerationAgent),
        AgentType::ResearchAssistant => Arc::new(ResearchAssistantAgent),
    }
}

/// 用应用配置构建一个内置 Agent
pub fn build_agent(agent_type: AgentType, cfg: &AppConfig) -> BaseAgent {
    let domain = domain_for(agent_type);
    let config = AgentConfig::from_app_config(cfg, domain.name());
    BaseAgent::from_arc(config, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_agents_match_their_type() {
        let cfg = AppConfig::default();
        for agent_type in AgentType::all() {
            let agent = build_agent(agent_type, &cfg);
            assert_eq!(agent.agent_type(), agent_type.as_str());
            assert!(!agent.available_tools().is_empty());
            assert_eq!(agent.config().agent_name, agent.name());
        }
    }
}
