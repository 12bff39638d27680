//! 工具箱：Tool trait、注册表、执行器与各领域工具

pub mod artifact;
pub mod civilization;
pub mod dating;
pub mod excavation;
pub mod executor;
pub mod registry;
pub mod report;
pub mod research;
pub mod schema;

pub use artifact::{CulturalContextTool, DatingEstimationTool, ImageAnalysisTool, MaterialIdentificationTool};
pub use civilization::{DatabaseQueryTool, MapVisualizationTool, TimelineBuilderTool};
pub use dating::{C14CalculationTool, CalibrationTool};
pub use excavation::{GridPlanningTool, ResourceCalculatorTool, RiskAssessmentTool};
pub use executor::{ToolExecutor, ToolInvoker};
pub use registry::{Tool, ToolRegistry, ToolSchema};
pub use report::{CitationManagerTool, FormatConverterTool, WritingAssistantTool};
pub use research::{HypothesisGeneratorTool, LiteratureSearchTool, StatisticalAnalysisTool};
pub use schema::{parameters_schema, parse_args};
