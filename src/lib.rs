// Library exports for depth-analyzer

pub mod error;

pub mod config; // Configuration management

pub mod depth; // Order book depth analysis

pub use config::{AnalyzerConfig, SensitivityConfig, SensitivityLevel};
pub use depth::{analyze_snapshot, AnalysisResult, AnalyzerRegistry, DepthAnalyzer, DepthSnapshot};
pub use error::{AnalyzerError, Result};
