pub mod config;
pub mod diagnosis;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use diagnosis::Prediction;
pub use utils::error::DiagnosisError;

pub type Result<T> = std::result::Result<T, DiagnosisError>;
