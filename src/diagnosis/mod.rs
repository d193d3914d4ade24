pub mod mock;
pub mod pipeline;
pub mod prediction;
pub mod storage;
pub mod store;
pub mod types;

pub use pipeline::ClassificationPipeline;
pub use prediction::{ClassScore, Prediction};
pub use storage::UploadStorage;
pub use store::DiagnosisStore;
pub use types::{
    AnalysisDetails, Condition, DiagnosisRecord, DiagnosisStatus, HistoryEntry, PatientInfo,
    SymptomValue, Symptoms,
};
