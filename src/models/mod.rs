pub mod classifier;
pub mod manager;

pub use classifier::{ImageClassifier, OnnxClassifier};
pub use manager::{ClassifierLoader, ModelManager, ModelStats, OnnxLoader};
