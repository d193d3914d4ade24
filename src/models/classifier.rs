use crate::utils::error::DiagnosisError;
use crate::{Config, Result};
use ndarray::Array4;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::Arc;

/// 图像分类器抽象：输入预处理后的 batch=1 张量，返回第一行原始输出
pub trait ImageClassifier: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>>;

    /// 模型标识，用于日志与 /api/info
    fn name(&self) -> &str;
}

/// ONNX Runtime 分类器
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    name: String,
    input_name: String,
    output_name: String,
}

fn model_load_error(e: impl Display) -> DiagnosisError {
    DiagnosisError::ModelLoad(e.to_string())
}

fn inference_error(e: impl Display) -> DiagnosisError {
    DiagnosisError::Inference(e.to_string())
}

impl OnnxClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = &config.model_path;

        if !model_path.exists() {
            return Err(DiagnosisError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()
            .map_err(model_load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_load_error)?
            .with_intra_threads(config.onnx_config.intra_threads)
            .map_err(model_load_error)?
            .commit_from_file(model_path)
            .map_err(model_load_error)?;

        // 动态发现输入输出名称
        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(DiagnosisError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DiagnosisError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        for (i, input) in session.inputs.iter().enumerate() {
            tracing::debug!("Classification input[{}]: '{}' {:?}", i, input.name, input.input_type);
        }
        tracing::info!(
            "Classification model ready: input='{}', output='{}'",
            input_name,
            output_name
        );

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx-classifier".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            name,
            input_name,
            output_name,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input.clone()).map_err(inference_error)?;

        let (shape, scores) = {
            let mut session = self.session.lock();
            let outputs = session
                .run(inputs![self.input_name.as_str() => input_tensor])
                .map_err(inference_error)?;

            let output = match outputs.get(self.output_name.as_str()) {
                Some(output) => output,
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(DiagnosisError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            };

            let array = output.try_extract_array::<f32>().map_err(inference_error)?;
            (array.shape().to_vec(), array.iter().copied().collect::<Vec<f32>>())
        };

        // 仅支持 [C] 或 [1, C]
        match shape.as_slice() {
            [_] | [1, _] => Ok(scores),
            other => Err(DiagnosisError::Inference(format!(
                "Expected classification output of shape [1, C], got {:?}",
                other
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
