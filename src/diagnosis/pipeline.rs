use crate::{
    config::OutputActivation,
    diagnosis::{prediction::Prediction, storage::UploadStorage},
    image::{ImageLoader, ImagePreprocessor},
    models::ImageClassifier,
    utils::error::DiagnosisError,
    Config, Result,
};
use std::sync::Arc;
use std::time::Instant;

/// 分类流水线：暂存上传文件 -> 解码 -> 预处理 -> 推理 -> 标签映射 -> 删除暂存文件
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    storage: UploadStorage,
    preprocessor: ImagePreprocessor,
    labels: Arc<[String]>,
    activation: OutputActivation,
}

impl ClassificationPipeline {
    pub fn new(config: &Config) -> Self {
        let classifier_config = &config.classifier_config;
        Self {
            storage: UploadStorage::new(&config.upload_dir),
            preprocessor: ImagePreprocessor::new(classifier_config),
            labels: classifier_config.labels.clone().into(),
            activation: classifier_config.activation,
        }
    }

    /// 对一次上传执行分类。暂存、解码与推理都在阻塞线程池中完成，
    /// 无论成功与否暂存文件都会被删除。
    pub async fn classify_upload<B>(
        &self,
        classifier: Arc<dyn ImageClassifier>,
        file_name: &str,
        bytes: B,
    ) -> Result<Prediction>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let start_time = Instant::now();

        let storage = self.storage.clone();
        let file_name = file_name.to_string();
        let preprocessor = self.preprocessor.clone();
        let labels = Arc::clone(&self.labels);
        let activation = self.activation;

        let result = tokio::task::spawn_blocking(move || -> Result<Prediction> {
            let staged = storage.stage_temp(&file_name, bytes.as_ref())?;

            let outcome = ImageLoader::from_path(staged.path())
                .and_then(|image| preprocessor.preprocess(&image))
                .map_err(as_processing_error)
                .and_then(|tensor| classifier.predict(&tensor))
                .and_then(|raw| Prediction::from_output(raw, &labels, activation));

            let staged_path = staged.path().to_path_buf();
            if let Err(e) = staged.close() {
                tracing::warn!("Failed to remove staged upload {}: {}", staged_path.display(), e);
            }

            outcome
        })
        .await
        .map_err(|e| DiagnosisError::Internal(format!("Classification task failed: {}", e)))
        .and_then(|r| r);

        match &result {
            Ok(prediction) => tracing::info!(
                "Classification completed: label={}, confidence={:.4}, time={:.3}s",
                prediction.label,
                prediction.confidence,
                start_time.elapsed().as_secs_f32()
            ),
            Err(e) => tracing::error!("Error during classification: {}", e),
        }

        result
    }
}

/// 解码与预处理阶段的失败一律按服务端错误返回
fn as_processing_error(err: DiagnosisError) -> DiagnosisError {
    if err.status_code().is_client_error() {
        DiagnosisError::ImageProcessing(err.to_string())
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use ndarray::Array4;
    use std::io::Cursor;

    struct Echo(Vec<f32>);

    impl ImageClassifier for Echo {
        fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
            assert_eq!(input.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn png() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(32, 32, Rgb([200u8, 120, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn dir_is_empty(path: &std::path::Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn classifies_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ClassificationPipeline::new(&Config::with_upload_dir(dir.path()));

        let prediction = pipeline
            .classify_upload(Arc::new(Echo(vec![0.1, 0.8, 0.1])), "lesion.png", png())
            .await
            .unwrap();

        assert_eq!(prediction.label, "Melanoma");
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn cleans_up_when_decoding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ClassificationPipeline::new(&Config::with_upload_dir(dir.path()));

        let result = pipeline
            .classify_upload(Arc::new(Echo(vec![1.0, 0.0, 0.0])), "bad.png", &b"not an image"[..])
            .await;

        assert!(matches!(result, Err(DiagnosisError::ImageDecode(_))));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn empty_upload_is_a_processing_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ClassificationPipeline::new(&Config::with_upload_dir(dir.path()));

        let result = pipeline
            .classify_upload(Arc::new(Echo(vec![1.0, 0.0, 0.0])), "empty.png", Vec::new())
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DiagnosisError::ImageProcessing(_)));
        assert!(err.status_code().is_server_error());
        assert!(dir_is_empty(dir.path()));
    }
}
