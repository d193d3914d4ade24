use crate::config::ClassifierConfig;
use crate::models::{ImageClassifier, OnnxClassifier};
use crate::{Config, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// 分类器加载入口，便于替换为其他后端
pub trait ClassifierLoader: Send + Sync {
    fn load(&self, config: &Config) -> Result<Arc<dyn ImageClassifier>>;
}

/// 从 `config.model_path` 加载ONNX模型
pub struct OnnxLoader;

impl ClassifierLoader for OnnxLoader {
    fn load(&self, config: &Config) -> Result<Arc<dyn ImageClassifier>> {
        Ok(Arc::new(OnnxClassifier::new(config)?))
    }
}

/// 模型管理器：持有当前已加载的分类器，支持启动时加载、按需加载和显式重载
pub struct ModelManager {
    config: Config,
    loader: Box<dyn ClassifierLoader>,
    classifier: RwLock<Option<Arc<dyn ImageClassifier>>>,
    // 串行化加载，避免并发请求重复构建会话
    load_guard: Mutex<()>,
}

impl ModelManager {
    pub fn new(config: Config) -> Self {
        Self::with_loader(config, Box::new(OnnxLoader))
    }

    pub fn with_loader(config: Config, loader: Box<dyn ClassifierLoader>) -> Self {
        Self {
            config,
            loader,
            classifier: RwLock::new(None),
            load_guard: Mutex::new(()),
        }
    }

    /// 启动时尝试加载，失败只记录日志
    pub fn init(&self) -> bool {
        tracing::info!("Initializing model manager...");
        match self.load() {
            Ok(classifier) => {
                tracing::info!("Model '{}' loaded successfully", classifier.name());
                true
            }
            Err(e) => {
                tracing::warn!("Error loading model: {}", e);
                false
            }
        }
    }

    /// 重新加载模型并替换当前分类器。
    /// 加载失败时保留原有分类器。
    pub fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        let _guard = self.load_guard.lock();
        let classifier = self.loader.load(&self.config)?;
        *self.classifier.write() = Some(Arc::clone(&classifier));
        Ok(classifier)
    }

    /// 已加载则直接返回，否则加载一次
    pub fn ensure_loaded(&self) -> Result<Arc<dyn ImageClassifier>> {
        if let Some(classifier) = self.classifier() {
            return Ok(classifier);
        }

        let _guard = self.load_guard.lock();
        // 等锁期间可能已被其他请求加载
        if let Some(classifier) = self.classifier() {
            return Ok(classifier);
        }

        tracing::info!("Model not loaded yet, loading on demand");
        let classifier = self.loader.load(&self.config)?;
        *self.classifier.write() = Some(Arc::clone(&classifier));
        Ok(classifier)
    }

    pub fn classifier(&self) -> Option<Arc<dyn ImageClassifier>> {
        self.classifier.read().as_ref().map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.read().is_some()
    }

    /// 获取模型统计信息
    pub fn stats(&self) -> ModelStats {
        let classifier = self.classifier();
        ModelStats {
            model_loaded: classifier.is_some(),
            model_name: classifier.map(|c| c.name().to_string()),
            model_path: self.config.model_path.display().to_string(),
            classifier: self.config.classifier_config.clone(),
            intra_threads: self.config.onnx_config.intra_threads,
            optimization_level: self.config.onnx_config.optimization_level,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub model_loaded: bool,
    pub model_name: Option<String>,
    pub model_path: String,
    pub classifier: ClassifierConfig,
    pub intra_threads: usize,
    pub optimization_level: i32,
}
