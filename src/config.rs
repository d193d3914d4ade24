use crate::utils::error::DiagnosisError;
use crate::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

/// 默认分类标签（与训练时的类别顺序一致）
pub const DEFAULT_LABELS: [&str; 3] = ["Eczema", "Melanoma", "Psoriasis"];

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// ONNX模型文件路径
    pub model_path: PathBuf,

    /// 上传文件目录
    pub upload_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,

    /// 分类器配置
    pub classifier_config: ClassifierConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifierConfig {
    /// 类别标签，顺序对应模型输出
    pub labels: Vec<String>,

    /// 输入图像边长（正方形）
    pub image_size: u32,

    pub normalization: Normalization,

    pub layout: TensorLayout,

    pub activation: OutputActivation,
}

/// 像素归一化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// x / 255，范围 [0, 1]
    Unit,
    /// x / 127.5 - 1，范围 [-1, 1]
    MobilenetV2,
}

/// 输入张量布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

/// 模型输出的后处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// 输出不是概率分布时才做softmax
    Auto,
    Softmax,
    Identity,
}

impl FromStr for Normalization {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" => Ok(Normalization::Unit),
            "mobilenet_v2" | "mobilenetv2" => Ok(Normalization::MobilenetV2),
            other => Err(DiagnosisError::Config(format!(
                "Unknown normalization '{}', expected 'unit' or 'mobilenet_v2'",
                other
            ))),
        }
    }
}

impl FromStr for TensorLayout {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(DiagnosisError::Config(format!(
                "Unknown tensor layout '{}', expected 'nhwc' or 'nchw'",
                other
            ))),
        }
    }
}

impl FromStr for OutputActivation {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(OutputActivation::Auto),
            "softmax" => Ok(OutputActivation::Softmax),
            "identity" | "none" => Ok(OutputActivation::Identity),
            other => Err(DiagnosisError::Config(format!(
                "Unknown output activation '{}', expected 'auto', 'softmax' or 'identity'",
                other
            ))),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            image_size: 224,
            normalization: Normalization::Unit,
            layout: TensorLayout::Nhwc,
            activation: OutputActivation::Auto,
        }
    }
}

impl ClassifierConfig {
    /// 解析逗号分隔的标签列表
    pub fn parse_labels(raw: &str) -> Result<Vec<String>> {
        let labels: Vec<String> = raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        if labels.len() < 2 {
            return Err(DiagnosisError::Config(format!(
                "At least two class labels are required, got {}",
                labels.len()
            )));
        }

        Ok(labels)
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_path: String,
        upload_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
        classifier_config: ClassifierConfig,
    ) -> Result<Self> {
        if classifier_config.image_size == 0 {
            return Err(DiagnosisError::Config("Image size must be positive".to_string()));
        }

        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 10 * 1024 * 1024, // 10MB
        };

        Ok(Self {
            bind_addr,
            model_path: PathBuf::from(model_path),
            upload_dir: PathBuf::from(upload_dir),
            workers,
            dev_mode,
            onnx_config,
            server_config,
            classifier_config,
        })
    }

    /// 测试及嵌入场景使用的默认配置
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            model_path: PathBuf::from("models/skin_model.onnx"),
            upload_dir: upload_dir.into(),
            workers: 1,
            dev_mode: false,
            onnx_config: OnnxConfig {
                intra_threads: 1,
                optimization_level: 3,
            },
            server_config: ServerConfig {
                request_timeout: 60,
                max_request_size: 10 * 1024 * 1024,
            },
            classifier_config: ClassifierConfig::default(),
        }
    }

    /// 确保上传目录存在
    pub fn ensure_upload_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        Ok(())
    }
}
