use crate::utils::error::DiagnosisError;
use crate::Result;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// 单张图像最大字节数
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// 单边最大像素
const MAX_DIMENSION: u32 = 8192;

pub struct ImageLoader;

impl ImageLoader {
    /// 从内存字节加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(DiagnosisError::InvalidInput("Empty image data".to_string()));
        }

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DiagnosisError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(DiagnosisError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        let image = image::load_from_memory(bytes)?;
        Self::validate_dimensions(&image)?;

        Ok(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Gif
                | ImageFormat::Tiff
                | ImageFormat::WebP
        )
    }

    /// 验证图像尺寸
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(DiagnosisError::InvalidInput(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(DiagnosisError::InvalidInput(format!(
                "Image too large: {}x{}, maximum {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(())
    }

    /// 清洗客户端提供的文件名，只保留 `[A-Za-z0-9_.-]`，
    /// 路径分隔符与空白合并为 `_`，去掉首尾的 `.` 与 `_`。
    /// 结果可能为空字符串。
    pub fn sanitize_filename(name: &str) -> String {
        let spaced: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
            .collect();

        let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

        let kept: String = joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .collect();

        kept.trim_matches(|c| c == '.' || c == '_').to_string()
    }
}
