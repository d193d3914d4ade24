use crate::config::{ClassifierConfig, Normalization, TensorLayout};
use crate::utils::error::DiagnosisError;
use crate::Result;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// 分类模型输入预处理：解码后的图像 -> 固定尺寸 -> 归一化 -> 加batch维度
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    size: u32,
    normalization: Normalization,
    layout: TensorLayout,
}

impl ImagePreprocessor {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            size: config.image_size,
            normalization: config.normalization,
            layout: config.layout,
        }
    }

    /// 输出张量形状
    pub fn input_shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, s, s, 3],
            TensorLayout::Nchw => [1, 3, s, s],
        }
    }

    pub fn preprocess(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DiagnosisError::ImageProcessing(
                "Cannot resize an empty image".to_string(),
            ));
        }

        // 与Keras load_img(target_size=...)一致：不保持宽高比，最近邻插值
        let resized = image
            .resize_exact(self.size, self.size, FilterType::Nearest)
            .to_rgb8();

        let mut tensor = Array4::<f32>::zeros(self.input_shape());

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (h, w) = (y as usize, x as usize);
            for c in 0..3 {
                let value = self.normalize(pixel[c]);
                match self.layout {
                    TensorLayout::Nhwc => tensor[[0, h, w, c]] = value,
                    TensorLayout::Nchw => tensor[[0, c, h, w]] = value,
                }
            }
        }

        Ok(tensor)
    }

    #[inline]
    fn normalize(&self, value: u8) -> f32 {
        let v = value as f32;
        match self.normalization {
            Normalization::Unit => v / 255.0,
            Normalization::MobilenetV2 => v / 127.5 - 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(rgb)))
    }

    fn config(normalization: Normalization, layout: TensorLayout) -> ClassifierConfig {
        ClassifierConfig {
            image_size: 4,
            normalization,
            layout,
            ..ClassifierConfig::default()
        }
    }

    #[test]
    fn resizes_to_fixed_nhwc_shape() {
        let pre = ImagePreprocessor::new(&config(Normalization::Unit, TensorLayout::Nhwc));
        let tensor = pre.preprocess(&solid(17, 9, [255, 0, 51])).unwrap();

        assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
        assert!((tensor[[0, 2, 3, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 2, 3, 1]].abs() < 1e-6);
        assert!((tensor[[0, 2, 3, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn unit_scaling_stays_in_range() {
        let pre = ImagePreprocessor::new(&config(Normalization::Unit, TensorLayout::Nhwc));
        let tensor = pre.preprocess(&solid(5, 5, [0, 128, 255])).unwrap();
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn mobilenet_scaling_and_nchw_layout() {
        let pre = ImagePreprocessor::new(&config(Normalization::MobilenetV2, TensorLayout::Nchw));
        let tensor = pre.preprocess(&solid(3, 3, [0, 255, 0])).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        assert!((tensor[[0, 0, 1, 1]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 1, 1]] - 1.0).abs() < 1e-6);
        assert!(tensor.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn grayscale_input_is_expanded_to_rgb() {
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(2, 2, image::Luma([255u8])));
        let pre = ImagePreprocessor::new(&config(Normalization::Unit, TensorLayout::Nhwc));
        let tensor = pre.preprocess(&gray).unwrap();
        assert!(tensor.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn empty_image_is_rejected() {
        let pre = ImagePreprocessor::new(&config(Normalization::Unit, TensorLayout::Nhwc));
        assert!(matches!(
            pre.preprocess(&DynamicImage::new_rgb8(0, 0)),
            Err(DiagnosisError::ImageProcessing(_))
        ));
    }
}
