use crate::image::ImageLoader;
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 公开访问上传图像的URL前缀
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// 上传目录：分类请求的临时文件和诊断记录的图像都存放在这里
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入一个随对象释放而删除的临时文件
    pub fn stage_temp(&self, file_name: &str, bytes: &[u8]) -> Result<NamedTempFile> {
        std::fs::create_dir_all(&self.dir)?;

        let suffix = match ImageLoader::sanitize_filename(file_name) {
            s if s.is_empty() => String::new(),
            s => format!("_{}", s),
        };

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!("Staged upload at {}", file.path().display());
        Ok(file)
    }

    /// 保存诊断图像，文件名为 `{id}_{清洗后的原文件名}`
    pub async fn save_for_diagnosis(
        &self,
        diagnosis_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let sanitized = match ImageLoader::sanitize_filename(file_name) {
            s if s.is_empty() => "image".to_string(),
            s => s,
        };
        let path = self.dir.join(format!("{}_{}", diagnosis_id, sanitized));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Saved diagnosis image: {}", path.display());
        Ok(path)
    }

    /// 存储路径对应的公开URL
    pub fn public_url(path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", UPLOADS_URL_PREFIX, name)
    }
}
