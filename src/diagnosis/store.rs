use crate::diagnosis::mock;
use crate::diagnosis::storage::UploadStorage;
use crate::diagnosis::types::{DiagnosisRecord, DiagnosisStatus, HistoryEntry, Symptoms};
use crate::utils::error::DiagnosisError;
use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 当前时间（Unix秒，含小数）
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// 内存诊断记录表，进程重启后丢失
#[derive(Debug, Default)]
pub struct DiagnosisStore {
    records: RwLock<HashMap<String, DiagnosisRecord>>,
}

impl DiagnosisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// 登记一条已上传的记录
    pub fn insert_uploaded(&self, id: String, image_path: &Path) -> DiagnosisRecord {
        let record = DiagnosisRecord::new(
            id.clone(),
            image_path.display().to_string(),
            now_timestamp(),
        );
        self.records.write().insert(id, record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Option<DiagnosisRecord> {
        self.records.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 写入分析结果并标记为 completed。
    /// `image_path` 为重新上传的图像路径（如有）。已完成的记录会刷新结果，状态不变。
    pub fn complete(
        &self,
        id: &str,
        symptoms: Symptoms,
        image_path: Option<PathBuf>,
    ) -> Result<DiagnosisRecord> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or(DiagnosisError::DiagnosisNotFound)?;

        if let Some(path) = image_path {
            record.image_path = path.display().to_string();
        }

        if record.status == DiagnosisStatus::Uploaded {
            tracing::debug!("Diagnosis {} transitioned to completed", id);
        } else {
            tracing::debug!("Diagnosis {} re-analyzed", id);
        }

        record.conditions = Some(mock::predict_conditions(&symptoms));
        record.analysis_details = Some(mock::analysis_details(&symptoms));
        record.patient_info = Some(mock::patient_info());
        record.image_url = Some(UploadStorage::public_url(Path::new(&record.image_path)));
        record.symptoms = Some(symptoms);
        record.status = DiagnosisStatus::Completed;
        record.date = now_timestamp();

        Ok(record.clone())
    }

    /// 获取已完成的诊断结果
    pub fn results(&self, id: &str) -> Result<DiagnosisRecord> {
        let records = self.records.read();
        let record = records.get(id).ok_or(DiagnosisError::DiagnosisNotFound)?;

        if !record.is_completed() {
            return Err(DiagnosisError::DiagnosisNotCompleted);
        }

        Ok(record.clone())
    }

    /// 已完成记录的摘要，按时间倒序
    pub fn history(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self
            .records
            .read()
            .values()
            .filter(|r| r.is_completed())
            .map(HistoryEntry::from)
            .collect();

        entries.sort_by(|a, b| b.date.total_cmp(&a.date));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symptoms(pairs: &[(&str, &str)]) -> Symptoms {
        Symptoms::from_form_fields(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn results_require_completion() {
        let store = DiagnosisStore::new();
        let id = DiagnosisStore::new_id();
        store.insert_uploaded(id.clone(), Path::new("uploads/a_x.png"));

        assert!(matches!(
            store.results(&id),
            Err(DiagnosisError::DiagnosisNotCompleted)
        ));
        assert!(matches!(
            store.results("missing"),
            Err(DiagnosisError::DiagnosisNotFound)
        ));

        store.complete(&id, Symptoms::default(), None).unwrap();
        let record = store.results(&id).unwrap();
        assert_eq!(record.status, DiagnosisStatus::Completed);
        assert_eq!(record.image_url.as_deref(), Some("/uploads/a_x.png"));
        assert_eq!(record.primary_condition(), "Eczema (Atopic Dermatitis)");
    }

    #[test]
    fn complete_unknown_id_fails() {
        let store = DiagnosisStore::new();
        assert!(matches!(
            store.complete("nope", Symptoms::default(), None),
            Err(DiagnosisError::DiagnosisNotFound)
        ));
    }

    #[test]
    fn reanalysis_keeps_completed_status_and_updates_image() {
        let store = DiagnosisStore::new();
        store.insert_uploaded("d1".into(), Path::new("uploads/d1_old.png"));
        store.complete("d1", symptoms(&[("itchLevel", "2")]), None).unwrap();

        let record = store
            .complete(
                "d1",
                symptoms(&[("itchLevel", "9")]),
                Some(PathBuf::from("uploads/d1_new.png")),
            )
            .unwrap();

        assert_eq!(record.status, DiagnosisStatus::Completed);
        assert_eq!(record.image_path, "uploads/d1_new.png");
        assert_eq!(record.conditions.unwrap()[0].probability, 92);
    }

    #[test]
    fn history_lists_completed_newest_first() {
        let store = DiagnosisStore::new();
        for id in ["a", "b", "c"] {
            store.insert_uploaded(id.into(), Path::new("uploads/x.png"));
        }
        store.complete("a", Symptoms::default(), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.complete("c", Symptoms::default(), None).unwrap();

        let history = store.history();
        let ids: Vec<&str> = history.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(history.iter().all(|h| h.status == DiagnosisStatus::Completed));
        assert_eq!(store.len(), 3);
    }
}
