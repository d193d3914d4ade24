use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 诊断记录生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisStatus {
    Uploaded,
    Completed,
}

/// 症状字段值：普通表单字段或 `key[]` 形式的数组字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymptomValue {
    Text(String),
    List(Vec<String>),
}

impl SymptomValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SymptomValue::Text(s) => Some(s),
            SymptomValue::List(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symptoms(pub BTreeMap<String, SymptomValue>);

impl Symptoms {
    /// 从multipart文本字段构建。
    /// `name[]` 字段收集为列表（键去掉后缀），其他字段保留第一次出现的值。
    pub fn from_form_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map: BTreeMap<String, SymptomValue> = BTreeMap::new();

        for (key, value) in fields {
            if let Some(base) = key.strip_suffix("[]") {
                let entry = map
                    .entry(base.to_string())
                    .or_insert_with(|| SymptomValue::List(Vec::new()));
                match &mut *entry {
                    SymptomValue::List(items) => items.push(value),
                    // 同名的普通字段先出现时，提升为列表
                    SymptomValue::Text(first) => {
                        let first = std::mem::take(first);
                        *entry = SymptomValue::List(vec![first, value]);
                    }
                }
            } else {
                map.entry(key).or_insert(SymptomValue::Text(value));
            }
        }

        Symptoms(map)
    }

    /// 从JSON对象构建；标量转为文本，数组元素逐个转为文本，null忽略
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> Self {
        use serde_json::Value;

        fn scalar(value: &Value) -> Option<String> {
            match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        }

        let map = object
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
                let value = match &value {
                    Value::Array(items) => {
                        SymptomValue::List(items.iter().filter_map(scalar).collect())
                    }
                    other => SymptomValue::Text(scalar(other)?),
                };
                Some((key, value))
            })
            .collect();

        Symptoms(map)
    }

    pub fn get(&self, key: &str) -> Option<&SymptomValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SymptomValue::as_text)
    }

    /// 瘙痒程度（0-10），无法解析时为 None
    pub fn itch_level(&self) -> Option<f64> {
        self.text("itchLevel")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 候选病症
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    pub probability: u32,
    pub severity: String,
    pub description: String,
    pub next_steps: Vec<String>,
    pub treatments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub age: u32,
    pub gender: String,
    pub skin_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub area_affected: String,
    pub duration: String,
    pub characteristics: Vec<String>,
}

/// 内存中的诊断记录
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisRecord {
    pub id: String,
    pub image_path: String,
    /// Unix时间戳（秒）
    pub date: f64,
    pub status: DiagnosisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Symptoms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "patientInfo", skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
    #[serde(rename = "analysisDetails", skip_serializing_if = "Option::is_none")]
    pub analysis_details: Option<AnalysisDetails>,
}

impl DiagnosisRecord {
    pub fn new(id: String, image_path: String, date: f64) -> Self {
        Self {
            id,
            image_path,
            date,
            status: DiagnosisStatus::Uploaded,
            symptoms: None,
            conditions: None,
            image_url: None,
            patient_info: None,
            analysis_details: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == DiagnosisStatus::Completed
    }

    pub fn primary_condition(&self) -> &str {
        self.conditions
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| c.name.as_str())
            .unwrap_or("Unknown")
    }
}

/// 历史记录摘要
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub date: f64,
    pub status: DiagnosisStatus,
    #[serde(rename = "primaryCondition")]
    pub primary_condition: String,
}

impl From<&DiagnosisRecord> for HistoryEntry {
    fn from(record: &DiagnosisRecord) -> Self {
        Self {
            id: record.id.clone(),
            date: record.date,
            status: record.status,
            primary_condition: record.primary_condition().to_string(),
        }
    }
}
