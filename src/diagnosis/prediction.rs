use crate::config::OutputActivation;
use crate::utils::error::DiagnosisError;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// 概率分布判定容差
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Serialize)]
pub struct ClassScore {
    pub label: String,
    pub score: f32,
}

/// 单张图像的分类结果，分数为 [0, 1] 区间的概率
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    pub scores: Vec<ClassScore>,
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// 非负且和为1（容差内）
pub fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|v| *v >= 0.0) && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE
}

/// 最大值下标，并列时取最小下标
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Prediction {
    /// 将模型原始输出映射到标签集合
    pub fn from_output(
        raw: Vec<f32>,
        labels: &[String],
        activation: OutputActivation,
    ) -> Result<Self> {
        if raw.len() != labels.len() {
            return Err(DiagnosisError::Inference(format!(
                "Model produced {} scores but {} class labels are configured",
                raw.len(),
                labels.len()
            )));
        }

        if raw.iter().any(|v| !v.is_finite()) {
            return Err(DiagnosisError::Inference(
                "Model output contains non-finite values".to_string(),
            ));
        }

        let scores = match activation {
            OutputActivation::Softmax => softmax(&raw),
            OutputActivation::Identity => raw,
            OutputActivation::Auto if is_distribution(&raw) => raw,
            OutputActivation::Auto => {
                tracing::debug!("Model output is not a distribution, applying softmax");
                softmax(&raw)
            }
        };

        let index = argmax(&scores)
            .ok_or_else(|| DiagnosisError::Inference("Empty model output".to_string()))?;

        let scores: Vec<ClassScore> = labels
            .iter()
            .zip(scores)
            .map(|(label, score)| ClassScore {
                label: label.clone(),
                score,
            })
            .collect();

        Ok(Self {
            label: labels[index].clone(),
            index,
            confidence: scores[index].score,
            scores,
        })
    }

    /// 标签 -> 分数，`scale` 为缩放系数（百分比用 100）
    pub fn score_map(&self, scale: f32, lowercase: bool) -> BTreeMap<String, f32> {
        self.scores
            .iter()
            .map(|s| {
                let label = if lowercase {
                    s.label.to_lowercase()
                } else {
                    s.label.clone()
                };
                (label, s.score * scale)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Eczema".into(), "Melanoma".into(), "Psoriasis".into()]
    }

    #[test]
    fn softmax_sums_to_one_and_preserves_order() {
        let probs = softmax(&[1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[1] > probs[2] && probs[2] > probs[0]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn auto_keeps_probabilities_untouched() {
        let p = Prediction::from_output(vec![0.1, 0.7, 0.2], &labels(), OutputActivation::Auto)
            .unwrap();
        assert_eq!(p.label, "Melanoma");
        assert_eq!(p.index, 1);
        assert!((p.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn auto_applies_softmax_to_logits() {
        let p = Prediction::from_output(vec![-2.0, 0.5, 4.0], &labels(), OutputActivation::Auto)
            .unwrap();
        assert_eq!(p.label, "Psoriasis");
        let total: f32 = p.scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn percentage_map_sums_to_hundred() {
        let p = Prediction::from_output(vec![0.25, 0.25, 0.5], &labels(), OutputActivation::Auto)
            .unwrap();
        let map = p.score_map(100.0, true);
        assert!(map.contains_key("psoriasis"));
        let total: f32 = map.values().sum();
        assert!((total - 100.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_label_count_mismatch_and_nan() {
        assert!(Prediction::from_output(vec![0.5, 0.5], &labels(), OutputActivation::Auto).is_err());
        assert!(
            Prediction::from_output(vec![f32::NAN, 0.5, 0.5], &labels(), OutputActivation::Identity)
                .is_err()
        );
    }
}
