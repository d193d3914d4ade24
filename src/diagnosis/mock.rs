//! 占位诊断数据。在病症分析模型接入之前，分析接口对任意输入都返回这组结果。

use crate::diagnosis::types::{AnalysisDetails, Condition, PatientInfo, Symptoms};
use once_cell::sync::Lazy;

/// 瘙痒程度超过该值时提高首个病症的概率
const ITCH_LEVEL_THRESHOLD: f64 = 7.0;
const ITCH_PROBABILITY_BOOST: u32 = 5;

const NOT_SPECIFIED: &str = "Not specified";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static MOCK_CONDITIONS: Lazy<Vec<Condition>> = Lazy::new(|| {
    vec![
        Condition {
            name: "Eczema (Atopic Dermatitis)".to_string(),
            probability: 87,
            severity: "Moderate".to_string(),
            description: "A chronic inflammatory skin condition characterized by dry, itchy, \
                and inflamed skin. It often appears in patches and can cause significant discomfort."
                .to_string(),
            next_steps: strings(&[
                "Consult with a dermatologist for proper evaluation and treatment plan",
                "Avoid triggers such as harsh soaps, certain fabrics, and extreme temperatures",
                "Keep skin moisturized with fragrance-free emollients",
                "Apply prescribed topical medications as directed",
            ]),
            treatments: strings(&[
                "Topical corticosteroids to reduce inflammation",
                "Calcineurin inhibitors (tacrolimus, pimecrolimus)",
                "Moisturizers and emollients to maintain skin hydration",
                "Antihistamines for itching relief",
                "Phototherapy for severe cases",
            ]),
        },
        Condition {
            name: "Contact Dermatitis".to_string(),
            probability: 42,
            severity: "Mild".to_string(),
            description: "An inflammatory skin condition resulting from contact with allergens \
                or irritants. It causes redness, itching, and sometimes blistering at the site of contact."
                .to_string(),
            next_steps: strings(&[
                "Identify and avoid potential allergens or irritants",
                "Use hypoallergenic products for skin care and cleaning",
                "Apply cool compresses to relieve symptoms",
                "Consider patch testing to identify specific allergens",
            ]),
            treatments: strings(&[
                "Topical corticosteroids for inflammation reduction",
                "Barrier creams to protect skin from irritants",
                "Oral antihistamines for itching",
                "Calamine lotion for symptom relief",
            ]),
        },
    ]
});

/// 根据症状返回候选病症列表
pub fn predict_conditions(symptoms: &Symptoms) -> Vec<Condition> {
    let mut conditions = MOCK_CONDITIONS.clone();

    if symptoms.itch_level().is_some_and(|level| level > ITCH_LEVEL_THRESHOLD) {
        if let Some(first) = conditions.first_mut() {
            first.probability += ITCH_PROBABILITY_BOOST;
        }
    }

    conditions
}

pub fn patient_info() -> PatientInfo {
    PatientInfo {
        age: 34,
        gender: NOT_SPECIFIED.to_string(),
        skin_type: NOT_SPECIFIED.to_string(),
    }
}

pub fn analysis_details(symptoms: &Symptoms) -> AnalysisDetails {
    AnalysisDetails {
        area_affected: NOT_SPECIFIED.to_string(),
        duration: symptoms
            .text("duration")
            .unwrap_or(NOT_SPECIFIED)
            .to_string(),
        characteristics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_itch(level: &str) -> Symptoms {
        Symptoms::from_form_fields(vec![("itchLevel".to_string(), level.to_string())])
    }

    #[test]
    fn returns_fixed_catalog() {
        let conditions = predict_conditions(&Symptoms::default());
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].name, "Eczema (Atopic Dermatitis)");
        assert_eq!(conditions[0].probability, 87);
        assert_eq!(conditions[1].probability, 42);
    }

    #[test]
    fn high_itch_level_boosts_first_condition() {
        assert_eq!(predict_conditions(&with_itch("8"))[0].probability, 92);
        assert_eq!(predict_conditions(&with_itch("7"))[0].probability, 87);
        assert_eq!(predict_conditions(&with_itch("8"))[1].probability, 42);
    }

    #[test]
    fn boost_does_not_leak_into_catalog() {
        predict_conditions(&with_itch("10"));
        assert_eq!(predict_conditions(&Symptoms::default())[0].probability, 87);
    }

    #[test]
    fn duration_flows_into_details() {
        let symptoms =
            Symptoms::from_form_fields(vec![("duration".to_string(), "3 days".to_string())]);
        assert_eq!(analysis_details(&symptoms).duration, "3 days");
        assert_eq!(analysis_details(&Symptoms::default()).duration, "Not specified");
    }
}
