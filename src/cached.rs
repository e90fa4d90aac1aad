use once_cell::sync::Lazy;

use crate::{attach_reference_sample, normalize, EvaluationRecord};

pub const SAMPLE_POEM: &str = "「ごめんね」とまいた実家の除草剤母が施設に引っ越した夏";

pub const CACHED_MODEL: &str = "cached-sample";

const SAMPLE_EVALUATION: &str = include_str!("../data/sample_evaluation.json");

static CACHED: Lazy<EvaluationRecord> = Lazy::new(|| {
    let mut record = normalize(SAMPLE_EVALUATION).unwrap();
    attach_reference_sample(&mut record);
    record.stamp_model(CACHED_MODEL);
    record
});

fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Bundled evaluation when `poem` is the sample poem, spacing aside.
pub fn cached_sample(poem: &str) -> Option<EvaluationRecord> {
    (without_whitespace(poem) == without_whitespace(SAMPLE_POEM)).then(|| CACHED.clone())
}
