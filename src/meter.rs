use serde::Serialize;

use crate::{Phrase, TUNING};

/// How one phrase position compares with its target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "fit", content = "by", rename_all = "snake_case")]
pub enum LineFit {
    Exact,
    /// Excess morae (jiamari).
    Over(usize),
    /// Missing morae (jitarazu).
    Under(usize),
    /// Position five phrases in has no phrase.
    Missing,
    /// Phrase past the fifth position.
    Extra,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterLine {
    pub target: Option<usize>,
    pub syllables: Option<usize>,
    pub fit: LineFit,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterReport {
    pub lines: Vec<MeterLine>,
    pub total: usize,
    pub conforms: bool,
}

fn fit_for(target: usize, actual: usize) -> LineFit {
    match actual.cmp(&target) {
        std::cmp::Ordering::Equal => LineFit::Exact,
        std::cmp::Ordering::Greater => LineFit::Over(actual - target),
        std::cmp::Ordering::Less => LineFit::Under(target - actual),
    }
}

pub fn check_meter(phrases: &[Phrase]) -> MeterReport {
    let pattern = TUNING.tanka_pattern;
    let positions = pattern.len().max(phrases.len());

    let lines: Vec<MeterLine> = (0..positions)
        .map(|i| {
            let target = pattern.get(i).copied();
            let syllables = phrases.get(i).map(|p| p.syllables);
            let fit = match (target, syllables) {
                (Some(t), Some(s)) => fit_for(t, s),
                (Some(_), None) => LineFit::Missing,
                (None, _) => LineFit::Extra,
            };
            MeterLine {
                target,
                syllables,
                fit,
            }
        })
        .collect();

    let total = phrases.iter().map(|p| p.syllables).sum();
    let conforms = lines.iter().all(|l| l.fit == LineFit::Exact);

    MeterReport {
        lines,
        total,
        conforms,
    }
}
