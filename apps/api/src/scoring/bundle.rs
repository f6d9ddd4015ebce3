use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::stages::StageError;

/// Auxiliary signals that may fall back to a neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Overlap,
    LlmScore,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Overlap => "overlap",
            Signal::LlmScore => "llm_score",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overlap" => Some(Signal::Overlap),
            "llm_score" => Some(Signal::LlmScore),
            _ => None,
        }
    }
}

/// Outcome of a soft stage: a measured value or the neutral fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuxSignal {
    Measured(f64),
    Degraded,
}

impl AuxSignal {
    pub fn value(&self) -> f64 {
        match self {
            AuxSignal::Measured(v) => clamp_score(*v),
            AuxSignal::Degraded => 0.0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AuxSignal::Degraded)
    }
}

/// The five load-bearing numbers returned by the blender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedScores {
    pub final_score: f64,
    pub semantic_score: f64,
    pub skills_score: f64,
    pub education_score: f64,
    pub experience_score: f64,
}

const REQUIRED_FIELDS: [&str; 5] = [
    "FinalScore",
    "SemanticScore",
    "SkillsScore",
    "EducationScore",
    "ExperienceScore",
];

impl BlendedScores {
    /// Reads the blender's JSON object. Every required field must be present
    /// and numeric (numbers or numeric strings); none is defaulted.
    pub fn from_output(output: &Value) -> Result<Self, StageError> {
        let object = output.as_object().ok_or_else(|| {
            StageError::MalformedOutput(format!("blender output is not an object: {output}"))
        })?;

        let mut values = [0.0_f64; 5];
        let mut missing = Vec::new();
        for (slot, field) in values.iter_mut().zip(REQUIRED_FIELDS) {
            match object.get(field).and_then(numeric) {
                Some(v) => *slot = v,
                None => missing.push(field),
            }
        }
        if !missing.is_empty() {
            return Err(StageError::MalformedOutput(format!(
                "blender output missing numeric {}",
                missing.join(", ")
            )));
        }

        let [final_score, semantic_score, skills_score, education_score, experience_score] =
            values;
        Ok(Self {
            final_score,
            semantic_score,
            skills_score,
            education_score,
            experience_score,
        })
    }
}

/// Result of one scoring run. Every score is clamped to [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub final_score: f64,
    pub semantic_score: f64,
    pub skills_score: f64,
    pub education_score: f64,
    pub experience_score: f64,
    pub overlap: f64,
    pub llm_score: f64,
    /// True when at least one auxiliary signal fell back to 0.
    pub degraded: bool,
    pub degraded_signals: Vec<Signal>,
}

impl ScoreBundle {
    pub fn assemble(blended: BlendedScores, overlap: AuxSignal, llm: AuxSignal) -> Self {
        let degraded_signals: Vec<Signal> = [(Signal::Overlap, overlap), (Signal::LlmScore, llm)]
            .into_iter()
            .filter(|(_, s)| s.is_degraded())
            .map(|(signal, _)| signal)
            .collect();

        Self {
            final_score: clamp_score(blended.final_score),
            semantic_score: clamp_score(blended.semantic_score),
            skills_score: clamp_score(blended.skills_score),
            education_score: clamp_score(blended.education_score),
            experience_score: clamp_score(blended.experience_score),
            overlap: overlap.value(),
            llm_score: llm.value(),
            degraded: !degraded_signals.is_empty(),
            degraded_signals,
        }
    }
}

/// Clamps to [0, 100]; NaN becomes 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Accepts JSON numbers and numeric strings.
pub fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
