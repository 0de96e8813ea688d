use crate::models::AnalysisResult;

/// Three-level classification shared by every score display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "Excellent Match!",
            Tier::Medium => "Good Match",
            Tier::Low => "Needs Improvement",
        }
    }
}

/// Lower bounds are inclusive: 0.8 is High, 0.6 is Medium.
pub fn tier_of(score: f64) -> Tier {
    if score >= 0.8 {
        Tier::High
    } else if score >= 0.6 {
        Tier::Medium
    } else {
        Tier::Low
    }
}

/// Weighted ATS compatibility composite in [0,1]:
///   - 40% overall match score
///   - 30% breadth of matched skills, saturating at 10 skills
///   - 30% paucity of ATS complaints; an empty feedback list earns the
///     full component, five or more complaints earn none
pub fn ats_compliance_score(result: &AnalysisResult) -> f64 {
    let base = result.overall_match_score * 0.4;
    let keyword = (result.matching_skills.len() as f64 / 10.0).min(1.0) * 0.3;
    let feedback = if result.ats_feedback.is_empty() {
        0.3
    } else {
        ((5.0 - result.ats_feedback.len() as f64) / 5.0).max(0.0) * 0.3
    };
    (base + keyword + feedback).clamp(0.0, 1.0)
}

/// User-facing percentage on the 0-100 scale, round-half-up.
pub fn percentage(score: f64) -> u32 {
    (score * 100.0).round() as u32
}
