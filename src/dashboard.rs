use std::thread;

use crate::api::MatchApi;
use crate::error::ApiError;
use crate::models::{AnalysisResult, Credential, ResumeRecord};

/// How many recent analyses feed the dashboard statistics. The averages
/// below are over this fetched window, not full history.
pub const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_resumes: usize,
    pub total_analyses: usize,
    pub average_match_score: f64,
    pub skills_to_learn: usize,
}

/// Reduces the fetched collections into the summary numbers. The average
/// is 0 for an empty window rather than an error, and `skills_to_learn`
/// counts a skill once per analysis it is missing from: it measures
/// aggregate learning burden, not unique skills.
pub fn summarize(resumes: &[ResumeRecord], analyses: &[AnalysisResult]) -> DashboardSummary {
    let average_match_score = if analyses.is_empty() {
        0.0
    } else {
        analyses.iter().map(|a| a.overall_match_score).sum::<f64>() / analyses.len() as f64
    };
    DashboardSummary {
        total_resumes: resumes.len(),
        total_analyses: analyses.len(),
        average_match_score,
        skills_to_learn: analyses.iter().map(|a| a.missing_skills.len()).sum(),
    }
}

#[derive(Debug)]
pub struct DashboardData {
    pub resumes: Vec<ResumeRecord>,
    pub recent_analyses: Vec<AnalysisResult>,
    pub summary: DashboardSummary,
}

/// Issues the two constituent fetches concurrently and combines them once
/// both complete. Either failure fails the whole dashboard; there is no
/// partial result.
pub fn fetch(api: &dyn MatchApi, cred: &Credential) -> Result<DashboardData, ApiError> {
    let (resumes, analyses) = thread::scope(|scope| {
        let resumes = scope.spawn(|| api.list_resumes(cred));
        let analyses = scope.spawn(|| api.list_analyses(cred, RECENT_WINDOW));
        (resumes.join(), analyses.join())
    });

    let resumes = resumes.map_err(|_| ApiError::remote("resume fetch panicked"))??;
    let analyses = analyses.map_err(|_| ApiError::remote("analysis fetch panicked"))??;

    let summary = summarize(&resumes, &analyses);
    Ok(DashboardData {
        resumes,
        recent_analyses: analyses,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use chrono::Utc;

    fn resume(id: i64) -> ResumeRecord {
        ResumeRecord {
            id,
            filename: format!("resume-{}.pdf", id),
            file_type: "pdf".to_string(),
            created_at: Utc::now().naive_utc(),
            extracted_skills: vec!["rust".to_string()],
        }
    }

    fn analysis(overall: f64, missing: &[&str]) -> AnalysisResult {
        let mut a = FakeApi::sample_analysis(1, overall);
        a.missing_skills = missing.iter().map(|s| s.to_string()).collect();
        a
    }

    #[test]
    fn test_empty_analyses_average_is_zero_not_an_error() {
        let summary = summarize(&[resume(1)], &[]);
        assert_eq!(summary.total_resumes, 1);
        assert_eq!(summary.total_analyses, 0);
        assert_eq!(summary.average_match_score, 0.0);
        assert_eq!(summary.skills_to_learn, 0);
    }

    #[test]
    fn test_average_is_over_the_fetched_window() {
        let analyses = vec![analysis(0.2, &[]), analysis(0.4, &[]), analysis(0.9, &[])];
        let summary = summarize(&[], &analyses);
        assert!((summary.average_match_score - 0.5).abs() < 1e-9);
        assert_eq!(summary.total_analyses, 3);
    }

    #[test]
    fn test_skills_to_learn_double_counts_recurring_skills() {
        let analyses = vec![
            analysis(0.5, &["kubernetes", "go"]),
            analysis(0.5, &["kubernetes"]),
        ];
        let summary = summarize(&[], &analyses);
        assert_eq!(summary.skills_to_learn, 3);
    }

    #[test]
    fn test_fetch_combines_both_collections() {
        let api = FakeApi {
            resumes: vec![resume(1), resume(2)],
            analyses: vec![analysis(0.6, &["go"]), analysis(0.8, &[])],
            ..FakeApi::default()
        };
        let cred = Credential::new("Bearer", "tok");

        let data = fetch(&api, &cred).unwrap();
        assert_eq!(data.resumes.len(), 2);
        assert_eq!(data.resumes[0].id, 1);
        assert_eq!(data.summary.total_resumes, 2);
        assert_eq!(data.summary.total_analyses, 2);
        assert!((data.summary.average_match_score - 0.7).abs() < 1e-9);
        assert_eq!(data.summary.skills_to_learn, 1);
    }

    #[test]
    fn test_fetch_respects_the_window_limit() {
        let analyses = (0..8).map(|i| analysis(0.5 + i as f64 * 0.01, &[])).collect();
        let api = FakeApi { analyses, ..FakeApi::default() };
        let cred = Credential::new("Bearer", "tok");

        let data = fetch(&api, &cred).unwrap();
        assert_eq!(data.recent_analyses.len(), RECENT_WINDOW);
    }

    #[test]
    fn test_either_failed_fetch_fails_the_whole_dashboard() {
        let cred = Credential::new("Bearer", "tok");

        let api = FakeApi {
            resumes_error: Some("resume service down".to_string()),
            ..FakeApi::default()
        };
        assert!(fetch(&api, &cred).is_err());

        let api = FakeApi {
            analyses_error: Some("analysis service down".to_string()),
            resumes: vec![resume(1)],
            ..FakeApi::default()
        };
        assert!(fetch(&api, &cred).is_err());
    }
}
