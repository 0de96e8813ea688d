use crate::api::MatchApi;
use crate::models::{AnalysisResult, Credential, JobDescriptionInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SelectResume,
    EnterJob,
    Review,
}

impl Step {
    pub fn title(self) -> &'static str {
        match self {
            Step::SelectResume => "Select Resume",
            Step::EnterJob => "Enter Job Details",
            Step::Review => "Review & Run Analysis",
        }
    }
}

/// Linear three-step wizard from resume selection to analysis submission.
/// Validation problems never escape as errors; they land in the `error`
/// field for the caller to render and the state stays put. Nothing here
/// survives abandonment: dropping the workflow is the cancel operation.
pub struct Workflow {
    step: Step,
    selected_resume: Option<i64>,
    job: JobDescriptionInput,
    error: Option<String>,
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            step: Step::SelectResume,
            selected_resume: None,
            job: JobDescriptionInput::default(),
            error: None,
        }
    }

    /// Deep-linked entry with a pre-selected resume skips straight to the
    /// job-details step.
    pub fn with_resume(resume_id: i64) -> Self {
        Self {
            step: Step::EnterJob,
            selected_resume: Some(resume_id),
            job: JobDescriptionInput::default(),
            error: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_resume(&self) -> Option<i64> {
        self.selected_resume
    }

    pub fn job(&self) -> &JobDescriptionInput {
        &self.job
    }

    pub fn select_resume(&mut self, resume_id: i64) {
        self.selected_resume = Some(resume_id);
    }

    pub fn set_job(&mut self, job: JobDescriptionInput) {
        self.job = job;
    }

    fn resume_guard(&self) -> Option<&'static str> {
        if self.selected_resume.is_none() {
            Some("no resume selected")
        } else {
            None
        }
    }

    fn job_guard(&self) -> Option<&'static str> {
        if self.job.raw_text.trim().is_empty() {
            Some("empty job description")
        } else {
            None
        }
    }

    /// Guarded forward transition. Returns true when the step advanced;
    /// otherwise the guard's message is left in `error` and the step is
    /// unchanged.
    pub fn advance(&mut self) -> bool {
        let guard = match self.step {
            Step::SelectResume => self.resume_guard(),
            Step::EnterJob => self.job_guard(),
            Step::Review => return false,
        };
        if let Some(message) = guard {
            self.error = Some(message.to_string());
            return false;
        }
        self.error = None;
        self.step = match self.step {
            Step::SelectResume => Step::EnterJob,
            Step::EnterJob | Step::Review => Step::Review,
        };
        true
    }

    /// Unconditional backward transition; clears any error.
    pub fn back(&mut self) {
        self.error = None;
        self.step = match self.step {
            Step::SelectResume | Step::EnterJob => Step::SelectResume,
            Step::Review => Step::EnterJob,
        };
    }

    /// Runs the analysis. Only valid at `Review`; both guards are
    /// re-checked first. On success the workflow is finished and the
    /// result is handed back; on failure the step stays `Review` with the
    /// failure detail in `error`, permitting resubmission.
    pub fn submit(&mut self, api: &dyn MatchApi, cred: &Credential) -> Option<AnalysisResult> {
        if self.step != Step::Review {
            self.error = Some("not at the review step".to_string());
            return None;
        }
        if let Some(message) = self.resume_guard().or_else(|| self.job_guard()) {
            self.error = Some(message.to_string());
            return None;
        }
        let resume_id = self.selected_resume?;
        match api.run_analysis(cred, resume_id, &self.job) {
            Ok(result) => {
                self.error = None;
                Some(result)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;

    fn job(text: &str) -> JobDescriptionInput {
        JobDescriptionInput {
            title: Some("Engineer".to_string()),
            company: None,
            raw_text: text.to_string(),
        }
    }

    fn ready_workflow() -> Workflow {
        let mut wf = Workflow::new();
        wf.select_resume(7);
        assert!(wf.advance());
        wf.set_job(job("We need a Rust engineer."));
        assert!(wf.advance());
        assert_eq!(wf.step(), Step::Review);
        wf
    }

    #[test]
    fn test_advance_requires_a_selected_resume() {
        let mut wf = Workflow::new();
        assert!(!wf.advance());
        assert_eq!(wf.step(), Step::SelectResume);
        assert_eq!(wf.error(), Some("no resume selected"));
    }

    #[test]
    fn test_advance_requires_nonblank_job_text() {
        let mut wf = Workflow::new();
        wf.select_resume(7);
        assert!(wf.advance());

        wf.set_job(job("   \n\t "));
        assert!(!wf.advance());
        assert_eq!(wf.step(), Step::EnterJob);
        assert_eq!(wf.error(), Some("empty job description"));
    }

    #[test]
    fn test_successful_advance_clears_prior_error() {
        let mut wf = Workflow::new();
        assert!(!wf.advance());
        assert!(wf.error().is_some());

        wf.select_resume(7);
        assert!(wf.advance());
        assert!(wf.error().is_none());
        assert_eq!(wf.step(), Step::EnterJob);
    }

    #[test]
    fn test_back_twice_returns_to_start() {
        let mut wf = ready_workflow();
        wf.back();
        assert_eq!(wf.step(), Step::EnterJob);
        wf.back();
        assert_eq!(wf.step(), Step::SelectResume);
        wf.back(); // already at the first step
        assert_eq!(wf.step(), Step::SelectResume);
    }

    #[test]
    fn test_deep_link_starts_at_job_entry() {
        let wf = Workflow::with_resume(42);
        assert_eq!(wf.step(), Step::EnterJob);
        assert_eq!(wf.selected_resume(), Some(42));
    }

    #[test]
    fn test_submit_yields_the_analysis() {
        let api = FakeApi {
            analysis: Some(FakeApi::sample_analysis(99, 0.82)),
            ..FakeApi::default()
        };
        let cred = Credential::new("Bearer", "tok");
        let mut wf = ready_workflow();

        let result = wf.submit(&api, &cred).expect("submit should succeed");
        assert_eq!(result.id, 99);
        assert!(wf.error().is_none());
    }

    #[test]
    fn test_submit_failure_stays_at_review_for_resubmission() {
        let api = FakeApi {
            analysis_error: Some("analysis backend unavailable".to_string()),
            ..FakeApi::default()
        };
        let cred = Credential::new("Bearer", "tok");
        let mut wf = ready_workflow();

        assert!(wf.submit(&api, &cred).is_none());
        assert_eq!(wf.step(), Step::Review);
        assert_eq!(wf.error(), Some("analysis backend unavailable"));

        // The backend failure is not terminal: a retry can succeed.
        let api = FakeApi {
            analysis: Some(FakeApi::sample_analysis(5, 0.5)),
            ..FakeApi::default()
        };
        assert!(wf.submit(&api, &cred).is_some());
    }

    #[test]
    fn test_submit_re_checks_guards() {
        let api = FakeApi::default();
        let cred = Credential::new("Bearer", "tok");

        let mut wf = Workflow::new();
        assert!(wf.submit(&api, &cred).is_none());
        assert_eq!(wf.error(), Some("not at the review step"));

        // Reach review legitimately, then hollow out the job text.
        let mut wf = ready_workflow();
        wf.set_job(job(" "));
        assert!(wf.submit(&api, &cred).is_none());
        assert_eq!(wf.step(), Step::Review);
        assert_eq!(wf.error(), Some("empty job description"));
    }
}
