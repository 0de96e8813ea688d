use std::sync::mpsc::Sender;

use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{
    AdvisorReply, AnalysisResult, Credential, JobDescriptionInput, RecommendationRecord,
    ResumeRecord, UserProfile,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Published once per credential rejection observed on the wire.
/// `SessionStore` holds the only receiver.
#[derive(Debug, Clone, Copy)]
pub struct AuthRejected;

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationInput {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.full_name.is_none()
    }
}

/// The remote matching service. Everything the engine cannot compute
/// locally goes through here; implementations own wire format and
/// timeouts, callers own retry (there is none automatic).
pub trait MatchApi: Send + Sync {
    fn authenticate(&self, email: &str, password: &str) -> Result<Credential, ApiError>;
    fn get_current_user(&self, cred: &Credential) -> Result<UserProfile, ApiError>;
    fn update_profile(
        &self,
        cred: &Credential,
        patch: &ProfilePatch,
    ) -> Result<UserProfile, ApiError>;
    fn create_account(&self, input: &RegistrationInput) -> Result<(), ApiError>;
    fn list_resumes(&self, cred: &Credential) -> Result<Vec<ResumeRecord>, ApiError>;
    fn delete_resume(&self, cred: &Credential, id: i64) -> Result<(), ApiError>;
    fn run_analysis(
        &self,
        cred: &Credential,
        resume_id: i64,
        job: &JobDescriptionInput,
    ) -> Result<AnalysisResult, ApiError>;
    fn list_analyses(
        &self,
        cred: &Credential,
        limit: usize,
    ) -> Result<Vec<AnalysisResult>, ApiError>;
    fn get_analysis(&self, cred: &Credential, id: i64) -> Result<AnalysisResult, ApiError>;
    fn delete_analysis(&self, cred: &Credential, id: i64) -> Result<(), ApiError>;
    fn recommendations_for_analysis(
        &self,
        cred: &Credential,
        analysis_id: i64,
    ) -> Result<Vec<RecommendationRecord>, ApiError>;
    fn ask_advisor(&self, cred: &Credential, message: &str) -> Result<AdvisorReply, ApiError>;
}

// --- HTTP implementation ---

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    resume_id: i64,
    job_description: &'a JobDescriptionInput,
}

#[derive(Debug, Serialize)]
struct AdvisorRequest<'a> {
    message: &'a str,
    context: serde_json::Value,
}

pub struct HttpApi {
    base_url: String,
    client: Client,
    auth_events: Sender<AuthRejected>,
}

impl HttpApi {
    pub fn new(base_url: &str, auth_events: Sender<AuthRejected>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            auth_events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(err: reqwest::Error) -> ApiError {
        ApiError::remote(format!("request to matching service failed: {}", err))
    }

    /// Maps non-success statuses onto the error taxonomy. A 401 is also
    /// published on the auth-event channel so the session can tear down
    /// no matter which operation tripped it.
    fn check(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = extract_detail(response);
        if status == StatusCode::UNAUTHORIZED {
            warn!("credential rejected ({})", status);
            let _ = self.auth_events.send(AuthRejected);
            return Err(ApiError::Auth);
        }

        let message = detail.unwrap_or_else(|| format!("service returned {}", status));
        if matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::NOT_FOUND
                | StatusCode::CONFLICT
                | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            Err(ApiError::validation(message))
        } else {
            Err(ApiError::remote(message))
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        cred: &Credential,
        path: &str,
    ) -> Result<T, ApiError> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .header("Authorization", cred.to_string())
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?
            .json()
            .map_err(|e| ApiError::remote(format!("malformed response from {}: {}", path, e)))
    }

    fn delete(&self, cred: &Credential, path: &str) -> Result<(), ApiError> {
        debug!("DELETE {}", path);
        let response = self
            .client
            .delete(self.url(path))
            .header("Authorization", cred.to_string())
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?;
        Ok(())
    }
}

impl MatchApi for HttpApi {
    fn authenticate(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        // The one non-JSON call: login credentials go form-encoded.
        debug!("POST /api/auth/login");
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .map_err(Self::send_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // A rejected password is a caller-fixable input problem, not a
            // torn session; there is no credential to discard yet.
            let message =
                extract_detail(response).unwrap_or_else(|| "invalid email or password".to_string());
            return Err(ApiError::validation(message));
        }
        let token: TokenResponse = self
            .check(response)?
            .json()
            .map_err(|e| ApiError::remote(format!("malformed login response: {}", e)))?;
        Ok(Credential::new(token.token_type, token.access_token))
    }

    fn get_current_user(&self, cred: &Credential) -> Result<UserProfile, ApiError> {
        self.get_json(cred, "/api/auth/me")
    }

    fn update_profile(
        &self,
        cred: &Credential,
        patch: &ProfilePatch,
    ) -> Result<UserProfile, ApiError> {
        debug!("PUT /api/auth/me");
        let response = self
            .client
            .put(self.url("/api/auth/me"))
            .header("Authorization", cred.to_string())
            .json(patch)
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?
            .json()
            .map_err(|e| ApiError::remote(format!("malformed profile response: {}", e)))
    }

    fn create_account(&self, input: &RegistrationInput) -> Result<(), ApiError> {
        debug!("POST /api/auth/register");
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(input)
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?;
        Ok(())
    }

    fn list_resumes(&self, cred: &Credential) -> Result<Vec<ResumeRecord>, ApiError> {
        self.get_json(cred, "/api/resume/")
    }

    fn delete_resume(&self, cred: &Credential, id: i64) -> Result<(), ApiError> {
        self.delete(cred, &format!("/api/resume/{}", id))
    }

    fn run_analysis(
        &self,
        cred: &Credential,
        resume_id: i64,
        job: &JobDescriptionInput,
    ) -> Result<AnalysisResult, ApiError> {
        debug!("POST /api/analysis/analyze (resume {})", resume_id);
        let body = AnalysisRequest {
            resume_id,
            job_description: job,
        };
        let response = self
            .client
            .post(self.url("/api/analysis/analyze"))
            .header("Authorization", cred.to_string())
            .json(&body)
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?
            .json()
            .map_err(|e| ApiError::remote(format!("malformed analysis response: {}", e)))
    }

    fn list_analyses(
        &self,
        cred: &Credential,
        limit: usize,
    ) -> Result<Vec<AnalysisResult>, ApiError> {
        self.get_json(cred, &format!("/api/analysis/?limit={}", limit))
    }

    fn get_analysis(&self, cred: &Credential, id: i64) -> Result<AnalysisResult, ApiError> {
        self.get_json(cred, &format!("/api/analysis/{}", id))
    }

    fn delete_analysis(&self, cred: &Credential, id: i64) -> Result<(), ApiError> {
        self.delete(cred, &format!("/api/analysis/{}", id))
    }

    fn recommendations_for_analysis(
        &self,
        cred: &Credential,
        analysis_id: i64,
    ) -> Result<Vec<RecommendationRecord>, ApiError> {
        self.get_json(cred, &format!("/api/recommendations/analysis/{}", analysis_id))
    }

    fn ask_advisor(&self, cred: &Credential, message: &str) -> Result<AdvisorReply, ApiError> {
        debug!("POST /api/chat/ask");
        let body = AdvisorRequest {
            message,
            context: serde_json::json!({}),
        };
        let response = self
            .client
            .post(self.url("/api/chat/ask"))
            .header("Authorization", cred.to_string())
            .json(&body)
            .send()
            .map_err(Self::send_error)?;
        self.check(response)?
            .json()
            .map_err(|e| ApiError::remote(format!("malformed advisor response: {}", e)))
    }
}

/// Best-effort extraction of the service's `{"detail": "..."}` error body.
fn extract_detail(response: Response) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    let text = response.text().ok()?;
    let body: ErrorBody = serde_json::from_str(&text).ok()?;
    match body.detail {
        serde_json::Value::String(s) => Some(s),
        // Validation errors arrive as a list of field problems; flatten the
        // messages rather than dumping raw JSON at the user.
        serde_json::Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
        }
        _ => None,
    }
}

/// In-memory stand-in for the remote service, shared by the unit tests of
/// every component that talks to the boundary.
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::mpsc::Sender;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct FakeApi {
        pub auth_events: Option<Sender<AuthRejected>>,
        pub user: Option<UserProfile>,
        pub authenticate_error: Option<String>,
        pub register_error: Option<String>,
        /// `get_current_user` answers with `ApiError::Auth` (and publishes
        /// the rejection) instead of the stored user.
        pub reject_current_user: bool,
        /// `get_current_user` answers with `ApiError::Remote`.
        pub current_user_error: Option<String>,
        pub resumes: Vec<ResumeRecord>,
        pub analyses: Vec<AnalysisResult>,
        pub resumes_error: Option<String>,
        pub analyses_error: Option<String>,
        pub analysis: Option<AnalysisResult>,
        pub analysis_error: Option<String>,
        pub delete_analysis_error: Option<String>,
    }

    impl FakeApi {
        pub fn with_user(email: &str) -> Self {
            Self {
                user: Some(UserProfile {
                    id: 1,
                    email: email.to_string(),
                    username: email.split('@').next().unwrap_or(email).to_string(),
                    full_name: None,
                }),
                ..Self::default()
            }
        }

        pub fn with_events(mut self, tx: Sender<AuthRejected>) -> Self {
            self.auth_events = Some(tx);
            self
        }

        pub fn sample_analysis(id: i64, overall: f64) -> AnalysisResult {
            AnalysisResult {
                id,
                overall_match_score: overall,
                technical_skills_score: overall,
                experience_score: overall,
                education_score: overall,
                semantic_similarity_score: overall,
                matching_skills: vec!["rust".to_string()],
                missing_skills: vec!["kubernetes".to_string()],
                ats_feedback: vec![],
                created_at: Utc::now().naive_utc(),
            }
        }

        fn publish_rejection(&self) {
            if let Some(tx) = &self.auth_events {
                let _ = tx.send(AuthRejected);
            }
        }
    }

    impl MatchApi for FakeApi {
        fn authenticate(&self, _email: &str, _password: &str) -> Result<Credential, ApiError> {
            match &self.authenticate_error {
                Some(msg) => Err(ApiError::validation(msg.clone())),
                None => Ok(Credential::new("Bearer", "fake-token")),
            }
        }

        fn get_current_user(&self, _cred: &Credential) -> Result<UserProfile, ApiError> {
            if self.reject_current_user {
                self.publish_rejection();
                return Err(ApiError::Auth);
            }
            if let Some(msg) = &self.current_user_error {
                return Err(ApiError::remote(msg.clone()));
            }
            self.user.clone().ok_or_else(|| ApiError::remote("no user configured"))
        }

        fn update_profile(
            &self,
            cred: &Credential,
            patch: &ProfilePatch,
        ) -> Result<UserProfile, ApiError> {
            let mut user = self.get_current_user(cred)?;
            if let Some(email) = &patch.email {
                user.email = email.clone();
            }
            if let Some(username) = &patch.username {
                user.username = username.clone();
            }
            if let Some(full_name) = &patch.full_name {
                user.full_name = Some(full_name.clone());
            }
            Ok(user)
        }

        fn create_account(&self, _input: &RegistrationInput) -> Result<(), ApiError> {
            match &self.register_error {
                Some(msg) => Err(ApiError::validation(msg.clone())),
                None => Ok(()),
            }
        }

        fn list_resumes(&self, _cred: &Credential) -> Result<Vec<ResumeRecord>, ApiError> {
            match &self.resumes_error {
                Some(msg) => Err(ApiError::remote(msg.clone())),
                None => Ok(self.resumes.clone()),
            }
        }

        fn delete_resume(&self, _cred: &Credential, _id: i64) -> Result<(), ApiError> {
            Ok(())
        }

        fn run_analysis(
            &self,
            _cred: &Credential,
            _resume_id: i64,
            _job: &JobDescriptionInput,
        ) -> Result<AnalysisResult, ApiError> {
            if let Some(msg) = &self.analysis_error {
                return Err(ApiError::remote(msg.clone()));
            }
            Ok(self.analysis.clone().unwrap_or_else(|| Self::sample_analysis(1, 0.7)))
        }

        fn list_analyses(
            &self,
            _cred: &Credential,
            limit: usize,
        ) -> Result<Vec<AnalysisResult>, ApiError> {
            match &self.analyses_error {
                Some(msg) => Err(ApiError::remote(msg.clone())),
                None => Ok(self.analyses.iter().take(limit).cloned().collect()),
            }
        }

        fn get_analysis(&self, _cred: &Credential, id: i64) -> Result<AnalysisResult, ApiError> {
            self.analyses
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| ApiError::validation("Analysis not found"))
        }

        fn delete_analysis(&self, _cred: &Credential, _id: i64) -> Result<(), ApiError> {
            match &self.delete_analysis_error {
                Some(msg) => Err(ApiError::remote(msg.clone())),
                None => Ok(()),
            }
        }

        fn recommendations_for_analysis(
            &self,
            _cred: &Credential,
            _analysis_id: i64,
        ) -> Result<Vec<RecommendationRecord>, ApiError> {
            Ok(vec![])
        }

        fn ask_advisor(&self, _cred: &Credential, message: &str) -> Result<AdvisorReply, ApiError> {
            Ok(AdvisorReply {
                response: format!("echo: {}", message),
                suggestions: vec![],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let api = HttpApi::new("http://localhost:8000/", tx);
        assert_eq!(api.url("/api/auth/me"), "http://localhost:8000/api/auth/me");
    }

    #[test]
    fn test_profile_patch_skips_unset_fields() {
        let patch = ProfilePatch {
            full_name: Some("Ada Lovelace".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"full_name":"Ada Lovelace"}"#);
        assert!(!patch.is_empty());
        assert!(ProfilePatch::default().is_empty());
    }
}
