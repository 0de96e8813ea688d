use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Bearer credential for an authenticated session. Rendered and persisted
/// as a single `"<scheme> <token>"` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub scheme: String,
    pub token: String,
}

impl Credential {
    pub fn new(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: token.into(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scheme, self.token)
    }
}

impl FromStr for Credential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, token) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| format!("malformed credential: {:?}", s))?;
        if scheme.is_empty() || token.is_empty() {
            return Err(format!("malformed credential: {:?}", s));
        }
        Ok(Self::new(scheme, token))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: i64,
    pub filename: String,
    pub file_type: String, // "pdf", "docx", "txt"
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub extracted_skills: Vec<String>,
}

/// Draft job posting collected by the analyze wizard. Only `raw_text`
/// is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDescriptionInput {
    pub title: Option<String>,
    pub company: Option<String>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: i64,
    pub overall_match_score: f64,
    pub technical_skills_score: f64,
    pub experience_score: f64,
    pub education_score: f64,
    pub semantic_similarity_score: f64,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub ats_feedback: Vec<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub skill_name: String,
    pub recommendation_type: String, // "course", "certification", "tutorial", etc.
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub provider: Option<String>,
    pub duration: Option<String>,
    pub price: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorReply {
    pub response: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_round_trip() {
        let cred = Credential::new("Bearer", "abc.def.ghi");
        let rendered = cred.to_string();
        assert_eq!(rendered, "Bearer abc.def.ghi");
        assert_eq!(rendered.parse::<Credential>().unwrap(), cred);
    }

    #[test]
    fn test_credential_parse_rejects_garbage() {
        assert!("".parse::<Credential>().is_err());
        assert!("Bearer".parse::<Credential>().is_err());
        assert!("Bearer ".parse::<Credential>().is_err());
    }

    #[test]
    fn test_credential_parse_trims_whitespace() {
        let cred = " Bearer tok\n".parse::<Credential>().unwrap();
        assert_eq!(cred.scheme, "Bearer");
        assert_eq!(cred.token, "tok");
    }
}
