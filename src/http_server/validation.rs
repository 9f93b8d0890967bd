//! Request Validation
//!
//! Typed request bodies and the field rules applied to them.

use std::sync::OnceLock;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{ApiError, ApiResult};

/// Field rules checked after a body deserializes
pub trait Validate {
    fn validate(&self) -> ApiResult<()>;
}

/// Unwrap a JSON body and run its field rules
pub fn validated<T: Validate>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = body?;
    value.validate()?;
    Ok(value)
}

fn username_pattern() -> ApiResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,50}$"))
        .as_ref()
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// 3-50 characters, ASCII letters, digits and underscores
pub fn validate_username(username: &str) -> ApiResult<()> {
    if username_pattern()?.is_match(username) {
        Ok(())
    } else {
        Err(ApiError::ValidationFailed(
            "Username must be 3-50 characters and contain only letters, numbers and underscores"
                .to_string(),
        ))
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::ValidationFailed(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn check_max(field: &str, value: Option<&String>, max: usize) -> ApiResult<()> {
    match value {
        Some(v) => check_len(field, v, 0, max),
        None => Ok(()),
    }
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationFailed(format!("{} is required", field)));
    }
    Ok(())
}

// ==================
// Auth
// ==================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.email.is_empty() || self.password.is_empty() || self.username.is_empty() {
            return Err(ApiError::ValidationFailed(
                "Email, password and username are required".to_string(),
            ));
        }
        validate_username(&self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ApiError::ValidationFailed(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================
// Profiles
// ==================

/// Partial profile update; unknown fields are rejected
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_experience: Option<Vec<String>>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> ApiResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        check_max("full_name", self.full_name.as_ref(), 100)?;
        check_max("bio", self.bio.as_ref(), 500)?;
        check_max("avatar_url", self.avatar_url.as_ref(), 255)?;
        check_max("country", self.country.as_ref(), 100)?;
        Ok(())
    }
}

// ==================
// Documents & speeches
// ==================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    PositionPaper,
    Research,
    Notes,
    Resolution,
    Amendment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechType {
    Opening,
    Closing,
    ModeratedCaucus,
    UnmoderatedCaucus,
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub document_type: DocumentType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee_id: Option<String>,
}

impl Validate for NewDocument {
    fn validate(&self) -> ApiResult<()> {
        check_len("title", &self.title, 1, 255)?;
        require_non_empty("content", &self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee_id: Option<String>,
}

impl Validate for DocumentUpdate {
    fn validate(&self) -> ApiResult<()> {
        if let Some(title) = &self.title {
            check_len("title", title, 1, 255)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NewSpeech {
    pub title: String,
    pub content: String,
    pub speech_type: SpeechType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee_id: Option<String>,
}

fn check_duration(duration: Option<u32>) -> ApiResult<()> {
    match duration {
        Some(d) if d > 3600 => Err(ApiError::ValidationFailed(
            "duration_seconds must be between 0 and 3600".to_string(),
        )),
        _ => Ok(()),
    }
}

impl Validate for NewSpeech {
    fn validate(&self) -> ApiResult<()> {
        check_len("title", &self.title, 1, 255)?;
        require_non_empty("content", &self.content)?;
        check_duration(self.duration_seconds)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_type: Option<SpeechType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee_id: Option<String>,
}

impl Validate for SpeechUpdate {
    fn validate(&self) -> ApiResult<()> {
        if let Some(title) = &self.title {
            check_len("title", title, 1, 255)?;
        }
        check_duration(self.duration_seconds)
    }
}

// ==================
// Committees
// ==================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NewCommittee {
    pub name: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub conference_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_date: Option<chrono::NaiveDate>,
}

impl Validate for NewCommittee {
    fn validate(&self) -> ApiResult<()> {
        check_len("name", &self.name, 1, 255)?;
        check_len("topic", &self.topic, 1, 255)?;
        check_len("conference_name", &self.conference_name, 1, 255)
    }
}
