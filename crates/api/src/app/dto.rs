use serde::{Deserialize, Serialize};

use registrar_auth::{ClaimSet, IssuedTokens, ProfessorProfile, Session, StudentProfile};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub all_devices: bool,
}

// -------------------------
// Response DTOs
// -------------------------

/// Body of login and refresh responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(flatten)]
    pub tokens: IssuedTokens,
    pub user: ClaimSet,
    pub token_type: &'static str,
}

impl From<Session> for TokenResponse {
    fn from(session: Session) -> Self {
        Self {
            tokens: session.tokens,
            user: session.claims,
            token_type: "Bearer",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub revoked: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<StudentProfile> for ProfileResponse {
    fn from(s: StudentProfile) -> Self {
        Self {
            id: s.id.get(),
            code: s.code,
            first_name: s.first_name,
            last_name: s.last_name,
            email: s.email.map(String::from),
            phone_number: s.phone,
        }
    }
}

impl From<ProfessorProfile> for ProfileResponse {
    fn from(p: ProfessorProfile) -> Self {
        Self {
            id: p.id.get(),
            code: p.code,
            first_name: p.first_name,
            last_name: p.last_name,
            email: p.email.map(String::from),
            phone_number: p.phone,
        }
    }
}
