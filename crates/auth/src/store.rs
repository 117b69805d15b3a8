//! Storage collaborators of the auth boundary.
//!
//! The auth crate owns the contracts; `registrar-infra` provides the
//! implementations (in-memory for dev/tests, Postgres for refresh tokens).
//! All access is async I/O and no lock is held across these calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use registrar_core::{Email, ProfessorId, StudentId, UserId};

use crate::identity::{ProfessorProfile, Profile, ProfileLinks, StudentProfile, User};
use crate::Role;

/// A persisted refresh credential.
///
/// `token` is globally unique. Records are never updated in place: rotation
/// deletes and recreates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Which refresh records a deletion targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// One device: the presented token, only if it belongs to `user_id`.
    Owned { user_id: UserId, token: String },

    /// Every device of a user.
    User(UserId),

    /// Rotation sweep: the consumed token (if any) plus every expired record
    /// of the user.
    Stale {
        user_id: UserId,
        consumed: Option<String>,
        now: DateTime<Utc>,
    },
}

impl RecordFilter {
    pub fn user_id(&self) -> UserId {
        match self {
            RecordFilter::Owned { user_id, .. } => *user_id,
            RecordFilter::User(user_id) => *user_id,
            RecordFilter::Stale { user_id, .. } => *user_id,
        }
    }

    pub fn matches(&self, record: &RefreshTokenRecord) -> bool {
        if record.user_id != self.user_id() {
            return false;
        }
        match self {
            RecordFilter::Owned { token, .. } => record.token == *token,
            RecordFilter::User(_) => true,
            RecordFilter::Stale { consumed, now, .. } => {
                consumed.as_deref() == Some(record.token.as_str()) || record.is_expired(*now)
            }
        }
    }
}

/// Result of an atomic delete-then-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Matching records were deleted and the replacement inserted.
    Rotated { removed: u64 },

    /// The token that had to be consumed was not present (or already
    /// expired); the store is unchanged.
    Rejected,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistence of refresh-token records. Nothing else writes them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<RefreshTokenRecord>, StoreError>;

    /// Insert a record; a token value that already exists is `Duplicate`.
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    /// Delete every record matching `filter`, returning how many were removed.
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Atomically delete the records matching `filter` and insert `record`.
    ///
    /// With `require = Some(token)`, the operation only commits if that token
    /// was among the deleted rows and had not expired at `filter`'s `now`.
    /// Two concurrent calls requiring the same token therefore see exactly
    /// one `Rotated`.
    async fn replace(
        &self,
        filter: &RecordFilter,
        require: Option<&str>,
        record: RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError>;
}

/// Read access to users, their roles and linked academic profiles.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    async fn roles(&self, user_id: UserId) -> Result<Vec<Role>, StoreError>;

    async fn profile_links(&self, user_id: UserId) -> Result<ProfileLinks, StoreError>;

    async fn student_id_of(&self, user_id: UserId) -> Result<Option<StudentId>, StoreError>;

    async fn professor_id_of(&self, user_id: UserId) -> Result<Option<ProfessorId>, StoreError>;

    /// Look a student up by code, falling back to the numeric id.
    async fn find_student(&self, identifier: &str) -> Result<Option<StudentProfile>, StoreError>;

    /// Look a professor up by code, falling back to the numeric id.
    async fn find_professor(&self, identifier: &str)
        -> Result<Option<ProfessorProfile>, StoreError>;

    /// Link unclaimed profiles whose e-mail matches `email` to `user_id` and
    /// return the user's links afterwards.
    async fn link_profiles_by_email(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<ProfileLinks, StoreError>;

    async fn profile(&self, user_id: UserId) -> Result<Profile, StoreError> {
        Ok(Profile::from_links(self.profile_links(user_id).await?))
    }
}

/// Credentials and account state (password verification, lockout, roles).
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    async fn verify_password(&self, user_id: UserId, password: &str) -> Result<bool, StoreError>;

    async fn is_locked_out(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn can_sign_in(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn record_failed_sign_in(&self, user_id: UserId) -> Result<(), StoreError>;

    async fn reset_failed_sign_ins(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Create a user; an e-mail that is already registered is `Duplicate`.
    async fn create_user(&self, email: &Email, password: &str) -> Result<User, StoreError>;

    async fn assign_role(&self, user_id: UserId, role: &Role) -> Result<(), StoreError>;
}
