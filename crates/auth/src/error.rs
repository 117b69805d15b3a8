use thiserror::Error;

use registrar_core::{DomainError, UserId};

use crate::issuer::IssueError;
use crate::store::StoreError;
use crate::token::TokenError;

/// Coarse classification used at the boundary to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad credentials, unknown/expired/consumed refresh token, no session.
    Authentication,
    /// Locked out or not allowed to sign in. Same status class as
    /// `Authentication` externally, distinct in logs.
    AccountState,
    Conflict,
    /// Store inconsistency (e.g. a live refresh token for a deleted user).
    MissingResource,
    Validation,
    Internal,
}

/// Failures of the session flows (login, register, refresh, logout).
///
/// `InvalidCredentials` deliberately covers both "no such user" and "wrong
/// password".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no session credential was presented")]
    SessionMissing,

    #[error("refresh token is unknown, expired or already used")]
    RefreshTokenInvalid,

    #[error("account is locked out")]
    AccountLocked,

    #[error("sign-in is not allowed for this account")]
    SignInNotAllowed,

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("user {0} referenced by a refresh token does not exist")]
    UserMissing(UserId),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::SessionMissing
            | AuthError::RefreshTokenInvalid => FailureKind::Authentication,
            AuthError::AccountLocked | AuthError::SignInNotAllowed => FailureKind::AccountState,
            AuthError::DuplicateEmail => FailureKind::Conflict,
            AuthError::UserMissing(_) => FailureKind::MissingResource,
            AuthError::Validation(_) => FailureKind::Validation,
            AuthError::Store(_) | AuthError::Token(_) => FailureKind::Internal,
        }
    }
}

impl From<IssueError> for AuthError {
    fn from(value: IssueError) -> Self {
        match value {
            IssueError::RefreshTokenReplayed => AuthError::RefreshTokenInvalid,
            IssueError::Store(e) => AuthError::Store(e),
            IssueError::Token(e) => AuthError::Token(e),
        }
    }
}
