//! Token issuance and refresh-token rotation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::claims::ClaimSet;
use crate::clock::Clock;
use crate::identity::User;
use crate::store::{CredentialStore, RecordFilter, RefreshTokenRecord, RotationOutcome, StoreError};
use crate::token::{generate_refresh_token, AccessTokenCodec, TokenError};

/// An access/refresh pair with expiries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// The refresh token a rotation had to consume was gone (replayed, or
    /// consumed by a concurrent refresh).
    #[error("refresh token was already consumed")]
    RefreshTokenReplayed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Issues access/refresh pairs and rotates refresh tokens.
///
/// The issuer does not authenticate: deciding whether a presented refresh
/// token is acceptable is the refresh flow's job. It only guarantees the
/// delete-then-insert ordering, atomically, through
/// [`CredentialStore::replace`].
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    codec: Arc<AccessTokenCodec>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<AccessTokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, codec, clock }
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a pair for `user`, deleting `previous` (if given) and every
    /// expired record of the user first.
    ///
    /// An unknown `previous` simply matches nothing; without one, a login
    /// never touches the user's other live sessions.
    pub async fn issue_pair(
        &self,
        user: &User,
        claims: &ClaimSet,
        previous: Option<&str>,
    ) -> Result<IssuedTokens, IssueError> {
        self.issue(user, claims, previous, false).await
    }

    /// Like [`issue_pair`](Self::issue_pair), but the store commits only if
    /// `presented` is consumed by this very call. A replayed or concurrently
    /// rotated token yields [`IssueError::RefreshTokenReplayed`] and no new
    /// record.
    pub async fn rotate_pair(
        &self,
        user: &User,
        claims: &ClaimSet,
        presented: &str,
    ) -> Result<IssuedTokens, IssueError> {
        self.issue(user, claims, Some(presented), true).await
    }

    #[instrument(skip_all, fields(user_id = %user.id, rotating = previous.is_some()), err)]
    async fn issue(
        &self,
        user: &User,
        claims: &ClaimSet,
        previous: Option<&str>,
        strict: bool,
    ) -> Result<IssuedTokens, IssueError> {
        debug_assert_eq!(user.id, claims.user_id);
        let now = self.clock.now();

        let filter = RecordFilter::Stale {
            user_id: user.id,
            consumed: previous.map(str::to_owned),
            now,
        };
        let expires_at = now
            .checked_add_signed(self.codec.settings().refresh_lifetime)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let record = RefreshTokenRecord {
            token: generate_refresh_token(),
            user_id: user.id,
            created_at: now,
            expires_at,
        };
        let refresh_token = record.token.clone();
        let refresh_expires_at = record.expires_at;

        let require = if strict { previous } else { None };
        match self.store.replace(&filter, require, record).await? {
            RotationOutcome::Rotated { removed } => {
                debug!(removed, "refresh lineage rotated");
            }
            RotationOutcome::Rejected => return Err(IssueError::RefreshTokenReplayed),
        }

        let (access_token, access_expires_at) = self.codec.sign(claims, now)?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_expires_at,
            refresh_token_expires_at: refresh_expires_at,
        })
    }
}
