//! Session flows: login, registration, refresh and logout.
//!
//! Transport-agnostic. The API layer extracts credentials from cookies and
//! headers and maps [`AuthError`] to responses.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use registrar_core::Email;

use crate::assembler::assemble;
use crate::claims::ClaimSet;
use crate::error::AuthError;
use crate::identity::{Profile, User};
use crate::issuer::{IssuedTokens, TokenIssuer};
use crate::policy::CallerContext;
use crate::store::{AccountStore, IdentityDirectory, RecordFilter, StoreError};

/// A freshly issued credential pair plus the claims it was minted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub tokens: IssuedTokens,
    pub claims: ClaimSet,
}

#[derive(Clone)]
pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    directory: Arc<dyn IdentityDirectory>,
    issuer: TokenIssuer,
}

impl SessionManager {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        directory: Arc<dyn IdentityDirectory>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            accounts,
            directory,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Claims from the user's *current* roles and profile links.
    pub async fn claims_for(&self, user: &User) -> Result<ClaimSet, AuthError> {
        let roles = self.directory.roles(user.id).await?;
        let profile = self.directory.profile(user.id).await?;
        Ok(assemble(user, &profile, &roles))
    }

    #[instrument(skip(self, password), err(level = "info"))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };
        let user = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if self.accounts.is_locked_out(user.id).await? {
            warn!(user_id = %user.id, "sign-in rejected: account locked out");
            return Err(AuthError::AccountLocked);
        }
        if !self.accounts.can_sign_in(user.id).await? {
            warn!(user_id = %user.id, "sign-in rejected: sign-in not allowed");
            return Err(AuthError::SignInNotAllowed);
        }
        if !self.accounts.verify_password(user.id, password).await? {
            self.accounts.record_failed_sign_in(user.id).await?;
            return Err(AuthError::InvalidCredentials);
        }
        self.accounts.reset_failed_sign_ins(user.id).await?;

        let claims = self.claims_for(&user).await?;
        let tokens = self.issuer.issue_pair(&user, &claims, None).await?;
        info!(user_id = %user.id, "signed in");

        Ok(Session { tokens, claims })
    }

    /// Create an account, link any pre-existing profile sharing the
    /// normalized e-mail, assign the role that profile implies, and return
    /// the resulting claims.
    #[instrument(skip(self, password), err(level = "info"))]
    pub async fn register(&self, email: &str, password: &str) -> Result<ClaimSet, AuthError> {
        let email = Email::parse(email)?;
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let user = self
            .accounts
            .create_user(&email, password)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AuthError::DuplicateEmail,
                other => AuthError::Store(other),
            })?;

        let links = self.directory.link_profiles_by_email(user.id, &email).await?;
        let role = Profile::from_links(links).implied_role();
        self.accounts.assign_role(user.id, &role).await?;
        info!(user_id = %user.id, %role, "registered");

        self.claims_for(&user).await
    }

    /// Exchange a valid refresh token for a new pair, consuming it.
    ///
    /// Unknown, expired and already-consumed tokens are indistinguishable to
    /// the caller and never cause a new record to be written.
    #[instrument(skip_all, err(level = "info"))]
    pub async fn refresh(&self, presented: &str) -> Result<Session, AuthError> {
        let now = self.issuer.now();
        let record = self
            .issuer
            .store()
            .find_by_token(presented)
            .await?
            .ok_or(AuthError::RefreshTokenInvalid)?;
        if record.is_expired(now) {
            return Err(AuthError::RefreshTokenInvalid);
        }

        let Some(user) = self.directory.find_user(record.user_id).await? else {
            error!(user_id = %record.user_id, "refresh token references a missing user");
            return Err(AuthError::UserMissing(record.user_id));
        };

        // Profile linkage may have changed since the previous pair.
        let claims = self.claims_for(&user).await?;
        let tokens = self.issuer.rotate_pair(&user, &claims, presented).await?;

        Ok(Session { tokens, claims })
    }

    /// Revoke the presented token, or every token of the caller.
    #[instrument(skip(self, caller, presented), fields(user_id = %caller.user_id), err)]
    pub async fn logout(
        &self,
        caller: &CallerContext,
        presented: &str,
        all_devices: bool,
    ) -> Result<u64, AuthError> {
        let filter = if all_devices {
            RecordFilter::User(caller.user_id)
        } else {
            RecordFilter::Owned {
                user_id: caller.user_id,
                token: presented.to_owned(),
            }
        };

        let removed = self.issuer.store().delete_many(&filter).await?;
        info!(removed, all_devices, "signed out");
        Ok(removed)
    }
}
