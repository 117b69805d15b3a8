//! Per-request authorization: ownership requirements and the admin bypass.
//!
//! Route identifiers are dual-typed: people use codes (`"000123"`), internal
//! links use numeric ids (`"42"`). Claims only carry the code, so the
//! directory is consulted as a fallback, never on the common path.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use registrar_core::UserId;

use crate::claims::ClaimSet;
use crate::store::{IdentityDirectory, StoreError};

/// The authenticated caller, passed explicitly into every check and handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: UserId,
    pub claims: ClaimSet,
}

impl CallerContext {
    pub fn new(claims: ClaimSet) -> Self {
        Self {
            user_id: claims.user_id,
            claims,
        }
    }
}

/// Outcome of a single check. A check never denies by itself; it either
/// grants or stays silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Grant,
    Abstain,
}

/// Outcome of a whole policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    pub fn is_granted(self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// A single authorization rule evaluated against the route's resource
/// identifier.
#[async_trait]
pub trait AuthorizationCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, caller: &CallerContext, resource: &str) -> Result<Verdict, StoreError>;
}

/// Grants when the caller holds an administrative role.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdminBypass;

#[async_trait]
impl AuthorizationCheck for AdminBypass {
    fn name(&self) -> &'static str {
        "admin_bypass"
    }

    async fn evaluate(
        &self,
        caller: &CallerContext,
        _resource: &str,
    ) -> Result<Verdict, StoreError> {
        Ok(if caller.claims.is_admin() {
            Verdict::Grant
        } else {
            Verdict::Abstain
        })
    }
}

/// Kind of academic record an ownership requirement protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Student,
    Professor,
}

impl Subject {
    fn code_claim<'a>(&self, claims: &'a ClaimSet) -> Option<&'a str> {
        match self {
            Subject::Student => claims.student_code.as_deref(),
            Subject::Professor => claims.professor_code.as_deref(),
        }
    }

    async fn profile_id(
        &self,
        directory: &dyn IdentityDirectory,
        user_id: UserId,
    ) -> Result<Option<i64>, StoreError> {
        Ok(match self {
            Subject::Student => directory.student_id_of(user_id).await?.map(i64::from),
            Subject::Professor => directory.professor_id_of(user_id).await?.map(i64::from),
        })
    }
}

/// "The caller owns the record named by the route identifier."
#[derive(Clone)]
pub struct OwnershipRequirement {
    subject: Subject,
    directory: Arc<dyn IdentityDirectory>,
}

impl OwnershipRequirement {
    pub fn new(subject: Subject, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { subject, directory }
    }

    pub fn student(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new(Subject::Student, directory)
    }

    pub fn professor(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new(Subject::Professor, directory)
    }

    /// Code claim first (no I/O), then the caller's numeric profile id.
    #[instrument(skip(self, caller), fields(subject = ?self.subject, user_id = %caller.user_id))]
    pub async fn resolve(
        &self,
        route_identifier: &str,
        caller: &CallerContext,
    ) -> Result<Verdict, StoreError> {
        if self.subject.code_claim(&caller.claims) == Some(route_identifier) {
            return Ok(Verdict::Grant);
        }

        let Ok(requested) = route_identifier.trim().parse::<i64>() else {
            return Ok(Verdict::Abstain);
        };
        match self.subject.profile_id(self.directory.as_ref(), caller.user_id).await? {
            Some(own) if own == requested => Ok(Verdict::Grant),
            _ => {
                debug!("ownership not established");
                Ok(Verdict::Abstain)
            }
        }
    }
}

#[async_trait]
impl AuthorizationCheck for OwnershipRequirement {
    fn name(&self) -> &'static str {
        match self.subject {
            Subject::Student => "student_ownership",
            Subject::Professor => "professor_ownership",
        }
    }

    async fn evaluate(
        &self,
        caller: &CallerContext,
        resource: &str,
    ) -> Result<Verdict, StoreError> {
        self.resolve(resource, caller).await
    }
}

/// Ordered combination of checks.
///
/// Bypass checks run first; the first one that grants short-circuits the rest
/// and the request is granted. Otherwise every requirement must grant. A
/// policy with no requirements and no granting bypass is denied.
#[derive(Clone, Default)]
pub struct Policy {
    bypasses: Vec<Arc<dyn AuthorizationCheck>>,
    requirements: Vec<Arc<dyn AuthorizationCheck>>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Student-ownership policy with the admin bypass in front.
    pub fn student_owner(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new()
            .bypass(AdminBypass)
            .require(OwnershipRequirement::student(directory))
    }

    /// Professor-ownership policy with the admin bypass in front.
    pub fn professor_owner(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new()
            .bypass(AdminBypass)
            .require(OwnershipRequirement::professor(directory))
    }

    pub fn bypass(mut self, check: impl AuthorizationCheck + 'static) -> Self {
        self.bypasses.push(Arc::new(check));
        self
    }

    pub fn require(mut self, check: impl AuthorizationCheck + 'static) -> Self {
        self.requirements.push(Arc::new(check));
        self
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn evaluate(
        &self,
        caller: &CallerContext,
        resource: &str,
    ) -> Result<Decision, StoreError> {
        for check in &self.bypasses {
            if check.evaluate(caller, resource).await? == Verdict::Grant {
                debug!(check = check.name(), "bypass granted");
                return Ok(Decision::Granted);
            }
        }

        if self.requirements.is_empty() {
            return Ok(Decision::Denied);
        }
        for check in &self.requirements {
            if check.evaluate(caller, resource).await? != Verdict::Grant {
                debug!(check = check.name(), "requirement not satisfied");
                return Ok(Decision::Denied);
            }
        }
        Ok(Decision::Granted)
    }
}
