//! `registrar-auth`: identity and session boundary.
//!
//! Claim assembly, access/refresh token lifecycle and ownership authorization.
//! This crate is decoupled from HTTP; storage is reached only through the
//! traits in [`store`].

pub mod assembler;
pub mod claims;
pub mod clock;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod policy;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

#[cfg(test)]
mod testing;

pub use assembler::assemble;
pub use claims::{validate_window, AccessClaims, ClaimSet, TokenValidationError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, FailureKind};
pub use identity::{ProfessorProfile, Profile, ProfileLinks, StudentProfile, User};
pub use issuer::{IssueError, IssuedTokens, TokenIssuer};
pub use policy::{
    AdminBypass, AuthorizationCheck, CallerContext, Decision, OwnershipRequirement, Policy,
    Subject, Verdict,
};
pub use roles::Role;
pub use session::{Session, SessionManager};
pub use store::{
    AccountStore, CredentialStore, IdentityDirectory, RecordFilter, RefreshTokenRecord,
    RotationOutcome, StoreError,
};
pub use token::{generate_refresh_token, AccessTokenCodec, TokenError, TokenSettings};
