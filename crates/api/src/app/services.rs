//! Service wiring: stores, token codec, session manager and route policies.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use registrar_auth::{
    AccessTokenCodec, AccountStore, AuthError, Clock, CredentialStore, IdentityDirectory, Policy,
    Role, SessionManager, SystemClock, TokenError, TokenIssuer,
};
use registrar_infra::{InMemoryCredentialStore, InMemoryIdentityStore, PostgresCredentialStore};

use crate::config::{ApiConfig, BootstrapAdmin};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("failed to connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to bootstrap the admin account: {0}")]
    Bootstrap(AuthError),
}

/// Everything a handler needs, shared behind one `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: SessionManager,
    pub directory: Arc<dyn IdentityDirectory>,
    pub codec: Arc<AccessTokenCodec>,
    pub clock: Arc<dyn Clock>,
    pub student_owner: Policy,
    pub professor_owner: Policy,
}

impl AppServices {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        directory: Arc<dyn IdentityDirectory>,
        credentials: Arc<dyn CredentialStore>,
        codec: Arc<AccessTokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let issuer = TokenIssuer::new(credentials, codec.clone(), clock.clone());
        Self {
            sessions: SessionManager::new(accounts, directory.clone(), issuer),
            student_owner: Policy::student_owner(directory.clone()),
            professor_owner: Policy::professor_owner(directory.clone()),
            directory,
            codec,
            clock,
        }
    }
}

/// Build services from configuration.
///
/// Identity data lives in `identity`; refresh tokens go to Postgres when
/// `DATABASE_URL` is set, otherwise to memory.
pub async fn build_services(
    config: &ApiConfig,
    identity: Arc<InMemoryIdentityStore>,
) -> Result<AppServices, ServiceError> {
    let codec = Arc::new(AccessTokenCodec::hs256(
        config.jwt_secret.as_bytes(),
        config.token_settings(),
    )?);

    let credentials: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            tracing::info!("refresh tokens stored in postgres");
            Arc::new(PostgresCredentialStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; refresh tokens kept in memory");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let services = AppServices::new(
        identity.clone(),
        identity.clone(),
        credentials,
        codec,
        Arc::new(SystemClock),
    );

    if let Some(admin) = &config.admin {
        bootstrap_admin(&services, &identity, admin).await?;
    }

    Ok(services)
}

async fn bootstrap_admin(
    services: &AppServices,
    identity: &InMemoryIdentityStore,
    admin: &BootstrapAdmin,
) -> Result<(), ServiceError> {
    let claims = services
        .sessions
        .register(&admin.email, &admin.password)
        .await
        .map_err(ServiceError::Bootstrap)?;
    identity
        .assign_role(claims.user_id, &Role::ADMIN)
        .await
        .map_err(|e| ServiceError::Bootstrap(e.into()))?;
    tracing::info!(user_id = %claims.user_id, "admin account bootstrapped");
    Ok(())
}
