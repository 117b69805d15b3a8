//! Integration tests for the session flows over the in-memory adapters.
//!
//! Tests: SessionManager → AccountStore/IdentityDirectory → TokenIssuer → CredentialStore
//!
//! Verifies:
//! - Login, registration and refresh produce claims from current directory state
//! - Refresh tokens are single use, including under concurrent presentation
//! - Logout is scoped to the caller

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use registrar_auth::{
        AccessTokenCodec, AccountStore, AuthError, CallerContext, Clock, CredentialStore,
        FailureKind, FixedClock, ProfessorProfile, Role, SessionManager, StudentProfile,
        TokenIssuer, TokenSettings,
    };
    use registrar_core::{Email, ProfessorId, StudentId};

    use crate::credentials::InMemoryCredentialStore;
    use crate::identity::InMemoryIdentityStore;

    const SECRET: &[u8] = b"an-integration-test-secret-of-sufficient-length";

    struct Harness {
        sessions: SessionManager,
        identity: Arc<InMemoryIdentityStore>,
        credentials: Arc<InMemoryCredentialStore>,
        clock: FixedClock,
    }

    fn setup() -> Harness {
        let clock = FixedClock::new(Utc::now());
        let identity = Arc::new(InMemoryIdentityStore::with_clock(Arc::new(clock.clone())));
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let settings = TokenSettings::new("registrar", "registrar-clients");
        let codec = AccessTokenCodec::hs256(SECRET, settings).unwrap();
        let issuer = TokenIssuer::new(
            credentials.clone(),
            Arc::new(codec),
            Arc::new(clock.clone()),
        );
        let sessions = SessionManager::new(identity.clone(), identity.clone(), issuer);

        Harness {
            sessions,
            identity,
            credentials,
            clock,
        }
    }

    fn student(id: i64, code: &str, email: &str) -> StudentProfile {
        StudentProfile {
            id: StudentId::new(id),
            user_id: None,
            code: code.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Email::parse(email).ok(),
            phone: Some("555-0100".to_string()),
        }
    }

    fn professor(id: i64, code: &str, email: &str) -> ProfessorProfile {
        ProfessorProfile {
            id: ProfessorId::new(id),
            user_id: None,
            code: code.to_string(),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: Email::parse(email).ok(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn login_issues_a_pair_and_stores_one_refresh_record() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();

        let session = h.sessions.login("a@b.com", "Valid1!").await.unwrap();

        assert!(!session.tokens.access_token.is_empty());
        assert!(!session.tokens.refresh_token.is_empty());
        assert!(session.tokens.refresh_token_expires_at > session.tokens.access_token_expires_at);
        assert_eq!(session.claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(session.claims.roles, vec![Role::USER]);

        let verified = h
            .sessions
            .issuer()
            .codec()
            .verify(&session.tokens.access_token, h.clock.now())
            .unwrap();
        assert_eq!(verified.claims, session.claims);

        let stored = h
            .credentials
            .find_by_token(&session.tokens.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, session.claims.user_id);
        assert_eq!(h.credentials.len(), 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();

        let unknown = h.sessions.login("nobody@b.com", "Valid1!").await.unwrap_err();
        let wrong = h.sessions.login("a@b.com", "nope").await.unwrap_err();
        let malformed = h.sessions.login("not-an-email", "Valid1!").await.unwrap_err();

        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(malformed, AuthError::InvalidCredentials);
        assert!(h.credentials.is_empty());
    }

    #[tokio::test]
    async fn locked_account_is_rejected_even_with_the_right_password() {
        let h = setup();
        let claims = h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        h.identity
            .lock_out_until(claims.user_id, Utc::now() + Duration::days(1))
            .unwrap();

        let err = h.sessions.login("a@b.com", "Valid1!").await.unwrap_err();

        assert_eq!(err, AuthError::AccountLocked);
        assert_eq!(err.kind(), FailureKind::AccountState);
        assert!(h.credentials.is_empty());
    }

    #[tokio::test]
    async fn repeated_bad_passwords_lock_the_account() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();

        for _ in 0..5 {
            let err = h.sessions.login("a@b.com", "wrong").await.unwrap_err();
            assert_eq!(err, AuthError::InvalidCredentials);
        }

        let err = h.sessions.login("a@b.com", "Valid1!").await.unwrap_err();
        assert_eq!(err, AuthError::AccountLocked);
    }

    #[tokio::test]
    async fn sign_in_can_be_disallowed() {
        let h = setup();
        let claims = h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        h.identity.set_sign_in_allowed(claims.user_id, false).unwrap();

        let err = h.sessions.login("a@b.com", "Valid1!").await.unwrap_err();
        assert_eq!(err, AuthError::SignInNotAllowed);
    }

    #[tokio::test]
    async fn register_links_a_student_record_with_the_same_email() {
        let h = setup();
        h.identity
            .add_student(student(42, "000123", "grace@campus.edu"))
            .unwrap();

        let claims = h
            .sessions
            .register("  Grace@Campus.EDU ", "Valid1!")
            .await
            .unwrap();

        assert_eq!(claims.roles, vec![Role::STUDENT]);
        assert_eq!(claims.student_code.as_deref(), Some("000123"));
        assert_eq!(claims.first_name.as_deref(), Some("Grace"));
        assert_eq!(claims.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(claims.professor_code, None);
    }

    #[tokio::test]
    async fn register_links_a_professor_record_with_the_same_email() {
        let h = setup();
        h.identity
            .add_professor(professor(7, "P-007", "alan@campus.edu"))
            .unwrap();

        let claims = h.sessions.register("alan@campus.edu", "Valid1!").await.unwrap();

        assert_eq!(claims.roles, vec![Role::PROFESSOR]);
        assert_eq!(claims.professor_code.as_deref(), Some("P-007"));
        assert_eq!(claims.student_code, None);
    }

    #[tokio::test]
    async fn registering_twice_is_a_conflict() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();

        let err = h.sessions.register("A@B.com", "Other1!").await.unwrap_err();

        assert_eq!(err, AuthError::DuplicateEmail);
        assert_eq!(err.kind(), FailureKind::Conflict);
    }

    #[tokio::test]
    async fn malformed_email_is_a_validation_failure_on_register() {
        let h = setup();
        let err = h.sessions.register("no-at-sign", "Valid1!").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[tokio::test]
    async fn refresh_rotates_and_the_old_token_cannot_be_replayed() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let first = h.sessions.login("a@b.com", "Valid1!").await.unwrap();

        let second = h.sessions.refresh(&first.tokens.refresh_token).await.unwrap();
        assert_ne!(second.tokens.refresh_token, first.tokens.refresh_token);

        let replay = h.sessions.refresh(&first.tokens.refresh_token).await.unwrap_err();
        assert_eq!(replay, AuthError::RefreshTokenInvalid);

        assert!(h.sessions.refresh(&second.tokens.refresh_token).await.is_ok());
        assert_eq!(h.credentials.len(), 1);
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected_without_writing_a_record() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let session = h.sessions.login("a@b.com", "Valid1!").await.unwrap();

        h.clock.advance(Duration::days(8));
        let err = h.sessions.refresh(&session.tokens.refresh_token).await.unwrap_err();

        assert_eq!(err, AuthError::RefreshTokenInvalid);
        assert_eq!(err.kind(), FailureKind::Authentication);
        assert_eq!(h.credentials.len(), 1);
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_rejected() {
        let h = setup();
        let err = h.sessions.refresh("never-issued").await.unwrap_err();
        assert_eq!(err, AuthError::RefreshTokenInvalid);
        assert!(h.credentials.is_empty());
    }

    #[tokio::test]
    async fn refresh_reflects_role_changes_since_login() {
        let h = setup();
        let claims = h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let session = h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        assert!(!session.claims.is_admin());

        h.identity.assign_role(claims.user_id, &Role::ADMIN).await.unwrap();
        let refreshed = h.sessions.refresh(&session.tokens.refresh_token).await.unwrap();

        assert!(refreshed.claims.is_admin());
        assert_eq!(refreshed.claims.roles, vec![Role::USER, Role::ADMIN]);
    }

    #[tokio::test]
    async fn refresh_for_a_deleted_user_is_a_missing_resource() {
        let h = setup();
        let claims = h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let session = h.sessions.login("a@b.com", "Valid1!").await.unwrap();

        h.identity.remove_user(claims.user_id).unwrap();
        let err = h.sessions.refresh(&session.tokens.refresh_token).await.unwrap_err();

        assert_eq!(err, AuthError::UserMissing(claims.user_id));
        assert_eq!(err.kind(), FailureKind::MissingResource);
    }

    #[tokio::test]
    async fn concurrent_refreshes_of_one_token_succeed_once() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let session = h.sessions.login("a@b.com", "Valid1!").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sessions = h.sessions.clone();
            let token = session.tokens.refresh_token.clone();
            handles.push(tokio::spawn(async move { sessions.refresh(&token).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, AuthError::RefreshTokenInvalid),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(h.credentials.len(), 1);
    }

    #[tokio::test]
    async fn logout_revokes_only_the_presented_session() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        let laptop = h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        let phone = h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        let caller = CallerContext::new(laptop.claims.clone());

        let removed = h
            .sessions
            .logout(&caller, &laptop.tokens.refresh_token, false)
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            h.sessions.refresh(&laptop.tokens.refresh_token).await.unwrap_err(),
            AuthError::RefreshTokenInvalid
        );
        assert!(h.sessions.refresh(&phone.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_everywhere_leaves_other_users_alone() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        h.sessions.register("c@d.com", "Valid1!").await.unwrap();
        let first = h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        let other = h.sessions.login("c@d.com", "Valid1!").await.unwrap();
        let caller = CallerContext::new(first.claims.clone());

        let removed = h
            .sessions
            .logout(&caller, &first.tokens.refresh_token, true)
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(h.credentials.find_by_user(caller.user_id).await.unwrap().is_empty());
        assert!(h.sessions.refresh(&other.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_cannot_revoke_another_users_token() {
        let h = setup();
        h.sessions.register("a@b.com", "Valid1!").await.unwrap();
        h.sessions.register("c@d.com", "Valid1!").await.unwrap();
        let mine = h.sessions.login("a@b.com", "Valid1!").await.unwrap();
        let theirs = h.sessions.login("c@d.com", "Valid1!").await.unwrap();
        let caller = CallerContext::new(mine.claims.clone());

        let removed = h
            .sessions
            .logout(&caller, &theirs.tokens.refresh_token, false)
            .await
            .unwrap();

        assert_eq!(removed, 0);
        assert!(h.credentials.find_by_token(&theirs.tokens.refresh_token).await.unwrap().is_some());
    }
}
