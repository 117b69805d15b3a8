use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use registrar_auth::{
    AccountStore, Clock, IdentityDirectory, ProfessorProfile, ProfileLinks, Role, StoreError,
    StudentProfile, SystemClock, User,
};
use registrar_core::{Email, Entity, ProfessorId, StudentId, UserId};

use crate::password::{hash_password, verify_password};

/// Lockout bookkeeping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    email: Email,
    password_hash: String,
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    sign_in_allowed: bool,
}

#[derive(Debug, Default)]
struct State {
    last_user_id: i64,
    accounts: HashMap<UserId, Account>,
    roles: HashMap<UserId, Vec<Role>>,
    students: Vec<StudentProfile>,
    professors: Vec<ProfessorProfile>,
}

impl State {
    fn user(&self, id: UserId) -> Option<User> {
        self.accounts.get(&id).map(|a| User {
            id: a.id,
            email: Some(a.email.clone()),
            roles: self.roles.get(&id).cloned().unwrap_or_default(),
        })
    }

    fn links(&self, user_id: UserId) -> ProfileLinks {
        ProfileLinks {
            student: self
                .students
                .iter()
                .find(|s| s.user_id == Some(user_id))
                .cloned(),
            professor: self
                .professors
                .iter()
                .find(|p| p.user_id == Some(user_id))
                .cloned(),
        }
    }
}

fn find_by_id<E: Entity>(records: &[E], id: E::Id) -> Option<&E> {
    records.iter().find(|r| r.id() == id)
}

/// In-memory identity store: accounts, roles and academic profiles.
///
/// Implements both [`AccountStore`] and [`IdentityDirectory`] over one shared
/// state, the way a single identity database would. Intended for tests/dev.
#[derive(Clone)]
pub struct InMemoryIdentityStore {
    state: Arc<RwLock<State>>,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            lockout: LockoutPolicy::default(),
            clock,
        }
    }

    pub fn with_lockout(mut self, lockout: LockoutPolicy) -> Self {
        self.lockout = lockout;
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn with_account<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut Account) -> T,
    ) -> Result<T, StoreError> {
        let mut state = self.write()?;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Storage(format!("unknown user {user_id}")))?;
        Ok(f(account))
    }

    /// Add a student record (profile CRUD lives outside this subsystem).
    pub fn add_student(&self, student: StudentProfile) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.students.iter().any(|s| s.id == student.id || s.code == student.code) {
            return Err(StoreError::Duplicate(format!("student {}", student.code)));
        }
        state.students.push(student);
        Ok(())
    }

    /// Add a professor record.
    pub fn add_professor(&self, professor: ProfessorProfile) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state
            .professors
            .iter()
            .any(|p| p.id == professor.id || p.code == professor.code)
        {
            return Err(StoreError::Duplicate(format!("professor {}", professor.code)));
        }
        state.professors.push(professor);
        Ok(())
    }

    pub fn lock_out_until(&self, user_id: UserId, until: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_account(user_id, |a| a.locked_until = Some(until))
    }

    pub fn set_sign_in_allowed(&self, user_id: UserId, allowed: bool) -> Result<(), StoreError> {
        self.with_account(user_id, |a| a.sign_in_allowed = allowed)
    }

    /// Remove a user account (profiles stay, unlinked).
    pub fn remove_user(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.accounts.remove(&user_id);
        state.roles.remove(&user_id);
        for s in state.students.iter_mut().filter(|s| s.user_id == Some(user_id)) {
            s.user_id = None;
        }
        for p in state.professors.iter_mut().filter(|p| p.user_id == Some(user_id)) {
            p.user_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let state = self.read()?;
        let id = state.accounts.values().find(|a| a.email == *email).map(|a| a.id);
        Ok(id.and_then(|id| state.user(id)))
    }

    async fn verify_password(&self, user_id: UserId, password: &str) -> Result<bool, StoreError> {
        let hash = {
            let state = self.read()?;
            match state.accounts.get(&user_id) {
                Some(account) => account.password_hash.clone(),
                None => return Ok(false),
            }
        };
        verify_password(password, &hash)
    }

    async fn is_locked_out(&self, user_id: UserId) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let state = self.read()?;
        Ok(state
            .accounts
            .get(&user_id)
            .and_then(|a| a.locked_until)
            .is_some_and(|until| until > now))
    }

    async fn can_sign_in(&self, user_id: UserId) -> Result<bool, StoreError> {
        let state = self.read()?;
        Ok(state.accounts.get(&user_id).is_some_and(|a| a.sign_in_allowed))
    }

    async fn record_failed_sign_in(&self, user_id: UserId) -> Result<(), StoreError> {
        let now = self.clock.now();
        let policy = self.lockout;
        self.with_account(user_id, |a| {
            a.failed_attempts += 1;
            if a.failed_attempts >= policy.max_failed_attempts {
                a.failed_attempts = 0;
                a.locked_until = Some(now + policy.lockout);
                tracing::warn!(user_id = %a.id, "account locked after repeated failures");
            }
        })
    }

    async fn reset_failed_sign_ins(&self, user_id: UserId) -> Result<(), StoreError> {
        self.with_account(user_id, |a| a.failed_attempts = 0)
    }

    async fn create_user(&self, email: &Email, password: &str) -> Result<User, StoreError> {
        let password_hash = hash_password(password)?;

        let mut state = self.write()?;
        if state.accounts.values().any(|a| a.email == *email) {
            return Err(StoreError::Duplicate(format!("email {email}")));
        }
        state.last_user_id += 1;
        let id = UserId::new(state.last_user_id);
        state.accounts.insert(
            id,
            Account {
                id,
                email: email.clone(),
                password_hash,
                failed_attempts: 0,
                locked_until: None,
                sign_in_allowed: true,
            },
        );

        Ok(User::new(id, Some(email.clone())))
    }

    async fn assign_role(&self, user_id: UserId, role: &Role) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.accounts.contains_key(&user_id) {
            return Err(StoreError::Storage(format!("unknown user {user_id}")));
        }
        let roles = state.roles.entry(user_id).or_default();
        if !roles.contains(role) {
            roles.push(role.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.user(user_id))
    }

    async fn roles(&self, user_id: UserId) -> Result<Vec<Role>, StoreError> {
        Ok(self.read()?.roles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn profile_links(&self, user_id: UserId) -> Result<ProfileLinks, StoreError> {
        Ok(self.read()?.links(user_id))
    }

    async fn student_id_of(&self, user_id: UserId) -> Result<Option<StudentId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .students
            .iter()
            .find(|s| s.user_id == Some(user_id))
            .map(|s| s.id))
    }

    async fn professor_id_of(&self, user_id: UserId) -> Result<Option<ProfessorId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .professors
            .iter()
            .find(|p| p.user_id == Some(user_id))
            .map(|p| p.id))
    }

    async fn find_student(&self, identifier: &str) -> Result<Option<StudentProfile>, StoreError> {
        let state = self.read()?;
        if let Some(s) = state.students.iter().find(|s| s.code == identifier) {
            return Ok(Some(s.clone()));
        }
        let Ok(id) = identifier.parse::<StudentId>() else {
            return Ok(None);
        };
        Ok(find_by_id(&state.students, id).cloned())
    }

    async fn find_professor(
        &self,
        identifier: &str,
    ) -> Result<Option<ProfessorProfile>, StoreError> {
        let state = self.read()?;
        if let Some(p) = state.professors.iter().find(|p| p.code == identifier) {
            return Ok(Some(p.clone()));
        }
        let Ok(id) = identifier.parse::<ProfessorId>() else {
            return Ok(None);
        };
        Ok(find_by_id(&state.professors, id).cloned())
    }

    async fn link_profiles_by_email(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<ProfileLinks, StoreError> {
        let mut state = self.write()?;
        if let Some(s) = state
            .students
            .iter_mut()
            .find(|s| s.user_id.is_none() && s.email.as_ref() == Some(email))
        {
            s.user_id = Some(user_id);
        }
        if let Some(p) = state
            .professors
            .iter_mut()
            .find(|p| p.user_id.is_none() && p.email.as_ref() == Some(email))
        {
            p.user_id = Some(user_id);
        }
        Ok(state.links(user_id))
    }
}

#[cfg(test)]
mod tests {
    use registrar_auth::FixedClock;

    use super::*;

    fn student(id: i64, code: &str, email: &str) -> StudentProfile {
        StudentProfile {
            id: StudentId::new(id),
            user_id: None,
            code: code.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Email::parse(email).ok(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = InMemoryIdentityStore::new();
        let email = Email::parse("a@b.com").unwrap();
        store.create_user(&email, "pw").await.unwrap();

        let err = store.create_user(&email, "pw").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn lookup_by_code_precedes_numeric_id() {
        let store = InMemoryIdentityStore::new();
        store.add_student(student(42, "000123", "s1@campus.edu")).unwrap();
        store.add_student(student(123, "000999", "s2@campus.edu")).unwrap();

        let by_code = store.find_student("000123").await.unwrap().unwrap();
        assert_eq!(by_code.id, StudentId::new(42));

        let by_id = store.find_student("123").await.unwrap().unwrap();
        assert_eq!(by_id.code, "000999");

        assert!(store.find_student("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn linking_claims_only_unlinked_profiles_with_matching_email() {
        let store = InMemoryIdentityStore::new();
        store.add_student(student(1, "S1", "grace@campus.edu")).unwrap();
        let email = Email::parse("Grace@Campus.edu").unwrap();
        let user = store.create_user(&email, "pw").await.unwrap();

        let links = store.link_profiles_by_email(user.id, &email).await.unwrap();
        assert_eq!(links.student.unwrap().user_id, Some(user.id));
        assert!(links.professor.is_none());
        assert_eq!(store.student_id_of(user.id).await.unwrap(), Some(StudentId::new(1)));
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account_until_the_window_passes() {
        let clock = FixedClock::new(Utc::now());
        let store = InMemoryIdentityStore::with_clock(Arc::new(clock.clone())).with_lockout(
            LockoutPolicy {
                max_failed_attempts: 2,
                lockout: Duration::minutes(10),
            },
        );
        let user = store
            .create_user(&Email::parse("a@b.com").unwrap(), "pw")
            .await
            .unwrap();

        store.record_failed_sign_in(user.id).await.unwrap();
        assert!(!store.is_locked_out(user.id).await.unwrap());
        store.record_failed_sign_in(user.id).await.unwrap();
        assert!(store.is_locked_out(user.id).await.unwrap());

        clock.advance(Duration::minutes(11));
        assert!(!store.is_locked_out(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn roles_are_assigned_once() {
        let store = InMemoryIdentityStore::new();
        let user = store
            .create_user(&Email::parse("a@b.com").unwrap(), "pw")
            .await
            .unwrap();

        store.assign_role(user.id, &Role::ADMIN).await.unwrap();
        store.assign_role(user.id, &Role::ADMIN).await.unwrap();

        assert_eq!(store.roles(user.id).await.unwrap(), vec![Role::ADMIN]);
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().roles, vec![Role::ADMIN]);
    }
}
