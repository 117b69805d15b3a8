//! Minimal in-crate doubles for unit tests. Full implementations live in
//! `registrar-infra`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use registrar_core::{Email, ProfessorId, StudentId, UserId};

use crate::identity::{ProfessorProfile, ProfileLinks, StudentProfile, User};
use crate::store::{
    CredentialStore, IdentityDirectory, RecordFilter, RefreshTokenRecord, RotationOutcome,
    StoreError,
};
use crate::Role;

#[derive(Debug, Default)]
pub struct MemoryCredentials {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(token).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.values().filter(|r| r.user_id == user_id).cloned().collect())
    }

    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.token) {
            return Err(StoreError::Duplicate(record.token));
        }
        records.insert(record.token.clone(), record);
        Ok(())
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn replace(
        &self,
        filter: &RecordFilter,
        require: Option<&str>,
        record: RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError> {
        let mut records = self.records.lock().unwrap();
        if let (Some(required), RecordFilter::Stale { now, .. }) = (require, filter) {
            let live = records
                .get(required)
                .is_some_and(|r| filter.matches(r) && !r.is_expired(*now));
            if !live {
                return Ok(RotationOutcome::Rejected);
            }
        }
        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        let removed = (before - records.len()) as u64;
        records.insert(record.token.clone(), record);
        Ok(RotationOutcome::Rotated { removed })
    }
}

/// Directory double that counts id lookups, so tests can assert the
/// code-claim fast path never touches it.
#[derive(Debug, Default)]
pub struct CountingDirectory {
    pub students: Vec<StudentProfile>,
    pub professors: Vec<ProfessorProfile>,
    pub lookups: AtomicUsize,
}

impl CountingDirectory {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityDirectory for CountingDirectory {
    async fn find_user(&self, _user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    async fn roles(&self, _user_id: UserId) -> Result<Vec<Role>, StoreError> {
        Ok(Vec::new())
    }

    async fn profile_links(&self, user_id: UserId) -> Result<ProfileLinks, StoreError> {
        Ok(ProfileLinks {
            student: self.students.iter().find(|s| s.user_id == Some(user_id)).cloned(),
            professor: self.professors.iter().find(|p| p.user_id == Some(user_id)).cloned(),
        })
    }

    async fn student_id_of(&self, user_id: UserId) -> Result<Option<StudentId>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.students.iter().find(|s| s.user_id == Some(user_id)).map(|s| s.id))
    }

    async fn professor_id_of(&self, user_id: UserId) -> Result<Option<ProfessorId>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.professors.iter().find(|p| p.user_id == Some(user_id)).map(|p| p.id))
    }

    async fn find_student(&self, _identifier: &str) -> Result<Option<StudentProfile>, StoreError> {
        Ok(None)
    }

    async fn find_professor(
        &self,
        _identifier: &str,
    ) -> Result<Option<ProfessorProfile>, StoreError> {
        Ok(None)
    }

    async fn link_profiles_by_email(
        &self,
        user_id: UserId,
        _email: &Email,
    ) -> Result<ProfileLinks, StoreError> {
        self.profile_links(user_id).await
    }
}
