//! Identity facts the auth boundary reasons about.
//!
//! These are read-only projections of records owned by the identity
//! directory. Nothing in this crate persists them.

use serde::{Deserialize, Serialize};

use registrar_core::{Email, Entity, ProfessorId, StudentId, UserId};

use crate::Role;

/// A user account (identity anchor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<Email>,
    pub roles: Vec<Role>,
}

impl User {
    pub fn new(id: UserId, email: Option<Email>) -> Self {
        Self {
            id,
            email,
            roles: Vec::new(),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Student record, optionally linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub user_id: Option<UserId>,
    /// Unique, human-readable student code (e.g. `"000123"`).
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
}

impl Entity for StudentProfile {
    type Id = StudentId;

    fn id(&self) -> StudentId {
        self.id
    }
}

/// Professor record, optionally linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorProfile {
    pub id: ProfessorId,
    pub user_id: Option<UserId>,
    /// Unique, human-readable professor code.
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
}

impl Entity for ProfessorProfile {
    type Id = ProfessorId;

    fn id(&self) -> ProfessorId {
        self.id
    }
}

/// The profiles linked to a user, exactly as the directory reports them.
///
/// The data model does not forbid a user from holding both; [`Profile::from_links`]
/// decides which one claim assembly sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileLinks {
    pub student: Option<StudentProfile>,
    pub professor: Option<ProfessorProfile>,
}

/// The profile facet a user's claims are derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Plain user (e.g. an administrator with no academic record).
    #[default]
    None,
    Student(StudentProfile),
    Professor(ProfessorProfile),
}

impl Profile {
    /// Collapse directory links into one facet. A linked student profile wins
    /// over a linked professor profile.
    pub fn from_links(links: ProfileLinks) -> Self {
        match (links.student, links.professor) {
            (Some(student), _) => Profile::Student(student),
            (None, Some(professor)) => Profile::Professor(professor),
            (None, None) => Profile::None,
        }
    }

    /// Role implied by the facet, assigned at registration time.
    pub fn implied_role(&self) -> Role {
        match self {
            Profile::None => Role::USER,
            Profile::Student(_) => Role::STUDENT,
            Profile::Professor(_) => Role::PROFESSOR,
        }
    }
}

impl From<ProfileLinks> for Profile {
    fn from(links: ProfileLinks) -> Self {
        Self::from_links(links)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(id: i64, email: &str) -> User {
        User::new(UserId::new(id), Some(Email::parse(email).unwrap()))
    }

    pub fn student(id: i64, code: &str) -> StudentProfile {
        StudentProfile {
            id: StudentId::new(id),
            user_id: None,
            code: code.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Some(Email::parse("grace@campus.edu").unwrap()),
            phone: Some("555-0100".to_string()),
        }
    }

    pub fn professor(id: i64, code: &str) -> ProfessorProfile {
        ProfessorProfile {
            id: ProfessorId::new(id),
            user_id: None,
            code: code.to_string(),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: Some(Email::parse("alan@campus.edu").unwrap()),
            phone: Some("555-0199".to_string()),
        }
    }
}
