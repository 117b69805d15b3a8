//! Claim assembly: the authoritative claim set for a user.
//!
//! Pure functions over identity facts. Callers must pass the *current*
//! profile state (profile linkage can change after registration), so nothing
//! here caches.

use crate::claims::ClaimSet;
use crate::identity::{ProfessorProfile, Profile, StudentProfile, User};
use crate::Role;

impl ClaimSet {
    /// Claims carried by the bare user record.
    pub fn for_user(user: &User) -> Self {
        let email = user.email.as_ref().map(|e| e.as_str().to_owned());
        Self {
            user_id: user.id,
            user_name: email.clone(),
            first_name: None,
            last_name: None,
            email,
            phone_number: None,
            roles: Vec::new(),
            student_code: None,
            professor_code: None,
        }
    }

    pub fn with_student(self, student: &StudentProfile) -> Self {
        let email = self
            .email
            .or_else(|| student.email.as_ref().map(|e| e.as_str().to_owned()));
        Self {
            first_name: Some(student.first_name.clone()),
            last_name: Some(student.last_name.clone()),
            phone_number: student.phone.clone().or(self.phone_number),
            student_code: Some(student.code.clone()),
            email,
            ..self
        }
    }

    pub fn with_professor(self, professor: &ProfessorProfile) -> Self {
        let email = self
            .email
            .or_else(|| professor.email.as_ref().map(|e| e.as_str().to_owned()));
        Self {
            first_name: Some(professor.first_name.clone()),
            last_name: Some(professor.last_name.clone()),
            phone_number: professor.phone.clone().or(self.phone_number),
            professor_code: Some(professor.code.clone()),
            email,
            ..self
        }
    }

    pub fn with_profile(self, profile: &Profile) -> Self {
        match profile {
            Profile::None => self,
            Profile::Student(student) => self.with_student(student),
            Profile::Professor(professor) => self.with_professor(professor),
        }
    }

    /// Append roles in order, skipping ones already present.
    pub fn with_roles<'a>(mut self, roles: impl IntoIterator<Item = &'a Role>) -> Self {
        for role in roles {
            if !self.roles.contains(role) {
                self.roles.push(role.clone());
            }
        }
        self
    }
}

/// Build the claim set for `user` from its current profile facet and roles.
pub fn assemble(user: &User, profile: &Profile, roles: &[Role]) -> ClaimSet {
    ClaimSet::for_user(user)
        .with_profile(profile)
        .with_roles(roles)
}
