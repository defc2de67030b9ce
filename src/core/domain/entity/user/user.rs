use thiserror::Error;

use crate::core::domain::entity::user::User;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateUserValidationError {
    #[error("User name must not be empty")]
    EmptyName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

#[derive(Debug)]
pub struct UnvalidatedCreateUserInput {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl TryFrom<UnvalidatedCreateUserInput> for User {
    type Error = CreateUserValidationError;

    fn try_from(value: UnvalidatedCreateUserInput) -> Result<Self, Self::Error> {
        let name = value.name.trim();
        if name.is_empty() {
            return Err(CreateUserValidationError::EmptyName);
        }
        let email = value.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(CreateUserValidationError::InvalidEmail(value.email)),
        }
        Ok(User {
            id: value.id,
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}
