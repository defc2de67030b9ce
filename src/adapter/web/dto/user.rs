use serde::{Deserialize, Serialize};

use crate::core::domain::entity::user::user::UnvalidatedCreateUserInput;
use crate::core::domain::entity::user::User;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateUserWebInput {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<CreateUserWebInput> for UnvalidatedCreateUserInput {
    fn from(value: CreateUserWebInput) -> Self {
        let CreateUserWebInput { id, name, email } = value;
        Self { id, name, email }
    }
}

/// JSON body returned for a stored user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserWebOutput {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<User> for UserWebOutput {
    fn from(value: User) -> Self {
        let User { id, name, email } = value;
        Self { id, name, email }
    }
}
