use crate::adapter::store::memory::entity::Entity;
use crate::adapter::store::memory::repository::MemoryRepository;
use crate::core::domain::entity::user::User;
use crate::core::domain::query::IndexOptions;

pub type MemoryUserRepository = MemoryRepository<User>;

impl Entity for User {
    type Id = i32;

    const NAME: &'static str = "User";

    fn id(&self) -> i32 {
        self.id
    }
}

/// Indexes the user table needs: emails are unique.
pub fn user_indexes() -> Vec<IndexOptions> {
    vec![IndexOptions::new("users_email_key", &["email"]).unique()]
}
