pub mod create_user;
pub mod repository;
pub mod session;
