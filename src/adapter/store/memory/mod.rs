pub mod entity;
pub mod repository;
pub mod session;
pub mod transaction;
pub mod user;
