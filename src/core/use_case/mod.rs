pub mod async_repository;
pub mod create_user;
pub mod session_runner;
pub mod transaction_guard;
