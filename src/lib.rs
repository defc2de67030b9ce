//! Non-blocking, transaction-aware facade over blocking repository backends.
//!
//! * [`core::use_case::async_repository::AsyncRepository`] runs every
//!   repository call on a bounded blocking pool.
//! * [`core::use_case::transaction_guard::run_in_transaction`] commits or
//!   rolls back exactly once and returns the block's own error untouched.
//! * [`core::use_case::session_runner::run_guarded`] settles a
//!   [`core::port::session::DatabaseSession`] and always yields a
//!   [`core::domain::transaction_result::TransactionResult`].

pub mod adapter;
pub mod core;
pub mod error;
