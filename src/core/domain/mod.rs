pub mod entity;
pub mod query;
pub mod repository_error;
pub mod transaction;
pub mod transaction_operation;
pub mod transaction_result;
