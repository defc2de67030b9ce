use crate::core::domain::repository_error::RepositoryError;

/// Outcome of a guarded repository operation.
///
/// Exactly one of `Success` or `Failure`. Accessors for the state that is not
/// held panic instead of returning a default.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a TransactionResult may be a Failure that should be inspected"]
pub enum TransactionResult<T> {
    Success(T),
    Failure(RepositoryError),
}

impl<T> TransactionResult<T> {
    pub fn success(value: T) -> Self {
        TransactionResult::Success(value)
    }

    pub fn failure(error: RepositoryError) -> Self {
        TransactionResult::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TransactionResult::Failure(_))
    }

    /// Borrows the success value.
    ///
    /// # Panics
    ///
    /// Panics if the result is a `Failure`.
    pub fn value(&self) -> &T {
        match self {
            TransactionResult::Success(value) => value,
            TransactionResult::Failure(error) => {
                panic!("called `TransactionResult::value()` on a `Failure`: {error}")
            }
        }
    }

    /// Borrows the failure.
    ///
    /// # Panics
    ///
    /// Panics if the result is a `Success`.
    pub fn error(&self) -> &RepositoryError {
        match self {
            TransactionResult::Failure(error) => error,
            TransactionResult::Success(_) => {
                panic!("called `TransactionResult::error()` on a `Success`")
            }
        }
    }

    /// # Panics
    ///
    /// Panics if the result is a `Failure`.
    pub fn into_value(self) -> T {
        match self {
            TransactionResult::Success(value) => value,
            TransactionResult::Failure(error) => {
                panic!("called `TransactionResult::into_value()` on a `Failure`: {error}")
            }
        }
    }

    /// # Panics
    ///
    /// Panics if the result is a `Success`.
    pub fn into_error(self) -> RepositoryError {
        match self {
            TransactionResult::Failure(error) => error,
            TransactionResult::Success(_) => {
                panic!("called `TransactionResult::into_error()` on a `Success`")
            }
        }
    }

    /// Runs `f` on the value of a `Success` and hands the result back untouched.
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let TransactionResult::Success(value) = &self {
            f(value);
        }
        self
    }

    /// Runs `f` on the error of a `Failure` and hands the result back untouched.
    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&RepositoryError),
    {
        if let TransactionResult::Failure(error) = &self {
            f(error);
        }
        self
    }

    pub fn into_result(self) -> Result<T, RepositoryError> {
        match self {
            TransactionResult::Success(value) => Ok(value),
            TransactionResult::Failure(error) => Err(error),
        }
    }

    /// Collapses to `None` on failure, dropping the error.
    pub fn ok(self) -> Option<T> {
        match self {
            TransactionResult::Success(value) => Some(value),
            TransactionResult::Failure(_) => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> TransactionResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            TransactionResult::Success(value) => TransactionResult::Success(f(value)),
            TransactionResult::Failure(error) => TransactionResult::Failure(error),
        }
    }

    pub fn as_ref(&self) -> TransactionResult<&T> {
        match self {
            TransactionResult::Success(value) => TransactionResult::Success(value),
            TransactionResult::Failure(error) => TransactionResult::Failure(error.clone()),
        }
    }
}

impl<T> From<Result<T, RepositoryError>> for TransactionResult<T> {
    fn from(value: Result<T, RepositoryError>) -> Self {
        match value {
            Ok(value) => TransactionResult::Success(value),
            Err(error) => TransactionResult::Failure(error),
        }
    }
}

impl<T> From<TransactionResult<T>> for Result<T, RepositoryError> {
    fn from(value: TransactionResult<T>) -> Self {
        value.into_result()
    }
}
