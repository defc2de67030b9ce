use async_trait::async_trait;
use tracing::info;

use crate::core::domain::entity::user::user::UnvalidatedCreateUserInput;
use crate::core::domain::entity::user::User;
use crate::core::domain::transaction_operation::{Operation, OperationContext};
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::create_user::{
    CreateUserError, CreateUserInputBoundary, CreateUserOutputBoundary,
};
use crate::core::port::repository::RepositoryAdapter;
use crate::core::use_case::async_repository::AsyncRepository;
use crate::core::use_case::transaction_guard::run_in_transaction;

pub struct InsertUserOperation {
    user: User,
}

impl InsertUserOperation {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl<A> Operation<A> for InsertUserOperation
where
    A: RepositoryAdapter<Entity = User>,
{
    type Output = bool;

    fn execute(&self, context: &OperationContext<'_, A>) -> TransactionResult<bool> {
        context.repository().insert(self.user.clone())
    }
}

pub struct CreateUserUseCase<A: RepositoryAdapter<Entity = User>> {
    repository: AsyncRepository<A>,
}

impl<A: RepositoryAdapter<Entity = User>> CreateUserUseCase<A> {
    pub fn new(repository: AsyncRepository<A>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<A: RepositoryAdapter<Entity = User>> CreateUserInputBoundary for CreateUserUseCase<A> {
    async fn execute(
        &self,
        input: UnvalidatedCreateUserInput,
        output_boundary: &mut dyn CreateUserOutputBoundary,
    ) -> Result<(), CreateUserError> {
        let user = User::try_from(input)?;
        let stored = user.clone();

        run_in_transaction(&self.repository, |repository, transaction| {
            Box::pin(async move {
                repository
                    .execute_in(InsertUserOperation::new(stored), transaction.context())
                    .await
                    .into_result()?;
                Ok::<_, CreateUserError>(())
            })
        })
        .await?;

        info!(user_id = user.id, "user created");
        output_boundary.execute(&user)?;

        Ok(())
    }
}
