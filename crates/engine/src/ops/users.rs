use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, users};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Registers a new user and returns its id.
    ///
    /// The engine stores the password as handed in; hashing and session
    /// handling belong to the caller.
    pub async fn new_user(&self, username: &str, password: &str) -> ResultEngine<String> {
        let username = normalize_required_text(username, "username")?;
        let id = Uuid::new_v4().to_string();

        with_tx!(self, |db_tx| {
            if self
                .find_user_by_username(&db_tx, &username)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }

            let user = users::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                username: ActiveValue::Set(username.clone()),
                password: ActiveValue::Set(password.to_string()),
            };
            user.insert(&db_tx).await?;

            tracing::info!(user_id = %id, %username, "created user");
            Ok(id)
        })
    }

    /// Looks a user up by username, for callers that only hold the name.
    pub async fn user_id_by_username(&self, username: &str) -> ResultEngine<String> {
        with_tx!(self, |db_tx| {
            self.find_user_by_username(&db_tx, username)
                .await?
                .map(|user| user.id)
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
        })
    }
}
