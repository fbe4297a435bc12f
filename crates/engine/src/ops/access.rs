use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, Member, ResultEngine, group_members, groups, users};

use super::Engine;

impl Engine {
    async fn find_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn is_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<bool> {
        group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map(|row| row.is_some())
            .map_err(Into::into)
    }

    /// Resolves a group for a caller. Missing groups and groups the caller
    /// is not a member of both come back as `GroupNotFound`.
    pub(super) async fn require_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::GroupNotFound(group_id.to_string()))?;
        if !self.is_group_member(db, group_id, user_id).await? {
            return Err(EngineError::GroupNotFound(group_id.to_string()));
        }
        Ok(model)
    }

    pub(super) async fn require_group_creator(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::GroupNotFound(group_id.to_string()))?;
        if model.created_by != user_id {
            return Err(EngineError::GroupNotFound(group_id.to_string()));
        }
        Ok(model)
    }

    /// Checks that a user referenced by an operation (payer, participant,
    /// settlement party) belongs to the group.
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        if !self.is_group_member(db, group_id, user_id).await? {
            return Err(EngineError::KeyNotFound(format!(
                "user {user_id} is not a member of the group"
            )));
        }
        Ok(())
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn find_user_by_username(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Group members joined with their usernames, in deterministic order
    /// (joined_at, then user id). This is the iteration order equal splits
    /// and balance listings use.
    pub(super) async fn members_ordered(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Member>> {
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_members::Column::JoinedAt)
            .order_by_asc(group_members::Column::UserId)
            .find_also_related(users::Entity)
            .all(db)
            .await?;

        rows.into_iter()
            .map(|(membership, user)| {
                let user =
                    user.ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
                Ok(Member {
                    user_id: membership.user_id,
                    username: user.username,
                    joined_at: membership.joined_at,
                })
            })
            .collect()
    }
}
