use chrono::Utc;
use sea_orm::{
    ActiveValue, JoinType, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, Group, Member, ResultEngine, group_members, groups,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Creates a group and enrolls the creator as its first member, in one
    /// transaction.
    pub async fn new_group(
        &self,
        name: &str,
        description: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<String> {
        let name = normalize_required_text(name, "group name")?;
        let description = normalize_optional_text(description);

        let group = Group::new(name, description, user_id);
        let group_id = group.id.clone();
        let group_entry: groups::ActiveModel = (&group).into();

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            group_entry.insert(&db_tx).await?;

            let membership = group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                joined_at: ActiveValue::Set(Utc::now()),
            };
            membership.insert(&db_tx).await?;

            tracing::info!(group_id = %group_id, created_by = %user_id, "created group");
            Ok(group_id)
        })
    }

    /// Adds a user to a group. Any member may add; joining twice is an
    /// error rather than a silent no-op.
    pub async fn add_group_member(
        &self,
        group_id: &str,
        member_user_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member_user_id).await?;

            if self.is_group_member(&db_tx, group_id, member_user_id).await? {
                return Err(EngineError::ExistingKey(member_user_id.to_string()));
            }

            let membership = group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.to_string()),
                user_id: ActiveValue::Set(member_user_id.to_string()),
                joined_at: ActiveValue::Set(Utc::now()),
            };
            membership.insert(&db_tx).await?;

            tracing::info!(%group_id, member = %member_user_id, "added group member");
            Ok(())
        })
    }

    /// Removes a member from a group. The creator cannot be removed, and
    /// removing a user who is not a member is an error rather than a no-op.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member_user_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_by_id(&db_tx, group_id, user_id).await?;
            if member_user_id == group.created_by {
                return Err(EngineError::InvalidArgument(
                    "cannot remove the group creator".to_string(),
                ));
            }
            self.require_group_member(&db_tx, group_id, member_user_id)
                .await?;

            group_members::Entity::delete_by_id((
                group_id.to_string(),
                member_user_id.to_string(),
            ))
            .exec(&db_tx)
            .await?;

            tracing::info!(%group_id, member = %member_user_id, "removed group member");
            Ok(())
        })
    }

    /// Returns a single group the caller belongs to.
    pub async fn group(&self, group_id: &str, user_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let model = self.require_group_by_id(&db_tx, group_id, user_id).await?;
            Ok(Group::from(model))
        })
    }

    /// Lists the groups the caller is a member of, oldest first.
    pub async fn groups_for_user(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let models: Vec<groups::Model> = groups::Entity::find()
                .join(JoinType::InnerJoin, groups::Relation::GroupMembers.def())
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Group::from).collect())
        })
    }

    /// Lists a group's members in join order.
    pub async fn group_members(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            self.members_ordered(&db_tx, group_id).await
        })
    }

    /// Deletes a group and everything it owns (creator-only).
    pub async fn delete_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_creator(&db_tx, group_id, user_id).await?;
            let backend = self.database.get_database_backend();

            // Explicit cascade inside one transaction: splits, expenses,
            // memberships, then the group itself.
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expense_splits WHERE expense_id IN \
                     (SELECT id FROM expenses WHERE group_id = ?);",
                    vec![group.id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expenses WHERE group_id = ?;",
                    vec![group.id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM group_members WHERE group_id = ?;",
                    vec![group.id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM groups WHERE id = ?;",
                    vec![group.id.clone().into()],
                ))
                .await?;

            tracing::info!(%group_id, "deleted group");
            Ok(())
        })
    }
}
