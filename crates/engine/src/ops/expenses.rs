use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Expense, ExpenseSplit, MoneyCents, ResultEngine, expense_splits, expenses,
    expenses::SETTLEMENT_DESCRIPTION, split,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Records an expense and its splits as one atomic unit.
    ///
    /// With `participants = None` the amount is split evenly across all
    /// current members, in membership order. With an explicit participant
    /// list only that subset is charged; the payer need not be among them
    /// but must belong to the group, and so must every participant.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_expense(
        &self,
        group_id: &str,
        description: &str,
        amount: MoneyCents,
        paid_by: &str,
        expense_date: NaiveDate,
        participants: Option<&[String]>,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        let description = normalize_required_text(description, "description")?;

        with_tx!(self, |db_tx| {
            let group = self.require_group_by_id(&db_tx, group_id, user_id).await?;
            self.require_group_member(&db_tx, group_id, paid_by).await?;

            let participant_ids: Vec<String> = match participants {
                None => self
                    .members_ordered(&db_tx, group_id)
                    .await?
                    .into_iter()
                    .map(|m| m.user_id)
                    .collect(),
                Some([]) => {
                    return Err(EngineError::InvalidSplit(
                        "at least one participant is required".to_string(),
                    ));
                }
                Some(subset) => {
                    let mut seen = HashSet::new();
                    for participant in subset {
                        if !seen.insert(participant.as_str()) {
                            return Err(EngineError::InvalidSplit(format!(
                                "duplicate participant {participant}"
                            )));
                        }
                        self.require_group_member(&db_tx, group_id, participant)
                            .await?;
                    }
                    subset.to_vec()
                }
            };

            let shares = split::allocate_even(amount, &participant_ids)?;

            let expense = Expense::new(group.id, description, amount, paid_by, expense_date)?;
            let expense_entry: expenses::ActiveModel = (&expense).into();
            expense_entry.insert(&db_tx).await?;

            for (participant, share) in &shares {
                let split = ExpenseSplit::new(&expense.id, participant, *share);
                let split_entry: expense_splits::ActiveModel = (&split).into();
                split_entry.insert(&db_tx).await?;
            }

            tracing::debug!(
                %group_id,
                expense_id = %expense.id,
                amount = %amount,
                splits = shares.len(),
                "recorded expense"
            );
            Ok(expense)
        })
    }

    /// Records a settlement of `amount` from `from_user_id` to `to_user_id`.
    ///
    /// A settlement reuses the expense ledger to represent the transfer: a
    /// new expense paid by the debtor, with a single split charging the
    /// creditor the full amount. Balances shift by exactly `amount` on each
    /// side and the group's zero-sum property is preserved.
    pub async fn record_settlement(
        &self,
        group_id: &str,
        from_user_id: &str,
        to_user_id: &str,
        amount: MoneyCents,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_by_id(&db_tx, group_id, user_id).await?;
            if from_user_id == to_user_id {
                return Err(EngineError::InvalidSplit(
                    "cannot settle a debt with yourself".to_string(),
                ));
            }
            self.require_group_member(&db_tx, group_id, from_user_id)
                .await?;
            self.require_group_member(&db_tx, group_id, to_user_id)
                .await?;

            let expense = Expense::new(
                group.id,
                SETTLEMENT_DESCRIPTION.to_string(),
                amount,
                from_user_id,
                Utc::now().date_naive(),
            )?;
            let expense_entry: expenses::ActiveModel = (&expense).into();
            expense_entry.insert(&db_tx).await?;

            let split = ExpenseSplit::new(&expense.id, to_user_id, amount);
            let split_entry: expense_splits::ActiveModel = (&split).into();
            split_entry.insert(&db_tx).await?;

            tracing::info!(
                %group_id,
                from = %from_user_id,
                to = %to_user_id,
                amount = %amount,
                "recorded settlement"
            );
            Ok(expense)
        })
    }

    /// Lists a group's expenses, most recent expense date first.
    pub async fn group_expenses(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            let models: Vec<expenses::Model> = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(expenses::Column::ExpenseDate)
                .order_by_desc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Expense::from).collect())
        })
    }

    /// Lists the splits of one expense in the group.
    pub async fn expense_splits(
        &self,
        group_id: &str,
        expense_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<ExpenseSplit>> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;

            expenses::Entity::find_by_id(expense_id.to_string())
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

            let models: Vec<expense_splits::Model> = expense_splits::Entity::find()
                .filter(expense_splits::Column::ExpenseId.eq(expense_id.to_string()))
                .order_by_asc(expense_splits::Column::UserId)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(ExpenseSplit::from).collect())
        })
    }
}
