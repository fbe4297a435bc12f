//! Expense primitives.
//!
//! An `Expense` is a single payment made by one member on behalf of a set of
//! participants; the participants' shares live in `expense_splits`. The sum
//! of a saved expense's splits always equals its amount (the allocator
//! enforces it, storage does not). Expenses are append-only: a settlement is
//! recorded as a new expense rather than by editing existing rows.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Description used for settlement expenses.
pub const SETTLEMENT_DESCRIPTION: &str = "Settlement";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount: MoneyCents,
    pub paid_by: String,
    pub expense_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: String,
        description: String,
        amount: MoneyCents,
        paid_by: &str,
        expense_date: NaiveDate,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            group_id,
            description,
            amount,
            paid_by: paid_by.to_string(),
            expense_date,
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub paid_by: String,
    pub expense_date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    ExpenseSplits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.clone()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            paid_by: ActiveValue::Set(expense.paid_by.clone()),
            expense_date: ActiveValue::Set(expense.expense_date),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            paid_by: model.paid_by,
            expense_date: model.expense_date,
            created_at: model.created_at,
        }
    }
}
