//! Expense splits.
//!
//! One row per (expense, debtor): "this user owes this much of this
//! expense". Unique per (expense, user) via an index in the schema.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub amount_owed: MoneyCents,
}

impl ExpenseSplit {
    pub fn new(expense_id: &str, user_id: &str, amount_owed: MoneyCents) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            expense_id: expense_id.to_string(),
            user_id: user_id.to_string(),
            amount_owed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub amount_owed_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseSplit> for ActiveModel {
    fn from(split: &ExpenseSplit) -> Self {
        Self {
            id: ActiveValue::Set(split.id.clone()),
            expense_id: ActiveValue::Set(split.expense_id.clone()),
            user_id: ActiveValue::Set(split.user_id.clone()),
            amount_owed_minor: ActiveValue::Set(split.amount_owed.cents()),
        }
    }
}

impl From<Model> for ExpenseSplit {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            expense_id: model.expense_id,
            user_id: model.user_id,
            amount_owed: MoneyCents::new(model.amount_owed_minor),
        }
    }
}
