//! Group primitives.
//!
//! A `Group` is a named collection of users who share expenses. Memberships
//! and expenses hang off it; deleting a group cascades to both.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: String, description: Option<String>, created_by: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.clone()),
            name: ActiveValue::Set(group.name.clone()),
            description: ActiveValue::Set(group.description.clone()),
            created_by: ActiveValue::Set(group.created_by.clone()),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}

impl From<Model> for Group {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}
