//! Core ledger engine for Divvy, a shared-expense tracker.
//!
//! Users form [`Group`]s, record [`Expense`]s paid by one member on behalf of
//! several, and the engine answers who owes whom: per-member net balances and
//! a minimal list of settling transfers.
//!
//! The engine owns a sea-orm [`DatabaseConnection`](sea_orm::DatabaseConnection)
//! and wraps every multi-row write in a database transaction. It keeps no
//! state between calls; the authenticated caller is an opaque `user_id`
//! passed into every operation.

pub use error::EngineError;
pub use expense_splits::ExpenseSplit;
pub use expenses::Expense;
pub use group_members::Member;
pub use groups::Group;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use settlement::{MemberBalance, Settlement};

mod error;
mod expense_splits;
mod expenses;
mod group_members;
mod groups;
mod money;
mod ops;
pub mod settlement;
pub mod split;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
