use sea_orm::{ConnectionTrait, DatabaseTransaction, Statement, TransactionTrait};

use crate::{
    MemberBalance, MoneyCents, ResultEngine, Settlement, settlement,
};

use super::{Engine, with_tx};

impl Engine {
    /// Sums one side of a member's ledger (owed or paid). A member with no
    /// matching rows sums to zero; "no rows" is never an error.
    async fn sum_minor(
        &self,
        db: &DatabaseTransaction,
        sql: &str,
        group_id: &str,
        member_user_id: &str,
    ) -> ResultEngine<i64> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            sql,
            vec![group_id.into(), member_user_id.into()],
        );
        let row = db.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    /// `paid - owed` for one member, computed inside an open transaction.
    async fn balance_in_tx(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        member_user_id: &str,
    ) -> ResultEngine<MoneyCents> {
        let total_owed = self
            .sum_minor(
                db,
                "SELECT COALESCE(SUM(s.amount_owed_minor), 0) AS sum \
                 FROM expense_splits s \
                 INNER JOIN expenses e ON e.id = s.expense_id \
                 WHERE e.group_id = ? AND s.user_id = ?;",
                group_id,
                member_user_id,
            )
            .await?;
        let total_paid = self
            .sum_minor(
                db,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM expenses \
                 WHERE group_id = ? AND paid_by = ?;",
                group_id,
                member_user_id,
            )
            .await?;

        Ok(MoneyCents::new(total_paid - total_owed))
    }

    /// Net balance of one user in a group: total paid minus total owed.
    ///
    /// Positive means the group owes this user money, negative means the
    /// user owes the group. Reading is side-effect free; calling twice
    /// without intervening writes yields the same value.
    pub async fn user_balance(
        &self,
        group_id: &str,
        member_user_id: &str,
        user_id: &str,
    ) -> ResultEngine<MoneyCents> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            self.balance_in_tx(&db_tx, group_id, member_user_id).await
        })
    }

    /// Balances of every member, in membership order. Recorded splits always
    /// sum to their expense amount, so the balances sum to zero.
    pub async fn all_balances(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<MemberBalance>> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            self.member_balances(&db_tx, group_id).await
        })
    }

    /// Computes the settling transfers for a group from its current
    /// balances: members are reduced to net positions, then the greedy
    /// solver in [`settlement`] pairs them off.
    pub async fn settlements(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            self.require_group_by_id(&db_tx, group_id, user_id).await?;
            let balances = self.member_balances(&db_tx, group_id).await?;
            Ok(settlement::simplify(&balances))
        })
    }

    async fn member_balances(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<MemberBalance>> {
        let members = self.members_ordered(db, group_id).await?;
        let mut balances = Vec::with_capacity(members.len());
        for member in members {
            let balance = self.balance_in_tx(db, group_id, &member.user_id).await?;
            balances.push(MemberBalance {
                user_id: member.user_id,
                username: member.username,
                balance,
            });
        }
        Ok(balances)
    }
}
