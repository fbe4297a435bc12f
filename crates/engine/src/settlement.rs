//! Settlement solver: turns a set of net balances into settling transfers.
//!
//! Greedy debt simplification: debtors and creditors are kept in two
//! max-heaps by magnitude; the largest debtor pays the largest creditor the
//! smaller of the two magnitudes, and whichever side is left with a nonzero
//! remainder goes back into its heap. This produces fewer transfers than
//! pairwise matching and conserves the total: the emitted amounts sum to the
//! sum of positive balances.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// A member's net position in a group: paid minus owed.
///
/// Positive means the group owes this user money; negative means this user
/// owes the group; zero means settled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub user_id: String,
    pub username: String,
    pub balance: MoneyCents,
}

/// A computed transfer instruction. Never persisted; regenerated from the
/// current balances on each request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub from_user_id: String,
    pub from_username: String,
    pub to_user_id: String,
    pub to_username: String,
    pub amount: MoneyCents,
}

/// One side of an open debt while the solver runs. Ordered by magnitude,
/// with ties broken on user id so the output is deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Party {
    amount: i64,
    user_id: String,
    username: String,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| other.user_id.cmp(&self.user_id))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reduces the given balances to a list of settling transfers.
///
/// Zero balances are skipped and every emitted amount is strictly positive.
/// For a closed group (balances summing to zero) the transfers zero out
/// every balance; otherwise the unmatched tail is simply left unsettled.
pub fn simplify(balances: &[MemberBalance]) -> Vec<Settlement> {
    let mut debtors: BinaryHeap<Party> = BinaryHeap::new();
    let mut creditors: BinaryHeap<Party> = BinaryHeap::new();

    for member in balances {
        let cents = member.balance.cents();
        let party = |amount| Party {
            amount,
            user_id: member.user_id.clone(),
            username: member.username.clone(),
        };
        if cents < 0 {
            debtors.push(party(-cents));
        } else if cents > 0 {
            creditors.push(party(cents));
        }
    }

    let mut settlements = Vec::new();
    while let (Some(mut debtor), Some(mut creditor)) = (debtors.pop(), creditors.pop()) {
        let amount = debtor.amount.min(creditor.amount);
        settlements.push(Settlement {
            from_user_id: debtor.user_id.clone(),
            from_username: debtor.username.clone(),
            to_user_id: creditor.user_id.clone(),
            to_username: creditor.username.clone(),
            amount: MoneyCents::new(amount),
        });

        debtor.amount -= amount;
        creditor.amount -= amount;
        if debtor.amount > 0 {
            debtors.push(debtor);
        }
        if creditor.amount > 0 {
            creditors.push(creditor);
        }
    }

    settlements
}
