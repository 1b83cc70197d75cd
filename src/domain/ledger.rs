//! # Ledger Engine
//!
//! Pure, synchronous computation folding an unordered transaction log into
//! a symmetric pairwise-debt matrix and selecting the next buyer. No I/O,
//! no clock, no randomness: the same inputs always produce the same
//! ledger, and folding the log in any order produces the same matrix.
//!
//! Debt is counted in whole coffees. For a transaction with buyer B and
//! receiver R, B gains one credit against R and R incurs one debt toward
//! B, so `matrix[A][B] == -matrix[B][A]` holds for every pair at all
//! times. The next buyer is the considered member with the minimum net
//! credit among the considered group, ties broken by ascending record id.

use std::collections::BTreeMap;

use crate::domain::models::{Transaction, User};
use crate::error::LedgerError;
use crate::storage::record::{Record, RecordId};

/// The derived pairwise net-debt state of one cule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    matrix: BTreeMap<RecordId, BTreeMap<RecordId, i64>>,
    net_scores: BTreeMap<RecordId, i64>,
    selected_buyer: Option<RecordId>,
}

impl Ledger {
    /// Full pairwise matrix: `matrix[buyer][receiver]` is how many coffees
    /// `receiver` owes `buyer`.
    pub fn matrix(&self) -> &BTreeMap<RecordId, BTreeMap<RecordId, i64>> {
        &self.matrix
    }

    /// Net debt `receiver` owes `buyer`, if both are active members.
    pub fn debt_between(&self, buyer: &RecordId, receiver: &RecordId) -> Option<i64> {
        self.matrix.get(buyer).and_then(|row| row.get(receiver)).copied()
    }

    /// Net credit per considered candidate among the considered group.
    pub fn net_scores(&self) -> &BTreeMap<RecordId, i64> {
        &self.net_scores
    }

    /// The member next obligated to buy, when at least two considered
    /// members were available to compare.
    pub fn selected_buyer(&self) -> Option<&RecordId> {
        self.selected_buyer.as_ref()
    }
}

impl Default for Ledger {
    /// An empty ledger: no members, no debts, no buyer.
    fn default() -> Self {
        Self {
            matrix: BTreeMap::new(),
            net_scores: BTreeMap::new(),
            selected_buyer: None,
        }
    }
}

/// Fold `transactions` into a pairwise debt matrix over `active_members`
/// and select the next buyer among `considered_members`.
///
/// Every ordered pair of distinct active members gets a defined (possibly
/// zero) entry even with no history. Transactions touching members outside
/// the active set are skipped; a transaction missing its buyer or receiver
/// reference aborts the whole computation with
/// [`LedgerError::InvalidTransactionFormat`].
pub fn compute_ledger(
    transactions: &[Transaction],
    active_members: &[User],
    considered_members: &[User],
) -> Result<Ledger, LedgerError> {
    let mut matrix: BTreeMap<RecordId, BTreeMap<RecordId, i64>> = BTreeMap::new();
    for member in active_members {
        let row = matrix.entry(member.id.clone()).or_default();
        for other in active_members {
            if other.id != member.id {
                row.insert(other.id.clone(), 0);
            }
        }
    }

    for transaction in transactions {
        fold_transaction(&mut matrix, transaction)?;
    }

    // Net score per considered candidate: sum of the candidate's row over
    // the other considered members. Minimum score means most in debt.
    let considered_ids: Vec<&RecordId> = considered_members
        .iter()
        .map(|m| &m.id)
        .filter(|id| matrix.contains_key(*id))
        .collect();

    let mut net_scores = BTreeMap::new();
    for &candidate in &considered_ids {
        let row = &matrix[candidate];
        let score: i64 = considered_ids
            .iter()
            .filter(|&&other| other != candidate)
            .map(|&other| row.get(other).copied().unwrap_or(0))
            .sum();
        net_scores.insert(candidate.clone(), score);
    }

    // A buyer needs at least two people to compare. BTreeMap iterates in
    // ascending id order, so strict less-than keeps the smallest id on a
    // tie.
    let selected_buyer = if net_scores.len() < 2 {
        None
    } else {
        let mut best: Option<(&RecordId, i64)> = None;
        for (id, &score) in &net_scores {
            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((id, score)),
            }
        }
        best.map(|(id, _)| id.clone())
    };

    Ok(Ledger {
        matrix,
        net_scores,
        selected_buyer,
    })
}

fn fold_transaction(
    matrix: &mut BTreeMap<RecordId, BTreeMap<RecordId, i64>>,
    transaction: &Transaction,
) -> Result<(), LedgerError> {
    let (Some(buyer), Some(receiver)) =
        (transaction.buyer_id.as_ref(), transaction.receiver_id.as_ref())
    else {
        return Err(LedgerError::InvalidTransactionFormat {
            id: transaction.id().to_string(),
        });
    };

    // Only pairs inside the active grid are folded; a transaction whose
    // buyer or receiver has left the active set leaves the matrix alone.
    let applies = matrix
        .get(buyer)
        .is_some_and(|row| row.contains_key(receiver));
    if !applies {
        return Ok(());
    }

    *matrix.get_mut(buyer).unwrap().get_mut(receiver).unwrap() += 1;
    *matrix.get_mut(receiver).unwrap().get_mut(buyer).unwrap() -= 1;

    debug_assert_eq!(
        matrix[buyer][receiver],
        -matrix[receiver][buyer],
        "pairwise antisymmetry violated after folding {}",
        transaction.id()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Coffeecule;
    use proptest::prelude::*;

    fn user(name: &str) -> User {
        // Fixed ids so tie-breaks and orderings are reproducible: the id
        // sorts the same way the name does.
        let mut u = User::new(name, format!("system-{name}"));
        u.id = RecordId::new(format!("user-{name}"));
        u
    }

    fn purchase(cule: &Coffeecule, buyer: &User, receiver: &User) -> Transaction {
        Transaction::new(cule, buyer, receiver)
    }

    fn abc() -> (Coffeecule, User, User, User) {
        let cule = Coffeecule::new("test cule", "ABC123");
        (cule, user("alice"), user("bob"), user("carol"))
    }

    #[test]
    fn empty_history_gives_zero_matrix_and_no_buyer_under_two() {
        let (_, alice, bob, carol) = abc();
        let members = vec![alice.clone(), bob.clone(), carol.clone()];

        let ledger = compute_ledger(&[], &members, &[alice.clone()]).unwrap();
        for (a, row) in ledger.matrix() {
            assert_eq!(row.len(), 2);
            for (b, &debt) in row {
                assert_ne!(a, b);
                assert_eq!(debt, 0);
            }
        }
        assert!(ledger.selected_buyer().is_none());

        let ledger = compute_ledger(&[], &members, &[]).unwrap();
        assert!(ledger.selected_buyer().is_none());
    }

    #[test]
    fn empty_history_with_two_considered_selects_smallest_id() {
        let (_, alice, bob, carol) = abc();
        let members = vec![alice.clone(), bob.clone(), carol.clone()];

        let ledger = compute_ledger(&[], &members, &members).unwrap();
        // All scores are zero; the tie resolves to the smallest id.
        assert_eq!(ledger.selected_buyer(), Some(&alice.id));
    }

    #[test]
    fn concrete_three_member_scenario() {
        let (cule, alice, bob, carol) = abc();
        let members = vec![alice.clone(), bob.clone(), carol.clone()];
        let transactions = vec![
            purchase(&cule, &alice, &bob),
            purchase(&cule, &alice, &carol),
            purchase(&cule, &bob, &alice),
        ];

        let ledger = compute_ledger(&transactions, &members, &members).unwrap();

        assert_eq!(ledger.debt_between(&alice.id, &bob.id), Some(0));
        assert_eq!(ledger.debt_between(&bob.id, &alice.id), Some(0));
        assert_eq!(ledger.debt_between(&alice.id, &carol.id), Some(1));
        assert_eq!(ledger.debt_between(&carol.id, &alice.id), Some(-1));
        assert_eq!(ledger.debt_between(&bob.id, &carol.id), Some(0));
        assert_eq!(ledger.debt_between(&carol.id, &bob.id), Some(0));

        assert_eq!(ledger.net_scores()[&alice.id], 1);
        assert_eq!(ledger.net_scores()[&bob.id], -1);
        assert_eq!(ledger.net_scores()[&carol.id], -1);

        // Bob and Carol tie at -1; "user-bob" sorts before "user-carol".
        assert_eq!(ledger.selected_buyer(), Some(&bob.id));
    }

    #[test]
    fn antisymmetry_holds_for_every_pair() {
        let (cule, alice, bob, carol) = abc();
        let members = vec![alice.clone(), bob.clone(), carol.clone()];
        let transactions = vec![
            purchase(&cule, &alice, &bob),
            purchase(&cule, &alice, &bob),
            purchase(&cule, &bob, &carol),
            purchase(&cule, &carol, &alice),
            purchase(&cule, &carol, &bob),
        ];

        let ledger = compute_ledger(&transactions, &members, &members).unwrap();
        for (a, row) in ledger.matrix() {
            for (b, &debt) in row {
                assert_eq!(debt, -ledger.debt_between(b, a).unwrap());
            }
        }
    }

    #[test]
    fn missing_buyer_reference_aborts_computation() {
        let (cule, alice, bob, _) = abc();
        let members = vec![alice.clone(), bob.clone()];
        let mut bad = purchase(&cule, &alice, &bob);
        bad.buyer_id = None;
        let transactions = vec![purchase(&cule, &alice, &bob), bad.clone()];

        let err = compute_ledger(&transactions, &members, &members).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidTransactionFormat {
                id: bad.id.to_string()
            }
        );
    }

    #[test]
    fn transactions_touching_departed_members_are_skipped() {
        let (cule, alice, bob, carol) = abc();
        // Carol is no longer an active member; her history must not
        // resize the matrix or panic the fold.
        let members = vec![alice.clone(), bob.clone()];
        let transactions = vec![
            purchase(&cule, &alice, &bob),
            purchase(&cule, &carol, &alice),
        ];

        let ledger = compute_ledger(&transactions, &members, &members).unwrap();
        assert_eq!(ledger.debt_between(&alice.id, &bob.id), Some(1));
        assert!(ledger.debt_between(&carol.id, &alice.id).is_none());
    }

    #[test]
    fn considered_subset_restricts_scoring() {
        let (cule, alice, bob, carol) = abc();
        let members = vec![alice.clone(), bob.clone(), carol.clone()];
        // Alice has bought for Carol repeatedly, but Carol is absent
        // today: her debt must not influence the present group.
        let transactions = vec![
            purchase(&cule, &alice, &carol),
            purchase(&cule, &alice, &carol),
            purchase(&cule, &bob, &alice),
        ];

        let present = vec![alice.clone(), bob.clone()];
        let ledger = compute_ledger(&transactions, &members, &present).unwrap();
        assert_eq!(ledger.net_scores()[&alice.id], -1);
        assert_eq!(ledger.net_scores()[&bob.id], 1);
        assert_eq!(ledger.selected_buyer(), Some(&alice.id));
    }

    proptest! {
        #[test]
        fn fold_is_order_independent(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let (cule, alice, bob, carol) = abc();
            let members = vec![alice.clone(), bob.clone(), carol.clone()];
            let transactions = vec![
                purchase(&cule, &alice, &bob),
                purchase(&cule, &alice, &carol),
                purchase(&cule, &bob, &alice),
                purchase(&cule, &bob, &carol),
                purchase(&cule, &carol, &alice),
                purchase(&cule, &alice, &bob),
            ];

            let baseline = compute_ledger(&transactions, &members, &members).unwrap();

            let permuted: Vec<Transaction> =
                order.iter().map(|&i| transactions[i].clone()).collect();
            let ledger = compute_ledger(&permuted, &members, &members).unwrap();

            prop_assert_eq!(ledger.matrix(), baseline.matrix());
            prop_assert_eq!(ledger.selected_buyer(), baseline.selected_buyer());
        }
    }
}
