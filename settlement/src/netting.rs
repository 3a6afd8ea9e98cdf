//! Greedy settlement minimization
//!
//! Collapses a set of pairwise debts into the fewest payments that leave
//! every participant's net position unchanged.
//!
//! # Algorithm
//!
//! 1. Validate every transaction
//! 2. Calculate net positions for each participant
//! 3. Match the largest creditor with the largest debtor
//! 4. Settle the smaller of the two magnitudes and repeat
//!
//! Each round fully settles at least one participant, so `P` participants
//! with a non-zero position need at most `P - 1` payments.
//!
//! # Example
//!
//! ```text
//! Transactions:
//!   A owes B: $10
//!   B owes C: $10
//!   A owes C: $5
//!
//! Net positions:
//!   A: -$15 (debtor)
//!   B:   $0
//!   C: +$15 (creditor)
//!
//! Settlements:
//!   A pays C: $15
//! ```

use crate::{
    types::{checked_sum, is_dust, Balances, ParticipantId, Settlement, Transaction},
    Error, Result,
};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, warn};

/// Heap entry for one side of the book
///
/// Orders by magnitude, then by reversed participant id, so a max-heap pops
/// the largest position first and the lexicographically smallest id among
/// equal positions.
#[derive(Debug, PartialEq, Eq)]
struct Position {
    magnitude: Decimal,
    participant: ParticipantId,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .cmp(&other.magnitude)
            .then_with(|| other.participant.cmp(&self.participant))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the net position of every participant
///
/// All transactions are validated before any balance is touched.
pub fn compute_net_balances(transactions: &[Transaction]) -> Result<Balances> {
    for tx in transactions {
        tx.validate()?;
    }

    let mut balances = Balances::new();
    for tx in transactions {
        balances.debit(&tx.from, tx.amount)?;
        balances.credit(&tx.to, tx.amount)?;
    }

    Ok(balances)
}

/// Produce the settlement sequence for a set of net positions
///
/// Positions are matched exactly; only a total imbalance of at most
/// `DUST_TOLERANCE` is absorbed, and it is left unsettled.
pub fn minimize_settlements(balances: &Balances) -> Result<Vec<Settlement>> {
    let total = balances.total()?;
    if !is_dust(total) {
        return Err(Error::InvariantViolation(format!(
            "net positions sum to {} instead of zero",
            total
        )));
    }

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (participant, &balance) in balances {
        if balance.is_zero() {
            continue;
        }
        let position = Position {
            magnitude: balance.abs(),
            participant: participant.clone(),
        };
        if balance > Decimal::ZERO {
            creditors.push(position);
        } else {
            debtors.push(position);
        }
    }

    let mut settlements = Vec::with_capacity(creditors.len().max(debtors.len()));

    loop {
        let (mut creditor, mut debtor) = match (creditors.pop(), debtors.pop()) {
            (Some(c), Some(d)) => (c, d),
            (None, None) => break,
            (Some(c), None) => return absorb_residue(c, creditors, settlements),
            (None, Some(d)) => return absorb_residue(d, debtors, settlements),
        };

        let amount = creditor.magnitude.min(debtor.magnitude);
        debug!(
            from = %debtor.participant,
            to = %creditor.participant,
            %amount,
            "settlement"
        );
        settlements.push(Settlement {
            from: debtor.participant.clone(),
            to: creditor.participant.clone(),
            amount,
        });

        creditor.magnitude -= amount;
        debtor.magnitude -= amount;

        if !creditor.magnitude.is_zero() {
            creditors.push(creditor);
        }
        if !debtor.magnitude.is_zero() {
            debtors.push(debtor);
        }
    }

    Ok(settlements)
}

/// Accept one-sided leftovers only if together they are dust
fn absorb_residue(
    first: Position,
    rest: BinaryHeap<Position>,
    settlements: Vec<Settlement>,
) -> Result<Vec<Settlement>> {
    let leftover: Vec<Position> = std::iter::once(first).chain(rest).collect();
    let residue = checked_sum(leftover.iter().map(|p| p.magnitude), "unmatched residue")?;
    if !is_dust(residue) {
        return Err(Error::InvariantViolation(format!(
            "{} left unmatched across {} participants",
            residue,
            leftover.len()
        )));
    }

    warn!(%residue, participants = leftover.len(), "dust residue left unsettled");
    Ok(settlements)
}

/// Compute net balances and settle them
pub fn minimize(transactions: &[Transaction]) -> Result<Vec<Settlement>> {
    let balances = compute_net_balances(transactions)?;
    minimize_settlements(&balances)
}

/// Check that settlements are a valid plan for `balances`
///
/// Verifies positive amounts, no self-payments, the `P - 1` bound and that
/// replaying the settlements reproduces every non-zero position.
pub fn verify_settlements(balances: &Balances, settlements: &[Settlement]) -> Result<()> {
    let mut replayed = Balances::new();
    for s in settlements {
        if s.amount <= Decimal::ZERO {
            return Err(Error::InvariantViolation(format!(
                "non-positive settlement {}",
                s
            )));
        }
        if s.from == s.to {
            return Err(Error::InvariantViolation(format!("self settlement {}", s)));
        }
        replayed.debit(&s.from, s.amount)?;
        replayed.credit(&s.to, s.amount)?;
    }

    let active = balances.nonzero_count();
    if settlements.len() > active.saturating_sub(1) {
        return Err(Error::InvariantViolation(format!(
            "{} settlements for {} unsettled participants",
            settlements.len(),
            active
        )));
    }

    let participants: HashSet<&ParticipantId> = balances
        .iter()
        .map(|(p, _)| p)
        .chain(replayed.iter().map(|(p, _)| p))
        .collect();
    for participant in participants {
        let drift = balances
            .get(participant)
            .checked_sub(replayed.get(participant))
            .ok_or_else(|| {
                Error::InvariantViolation(format!("{} drift exceeds decimal range", participant))
            })?;
        if !is_dust(drift) {
            return Err(Error::InvariantViolation(format!(
                "{} off by {} after settlement",
                participant, drift
            )));
        }
    }

    Ok(())
}
