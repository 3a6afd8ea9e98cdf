//! Core types for the settlement minimizer

use crate::{Error, Result, DUST_TOLERANCE};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Participant identifier (name or key)
///
/// Ordered lexicographically; the ordering drives tie-breaking in the
/// minimizer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create new participant ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier carries no visible characters
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Recorded debt: `from` owes `to` the given amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Debtor
    pub from: ParticipantId,

    /// Creditor
    pub to: ParticipantId,

    /// Amount owed
    pub amount: Decimal,
}

impl Transaction {
    /// Create a validated transaction
    pub fn new(
        from: impl Into<ParticipantId>,
        to: impl Into<ParticipantId>,
        amount: Decimal,
    ) -> Result<Self> {
        let tx = Self {
            from: from.into(),
            to: to.into(),
            amount,
        };
        tx.validate()?;
        Ok(tx)
    }

    /// Create a validated transaction from a floating point amount
    ///
    /// NaN and infinities are rejected as `InvalidAmount`.
    pub fn from_f64(
        from: impl Into<ParticipantId>,
        to: impl Into<ParticipantId>,
        amount: f64,
    ) -> Result<Self> {
        if !amount.is_finite() {
            return Err(Error::InvalidAmount(format!("{} is not finite", amount)));
        }
        let amount = Decimal::from_f64(amount).ok_or_else(|| {
            Error::InvalidAmount(format!("{} is out of decimal range", amount))
        })?;
        Self::new(from, to, amount)
    }

    /// Check the input contract
    pub fn validate(&self) -> Result<()> {
        if self.from.is_blank() || self.to.is_blank() {
            return Err(Error::InvalidParticipant(format!(
                "empty participant id in {} -> {}",
                self.from, self.to
            )));
        }

        if self.from == self.to {
            return Err(Error::InvalidParticipantPair(self.from.to_string()));
        }

        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "{} -> {}: amount {} must be positive",
                self.from, self.to, self.amount
            )));
        }

        Ok(())
    }
}

/// Minimal payment instruction produced by the minimizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Payer (net debtor)
    pub from: ParticipantId,

    /// Payee (net creditor)
    pub to: ParticipantId,

    /// Amount to pay
    pub amount: Decimal,
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}

/// Net position per participant (positive = owed money, negative = owes money)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<ParticipantId, Decimal>);

impl Balances {
    /// Create empty balances
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase a participant's position
    pub fn credit(&mut self, participant: &ParticipantId, amount: Decimal) -> Result<()> {
        let balance = self.0.entry(participant.clone()).or_insert(Decimal::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow(format!("position of {}", participant)))?;
        Ok(())
    }

    /// Decrease a participant's position
    pub fn debit(&mut self, participant: &ParticipantId, amount: Decimal) -> Result<()> {
        let balance = self.0.entry(participant.clone()).or_insert(Decimal::ZERO);
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| Error::Overflow(format!("position of {}", participant)))?;
        Ok(())
    }

    /// Get a participant's position (zero if unknown)
    pub fn get(&self, participant: &ParticipantId) -> Decimal {
        self.0.get(participant).copied().unwrap_or(Decimal::ZERO)
    }

    /// Iterate in participant order
    pub fn iter(&self) -> btree_map::Iter<'_, ParticipantId, Decimal> {
        self.0.iter()
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no participant is known
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Algebraic sum of all positions (zero when money is conserved)
    pub fn total(&self) -> Result<Decimal> {
        checked_sum(self.0.values().copied(), "sum of net positions")
    }

    /// Number of participants with a non-zero position
    pub fn nonzero_count(&self) -> usize {
        self.0.values().filter(|b| !b.is_zero()).count()
    }

    /// Copy without the settled participants
    pub fn nonzero(&self) -> Self {
        self.0
            .iter()
            .filter(|(_, b)| !b.is_zero())
            .map(|(p, b)| (p.clone(), *b))
            .collect()
    }
}

impl FromIterator<(ParticipantId, Decimal)> for Balances {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Balances {
    type Item = (ParticipantId, Decimal);
    type IntoIter = btree_map::IntoIter<ParticipantId, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Balances {
    type Item = (&'a ParticipantId, &'a Decimal);
    type IntoIter = btree_map::Iter<'a, ParticipantId, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Check if a residue is small enough to count as settled
pub fn is_dust(amount: Decimal) -> bool {
    amount.abs() <= DUST_TOLERANCE
}

/// Sum amounts, failing instead of overflowing
pub(crate) fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| Error::Overflow(format!("{} exceeds decimal range", what)))
    })
}

/// Netting statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NettingStats {
    /// Number of participants involved
    pub participant_count: usize,

    /// Number of recorded transactions
    pub transaction_count: usize,

    /// Number of settlements
    pub settlement_count: usize,

    /// Total amount across recorded transactions
    pub total_gross: Decimal,

    /// Total amount across settlements
    pub total_net: Decimal,

    /// Amount that no longer has to move
    pub amount_saved: Decimal,

    /// Netting efficiency (0.0 - 1.0)
    pub efficiency: f64,

    /// Number of payments eliminated
    pub transfers_eliminated: usize,
}

impl NettingStats {
    /// Derive statistics from a minimization run
    pub fn from_run(
        transactions: &[Transaction],
        balances: &Balances,
        settlements: &[Settlement],
    ) -> Result<Self> {
        let total_gross = checked_sum(transactions.iter().map(|t| t.amount), "gross amount")?;
        let total_net = checked_sum(settlements.iter().map(|s| s.amount), "net amount")?;
        let amount_saved = total_gross
            .checked_sub(total_net)
            .ok_or_else(|| Error::Overflow("amount saved exceeds decimal range".into()))?;

        let efficiency = if total_gross > Decimal::ZERO {
            amount_saved
                .checked_div(total_gross)
                .and_then(|ratio| ratio.to_f64())
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(Self {
            participant_count: balances.len(),
            transaction_count: transactions.len(),
            settlement_count: settlements.len(),
            total_gross,
            total_net,
            amount_saved,
            efficiency,
            transfers_eliminated: transactions.len().saturating_sub(settlements.len()),
        })
    }
}

/// Result of one engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Payments to execute, in greedy order
    pub settlements: Vec<Settlement>,

    /// Net balances the settlements reproduce
    pub balances: Balances,

    /// Netting statistics
    pub stats: NettingStats,

    /// Computed timestamp
    pub computed_at: DateTime<Utc>,
}
