//! Settlement engine
//!
//! Wraps the netting core with input limits, plan verification and logging.

use crate::{
    config::Config,
    netting::{compute_net_balances, minimize_settlements, verify_settlements},
    types::*,
    Error, Result,
};
use tracing::{info, warn};

/// Settlement minimizer
#[derive(Debug, Clone)]
pub struct SettlementMinimizer {
    /// Configuration
    config: Config,
}

impl SettlementMinimizer {
    /// Create new minimizer
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compute net positions, enforcing the configured limits
    pub fn balances(&self, transactions: &[Transaction]) -> Result<Balances> {
        let limits = &self.config.limits;
        if transactions.len() > limits.max_transactions {
            return Err(Error::LimitExceeded(format!(
                "{} transactions (max {})",
                transactions.len(),
                limits.max_transactions
            )));
        }

        let balances = compute_net_balances(transactions).map_err(|e| {
            warn!(error = %e, "rejected transaction set");
            e
        })?;

        if balances.len() > limits.max_participants {
            return Err(Error::LimitExceeded(format!(
                "{} participants (max {})",
                balances.len(),
                limits.max_participants
            )));
        }

        Ok(balances)
    }

    /// Build the settlement plan for a transaction set
    pub fn plan(&self, transactions: &[Transaction]) -> Result<SettlementPlan> {
        let balances = self.balances(transactions)?;
        let settlements = minimize_settlements(&balances)?;

        if self.config.netting.verify_plan {
            verify_settlements(&balances, &settlements)?;
        }

        let stats = NettingStats::from_run(transactions, &balances, &settlements)?;
        info!(
            participants = stats.participant_count,
            transactions = stats.transaction_count,
            settlements = stats.settlement_count,
            saved = %stats.amount_saved,
            "settlement plan computed"
        );

        Ok(SettlementPlan {
            settlements,
            balances,
            stats,
            computed_at: chrono::Utc::now(),
        })
    }
}

impl Default for SettlementMinimizer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tx(from: &str, to: &str, amount: i64) -> Transaction {
        Transaction::new(from, to, Decimal::new(amount, 0)).unwrap()
    }

    #[test]
    fn test_plan_reports_savings() {
        let engine = SettlementMinimizer::default();
        let plan = engine
            .plan(&[tx("A", "B", 10), tx("B", "C", 10), tx("A", "C", 5)])
            .unwrap();

        assert_eq!(plan.settlements.len(), 1);
        assert_eq!(plan.balances.len(), 3);
        assert_eq!(plan.stats.transaction_count, 3);
        assert_eq!(plan.stats.settlement_count, 1);
        assert_eq!(plan.stats.transfers_eliminated, 2);
        assert_eq!(plan.stats.amount_saved, Decimal::new(10, 0));
    }

    #[test]
    fn test_transaction_limit() {
        let mut config = Config::default();
        config.limits.max_transactions = 1;
        let engine = SettlementMinimizer::new(config);

        let err = engine
            .plan(&[tx("A", "B", 1), tx("B", "C", 1)])
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn test_participant_limit() {
        let mut config = Config::default();
        config.limits.max_participants = 2;
        let engine = SettlementMinimizer::new(config);

        assert!(engine.plan(&[tx("A", "B", 1)]).is_ok());
        let err = engine
            .plan(&[tx("A", "B", 1), tx("B", "C", 1)])
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn test_invalid_input_surfaces_validation_error() {
        let engine = SettlementMinimizer::default();
        let mut bad = tx("A", "B", 1);
        bad.amount = Decimal::ZERO;

        let err = engine.plan(&[bad]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_amounts_beyond_decimal_range_are_errors() {
        let engine = SettlementMinimizer::default();

        let err = engine
            .plan(&[
                Transaction::new("A", "B", Decimal::MAX).unwrap(),
                Transaction::new("A", "C", Decimal::MAX).unwrap(),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));

        // Positions cancel out but the gross total does not fit
        let err = engine
            .plan(&[
                Transaction::new("A", "B", Decimal::MAX).unwrap(),
                Transaction::new("B", "A", Decimal::MAX).unwrap(),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn test_tiny_debts_produce_verified_plan() {
        let transactions: Vec<Transaction> = (0..10)
            .map(|i| Transaction::new(format!("X{}", i), "Y", Decimal::new(1, 9)).unwrap())
            .collect();

        let plan = SettlementMinimizer::default().plan(&transactions).unwrap();
        assert_eq!(plan.settlements.len(), 10);
        assert_eq!(plan.stats.total_net, Decimal::new(10, 9));
    }

    #[test]
    fn test_empty_plan() {
        let plan = SettlementMinimizer::default().plan(&[]).unwrap();
        assert!(plan.settlements.is_empty());
        assert!(plan.balances.is_empty());
        assert_eq!(plan.stats.efficiency, 0.0);
    }
}
