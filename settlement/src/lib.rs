//! Cash Flow Settlement Minimizer
//!
//! Reduces a group's pairwise debts to the fewest payments that settle
//! everyone.
//!
//! # Architecture
//!
//! 1. **Validation**: Reject non-positive amounts, self-debts and blank ids
//! 2. **Netting**: Aggregate transactions into one net position per participant
//! 3. **Matching**: Greedily pair the largest creditor with the largest debtor
//! 4. **Verification**: Replay the settlements against the net positions
//!
//! # Invariants
//!
//! - Money conservation: Σ(net positions) == 0
//! - Balance equivalence: settlements reproduce every net position
//! - At most `P - 1` settlements for `P` unsettled participants
//! - Deterministic: ties go to the lexicographically smallest participant
//!
//! # Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use settlement::{minimize, Transaction};
//!
//! # fn main() -> settlement::Result<()> {
//! let transactions = vec![
//!     Transaction::new("A", "B", Decimal::new(10, 0))?,
//!     Transaction::new("B", "C", Decimal::new(10, 0))?,
//!     Transaction::new("A", "C", Decimal::new(5, 0))?,
//! ];
//!
//! let settlements = minimize(&transactions)?;
//! assert_eq!(settlements.len(), 1);
//! assert_eq!(settlements[0].amount, Decimal::new(15, 0));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod netting;
pub mod error;
pub mod config;
pub mod engine;

use rust_decimal::Decimal;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use engine::SettlementMinimizer;
pub use netting::{compute_net_balances, minimize, minimize_settlements, verify_settlements};

/// Magnitude at or below which a net position counts as settled (1e-9)
pub const DUST_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);
