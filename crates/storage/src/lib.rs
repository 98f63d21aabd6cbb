//! Inventory and storage reconciliation
//!
//! Decides which storage slot carried seeds go into and which slot seeds are
//! taken from, then issues the transfers. Transfers are fire-and-forget; the
//! next slot enumeration is the only source of truth.

pub mod plan;
pub mod reconciler;

pub use plan::{plan_deposit, select_withdraw_slot, DepositMove, DepositPlan};
pub use reconciler::{DepositOutcome, Reconciler, WithdrawOutcome};
