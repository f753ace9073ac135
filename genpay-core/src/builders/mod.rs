//! Turn shop orders and form input into gateway request bodies.
//!
//! Builders are pure: no I/O, no clock. Callers pass in the date and any
//! gateway data they depend on.

pub mod charge;
pub mod refund;

pub use charge::build_charge;
pub use refund::build_refund;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("malformed phone number {0:?}, expected (DD) NNNNN-NNNN")]
    MalformedPhoneNumber(String),
    #[error("missing card details: {0}")]
    MissingCardDetails(&'static str),
    #[error("billet refunds need a destination bank account")]
    MissingBankAccount,
    #[error("the gateway transaction has no payment to refund")]
    MissingPriorPayment,
    #[error("invalid installment quantity {0}")]
    InvalidInstallmentQuantity(u32),
}
