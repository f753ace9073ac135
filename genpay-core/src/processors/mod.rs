//! Processors that talk to the gateway, the logistics partner and the shop.
//!
//! - `Orchestrator`: charge, cancel and refund calls
//! - `StatusMachine`: applies gateway statuses to orders, exactly once
//! - `WebhookHandler`: verifies notifications and feeds the `StatusMachine`
//! - `ShipmentDispatcher`: creates shipment batches and reads back tracking

pub mod orchestrator;
pub mod shipping;
pub mod status_machine;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{CancelOutcome, ChargeOutcome, Orchestrator, OrchestratorError};
pub use shipping::{ShipmentDispatcher, ShippingError};
pub use status_machine::{
    Effect, StatusError, StatusMachine, StatusOutcome, StatusUpdate, Transition, plan_transition,
};
pub use webhook::{WebhookError, WebhookHandler};
