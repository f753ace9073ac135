pub mod charge;
pub mod logistics;
pub mod refund;
pub mod response;
pub mod status;
pub mod webhook;

pub use status::GatewayStatus;
