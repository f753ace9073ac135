//! Wire types, request signing and HTTP clients for the GenPay payment
//! gateway and the GenLog logistics API.

pub mod config;
pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;
