//! smsgate Protocol - Command payloads and relay frames
//!
//! This crate defines:
//! - `form`: strict `application/x-www-form-urlencoded` parsing over raw bytes
//! - `Command`: the `valid` / `sendNumber` / `sendMsg` command carried in a token
//! - Freshness checks and the pluggable `FieldValidator`
//! - `RelayFrame`: the `::number::message::` line written to the SMS device

mod command;
pub mod form;
mod frame;
mod validation;

pub use command::*;
pub use frame::*;
pub use validation::*;
