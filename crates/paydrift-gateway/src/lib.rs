//! # paydrift-gateway
//!
//! Outbound collaborator ports for the Paydrift settlement core:
//!
//! - [`ExchangeGateway`] — deposit history, deposit address, and withdrawal
//!   submission against the custodial exchange, with [`RestGateway`] as the
//!   HTTP implementation
//! - [`NotificationSink`] — best-effort user/operator messaging, with
//!   [`TracingSink`] (structured log) and [`WebhookSink`] (HTTP relay)
//!
//! The `test-helpers` feature adds `testkit::FakeExchange` and
//! `testkit::RecordingSink` for driving the engine without a network.

pub mod exchange;
pub mod notify;
pub mod rest;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testkit;

pub use exchange::{ExchangeGateway, WithdrawalReceipt};
pub use notify::{NotificationSink, TracingSink, WebhookSink};
pub use rest::{RestGateway, RestGatewayConfig};
