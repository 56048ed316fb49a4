//! Gateway: the HTTP surface of the directive pipeline.
//!
//! One port, two routes: `GET /` health and `POST /message`. Each message is
//! handled by one sequential pipeline execution (assistant call -> extract ->
//! resolve -> validate -> dispatch); there is no shared mutable state across
//! requests.

mod server;

pub use server::{run_gateway, GatewayState};
