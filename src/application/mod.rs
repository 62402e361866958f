//! Application layer: the services that orchestrate domain objects and ports.
//!
//! `OrderService` is the order lifecycle engine. It validates, mutates one
//! order document at a time through compare-and-swap writes, and pushes side
//! effects (gateway calls, emails) out through injected ports.

pub mod cart;
pub mod dispatch;
pub mod orders;
