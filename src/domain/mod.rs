//! Entities, value objects and the ports the application layer talks through.

pub mod cart;
pub mod money;
pub mod notification;
pub mod order;
pub mod payment;
pub mod ports;
pub mod role;
pub mod schedule;
