//! Request handlers, one module per resource.

pub mod booking;
pub mod orders;
