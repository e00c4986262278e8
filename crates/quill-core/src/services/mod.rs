//! Application services - the write workflows.
//!
//! Services take an open [`Transaction`](crate::ports::Transaction) and never
//! commit it themselves.

pub mod accounts;
pub mod post_sync;
pub mod tags;
