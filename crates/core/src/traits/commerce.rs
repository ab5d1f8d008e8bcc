//! Order lookup capability

use async_trait::async_trait;

use crate::{OrderSummary, Result};

/// Commerce backend order lookup
///
/// Both email and order number are required so one customer cannot
/// enumerate another customer's orders.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// `Ok(None)` when no order matches the pair
    async fn lookup(&self, email: &str, order_number: &str) -> Result<Option<OrderSummary>>;
}
