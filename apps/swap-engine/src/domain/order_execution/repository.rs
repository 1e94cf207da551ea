//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;

use super::aggregate::Order;
use super::errors::OrderError;
use crate::domain::shared::OrderId;

/// Repository trait for Order persistence.
///
/// Durable storage is an external collaborator; the engine only needs
/// lookup by id and upsert.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Find an order by its ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. A missing order is `Ok(None)`.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;
}
