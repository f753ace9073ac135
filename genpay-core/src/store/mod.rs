//! Persistence of [`TransactionRecord`]s with optimistic concurrency.
//!
//! `save` is a compare-and-swap on `version`: it only succeeds when the
//! stored copy is still at the version the caller loaded, and returns the
//! record with the bumped version. A version of `0` inserts.

mod memory;
mod postgres;

pub use memory::MemoryTransactionStore;
pub use postgres::PgTransactionStore;

use async_trait::async_trait;
use tracing::debug;

use crate::entities::{OrderId, TransactionRecord};

const MAX_SAVE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction record for order {order_id} was modified concurrently")]
    Conflict { order_id: OrderId },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn load(&self, order_id: OrderId) -> Result<Option<TransactionRecord>, StoreError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    async fn save(&self, record: TransactionRecord) -> Result<TransactionRecord, StoreError>;

    /// The stored record, or a fresh unsaved one.
    async fn load_or_new(&self, order_id: OrderId) -> Result<TransactionRecord, StoreError> {
        Ok(self
            .load(order_id)
            .await?
            .unwrap_or_else(|| TransactionRecord::new(order_id)))
    }
}

/// Load, modify and save a record, reloading when another writer got there
/// first.
pub async fn update_record<F>(
    store: &dyn TransactionStore,
    order_id: OrderId,
    mut modify: F,
) -> Result<TransactionRecord, StoreError>
where
    F: FnMut(&mut TransactionRecord) + Send,
{
    for _ in 0..MAX_SAVE_ATTEMPTS {
        let mut record = store.load_or_new(order_id).await?;
        modify(&mut record);
        match store.save(record).await {
            Err(StoreError::Conflict { .. }) => {
                debug!(order_id, "transaction record save conflicted, retrying");
            }
            other => return other,
        }
    }
    Err(StoreError::Conflict { order_id })
}
