use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, TransactionStore};
use crate::entities::{OrderId, TransactionRecord};

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    records: RwLock<HashMap<OrderId, TransactionRecord>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.records.read().await.get(&order_id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn save(&self, mut record: TransactionRecord) -> Result<TransactionRecord, StoreError> {
        let mut records = self.records.write().await;
        let stored_version = records.get(&record.order_id).map_or(0, |r| r.version);
        if stored_version != record.version {
            return Err(StoreError::Conflict {
                order_id: record.order_id,
            });
        }
        record.version += 1;
        records.insert(record.order_id, record.clone());
        Ok(record)
    }
}
