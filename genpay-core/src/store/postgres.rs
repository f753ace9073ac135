use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

use super::{StoreError, TransactionStore};
use crate::entities::transaction_record::{
    GetTransactionRecord, GetTransactionRecordByChargeId, InsertTransactionRecord,
    UpdateTransactionRecord,
};
use crate::entities::{OrderId, TransactionRecord};
use crate::framework::DatabaseProcessor;

/// `transaction_records` table in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    processor: DatabaseProcessor,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetTransactionRecord { order_id })
            .await?)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetTransactionRecordByChargeId {
                transaction_id: transaction_id.to_owned(),
            })
            .await?)
    }

    async fn save(&self, record: TransactionRecord) -> Result<TransactionRecord, StoreError> {
        let order_id = record.order_id;
        let saved = if record.version == 0 {
            self.processor
                .process(InsertTransactionRecord { record })
                .await?
        } else {
            self.processor
                .process(UpdateTransactionRecord { record })
                .await?
        };
        saved.ok_or(StoreError::Conflict { order_id })
    }
}
