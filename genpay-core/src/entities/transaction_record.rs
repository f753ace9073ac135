use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::order::{OrderId, PaymentMethodKind};
use crate::framework::DatabaseProcessor;

/// Gateway state persisted against an order.
///
/// `version` is an optimistic-concurrency token: a record read at version
/// `n` can only be written back while the stored copy is still at `n`.
/// Version `0` means the record has never been stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_id: OrderId,
    /// The gateway's charge id.
    pub transaction_id: Option<String>,
    pub cancelled: bool,
    pub declined: bool,
    pub failure: bool,
    /// Payment completion was applied to the order.
    pub approved: bool,
    pub fully_refunded: bool,
    /// Refund ids already applied to the order. Never contains duplicates.
    pub refunded_ids: Vec<String>,
    /// Last gateway status applied to the order.
    pub last_status: Option<String>,
    pub display: PaymentDisplay,
    pub version: i64,
}

impl TransactionRecord {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    pub fn has_refund(&self, refund_id: &str) -> bool {
        self.refunded_ids.iter().any(|id| id == refund_id)
    }

    /// Append a refund id unless it is already present. Returns whether it
    /// was added.
    pub fn push_refund_id(&mut self, refund_id: &str) -> bool {
        if self.has_refund(refund_id) {
            return false;
        }
        self.refunded_ids.push(refund_id.to_owned());
        true
    }
}

/// Payment details shown on the order screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentDisplay {
    pub method: Option<PaymentMethodKind>,
    pub card_brand: Option<String>,
    pub masked_number: Option<String>,
    pub installments: Option<u32>,
    pub billet_url: Option<String>,
    /// Total charged, including installment interest.
    pub amount: Option<Decimal>,
}

/// Display name for a card brand code. Unknown codes are returned as-is.
pub fn card_brand_name(brand: &str) -> String {
    match brand.to_ascii_lowercase().as_str() {
        "visa" => "Visa",
        "mastercard" => "MasterCard",
        "amex" => "American Express",
        "aura" => "Aura",
        "jcb" => "JCB",
        "diners" => "Diners",
        "elo" => "Elo",
        "hipercard" => "Hipercard",
        "discover" => "Discover",
        _ => return brand.to_owned(),
    }
    .to_owned()
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TransactionRecordRow {
    order_id: i64,
    transaction_id: Option<String>,
    cancelled: bool,
    declined: bool,
    failure: bool,
    approved: bool,
    fully_refunded: bool,
    refunded_ids: Vec<String>,
    last_status: Option<String>,
    display: sqlx::types::Json<PaymentDisplay>,
    version: i64,
}

impl From<TransactionRecordRow> for TransactionRecord {
    fn from(row: TransactionRecordRow) -> Self {
        Self {
            order_id: row.order_id,
            transaction_id: row.transaction_id,
            cancelled: row.cancelled,
            declined: row.declined,
            failure: row.failure,
            approved: row.approved,
            fully_refunded: row.fully_refunded,
            refunded_ids: row.refunded_ids,
            last_status: row.last_status,
            display: row.display.0,
            version: row.version,
        }
    }
}

const RECORD_COLUMNS: &str = "order_id, transaction_id, cancelled, declined, failure, \
    approved, fully_refunded, refunded_ids, last_status, display, version";

#[derive(Debug, Clone)]
pub struct GetTransactionRecord {
    pub order_id: OrderId,
}

impl Processor<GetTransactionRecord> for DatabaseProcessor {
    type Output = Option<TransactionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionRecord")]
    async fn process(
        &self,
        query: GetTransactionRecord,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM transaction_records WHERE order_id = $1");
        let row = sqlx::query_as::<_, TransactionRecordRow>(&sql)
            .bind(query.order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
/// Look a record up by the gateway's charge id, as webhooks only carry that.
pub struct GetTransactionRecordByChargeId {
    pub transaction_id: String,
}

impl Processor<GetTransactionRecordByChargeId> for DatabaseProcessor {
    type Output = Option<TransactionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionRecordByChargeId")]
    async fn process(
        &self,
        query: GetTransactionRecordByChargeId,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM transaction_records WHERE transaction_id = $1");
        let row = sqlx::query_as::<_, TransactionRecordRow>(&sql)
            .bind(query.transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
/// Insert a record at version 1. Returns `None` if one already exists for
/// the order.
pub struct InsertTransactionRecord {
    pub record: TransactionRecord,
}

impl Processor<InsertTransactionRecord> for DatabaseProcessor {
    type Output = Option<TransactionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertTransactionRecord")]
    async fn process(
        &self,
        insert: InsertTransactionRecord,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let r = insert.record;
        let sql = format!(
            r#"
            INSERT INTO transaction_records ({RECORD_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TransactionRecordRow>(&sql)
            .bind(r.order_id)
            .bind(r.transaction_id)
            .bind(r.cancelled)
            .bind(r.declined)
            .bind(r.failure)
            .bind(r.approved)
            .bind(r.fully_refunded)
            .bind(r.refunded_ids)
            .bind(r.last_status)
            .bind(sqlx::types::Json(r.display))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
/// Compare-and-swap update. Returns `None` when the stored version no
/// longer matches `record.version`.
pub struct UpdateTransactionRecord {
    pub record: TransactionRecord,
}

impl Processor<UpdateTransactionRecord> for DatabaseProcessor {
    type Output = Option<TransactionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateTransactionRecord")]
    async fn process(
        &self,
        update: UpdateTransactionRecord,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let r = update.record;
        let sql = format!(
            r#"
            UPDATE transaction_records
            SET transaction_id = $2,
                cancelled = $3,
                declined = $4,
                failure = $5,
                approved = $6,
                fully_refunded = $7,
                refunded_ids = $8,
                last_status = $9,
                display = $10,
                version = version + 1,
                updated_at = NOW()
            WHERE order_id = $1 AND version = $11
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TransactionRecordRow>(&sql)
            .bind(r.order_id)
            .bind(r.transaction_id)
            .bind(r.cancelled)
            .bind(r.declined)
            .bind(r.failure)
            .bind(r.approved)
            .bind(r.fully_refunded)
            .bind(r.refunded_ids)
            .bind(r.last_status)
            .bind(sqlx::types::Json(r.display))
            .bind(r.version)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_refund_id_dedups() {
        let mut record = TransactionRecord::new(7);
        assert!(record.push_refund_id("r1"));
        assert!(!record.push_refund_id("r1"));
        assert!(record.push_refund_id("r2"));
        assert_eq!(record.refunded_ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_card_brand_names() {
        assert_eq!(card_brand_name("amex"), "American Express");
        assert_eq!(card_brand_name("MASTERCARD"), "MasterCard");
        assert_eq!(card_brand_name("cabal"), "cabal");
    }

    #[test]
    fn test_display_round_trips_through_json_column() {
        let display = PaymentDisplay {
            method: Some(PaymentMethodKind::Billet),
            billet_url: Some("https://billet/1".to_string()),
            amount: Some(Decimal::new(10000, 2)),
            ..Default::default()
        };
        let json = serde_json::to_value(&display).unwrap();
        let back: PaymentDisplay = serde_json::from_value(json).unwrap();
        assert_eq!(back, display);
    }
}
