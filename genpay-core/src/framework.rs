use sqlx::PgPool;

/// Runs store queries. Each query is a type with a
/// `kanau::processor::Processor` impl on this struct.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
