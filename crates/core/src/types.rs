/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Authenticated account identifier (the JWT `sub` claim).
pub type UserId = DbId;

/// Catalogue product identifier.
pub type ProductId = DbId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
