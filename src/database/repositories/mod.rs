/// Repository implementations
///
/// Callers depend on the [`PriceRepository`] trait; the PostgreSQL
/// implementation takes a connection provider so the pool stays swappable.

pub mod price_repository;

pub use price_repository::{PgPriceRepository, PriceRepository, TimeRange, MAX_ROWS_PER_STATEMENT};
