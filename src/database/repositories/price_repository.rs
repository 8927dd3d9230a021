use crate::database::connection::{DatabaseError, PgPooledConnection};
use crate::database::models::{NewStockPrice, PricePoint};
use crate::database::schema::stock_prices;
use chrono::{DateTime, Utc};
use diesel::dsl::avg;
use diesel::prelude::*;
use std::sync::Arc;

/// Rows per INSERT statement, keeping bind parameters under PostgreSQL's limit
pub const MAX_ROWS_PER_STATEMENT: usize = 10_000;

/// Optional inclusive bounds on the stored `timestamp`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| time >= start) && self.end.map_or(true, |end| time <= end)
    }
}

/// Price repository trait - storage interface for the ingestion pipeline and query API
///
/// Calls block on the database; async callers run them on `spawn_blocking`.
pub trait PriceRepository: Send + Sync {
    /// Insert a whole batch in one transaction
    ///
    /// Either every row is committed or none is.
    fn insert_batch(&self, rows: &[NewStockPrice]) -> Result<usize, DatabaseError>;

    /// Price points for a symbol ordered by time ascending
    fn get_prices(&self, stock_name: &str, range: TimeRange) -> Result<Vec<PricePoint>, DatabaseError>;

    /// Mean price for a symbol, `None` when no rows match
    fn get_average(&self, stock_name: &str, range: TimeRange) -> Result<Option<f64>, DatabaseError>;
}

/// PostgreSQL implementation of PriceRepository
pub struct PgPriceRepository {
    get_conn: Arc<dyn Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync>,
}

impl PgPriceRepository {
    /// Create new price repository with connection provider
    pub fn new<F>(get_conn: F) -> Self
    where
        F: Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync + 'static,
    {
        Self {
            get_conn: Arc::new(get_conn),
        }
    }
}

impl PriceRepository for PgPriceRepository {
    fn insert_batch(&self, rows: &[NewStockPrice]) -> Result<usize, DatabaseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = (self.get_conn)()?;

        let inserted = conn.transaction::<usize, DatabaseError, _>(|conn| {
            let mut inserted = 0;
            for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
                inserted += diesel::insert_into(stock_prices::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;

        tracing::debug!("Batch inserted {} price rows", inserted);

        Ok(inserted)
    }

    fn get_prices(&self, stock_name: &str, range: TimeRange) -> Result<Vec<PricePoint>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let mut query = stock_prices::table
            .select(PricePoint::as_select())
            .filter(stock_prices::stock_name.eq(stock_name))
            .into_boxed();

        if let Some(start) = range.start {
            query = query.filter(stock_prices::price_time.ge(start));
        }
        if let Some(end) = range.end {
            query = query.filter(stock_prices::price_time.le(end));
        }

        query
            .order(stock_prices::price_time.asc())
            .load::<PricePoint>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn get_average(&self, stock_name: &str, range: TimeRange) -> Result<Option<f64>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let mut query = stock_prices::table
            .select(avg(stock_prices::price))
            .filter(stock_prices::stock_name.eq(stock_name))
            .into_boxed();

        if let Some(start) = range.start {
            query = query.filter(stock_prices::price_time.ge(start));
        }
        if let Some(end) = range.end {
            query = query.filter(stock_prices::price_time.le(end));
        }

        query
            .get_result::<Option<f64>>(&mut conn)
            .map_err(DatabaseError::from)
    }
}
