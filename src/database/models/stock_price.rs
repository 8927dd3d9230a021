use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::database::connection::DatabaseError;
use crate::models::BatchRecord;

/// Row written for each buffered tick at flush time
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::database::schema::stock_prices)]
pub struct NewStockPrice {
    pub stock_name: String,
    pub exchange: String,
    pub price: f64,
    /// Stored in the `timestamp` column
    pub price_time: DateTime<Utc>,
}

impl TryFrom<&BatchRecord> for NewStockPrice {
    type Error = DatabaseError;

    fn try_from(record: &BatchRecord) -> Result<Self, Self::Error> {
        let price_time =
            record
                .event_timestamp()
                .ok_or_else(|| DatabaseError::InvalidTimestamp {
                    stock_name: record.stock_name.clone(),
                    value: record.event_time,
                })?;

        Ok(Self {
            stock_name: record.stock_name.clone(),
            exchange: record.exchange.clone(),
            price: record.price,
            price_time,
        })
    }
}

impl NewStockPrice {
    /// Convert a drained batch, failing on the first unrepresentable timestamp
    pub fn from_batch(records: &[BatchRecord]) -> Result<Vec<Self>, DatabaseError> {
        records.iter().map(Self::try_from).collect()
    }
}

/// One stored price observation, as returned by the query API
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::database::schema::stock_prices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PricePoint {
    #[diesel(column_name = price_time)]
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::stock_prices;
    use diesel::pg::Pg;

    fn record(event_time: f64) -> BatchRecord {
        BatchRecord {
            stock_name: "AAPL".to_string(),
            exchange: "NASDAQ".to_string(),
            price: 220.40,
            event_time,
        }
    }

    #[test]
    fn test_row_from_record() {
        let row = NewStockPrice::try_from(&record(1757494917.02)).unwrap();

        assert_eq!(row.stock_name, "AAPL");
        assert_eq!(row.exchange, "NASDAQ");
        assert_eq!(row.price, 220.40);
        assert_eq!(row.price_time.timestamp(), 1757494917);
        assert_eq!(row.price_time.timestamp_subsec_micros(), 20_000);
    }

    #[test]
    fn test_unrepresentable_time_fails_whole_batch() {
        let batch = vec![record(1.0), record(f64::NAN), record(2.0)];

        let err = NewStockPrice::from_batch(&batch).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_insert_targets_timestamp_column() {
        let rows = NewStockPrice::from_batch(&[record(1.0)]).unwrap();
        let query = diesel::insert_into(stock_prices::table).values(&rows);
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();

        assert!(sql.starts_with(
            r#"INSERT INTO "stock_prices" ("stock_name", "exchange", "price", "timestamp")"#
        ));
    }

    #[test]
    fn test_price_point_json() {
        let point = PricePoint {
            timestamp: DateTime::<Utc>::from_timestamp(1757494917, 0).unwrap(),
            price: 220.4,
        };

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["timestamp"], "2025-09-10T09:01:57Z");
        assert_eq!(json["price"], 220.4);
    }
}
