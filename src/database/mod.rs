/// Database module for PostgreSQL price storage
///
/// This module provides:
/// - A lazily connecting r2d2 pool and embedded schema migrations
/// - The `stock_prices` schema and diesel models
/// - The repository used by the flush job and the query API

pub mod connection;
pub mod models;
pub mod repositories;
pub mod schema;

pub use connection::{establish_connection_pool, DatabaseError, DatabasePool};
