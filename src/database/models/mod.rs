pub mod stock_price;

pub use stock_price::{NewStockPrice, PricePoint};
