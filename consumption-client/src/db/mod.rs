pub mod consumption_queries;

pub use consumption_queries::{fetch_consumption_window, insert_consumption_lot};
