pub mod errors;
pub mod types;

pub use errors::ChartError;
pub use types::{DerivedSeries, Record, Series};
