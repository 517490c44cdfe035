pub mod collector;
pub mod granularity;
pub mod pipeline;
pub mod reading;
pub mod reconcile;
pub mod series;
pub mod table;
