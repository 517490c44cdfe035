pub mod cost;
pub mod partition;
pub mod resample;
pub mod solar;
pub mod summary;
