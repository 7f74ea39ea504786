pub mod core;
pub mod datasets;
pub mod models;
