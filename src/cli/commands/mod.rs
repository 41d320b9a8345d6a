pub mod batch;
pub mod config;
pub mod count;
pub mod fetch;
pub mod insights;
