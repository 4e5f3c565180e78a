pub mod metrics;
pub mod path_logger;
pub mod signature;
