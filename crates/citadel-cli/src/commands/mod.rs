pub mod config;
pub mod load;
pub mod provision;
pub mod stats;
