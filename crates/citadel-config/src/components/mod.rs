//! Configuration components, one per concern of the loader.

pub mod api;
pub mod database;
pub mod logging;
pub mod run;

pub use api::*;
pub use database::*;
pub use logging::*;
pub use run::*;
