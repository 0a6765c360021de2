/*
[INPUT]:  Public API exports for the xapi-trader crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod driver;
pub mod history;

// Re-export main types for convenience
pub use config::TraderConfig;
pub use driver::{Driver, SessionExit, run};
pub use history::{OhlcvRow, PriceBar};
