pub mod config;
pub mod customer;
pub mod error;

pub use config::Config;
pub use customer::*;
pub use error::*;
