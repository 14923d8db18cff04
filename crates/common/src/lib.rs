//! Error context and HTML text helpers shared by the relaygram crates.

pub mod error;
pub mod html;

pub use error::FromMessage;
