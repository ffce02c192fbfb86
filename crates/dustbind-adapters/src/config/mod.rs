//! Configuration stores.

mod json;
mod layered;

pub use json::JsonConfig;
pub use layered::LayeredConfig;
