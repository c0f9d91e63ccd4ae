pub mod document;
pub mod error_utils;
pub mod graph;
pub mod loader;
pub mod protocol;
pub mod validation;
