//! Application services: content access, rendering and page assembly.

pub mod chrome;
pub mod content;
pub mod error;
pub mod listing;
pub mod manifest;
pub mod posts;
pub mod render;
pub mod resume;
