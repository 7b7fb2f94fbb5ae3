//! Domain layer types and invariants.

pub mod error;
pub mod frontmatter;
pub mod resume;
pub mod slug;
