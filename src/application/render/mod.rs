//! MDX compile pipeline.
//!
//! The pipeline is pure: it accepts post source, produces deterministic HTML,
//! and surfaces structured errors. Fetching and caching happen in the caller.

mod failure;
mod service;
mod types;

pub use failure::describe_failure;
pub use service::{MdxRenderService, render_service};
pub use types::{CompiledPost, RenderError, RenderService};
