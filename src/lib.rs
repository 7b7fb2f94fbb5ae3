//! Classified-dossier portfolio and blog server.
//!
//! Posts live on a separate content branch as MDX sources plus JSON
//! manifests. The server fetches them over HTTP, caches them, compiles MDX
//! to sanitized HTML and renders everything through askama templates.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
