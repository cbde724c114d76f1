//! Template and configuration store for dungeon instances.
//!
//! Dungeon layouts live in RON files, one [`dungeon_core::DungeonTemplate`]
//! per file, and engine tunables in a TOML file. Everything loaded here is
//! validated before it reaches the runtime; the runtime treats it as
//! read-only.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, LoadResult, TemplateLoader};
