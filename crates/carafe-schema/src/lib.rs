//! Shared recipe types for carafe.
//!
//! A recipe is the declarative description of one installable application:
//! where its source archive lives, the SHA-256 digest it must match, the
//! pinned dependency archives it needs, and how to smoke-test the result.
//! Everything here is plain data plus construction-time validation; no I/O
//! beyond reading the recipe file itself.

pub mod digest;
pub mod recipe;
pub mod types;

// Re-exports
pub use digest::Sha256Digest;
pub use recipe::{CheckSpec, PackageSpec, Recipe, RecipeError, ResourceSpec};
pub use types::{AppName, ResourceName, Version};
