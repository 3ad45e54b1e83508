//! Logic modules: pure functions over the catalog and personas.
//!
//! # Modules
//!
//! - `resolver` - Dependency expansion into an install order
//! - `requirements` - Catalog system requirements against the host
//! - `recommend` - Persona ranking by installed share

pub mod recommend;
pub mod requirements;
pub mod resolver;
