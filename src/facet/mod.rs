//! Faceted option resolution over the stored table

pub mod resolver;

pub use resolver::{FacetLists, resolve, resolve_all};
