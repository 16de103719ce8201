//! Command line interface support (`cli` feature)

pub mod commands;
pub mod error;
