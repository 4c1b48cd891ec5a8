//! Structural addressing, citation parsing, and in-text reference linking
//! for a library of interlinked texts.
//!
//! Build a [`Library`] once (from store records through [`LibraryBuilder`]
//! or [`store::load_dir`]), share it through `Arc`, and parse citations
//! with [`Library::parse_ref`] or scan prose with [`Linker`].

pub mod address;
pub mod config;
pub mod error;
pub mod hebrew;
pub mod index;
pub mod jagged;
pub mod lang;
pub mod library;
pub mod linker;
pub mod reference;
pub mod review;
pub mod schema;
pub mod store;
pub mod title_index;
pub mod types;

pub use error::Error;
pub use lang::Lang;
pub use library::{Library, LibraryBuilder, TextChunk};
pub use linker::{LinkItem, Linker, Resolution, ResolvedRef};
pub use reference::{Ref, RefPattern};
