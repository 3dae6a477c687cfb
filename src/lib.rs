//! Replays a KiCad netlist onto a board.
//!
//! The netlist text is parsed into a [`Document`] of components and nets,
//! which [`build`] turns into calls against a [`Board`]. [`MemoryBoard`] is
//! the bundled board implementation; placement, outline and routing helpers
//! work on any board that also implements [`Layout`].

pub mod board;
pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod memory;
pub mod outline;
pub mod placement;
pub mod route;
pub mod sexpr;

pub use board::{Board, Layout};
pub use builder::{build, BuildReport};
pub use config::Config;
pub use document::{ComponentRecord, Document, Endpoint, NetRecord};
pub use error::{BoardError, BuildError, ConfigError, LibraryError, ParseError, RecordError};
pub use footprint::{Footprint, FootprintId, FootprintLibrary};
pub use memory::MemoryBoard;

/// Parses netlist text into a [`Document`]
pub fn extract(input: &str) -> Result<Document, ParseError> {
    Document::parse(input)
}
