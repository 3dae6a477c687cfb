use std::path::PathBuf;

use thiserror::Error;

type Span = logos::Span;

/// Netlist parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input at {at:?}")]
    UnexpectedEof { at: Span },
    #[error("Expected {expected} but found {found} at {at:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        at: Span,
    },
    #[error("Unknown token {found} at {at:?}")]
    UnknownToken { found: String, at: Span },
    #[error("Input contains no s-expression")]
    EmptyDocument,
    #[error("SExpr {0} not found")]
    MissingChild(String),
    #[error("Value of {0} not found")]
    MissingValue(String),
    #[error("Value of {0} is empty")]
    EmptyValue(String),
    #[error("Component {0} is defined more than once")]
    DuplicateComponent(String),
    #[error("Net {0} is defined more than once")]
    DuplicateNet(String),
}

/// A single record that was skipped while building a board
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("{reference}: footprint \"{footprint}\" is not of the form library:cell")]
    MalformedFootprint {
        reference: String,
        footprint: String,
    },
    #[error("{reference}: footprint {footprint} not found in any library")]
    FootprintNotFound {
        reference: String,
        footprint: String,
    },
    #[error("net {net}: no component {reference} (pin {pin})")]
    UnknownComponent {
        net: String,
        reference: String,
        pin: String,
    },
    #[error("net {net}: component {reference} has no pad {pin}")]
    UnknownPad {
        net: String,
        reference: String,
        pin: String,
    },
}

/// Footprint lookup errors
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Footprint {0} not found")]
    NotFound(String),
    #[error("Failed to read footprint file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse footprint file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Errors raised by a board implementation
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Footprint {0} not found")]
    FootprintNotFound(String),
    #[error("Footprint library error: {0}")]
    Library(#[source] LibraryError),
    #[error("Component {0} already exists on the board")]
    DuplicateReference(String),
    #[error("Component {0} not found on the board")]
    UnknownComponent(String),
    #[error("Net {0} not found on the board")]
    UnknownNet(String),
    #[error("Net name is empty")]
    EmptyNetName,
    #[error("Stale board handle")]
    InvalidHandle,
    #[error("Board has no footprints to fit an outline around")]
    EmptyBoard,
    #[error("Failed to write board file {path}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LibraryError> for BoardError {
    fn from(value: LibraryError) -> Self {
        match value {
            LibraryError::NotFound(id) => BoardError::FootprintNotFound(id),
            other => BoardError::Library(other),
        }
    }
}

/// Fatal errors that abort a build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Board context error: {0}")]
    BoardContext(#[from] BoardError),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config: {0} must be a finite number")]
    NotFinite(&'static str),
}

/// A footprint name that is not `library:cell`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not of the form library:cell")]
pub struct MalformedFootprint(pub String);
