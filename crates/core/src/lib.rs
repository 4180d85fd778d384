//! upkeep-core: parsing, location, hook injection and classification for
//! brace-delimited game script.
//!
//! The pipeline keeps two views of every source file: the parsed
//! [`Document`] used for classification, and the original text used by the
//! locator and injector so patched declarations keep their exact layout.
//!
//! # Public API
//!
//! - [`parse_source()`] -- read and parse a family of source files
//! - [`classify()`] -- apply a [`Policy`] to parsed templates and subjects
//! - [`locate_block()`] / [`inject_hooks()`] -- raw-text surgery
//! - [`lexer::tokenize`], [`parser::parse_document`] -- the individual stages

pub mod classify;
pub mod document;
pub mod error;
pub mod inject;
pub mod lexer;
pub mod locate;
pub mod parser;
pub mod policy;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use classify::{Classification, Provenance, QualifiedEntity, Route, Summary};
pub use document::{Document, Value};
pub use error::{InjectError, LocateError, ParseAnomaly, ParseError, PolicyError, SourceError};
pub use policy::Policy;
pub use source::{FileSystemProvider, InMemoryProvider, ParsedSource, SourceProvider};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use classify::classify;
pub use inject::inject_hooks;
pub use locate::{locate_block, locate_sub_block};
pub use source::parse_source;
