//! Policy bundle model.
//!
//! Bundles are YAML documents holding policies, queries and migration
//! groups. Every decoded record remembers the line and column it started at
//! so diagnostics can point back into the source.

pub mod compile;
pub mod decode;
pub mod format;
pub mod parse;
pub mod position;
pub mod schema;

pub use compile::{BundleCompiler, CompileError, MqlCompiler};
pub use decode::{DecodeError, DecodeErrorKind};
pub use format::{format_bundle, format_file};
pub use parse::{parse, parse_file, parse_str};
pub use position::FileContext;
pub use schema::*;
