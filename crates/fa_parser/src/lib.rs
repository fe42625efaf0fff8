//! ECMAScript parser front-end for fast-async.
//!
//! Wraps the standard SWC parser and adds:
//!
//! - Syntax-extension gating: async functions are rejected unless the
//!   `asyncFunctions` extension is enabled on the [`ParserConfig`](fa_ast::ParserConfig).
//! - Location control: with `ranges` off every span is replaced by `DUMMY_SP`,
//!   with `locations` off no comments are collected.

pub mod gate;
pub mod locations;
pub mod parse;

pub use locations::{has_locations, strip_locations, StripLocations};
pub use parse::{parse_program, ParseError, ParseResult};
