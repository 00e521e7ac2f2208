//! CLI command implementations.
//!
//! Each submodule implements one `conduit` subcommand. Results are written to
//! stdout as JSON; logs go to stderr.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `doc` | Insert, get, update, delete, list and query documents |
//! | `vector` | Create a collection, upsert records, search |
//! | `llm` | Generate text, JSON, or image descriptions |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! conduit doc -c articles insert '{"_key": "a1", "title": "Hello"}'
//! conduit vector -c chunks search '[0.1, 0.2, 0.3]' --threshold 0.8
//! conduit llm --local -m qwen2.5-vl images "What is shown?" photo.jpg
//! ```

pub mod clients;
mod config;
mod document;
mod llm;
mod vector;

pub use clients::{build_document_collection, build_llm_client, build_vector_collection};
pub use config::ConfigCommand;
pub use document::{DocArgs, DocCommand};
pub use llm::{LlmArgs, LlmCommand};
pub use vector::{VectorArgs, VectorCommand};

use anyhow::Context;
use serde::Serialize;
use std::io::Write;

/// Writes `value` as pretty JSON followed by a newline.
fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("cannot write output")?;
    writeln!(out)?;
    Ok(())
}

/// Parses a command-line argument that must be a JSON object.
fn parse_json_object(text: &str, what: &str) -> anyhow::Result<crate::document::Document> {
    serde_json::from_str(text).with_context(|| format!("{what} must be a JSON object"))
}
