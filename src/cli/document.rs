//! Document store CLI command.

use super::{parse_json_object, write_json};
use crate::config::ConduitConfig;
use crate::document::{CollectionSpec, DEFAULT_PAGE_SIZE, DocumentCollection};
use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::json;
use std::io::Write;

/// Arguments of `conduit doc`.
#[derive(Debug, Args)]
pub struct DocArgs {
    /// Collection name.
    #[arg(short, long)]
    pub collection: String,

    /// Open (or create) the collection as an edge collection.
    #[arg(long)]
    pub edge: bool,

    #[command(subcommand)]
    pub command: DocCommand,
}

/// Document store operations.
#[derive(Debug, Subcommand)]
pub enum DocCommand {
    /// Insert a JSON document.
    Insert {
        /// Document as a JSON object.
        document: String,

        /// Print the stored document along with its metadata.
        #[arg(long)]
        return_new: bool,
    },

    /// Fetch a document by key.
    Get {
        /// Document key.
        key: String,
    },

    /// Merge fields into the document with the given key.
    Update {
        /// Document key.
        key: String,

        /// Fields to merge, as a JSON object.
        updates: String,
    },

    /// Delete a document by key.
    Delete {
        /// Document key.
        key: String,
    },

    /// Page through the collection.
    List {
        /// Page size.
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,

        /// Documents to skip.
        #[arg(short, long, default_value_t = 0)]
        skip: usize,
    },

    /// Run an AQL query.
    Query {
        /// AQL text.
        query: String,

        /// Bind variables, as a JSON object.
        #[arg(short, long)]
        bind: Option<String>,

        /// Ask the server for a result count.
        #[arg(long)]
        count: bool,
    },
}

impl DocArgs {
    /// Connects to the configured store and runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if input is malformed or the store call fails.
    pub fn run(self, config: &ConduitConfig, out: &mut impl Write) -> anyhow::Result<()> {
        let spec = if self.edge {
            CollectionSpec::edge(&self.collection)
        } else {
            CollectionSpec::document(&self.collection)
        };
        let collection = super::clients::build_document_collection(config, spec)
            .with_context(|| format!("cannot open collection '{}'", self.collection))?;
        self.command.execute(&collection, out)
    }
}

impl DocCommand {
    /// Runs the command against `collection`, writing JSON to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if input is malformed or the store call fails.
    pub fn execute(
        self,
        collection: &dyn DocumentCollection,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        match self {
            Self::Insert {
                document,
                return_new,
            } => {
                let document = parse_json_object(&document, "document")?;
                let meta = collection.insert(&document, return_new)?;
                write_json(out, &meta)
            },
            Self::Get { key } => match collection.get(&key)? {
                Some(document) => write_json(out, &document),
                None => anyhow::bail!("no document '{key}' in '{}'", collection.name()),
            },
            Self::Update { key, updates } => {
                let updates = parse_json_object(&updates, "updates")?;
                let updated = collection.update(&key, &updates)?;
                write_json(out, &json!({ "updated": updated }))
            },
            Self::Delete { key } => {
                let deleted = collection.delete(&key)?;
                write_json(out, &json!({ "deleted": deleted }))
            },
            Self::List { limit, skip } => write_json(out, &collection.list_all(limit, skip)?),
            Self::Query { query, bind, count } => {
                let bind_vars = bind
                    .as_deref()
                    .map(|b| parse_json_object(b, "bind variables"))
                    .transpose()?;
                let rows = collection.query(&query, bind_vars.as_ref(), count)?;
                write_json(out, &rows)
            },
        }
    }
}
