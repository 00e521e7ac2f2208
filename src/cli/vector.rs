//! Vector store CLI command.

use super::write_json;
use crate::config::ConduitConfig;
use crate::vector::{
    DEFAULT_SEARCH_LIMIT, Distance, PayloadFilter, VectorCollection, VectorCollectionSpec,
    VectorRecord,
};
use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

/// Arguments of `conduit vector`.
#[derive(Debug, Args)]
pub struct VectorArgs {
    /// Collection name.
    #[arg(short, long)]
    pub collection: String,

    /// Distance metric: cosine, euclid, dot or manhattan.
    #[arg(short, long, default_value = "cosine", value_parser = parse_distance)]
    pub distance: Distance,

    #[command(subcommand)]
    pub command: VectorCommand,
}

/// Vector store operations.
#[derive(Debug, Subcommand)]
pub enum VectorCommand {
    /// Create the collection if it does not exist.
    Create {
        /// Vector dimensionality.
        #[arg(short, long)]
        size: usize,
    },

    /// Upsert records from a JSON array of `{id, vector, payload}` objects.
    Upsert {
        /// Inline JSON array.
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        records: Option<String>,

        /// Read the JSON array from this file.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Nearest-neighbour search.
    Search {
        /// Query vector as a JSON array of numbers.
        vector: String,

        /// Maximum number of hits.
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Minimum score (maximum distance for euclid and manhattan).
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Payload filter, as JSON. Accepted but not applied.
        #[arg(long)]
        filter: Option<String>,
    },
}

fn parse_distance(s: &str) -> Result<Distance, String> {
    Distance::parse(s).ok_or_else(|| format!("unknown distance metric '{s}'"))
}

impl VectorArgs {
    /// Runs the command against the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if input is malformed or the store call fails.
    pub fn run(self, config: &ConduitConfig, out: &mut impl Write) -> anyhow::Result<()> {
        let Self {
            collection,
            distance,
            command,
        } = self;
        let size = command.vector_size()?;
        let spec = VectorCollectionSpec::new(collection, size).with_distance(distance);
        command.execute(&super::clients::build_vector_collection(config, spec), out)
    }
}

impl VectorCommand {
    /// Dimensionality implied by the command's input.
    fn vector_size(&self) -> anyhow::Result<usize> {
        Ok(match self {
            Self::Create { size } => *size,
            Self::Upsert { .. } => 0,
            Self::Search { vector, .. } => parse_vector(vector)?.len(),
        })
    }

    /// Runs the command against `collection`, writing JSON to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if input is malformed or the store call fails.
    pub fn execute(
        self,
        collection: &dyn VectorCollection,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        match self {
            Self::Create { .. } => {
                collection.create_collection()?;
                write_json(out, &json!({ "collection": collection.name(), "ready": true }))
            },
            Self::Upsert { records, file } => {
                let text = match (records, file) {
                    (Some(inline), _) => inline,
                    (None, Some(path)) => std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read '{}'", path.display()))?,
                    (None, None) => anyhow::bail!("no records given"),
                };
                let records: Vec<VectorRecord> =
                    serde_json::from_str(&text).context("records must be a JSON array")?;
                collection.add_records(&records)?;
                write_json(out, &json!({ "upserted": records.len() }))
            },
            Self::Search {
                vector,
                limit,
                threshold,
                filter,
            } => {
                let query = parse_vector(&vector)?;
                let filter = filter
                    .as_deref()
                    .map(serde_json::from_str::<PayloadFilter>)
                    .transpose()
                    .context("filter must be JSON")?;
                let hits = collection.search(&query, limit, filter.as_ref(), threshold)?;
                write_json(out, &hits)
            },
        }
    }
}

fn parse_vector(text: &str) -> anyhow::Result<Vec<f32>> {
    serde_json::from_str(text).context("vector must be a JSON array of numbers")
}
