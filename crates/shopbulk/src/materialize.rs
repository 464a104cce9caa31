//! Rebuilds nested results from a flat bulk export
//!
//! A bulk export is JSONL: top-level records appear as plain lines and every
//! nested connection node appears as its own line carrying `__parentId`.
//! Parents are not guaranteed to precede their children, so materialization
//! runs in two phases:
//!
//! 1. a single forward pass decoding every line, collecting top-level records
//!    in file order and child edges in a connection sink keyed by
//!    `(parent id, connection field)`
//! 2. a stitch pass attaching each sink group onto its parent record
//!
//! Any failure aborts the whole call; callers never observe partial output.
//! Only one level of nesting is stitched: a child whose `__parentId` names
//! another child is reported as orphaned.

use crate::model::Edge;
use crate::record::{AttachError, BulkRecord, DecodeNode};
use crate::resource::{self, ResourceError};
use serde_json::Value;
use serde_jsonlines::JsonLinesReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Field marking a line as a child of another record
pub const PARENT_ID_FIELD: &str = "__parentId";

const ID_FIELD: &str = "id";

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("failed to open export file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read export line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode export line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("export line {line} is not a JSON object")]
    NotAnObject { line: usize },

    #[error("export line {line} has a non-string `__parentId`")]
    InvalidParentId { line: usize },

    #[error("export line {line} is a connection node without an `id` field; nested connections must query `id`")]
    MissingChildId { line: usize },

    #[error("export line {line}: {source}")]
    Resource {
        line: usize,
        #[source]
        source: ResourceError,
    },

    #[error("top-level record #{index} has no `id`; it is required to stitch nested connections")]
    MissingPrimaryId { index: usize },

    #[error("child records reference parent `{parent_id}` which is not a top-level record")]
    OrphanedChild { parent_id: String },

    #[error("connection `{field}` is not defined on the parent type (parent `{parent_id}`)")]
    UnknownField { parent_id: String, field: String },

    #[error("cannot stitch onto parent `{parent_id}`: {source}")]
    NodeTypeMismatch {
        parent_id: String,
        #[source]
        source: AttachError,
    },
}

/// Counters describing one materialization
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeStats {
    pub lines: usize,
    pub records: usize,
    pub child_edges: usize,
    pub connections: usize,
}

struct SinkGroup<N> {
    parent_id: String,
    field: &'static str,
    edges: Vec<Edge<N>>,
}

/// Child edges awaiting stitching, grouped in first-seen order
struct ConnectionSink<N> {
    index: HashMap<(String, &'static str), usize>,
    groups: Vec<SinkGroup<N>>,
}

impl<N> ConnectionSink<N> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push(&mut self, parent_id: String, field: &'static str, edge: Edge<N>) {
        let key = (parent_id, field);
        if let Some(&slot) = self.index.get(&key) {
            self.groups[slot].edges.push(edge);
            return;
        }

        self.groups.push(SinkGroup {
            parent_id: key.0.clone(),
            field,
            edges: vec![edge],
        });
        self.index.insert(key, self.groups.len() - 1);
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Materialize a whole export from any buffered reader
pub fn materialize<R, B>(reader: B) -> Result<Vec<R>, MaterializeError>
where
    R: BulkRecord,
    B: BufRead,
{
    let mut out = Vec::new();
    materialize_into(reader, &mut out)?;
    Ok(out)
}

/// Materialize an export file from disk
pub fn materialize_file<R: BulkRecord>(path: &Path) -> Result<Vec<R>, MaterializeError> {
    let file = File::open(path).map_err(|source| MaterializeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    materialize(BufReader::new(file))
}

/// Materialize an export, appending the records to `out` only on success
pub fn materialize_into<R, B>(reader: B, out: &mut Vec<R>) -> Result<MaterializeStats, MaterializeError>
where
    R: BulkRecord,
    B: BufRead,
{
    let mut stats = MaterializeStats::default();
    let mut records: Vec<R> = Vec::new();
    let mut sink: ConnectionSink<R::Node> = ConnectionSink::new();
    let mut lines = JsonLinesReader::new(reader);

    loop {
        let line = stats.lines + 1;
        let value: Value = match lines.read() {
            Ok(Some(value)) => value,
            Ok(None) => break,
            Err(err) => return Err(line_error(line, err)),
        };
        stats.lines = line;

        let Value::Object(mut object) = value else {
            return Err(MaterializeError::NotAnObject { line });
        };

        let Some(parent) = object.remove(PARENT_ID_FIELD) else {
            let record = serde_json::from_value(Value::Object(object)).map_err(|source| {
                MaterializeError::Decode {
                    line,
                    source: Box::new(source),
                }
            })?;
            records.push(record);
            continue;
        };

        let Value::String(parent_id) = parent else {
            return Err(MaterializeError::InvalidParentId { line });
        };

        let gid = object
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or(MaterializeError::MissingChildId { line })?;
        let (kind, field) =
            resource::resolve(gid).map_err(|source| MaterializeError::Resource { line, source })?;

        let node = R::Node::decode(kind, Value::Object(object)).map_err(|source| {
            MaterializeError::Decode {
                line,
                source: Box::new(source),
            }
        })?;

        sink.push(parent_id, field, Edge::new(node));
        stats.child_edges += 1;
    }

    stats.records = records.len();
    stats.connections = sink.groups.len();

    if !sink.is_empty() {
        stitch(&mut records, sink)?;
    }

    debug!(
        lines = stats.lines,
        records = stats.records,
        child_edges = stats.child_edges,
        connections = stats.connections,
        "Materialized bulk export"
    );

    out.append(&mut records);
    Ok(stats)
}

fn stitch<R: BulkRecord>(
    records: &mut [R],
    sink: ConnectionSink<R::Node>,
) -> Result<(), MaterializeError> {
    let mut by_id: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let id = record
            .id()
            .ok_or(MaterializeError::MissingPrimaryId { index })?;
        by_id.entry(id.to_string()).or_insert(index);
    }

    if let Some(orphan) = sink
        .groups
        .iter()
        .find(|group| !by_id.contains_key(&group.parent_id))
    {
        return Err(MaterializeError::OrphanedChild {
            parent_id: orphan.parent_id.clone(),
        });
    }

    for group in sink.groups {
        let SinkGroup {
            parent_id,
            field,
            edges,
        } = group;

        let Some(&index) = by_id.get(&parent_id) else {
            return Err(MaterializeError::OrphanedChild { parent_id });
        };

        records[index]
            .attach_connection(field, edges)
            .map_err(|err| match err {
                AttachError::UnknownField(field) => MaterializeError::UnknownField { parent_id, field },
                source @ AttachError::NodeTypeMismatch { .. } => {
                    MaterializeError::NodeTypeMismatch { parent_id, source }
                },
            })?;
    }

    Ok(())
}

// serde-jsonlines reports JSON syntax errors as io::Error wrapping a serde_json::Error.
fn line_error(line: usize, err: io::Error) -> MaterializeError {
    let is_json = err
        .get_ref()
        .is_some_and(|inner| inner.is::<serde_json::Error>());

    if !is_json {
        return MaterializeError::Read { line, source: err };
    }

    let kind = err.kind();
    match err.into_inner() {
        Some(source) => MaterializeError::Decode { line, source },
        None => MaterializeError::Read {
            line,
            source: io::Error::from(kind),
        },
    }
}
