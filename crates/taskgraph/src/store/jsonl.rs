//! JSONL-backed task store.
//!
//! The whole store lives in a single file with one tagged record per line:
//!
//! ```text
//! {"kind":"task","id":1,"title":"Design schema",...}
//! {"kind":"edge","id":1,"task_id":2,"depends_on_id":1,...}
//! ```
//!
//! The file is rewritten atomically (temp file + rename) after every
//! mutation. A mutation only becomes visible in memory once the write has
//! succeeded, so a failed write leaves both the file and the store as they
//! were.

use super::state::{IdCounters, StoreState};
use super::{ChangeSet, Committed, StoreResult, TaskStore};
use crate::domain::{
    CyclePath, ESTIMATED_HOURS_RANGE, Edge, EdgeId, NewEdge, NewTask, PRIORITY_RANGE, Task, TaskId,
};
use crate::error::{Error, StoreError};
use crate::graph::DependencyGraph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use taskgraph_jsonl::{Warning as JsonlWarning, read_jsonl_resilient, write_jsonl_atomic_iter};
use tokio::sync::Mutex;

/// One line of the data file.
///
/// Task fields stay untyped until [`decode_task`] so a bad value is reported
/// against its task id instead of as a malformed line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record {
    Task(Map<String, Value>),
    Edge(Edge),
    Meta(IdCounters),
}

/// Borrowed form of [`Record`] used when saving.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RecordRef<'a> {
    Task(&'a Task),
    Edge(&'a Edge),
    Meta(IdCounters),
}

/// Non-fatal problems found while loading a data file.
///
/// The offending line or record is skipped; everything else loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A line could not be parsed as a record.
    MalformedJson { line_number: usize, error: String },

    /// A task record failed field validation.
    InvalidTaskData { task_id: TaskId, error: String },

    /// A record parsed as JSON but has no usable id.
    UnreadableRecord { kind: &'static str, error: String },

    /// A second record reused a task or edge id.
    DuplicateRecord { kind: &'static str, id: u64 },

    /// An edge references a task that is not in the file.
    OrphanedDependency {
        edge_id: EdgeId,
        task_id: TaskId,
        depends_on_id: TaskId,
    },

    /// An edge points a task at itself.
    SelfDependency { edge_id: EdgeId, task_id: TaskId },

    /// An edge repeats an already loaded pair.
    DuplicateDependency {
        edge_id: EdgeId,
        task_id: TaskId,
        depends_on_id: TaskId,
    },

    /// An edge would close a cycle.
    CircularDependency { edge_id: EdgeId, path: CyclePath },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed record: {error}")
            }
            LoadWarning::InvalidTaskData { task_id, error } => {
                write!(f, "task {task_id}: invalid data: {error}")
            }
            LoadWarning::UnreadableRecord { kind, error } => {
                write!(f, "{kind} record without a usable id: {error}")
            }
            LoadWarning::DuplicateRecord { kind, id } => {
                write!(f, "{kind} {id}: duplicate id, later record skipped")
            }
            LoadWarning::OrphanedDependency {
                edge_id,
                task_id,
                depends_on_id,
            } => write!(
                f,
                "edge {edge_id}: {task_id} -> {depends_on_id} references a missing task"
            ),
            LoadWarning::SelfDependency { edge_id, task_id } => {
                write!(f, "edge {edge_id}: task {task_id} depends on itself")
            }
            LoadWarning::DuplicateDependency {
                edge_id,
                task_id,
                depends_on_id,
            } => write!(
                f,
                "edge {edge_id}: {task_id} -> {depends_on_id} is already present"
            ),
            LoadWarning::CircularDependency { edge_id, path } => {
                write!(f, "edge {edge_id}: would create cycle {path}")
            }
        }
    }
}

/// Persistent [`TaskStore`] backed by a JSONL file.
#[derive(Debug)]
pub struct JsonlTaskStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonlTaskStore {
    /// Open the store at `path`, loading existing records.
    ///
    /// A missing file is an empty store; the file is created on the first
    /// mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<(Self, Vec<LoadWarning>)> {
        let path = path.as_ref().to_path_buf();

        let (state, warnings) = if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::Jsonl(e.into()))?
        {
            load_state(&path).await?
        } else {
            tracing::debug!(path = %path.display(), "Data file not found, starting empty");
            (StoreState::default(), Vec::new())
        };

        for warning in &warnings {
            tracing::warn!(path = %path.display(), %warning, "Skipped record while loading");
        }

        Ok((
            Self {
                path,
                state: Mutex::new(state),
            },
            warnings,
        ))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` to a copy of the state, persist the copy, then swap it in.
    async fn mutate<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreState) -> StoreResult<T> + Send,
        T: Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = op(&mut next)?;
        self.save(&next).await?;
        *state = next;
        Ok(out)
    }

    async fn save(&self, state: &StoreState) -> StoreResult<()> {
        // Collected up front: the borrowing iterators are not Send.
        let records: Vec<RecordRef<'_>> = state
            .tasks()
            .map(RecordRef::Task)
            .chain(state.edges().map(RecordRef::Edge))
            .chain(std::iter::once(RecordRef::Meta(state.counters())))
            .collect();

        write_jsonl_atomic_iter(&self.path, records)
            .await
            .map_err(|e| {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to save data file");
                StoreError::Jsonl(e)
            })
    }
}

/// Read and validate every record in `path`.
async fn load_state(path: &Path) -> StoreResult<(StoreState, Vec<LoadWarning>)> {
    let (records, jsonl_warnings) = read_jsonl_resilient::<Record, _>(path).await?;

    let mut warnings: Vec<LoadWarning> = jsonl_warnings
        .into_iter()
        .map(|w| match w {
            JsonlWarning::MalformedJson { line_number, error } => {
                LoadWarning::MalformedJson { line_number, error }
            }
            JsonlWarning::SkippedLine {
                line_number,
                reason,
            } => LoadWarning::MalformedJson {
                line_number,
                error: reason,
            },
        })
        .collect();

    let mut tasks = Vec::new();
    let mut edges = Vec::new();
    let mut saved = IdCounters::default();
    for record in records {
        match record {
            Record::Task(fields) => match decode_task(fields) {
                Ok(task) => tasks.push(task),
                Err(warning) => warnings.push(warning),
            },
            Record::Edge(edge) => edges.push(edge),
            Record::Meta(counters) => {
                saved.last_task_id = saved.last_task_id.max(counters.last_task_id);
                saved.last_edge_id = saved.last_edge_id.max(counters.last_edge_id);
            }
        }
    }

    // Tasks first: edges are checked against the set of accepted tasks.
    let mut task_ids = BTreeSet::new();
    let mut accepted_tasks = Vec::with_capacity(tasks.len());
    for task in tasks {
        if let Err(e) = task.validate() {
            warnings.push(LoadWarning::InvalidTaskData {
                task_id: task.id,
                error: e.to_string(),
            });
            continue;
        }
        if !task_ids.insert(task.id) {
            warnings.push(LoadWarning::DuplicateRecord {
                kind: "task",
                id: task.id.0,
            });
            continue;
        }
        accepted_tasks.push(task);
    }

    edges.sort_by_key(|e| e.id);
    let mut graph = DependencyGraph::new();
    for id in &task_ids {
        graph.add_task(*id);
    }

    let mut edge_ids = BTreeSet::new();
    let mut accepted_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        if !edge_ids.insert(edge.id) {
            warnings.push(LoadWarning::DuplicateRecord {
                kind: "edge",
                id: edge.id.0,
            });
            continue;
        }

        match graph.try_insert_edge(&edge) {
            Ok(()) => accepted_edges.push(edge),
            Err(err) => warnings.push(edge_warning(&edge, err)),
        }
    }

    tracing::info!(
        path = %path.display(),
        tasks = accepted_tasks.len(),
        edges = accepted_edges.len(),
        warnings = warnings.len(),
        "Loaded data file"
    );

    Ok((
        StoreState::from_records(accepted_tasks, accepted_edges, saved),
        warnings,
    ))
}

/// Turn the raw fields of a task record into a [`Task`].
///
/// Numbers too wide for their field are range errors, same as any other
/// out-of-range value.
fn decode_task(fields: Map<String, Value>) -> Result<Task, LoadWarning> {
    let Some(task_id) = fields.get("id").and_then(Value::as_u64).map(TaskId) else {
        return Err(LoadWarning::UnreadableRecord {
            kind: "task",
            error: "missing or non-integer id".to_string(),
        });
    };
    let invalid = |error: String| LoadWarning::InvalidTaskData { task_id, error };

    if let Some(priority) = fields.get("priority").and_then(Value::as_u64) {
        if u8::try_from(priority).is_err() {
            return Err(invalid(out_of_range(
                "priority",
                priority,
                *PRIORITY_RANGE.start(),
                *PRIORITY_RANGE.end(),
            )));
        }
    }
    if let Some(hours) = fields.get("estimated_hours").and_then(Value::as_u64) {
        if u32::try_from(hours).is_err() {
            return Err(invalid(out_of_range(
                "estimated_hours",
                hours,
                *ESTIMATED_HOURS_RANGE.start(),
                *ESTIMATED_HOURS_RANGE.end(),
            )));
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))
}

fn out_of_range(
    field: &'static str,
    value: u64,
    min: impl Into<u64>,
    max: impl Into<u64>,
) -> String {
    Error::InvalidField {
        field,
        message: format!("{value} is outside {}..={}", min.into(), max.into()),
    }
    .to_string()
}

fn edge_warning(edge: &Edge, err: Error) -> LoadWarning {
    match err {
        Error::SelfDependency(task_id) => LoadWarning::SelfDependency {
            edge_id: edge.id,
            task_id,
        },
        Error::DuplicateDependency { .. } => LoadWarning::DuplicateDependency {
            edge_id: edge.id,
            task_id: edge.task_id,
            depends_on_id: edge.depends_on_id,
        },
        Error::CircularDependency { path } => LoadWarning::CircularDependency {
            edge_id: edge.id,
            path,
        },
        _ => LoadWarning::OrphanedDependency {
            edge_id: edge.id,
            task_id: edge.task_id,
            depends_on_id: edge.depends_on_id,
        },
    }
}

#[async_trait]
impl TaskStore for JsonlTaskStore {
    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        self.mutate(|state| Ok(state.create(task))).await
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        self.state.lock().await.get(id)
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.state.lock().await.tasks().cloned().collect())
    }

    async fn put(&self, task: Task, expected_version: u64) -> StoreResult<Task> {
        self.mutate(|state| state.put(task, expected_version)).await
    }

    async fn delete(&self, id: TaskId) -> StoreResult<Vec<Edge>> {
        self.mutate(|state| state.delete(id)).await
    }

    async fn list_edges(&self) -> StoreResult<Vec<Edge>> {
        Ok(self.state.lock().await.edges().cloned().collect())
    }

    async fn put_edge(&self, edge: NewEdge) -> StoreResult<Edge> {
        self.mutate(|state| state.put_edge(edge)).await
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<Edge> {
        self.mutate(|state| state.delete_edge(id)).await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<Committed> {
        self.mutate(|state| state.apply(changes)).await
    }
}
