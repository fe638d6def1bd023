//! Output formatting for CLI commands.
//!
//! Every printer comes in a text flavor for people and a JSON flavor for
//! scripts, selected by [`OutputMode`].

pub mod color;

use crate::domain::{Edge, Task, TaskId};
use crate::query::{CompletionEstimate, GraphView, StatusCounts};
use color::{bold, colored_status_icon, colorize_id, colorize_priority, colorize_status, dimmed};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};

pub use color::{success, warning};

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 80;

/// Settings that control text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig with explicit values.
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Read settings from the environment.
    ///
    /// - `TASKGRAPH_MAX_WIDTH`: maximum content width (default 80)
    /// - `TASKGRAPH_ASCII`: "1" or "true" for ASCII-only icons
    /// - `NO_COLOR`: any value disables colors
    /// - `TASKGRAPH_COLOR`: "0" or "false" disables colors
    pub fn from_env() -> Self {
        let max_width = match env::var("TASKGRAPH_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    env_var = "TASKGRAPH_MAX_WIDTH",
                    value = %s,
                    default = DEFAULT_MAX_CONTENT_WIDTH,
                    "Invalid value, using default"
                );
                DEFAULT_MAX_CONTENT_WIDTH
            }),
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = env::var("TASKGRAPH_ASCII")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TASKGRAPH_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

fn get_terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, max_width)
                    .into_iter()
                    .map(|s| s.into_owned())
                    .collect()
            }
        })
        .collect()
}

fn task_ref(id: TaskId, config: &OutputConfig) -> String {
    colorize_id(&format!("#{id}"), config)
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Run `text` or serialize `value`, writing to stdout.
fn emit<T, F>(value: &T, mode: OutputMode, text: F) -> io::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&mut io::StdoutLock<'_>, &OutputConfig) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => text(&mut handle, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, value),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

/// Print a JSON-formatted result for any serializable value.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), value)
}

/// Print a simple message.
pub fn print_message(msg: &str) -> io::Result<()> {
    writeln!(io::stdout().lock(), "{msg}")
}

/// Print one task as a summary line.
pub fn print_task(task: &Task, mode: OutputMode) -> io::Result<()> {
    emit(task, mode, |w, config| write_task_line(w, task, config))
}

/// Print a list of tasks.
pub fn print_tasks(tasks: &[Task], mode: OutputMode) -> io::Result<()> {
    emit(tasks, mode, |w, config| write_tasks_text(w, tasks, config))
}

#[derive(Serialize)]
struct TaskDetails<'a> {
    #[serde(flatten)]
    task: &'a Task,
    dependencies: &'a [Edge],
    dependents: &'a [Edge],
}

/// Print a task with its dependency edges (for `show`).
pub fn print_task_details(
    task: &Task,
    dependencies: &[Edge],
    dependents: &[Edge],
    mode: OutputMode,
) -> io::Result<()> {
    let details = TaskDetails {
        task,
        dependencies,
        dependents,
    };
    emit(&details, mode, |w, config| {
        write_task_details_text(w, task, dependencies, dependents, config)
    })
}

/// Print dependency edges.
pub fn print_edges(edges: &[Edge], mode: OutputMode) -> io::Result<()> {
    emit(edges, mode, |w, config| write_edges_text(w, edges, config))
}

/// Print the graph grouped by layout level.
pub fn print_graph(view: &GraphView, mode: OutputMode) -> io::Result<()> {
    emit(view, mode, |w, config| write_graph_text(w, view, config))
}

/// Print a completion estimate.
pub fn print_estimate(estimate: &CompletionEstimate, mode: OutputMode) -> io::Result<()> {
    emit(estimate, mode, |w, config| {
        write_estimate_text(w, estimate, config)
    })
}

/// Print status counts.
pub fn print_stats(counts: &StatusCounts, mode: OutputMode) -> io::Result<()> {
    emit(counts, mode, |w, _| write_stats_text(w, counts))
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_task_line<W: Write>(w: &mut W, task: &Task, config: &OutputConfig) -> io::Result<()> {
    writeln!(
        w,
        "{} {} {} {}",
        colored_status_icon(task.status, config),
        task_ref(task.id, config),
        colorize_priority(task.priority, config),
        task.title
    )
}

fn write_tasks_text<W: Write>(w: &mut W, tasks: &[Task], config: &OutputConfig) -> io::Result<()> {
    if tasks.is_empty() {
        return writeln!(w, "No tasks found.");
    }

    writeln!(w, "Found {} task(s):", tasks.len())?;
    writeln!(w)?;
    for task in tasks {
        write_task_line(w, task, config)?;
    }
    Ok(())
}

fn write_task_details_text<W: Write>(
    w: &mut W,
    task: &Task,
    dependencies: &[Edge],
    dependents: &[Edge],
    config: &OutputConfig,
) -> io::Result<()> {
    let content_width = get_terminal_width().min(config.max_width);

    writeln!(
        w,
        "{} {} {}",
        colored_status_icon(task.status, config),
        task_ref(task.id, config),
        bold(&task.title, config)
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Status:", config),
        colorize_status(task.status, config)
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Priority:", config),
        colorize_priority(task.priority, config)
    )?;
    writeln!(w, "  {} {}h", dimmed("Estimate:", config), task.estimated_hours)?;
    writeln!(w, "  {} {}", dimmed("Version:", config), task.version)?;
    if task.pinned {
        writeln!(w, "  {} yes", dimmed("Pinned:", config))?;
    }

    if !task.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}:", bold("Description", config))?;
        for line in wrap_text(&task.description, content_width.saturating_sub(2)) {
            writeln!(w, "  {line}")?;
        }
    }

    if !dependencies.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}:", bold("Depends on", config))?;
        for edge in dependencies {
            writeln!(
                w,
                "  {} {}",
                task_ref(edge.depends_on_id, config),
                dimmed(&format!("(edge {})", edge.id), config)
            )?;
        }
    }

    if !dependents.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}:", bold("Required by", config))?;
        for edge in dependents {
            writeln!(
                w,
                "  {} {}",
                task_ref(edge.task_id, config),
                dimmed(&format!("(edge {})", edge.id), config)
            )?;
        }
    }

    Ok(())
}

fn write_edges_text<W: Write>(w: &mut W, edges: &[Edge], config: &OutputConfig) -> io::Result<()> {
    if edges.is_empty() {
        return writeln!(w, "No dependencies.");
    }
    for edge in edges {
        writeln!(
            w,
            "{} {} depends on {}",
            dimmed(&format!("[{}]", edge.id), config),
            task_ref(edge.task_id, config),
            task_ref(edge.depends_on_id, config)
        )?;
    }
    Ok(())
}

fn write_graph_text<W: Write>(
    w: &mut W,
    view: &GraphView,
    config: &OutputConfig,
) -> io::Result<()> {
    if view.nodes.is_empty() {
        return writeln!(w, "No tasks found.");
    }

    let mut prerequisites: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
    for edge in &view.edges {
        prerequisites.entry(edge.target).or_default().push(edge.source);
    }

    let mut levels: BTreeMap<usize, Vec<_>> = BTreeMap::new();
    for node in &view.nodes {
        levels.entry(node.level).or_default().push(node);
    }

    for (level, nodes) in levels {
        writeln!(w, "{}", bold(&format!("Level {level}"), config))?;
        for node in nodes {
            write!(
                w,
                "  {} {} {}",
                colored_status_icon(node.status, config),
                task_ref(node.id, config),
                node.title
            )?;
            if let Some(deps) = prerequisites.get(&node.id) {
                let refs: Vec<String> = deps.iter().map(|id| task_ref(*id, config)).collect();
                write!(w, " {} {}", dimmed("<-", config), refs.join(", "))?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

fn write_estimate_text<W: Write>(
    w: &mut W,
    estimate: &CompletionEstimate,
    config: &OutputConfig,
) -> io::Result<()> {
    let path: Vec<String> = estimate
        .critical_path
        .iter()
        .map(|id| task_ref(*id, config))
        .collect();

    writeln!(
        w,
        "{} {}h",
        dimmed("Estimated hours:", config),
        estimate.total_hours
    )?;
    writeln!(
        w,
        "{} {}",
        dimmed("Critical path:  ", config),
        path.join(&format!(" {} ", dimmed("->", config)))
    )?;
    writeln!(
        w,
        "{} {}",
        dimmed("Can start now:  ", config),
        if estimate.can_start_immediately { "yes" } else { "no" }
    )
}

fn write_stats_text<W: Write>(w: &mut W, counts: &StatusCounts) -> io::Result<()> {
    writeln!(w, "Total:       {}", counts.total)?;
    writeln!(w, "Pending:     {}", counts.pending)?;
    writeln!(w, "In progress: {}", counts.in_progress)?;
    writeln!(w, "Completed:   {}", counts.completed)?;
    writeln!(w, "Blocked:     {}", counts.blocked)
}
