//! Color and styling helpers for CLI output.
//!
//! Semantic color theme:
//!   - Success/Done:   green  (completed)
//!   - Active:         yellow (in_progress)
//!   - Error/Blocked:  red    (blocked, errors)
//!   - Reference:      cyan   (task and edge ids)
//!   - Muted:          dimmed (field labels, arrows)

use crate::domain::TaskStatus;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

pub(crate) fn colorize_status(status: TaskStatus, config: &OutputConfig) -> String {
    let text = status.as_str();
    if !config.use_colors {
        return text.to_string();
    }
    match status {
        TaskStatus::Pending => text.white().to_string(),
        TaskStatus::InProgress => text.yellow().to_string(),
        TaskStatus::Blocked => text.red().to_string(),
        TaskStatus::Completed => text.green().to_string(),
    }
}

/// Status icon, with ASCII fallback.
pub(crate) fn colored_status_icon(status: TaskStatus, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match status {
            TaskStatus::Pending => "o",
            TaskStatus::InProgress => ">",
            TaskStatus::Blocked => "x",
            TaskStatus::Completed => "+",
        }
    } else {
        match status {
            TaskStatus::Pending => "○",
            TaskStatus::InProgress => "▶",
            TaskStatus::Blocked => "✗",
            TaskStatus::Completed => "✓",
        }
    };

    if !config.use_colors {
        return icon.to_string();
    }

    match status {
        TaskStatus::Pending => icon.white().to_string(),
        TaskStatus::InProgress => icon.yellow().to_string(),
        TaskStatus::Blocked => icon.red().to_string(),
        TaskStatus::Completed => icon.green().to_string(),
    }
}

pub(crate) fn colorize_priority(priority: u8, config: &OutputConfig) -> String {
    let text = format!("P{priority}");
    if !config.use_colors {
        return text;
    }
    match priority {
        5 => text.red().bold().to_string(),
        4 => text.yellow().to_string(),
        _ => text,
    }
}

/// Colorize an id reference such as `#12` (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}
