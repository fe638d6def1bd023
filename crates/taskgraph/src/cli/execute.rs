//! Command execution logic.

use anyhow::Result;

use super::args::{CreateArgs, DepAction, DepArgs, InitArgs, ListArgs, TaskIdArgs, UpdateArgs};
use crate::app::App;
use crate::domain::{EdgeId, NewTask, TaskId, TaskStatus, TaskUpdate};
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.policy.into()).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "taskgraph_dir": result.taskgraph_dir.display().to_string(),
            "config_file": result.config_file.display().to_string(),
            "tasks_file": result.tasks_file.display().to_string(),
            "status_policy": result.status_policy,
        }))?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized taskgraph in {}", result.taskgraph_dir.display());
            println!("  Config: {}", result.config_file.display());
            println!("  Tasks:  {}", result.tasks_file.display());
            println!("  Status policy: {}", result.status_policy);
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the create command
pub async fn execute_create(app: &App, args: &CreateArgs, output_mode: OutputMode) -> Result<()> {
    let mut new = NewTask::new(args.title.clone())
        .with_priority(args.priority)
        .with_estimated_hours(args.estimated_hours);
    if let Some(description) = &args.description {
        new = new.with_description(description.clone());
    }
    if let Some(status) = args.status {
        new = new.with_status(status.into());
    }

    let task = app.service().create_task(new).await?;

    if output_mode == OutputMode::Text {
        let config = OutputConfig::from_env();
        println!("{} #{}", output::success("Created task", &config), task.id);
    }
    output::print_task(&task, output_mode)?;
    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let mut tasks = app.service().list_tasks().await?;
    if let Some(status) = args.status {
        let status = TaskStatus::from(status);
        tasks.retain(|t| t.status == status);
    }
    output::print_tasks(&tasks, output_mode)?;
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &App, args: &TaskIdArgs, output_mode: OutputMode) -> Result<()> {
    let id = TaskId(args.id);
    let service = app.service();

    let task = service.get_task(id).await?;
    let dependencies = service.dependencies_of(id).await?;
    let dependents = service.dependents_of(id).await?;

    output::print_task_details(&task, &dependencies, &dependents, output_mode)?;
    Ok(())
}

/// Execute the update command
pub async fn execute_update(app: &App, args: &UpdateArgs, output_mode: OutputMode) -> Result<()> {
    let update = TaskUpdate {
        title: args.title.clone(),
        description: args.description.clone(),
        status: args.status.map(TaskStatus::from),
        priority: args.priority,
        estimated_hours: args.estimated_hours,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --title, --description, --status, --priority, --hours");
    }

    let task = app
        .service()
        .update_task(TaskId(args.id), update, args.expected_version)
        .await?;

    if output_mode == OutputMode::Text {
        println!("Updated task #{} (version {})", task.id, task.version);
    }
    output::print_task(&task, output_mode)?;
    Ok(())
}

/// Execute the delete command
pub async fn execute_delete(app: &App, args: &TaskIdArgs, output_mode: OutputMode) -> Result<()> {
    let id = TaskId(args.id);
    let removed = app.service().delete_task(id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "deleted": id,
            "removed_dependencies": removed,
        }))?,
        OutputMode::Text => {
            println!(
                "Deleted task #{id} and {} dependenc{}",
                removed.len(),
                if removed.len() == 1 { "y" } else { "ies" }
            );
        }
    }
    Ok(())
}

/// Execute the dep command
pub async fn execute_dep(app: &App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    let service = app.service();

    match &args.action {
        DepAction::Add { task, depends_on } => {
            let edge = service
                .add_dependency(TaskId(*task), TaskId(*depends_on))
                .await?;
            if output_mode == OutputMode::Text {
                let config = OutputConfig::from_env();
                println!(
                    "{} #{} now depends on #{} (edge {})",
                    output::success("Added:", &config),
                    edge.task_id,
                    edge.depends_on_id,
                    edge.id
                );
                let task = service.get_task(edge.task_id).await?;
                output::print_task(&task, output_mode)?;
                if task.status == TaskStatus::Blocked {
                    println!(
                        "{}",
                        output::warning("Task is blocked by an upstream dependency", &config)
                    );
                }
            } else {
                output::print_json(&edge)?;
            }
        }
        DepAction::Remove { edge_id } => {
            let edge = service.remove_dependency(EdgeId(*edge_id)).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&edge)?,
                OutputMode::Text => println!(
                    "Removed dependency #{} -> #{} (edge {})",
                    edge.task_id, edge.depends_on_id, edge.id
                ),
            }
        }
        DepAction::List { id } => {
            let id = TaskId(*id);
            let dependencies = service.dependencies_of(id).await?;
            let dependents = service.dependents_of(id).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "dependencies": dependencies,
                    "dependents": dependents,
                }))?,
                OutputMode::Text => {
                    println!("#{id} depends on:");
                    output::print_edges(&dependencies, output_mode)?;
                    println!();
                    println!("#{id} is required by:");
                    output::print_edges(&dependents, output_mode)?;
                }
            }
        }
    }

    Ok(())
}

/// Execute the complete command
pub async fn execute_complete(
    app: &App,
    args: &TaskIdArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let task = app.service().mark_completed(TaskId(args.id)).await?;

    if output_mode == OutputMode::Text {
        let config = OutputConfig::from_env();
        println!("{} #{}", output::success("Completed", &config), task.id);
    }
    output::print_task(&task, output_mode)?;
    Ok(())
}

/// Execute the graph command
pub async fn execute_graph(app: &App, output_mode: OutputMode) -> Result<()> {
    let view = app.service().get_graph().await?;
    output::print_graph(&view, output_mode)?;
    Ok(())
}

/// Execute the ancestors command
pub async fn execute_ancestors(
    app: &App,
    args: &TaskIdArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let tasks = app.service().ancestors(TaskId(args.id)).await?;
    output::print_tasks(&tasks, output_mode)?;
    Ok(())
}

/// Execute the descendants command
pub async fn execute_descendants(
    app: &App,
    args: &TaskIdArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let tasks = app.service().descendants(TaskId(args.id)).await?;
    output::print_tasks(&tasks, output_mode)?;
    Ok(())
}

/// Execute the estimate command
pub async fn execute_estimate(
    app: &App,
    args: &TaskIdArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let estimate = app.service().estimate(TaskId(args.id)).await?;
    output::print_estimate(&estimate, output_mode)?;
    Ok(())
}

/// Execute the stats command
pub async fn execute_stats(app: &App, output_mode: OutputMode) -> Result<()> {
    let counts = app.service().stats().await?;
    output::print_stats(&counts, output_mode)?;
    Ok(())
}
