//! Tests for the JSONL store: resilient loading and persistence through the
//! dependency service.

use std::path::Path;
use taskgraph::domain::{EdgeId, NewTask, TaskId, TaskStatus};
use taskgraph::error::Error;
use taskgraph::resolver::StatusPolicy;
use taskgraph::service::DependencyService;
use taskgraph::store::{JsonlTaskStore, LoadWarning, TaskStore};
use tempfile::TempDir;

fn task_line(id: u64, title: &str, status: &str, priority: u8) -> String {
    format!(
        r#"{{"kind":"task","id":{id},"title":"{title}","status":"{status}","priority":{priority},"estimated_hours":8,"version":1,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}}"#
    )
}

fn edge_line(id: u64, task_id: u64, depends_on_id: u64) -> String {
    format!(
        r#"{{"kind":"edge","id":{id},"task_id":{task_id},"depends_on_id":{depends_on_id},"created_at":"2024-01-01T00:00:00Z"}}"#
    )
}

async fn write_lines(path: &Path, lines: &[String]) {
    tokio::fs::write(path, lines.join("\n") + "\n").await.unwrap();
}

async fn open_service(path: &Path) -> DependencyService {
    let (store, warnings) = JsonlTaskStore::open(path).await.unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    DependencyService::load(Box::new(store), StatusPolicy::Automatic)
        .await
        .unwrap()
}

#[tokio::test]
async fn loading_skips_bad_records_with_warnings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");
    write_lines(
        &path,
        &[
            task_line(1, "Schema", "completed", 3),
            task_line(2, "Parser", "in_progress", 4),
            task_line(3, "Docs", "pending", 2),
            "this is not json".to_string(),
            task_line(4, "Broken", "pending", 9),
            edge_line(1, 2, 1),
            edge_line(2, 3, 2),
            edge_line(3, 2, 9),
            edge_line(4, 3, 3),
            edge_line(5, 2, 1),
            edge_line(6, 1, 3),
        ],
    )
    .await;

    let (store, warnings) = JsonlTaskStore::open(&path).await.unwrap();

    let tasks = store.list().await.unwrap();
    assert_eq!(
        tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![TaskId(1), TaskId(2), TaskId(3)]
    );
    let edges = store.list_edges().await.unwrap();
    assert_eq!(
        edges.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![EdgeId(1), EdgeId(2)]
    );

    assert_eq!(warnings.len(), 6, "warnings: {warnings:?}");
    assert!(matches!(
        warnings[0],
        LoadWarning::MalformedJson { line_number: 4, .. }
    ));
    assert!(warnings.iter().any(|w| matches!(
        w,
        LoadWarning::InvalidTaskData { task_id: TaskId(4), .. }
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        LoadWarning::OrphanedDependency { edge_id: EdgeId(3), .. }
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        LoadWarning::SelfDependency { edge_id: EdgeId(4), .. }
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        LoadWarning::DuplicateDependency { edge_id: EdgeId(5), .. }
    )));
    let cycle = warnings
        .iter()
        .find_map(|w| match w {
            LoadWarning::CircularDependency { edge_id, path } => Some((*edge_id, path.clone())),
            _ => None,
        })
        .expect("cycle warning");
    assert_eq!(cycle.0, EdgeId(6));
    assert_eq!(cycle.1.ids(), &[TaskId(1), TaskId(3), TaskId(2), TaskId(1)]);
}

#[tokio::test]
async fn duplicate_ids_keep_the_first_record() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");
    write_lines(
        &path,
        &[
            task_line(1, "First", "pending", 3),
            task_line(1, "Second", "pending", 3),
        ],
    )
    .await;

    let (store, warnings) = JsonlTaskStore::open(&path).await.unwrap();

    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.get(TaskId(1)).await.unwrap().title, "First");
    assert_eq!(
        warnings,
        vec![LoadWarning::DuplicateRecord { kind: "task", id: 1 }]
    );
}

#[tokio::test]
async fn service_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");

    let (a, b, edge) = {
        let service = open_service(&path).await;
        let a = service
            .create_task(NewTask::new("A").with_status(TaskStatus::Blocked))
            .await
            .unwrap()
            .id;
        let b = service.create_task(NewTask::new("B")).await.unwrap().id;
        let edge = service.add_dependency(b, a).await.unwrap();
        (a, b, edge)
    };

    let service = open_service(&path).await;
    assert_eq!(service.get_task(b).await.unwrap().status, TaskStatus::Blocked);
    let deps = service.dependencies_of(b).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].id, edge.id);

    // Ids keep counting from the stored maximum.
    let c = service.create_task(NewTask::new("C")).await.unwrap();
    assert_eq!(c.id, TaskId(3));

    assert!(matches!(
        service.add_dependency(a, b).await,
        Err(Error::CircularDependency { .. })
    ));
}

#[tokio::test]
async fn deleted_ids_are_not_reissued_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");

    let (b, edge) = {
        let service = open_service(&path).await;
        let a = service.create_task(NewTask::new("A")).await.unwrap().id;
        let b = service.create_task(NewTask::new("B")).await.unwrap().id;
        let edge = service.add_dependency(b, a).await.unwrap();
        let removed = service.delete_task(b).await.unwrap();
        assert_eq!(removed, vec![edge.clone()]);
        (b, edge)
    };

    let service = open_service(&path).await;
    assert!(matches!(
        service.get_task(b).await,
        Err(Error::TaskNotFound(_))
    ));

    let c = service.create_task(NewTask::new("C")).await.unwrap();
    assert_eq!(c.id, TaskId(3));
    let next_edge = service.add_dependency(c.id, TaskId(1)).await.unwrap();
    assert_eq!(next_edge.id, EdgeId(edge.id.0 + 1));
}

#[tokio::test]
async fn files_without_counters_resume_from_highest_id() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");
    write_lines(
        &path,
        &[
            task_line(4, "Schema", "pending", 3),
            task_line(2, "Parser", "pending", 3),
        ],
    )
    .await;

    let service = open_service(&path).await;
    let task = service.create_task(NewTask::new("Docs")).await.unwrap();
    assert_eq!(task.id, TaskId(5));
}

#[tokio::test]
async fn oversized_numbers_are_invalid_task_data() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");
    let oversized_hours = task_line(2, "Parser", "pending", 3)
        .replace(r#""estimated_hours":8"#, r#""estimated_hours":5000000000"#);
    write_lines(
        &path,
        &[
            task_line(1, "Schema", "pending", 3).replace(r#""priority":3"#, r#""priority":300"#),
            oversized_hours,
            task_line(3, "Docs", "pending", 3),
        ],
    )
    .await;

    let (store, warnings) = JsonlTaskStore::open(&path).await.unwrap();

    assert_eq!(
        store.list().await.unwrap().iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![TaskId(3)]
    );
    assert_eq!(warnings.len(), 2, "warnings: {warnings:?}");
    match &warnings[0] {
        LoadWarning::InvalidTaskData { task_id, error } => {
            assert_eq!(*task_id, TaskId(1));
            assert!(error.contains("300 is outside 1..=5"), "error: {error}");
        }
        other => panic!("expected invalid task data, got {other:?}"),
    }
    assert!(matches!(
        warnings[1],
        LoadWarning::InvalidTaskData { task_id: TaskId(2), .. }
    ));
}

#[tokio::test]
async fn task_record_without_id_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.jsonl");
    write_lines(
        &path,
        &[
            r#"{"kind":"task","title":"Nameless"}"#.to_string(),
            task_line(1, "Schema", "pending", 3),
        ],
    )
    .await;

    let (store, warnings) = JsonlTaskStore::open(&path).await.unwrap();

    assert_eq!(store.list().await.unwrap().len(), 1);
    assert!(matches!(
        warnings.as_slice(),
        [LoadWarning::UnreadableRecord { kind: "task", .. }]
    ));
}

#[tokio::test]
async fn failed_write_is_transient_and_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    tokio::fs::create_dir(&data_dir).await.unwrap();
    let path = data_dir.join("tasks.jsonl");

    let service = open_service(&path).await;
    let a = service
        .create_task(NewTask::new("A").with_status(TaskStatus::Blocked))
        .await
        .unwrap()
        .id;
    let b = service.create_task(NewTask::new("B")).await.unwrap().id;

    tokio::fs::remove_dir_all(&data_dir).await.unwrap();

    let err = service.add_dependency(b, a).await.unwrap_err();
    assert!(err.is_transient(), "expected a storage error, got {err:?}");
    assert!(service.get_graph().await.unwrap().edges.is_empty());
    assert_eq!(service.get_task(b).await.unwrap().status, TaskStatus::Pending);

    tokio::fs::create_dir(&data_dir).await.unwrap();
    service.add_dependency(b, a).await.unwrap();
    assert_eq!(service.get_task(b).await.unwrap().status, TaskStatus::Blocked);
}
