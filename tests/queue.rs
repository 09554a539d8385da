//! Integration tests for the task queue: admission control, the task
//! state machine, and outcome retrieval. Clone drivers are local doubles;
//! nothing here touches the network.

mod common;

use repotally::clone::CloneDriver;
use repotally::queue::{RepoTask, TaskQueue};
use repotally::services::AnalyzerOptions;
use repotally::types::{TaskId, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn task(size_bytes: u64) -> RepoTask {
    RepoTask::new(
        "octo".to_string(),
        "fixture".to_string(),
        size_bytes,
        AnalyzerOptions::default(),
    )
}

async fn wait_done(queue: &TaskQueue, id: &TaskId) -> Arc<repotally::queue::RepoTask> {
    for _ in 0..500 {
        if let Some(task) = queue.get(id) {
            if task.status().is_done() {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never reached done");
}

#[tokio::test]
async fn successful_task_walks_the_full_state_machine() {
    let scratch = TempDir::new().unwrap();
    let cloner = Arc::new(common::FixtureCloner::small_repo());
    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::clone(&cloner) as Arc<dyn CloneDriver>,
    );

    let id = queue.add(task(1024)).await.unwrap();

    // Observed statuses must be a monotone run of the state machine.
    let mut last = TaskStatus::Init;
    loop {
        let Some(current) = queue.get(&id).map(|t| t.status()) else {
            panic!("task vanished mid-flight");
        };
        assert!(current >= last, "{current:?} observed after {last:?}");
        last = current;

        if current.is_done() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let task = queue.get(&id).unwrap();
    let outcome = task.outcome();

    assert_eq!(cloner.call_count(), 1);
    assert!(outcome.error.is_none());

    let report = outcome.report.expect("done without error must carry a report");
    assert_eq!(report.total_files, 3);
    assert_eq!(report.total_lines, 50);
    assert_eq!(report.total_blank, 11);
    assert_eq!(report.total_comments, 21);
}

#[tokio::test]
async fn oversized_task_is_rejected_before_cloning() {
    let scratch = TempDir::new().unwrap();
    let config = common::test_config(scratch.path());
    let cloner = Arc::new(common::FixtureCloner::small_repo());
    let queue = TaskQueue::start(&config, common::registry(), Arc::clone(&cloner) as Arc<dyn CloneDriver>);

    let id = queue.add(task(config.max_repo_bytes + 1)).await.unwrap();
    let task = wait_done(&queue, &id).await;
    let outcome = task.outcome();

    assert_eq!(cloner.call_count(), 0, "rejected task must not clone");
    assert!(outcome.report.is_none());
    assert!(outcome.error.unwrap().contains("exceeds the per-task limit"));
}

#[tokio::test]
async fn failed_clone_ends_the_task_with_an_error() {
    let scratch = TempDir::new().unwrap();
    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::new(common::FailingCloner),
    );

    let id = queue.add(task(1024)).await.unwrap();
    let task = wait_done(&queue, &id).await;
    let outcome = task.outcome();

    assert_eq!(task.status(), TaskStatus::Done);
    assert!(outcome.report.is_none());
    assert!(outcome.error.unwrap().contains("remote hung up"));
}

#[tokio::test]
async fn scratch_directories_are_removed_on_success_and_failure() {
    let scratch = TempDir::new().unwrap();

    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::new(common::FixtureCloner::small_repo()),
    );
    let id = queue.add(task(1024)).await.unwrap();
    wait_done(&queue, &id).await;

    let failing = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::new(common::FailingCloner),
    );
    let id = failing.add(task(1024)).await.unwrap();
    wait_done(&failing, &id).await;

    let leftovers: Vec<_> = std::fs::read_dir(scratch.path())
        .unwrap()
        .flatten()
        .collect();
    assert!(
        leftovers.is_empty(),
        "scratch root must be empty, found {leftovers:?}"
    );
}

#[tokio::test]
async fn tasks_are_processed_in_submission_order() {
    let scratch = TempDir::new().unwrap();
    let cloner = Arc::new(common::FixtureCloner::small_repo());
    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::clone(&cloner) as Arc<dyn CloneDriver>,
    );

    let first = queue.add(task(1024)).await.unwrap();
    let second = queue.add(task(1024)).await.unwrap();
    let third = queue.add(task(1024)).await.unwrap();

    // FIFO with a single processor: by the time the last submission is
    // done, the earlier ones must be done too.
    wait_done(&queue, &third).await;
    assert!(queue.get(&first).unwrap().status().is_done());
    assert!(queue.get(&second).unwrap().status().is_done());
    assert_eq!(cloner.call_count(), 3);
}

#[tokio::test]
async fn deleted_tasks_are_gone() {
    let scratch = TempDir::new().unwrap();
    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        Arc::new(common::FixtureCloner::small_repo()),
    );

    let id = queue.add(task(1024)).await.unwrap();
    wait_done(&queue, &id).await;

    queue.delete(&id);
    assert!(queue.get(&id).is_none());

    // Unknown ids are simply absent.
    assert!(queue.get(&TaskId::fresh()).is_none());
}

#[tokio::test]
async fn task_options_reach_the_analyzer() {
    let scratch = TempDir::new().unwrap();
    let cloner = Arc::new(common::FixtureCloner::small_repo());
    let queue = TaskQueue::start(
        &common::test_config(scratch.path()),
        common::registry(),
        cloner,
    );

    let task = RepoTask::new(
        "octo".to_string(),
        "fixture".to_string(),
        1024,
        AnalyzerOptions {
            exclude_file_patterns: vec!["*.go".to_string()],
            exclude_dir_patterns: Vec::new(),
        },
    );

    let id = queue.add(task).await.unwrap();
    let task = wait_done(&queue, &id).await;
    let report = task.outcome().report.unwrap();

    assert_eq!(report.total_files, 2);
    assert!(report.languages.iter().all(|l| l.name != "Go"));
}
