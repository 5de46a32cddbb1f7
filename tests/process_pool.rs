//! Drives the real `taskq worker` binary through the process pool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use taskq::config::ExecutorKind;
use taskq::dispatch::{ExecutionResult, ProcessPool, WorkerPool};
use taskq::payload::PayloadStore;
use taskq::task::TaskStatus;
use taskq::App;

use common::{test_config, wait_for_status};

fn worker_pool(payloads: &PayloadStore) -> ProcessPool {
    ProcessPool::with_program(
        2,
        env!("CARGO_BIN_EXE_taskq"),
        vec!["worker".to_string()],
        payloads,
        Duration::ZERO,
    )
    .unwrap()
}

#[tokio::test]
async fn worker_process_executes_task() {
    let tmp = tempfile::tempdir().unwrap();
    let payloads = PayloadStore::file(tmp.path()).unwrap();
    payloads.set_input(7, "hello").unwrap();

    let pool = worker_pool(&payloads);
    assert_eq!(pool.execute(7).await, ExecutionResult::Success);
    assert_eq!(
        payloads.get_output(7).unwrap(),
        "hello - successfully executed"
    );

    // no staged input: the child exits non-zero
    assert_eq!(pool.execute(8).await, ExecutionResult::Failure);
    pool.shutdown().await;
}

#[tokio::test]
async fn end_to_end_through_worker_processes() {
    let tmp = tempfile::tempdir().unwrap();
    let payloads = PayloadStore::file(tmp.path()).unwrap();
    let pool = Arc::new(worker_pool(&payloads));

    let mut config = test_config(2);
    config.payload_dir = Some(tmp.path().to_path_buf());
    config.executor = ExecutorKind::Process;
    let mut app = App::with_pool(config, payloads, pool);
    app.start();

    let service = app.service();
    let mut ids = Vec::new();
    for input in ["a", "b", "c"] {
        let id = service.create_task(input).await.unwrap().task_id;
        service.run_task(id).await.unwrap();
        ids.push((id, input));
    }

    for &(id, input) in &ids {
        wait_for_status(app.store(), id, TaskStatus::Success).await;
        assert_eq!(
            service.get_task_output(id).await.unwrap().output_data,
            format!("{input} - successfully executed")
        );
    }
    app.shutdown().await;
}
