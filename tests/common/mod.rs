#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use taskq::config::ExecutorKind;
use taskq::dispatch::{ComputeFn, ThreadPool};
use taskq::payload::PayloadStore;
use taskq::store::TaskStore;
use taskq::task::{TaskId, TaskStatus};
use taskq::{App, Config};

pub fn test_config(max_running_tasks: usize) -> Config {
    Config {
        max_running_tasks,
        pool_workers: 4,
        executor: ExecutorKind::Thread,
        payload_dir: None,
        slot_poll_interval: Duration::from_millis(10),
        work_delay: Duration::ZERO,
        ..Config::default()
    }
}

/// App on a thread pool with the given computation, dispatch loop running.
pub fn started_app(max_running_tasks: usize, compute: ComputeFn) -> App {
    started_app_with(test_config(max_running_tasks), compute)
}

pub fn started_app_with(config: Config, compute: ComputeFn) -> App {
    let payloads = PayloadStore::memory();
    let pool = Arc::new(ThreadPool::new(config.pool_workers, payloads.clone(), compute));
    let mut app = App::with_pool(config, payloads, pool);
    app.start();
    app
}

pub async fn wait_for_status(store: &Arc<dyn TaskStore>, task_id: TaskId, status: TaskStatus) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if store.get_status(task_id).await.unwrap() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {task_id} never reached {status}"));
}

/// A latch the computation blocks on until released.
#[derive(Clone, Default)]
pub struct Gate(Arc<AtomicBool>);

impl Gate {
    pub fn release(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn wait(&self) {
        while !self.0.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Echo computation that blocks on `gate` first.
pub fn gated(gate: Gate) -> ComputeFn {
    Arc::new(move |_: TaskId, input: &str| {
        gate.wait();
        Ok(format!("{input} - successfully executed"))
    })
}
