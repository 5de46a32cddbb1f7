//! Wiring: builds every collaborator from [`Config`] and owns the dispatch
//! loop's lifetime.

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api;
use crate::config::{Config, ExecutorKind};
use crate::dispatch::{
    ExecutionHandler, ProcessPool, TaskQueueListener, ThreadPool, WorkerPool, simulated_work,
};
use crate::error::Result;
use crate::payload::PayloadStore;
use crate::queue::TaskQueue;
use crate::service::TaskService;
use crate::store::{InMemoryTaskStore, TaskStore};

pub struct App {
    config: Config,
    store: Arc<dyn TaskStore>,
    queue: Arc<TaskQueue>,
    payloads: PayloadStore,
    pool: Arc<dyn WorkerPool>,
    service: TaskService,
    shutdown: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl App {
    /// Build the payload store and worker pool named by `config`.
    pub fn build(config: Config) -> Result<Self> {
        config.validate()?;

        let payloads = match &config.payload_dir {
            Some(dir) => PayloadStore::file(dir)?,
            None => PayloadStore::memory(),
        };
        let pool: Arc<dyn WorkerPool> = match config.executor {
            ExecutorKind::Process => Arc::new(ProcessPool::new(
                config.pool_workers,
                &payloads,
                config.work_delay,
            )?),
            ExecutorKind::Thread => Arc::new(ThreadPool::new(
                config.pool_workers,
                payloads.clone(),
                simulated_work(config.work_delay),
            )),
        };

        info!(
            executor = ?config.executor,
            max_running_tasks = config.max_running_tasks,
            pool_workers = pool.max_workers(),
            "App configured"
        );
        Ok(Self::with_pool(config, payloads, pool))
    }

    /// Build around an existing payload store and pool.
    pub fn with_pool(config: Config, payloads: PayloadStore, pool: Arc<dyn WorkerPool>) -> Self {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let queue = Arc::new(match config.queue_capacity {
            Some(capacity) => TaskQueue::bounded(capacity),
            None => TaskQueue::new(),
        });
        let service = TaskService::new(Arc::clone(&store), Arc::clone(&queue));

        Self {
            config,
            store,
            queue,
            payloads,
            pool,
            service,
            shutdown: CancellationToken::new(),
            listener: None,
        }
    }

    /// Spawn the dispatch loop. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.listener.is_some() {
            warn!("Dispatch loop already running");
            return;
        }
        let handler = Arc::new(ExecutionHandler::new(
            Arc::clone(&self.store),
            self.payloads.clone(),
            Arc::clone(&self.pool),
        ));
        let listener = TaskQueueListener::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.store),
            handler,
            self.config.max_running_tasks,
            self.config.slot_poll_interval,
        );
        self.listener = Some(listener.spawn(self.shutdown.child_token()));
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> Router {
        api::router(self.service.clone())
    }

    /// Stop dispatching, wait for in-flight executions, then shut the pool.
    pub async fn shutdown(mut self) {
        info!("Shutting down");
        self.shutdown.cancel();
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                warn!(error = %e, "Dispatch loop ended abnormally");
            }
        }
        self.pool.shutdown().await;
        info!("Shutdown complete");
    }
}
