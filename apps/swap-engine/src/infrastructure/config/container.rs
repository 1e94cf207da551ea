//! Dependency Injection Container
//!
//! Manages creation and wiring of all application components.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EXECUTE_ORDER_TOPIC, JobQueuePort};
use crate::application::services::OrderProgressBuffer;
use crate::application::use_cases::{ExecuteOrderJobProcessor, OrderExecutor, SubmitSwapUseCase};
use crate::config::Config;
use crate::domain::routing::{Dex, DexRegistry, DexRouter, RegistryError};
use crate::infrastructure::http::AppState;
use crate::infrastructure::persistence::InMemoryOrderRepository;
use crate::infrastructure::queue::{InMemoryJobQueue, WorkerPool};
use crate::infrastructure::venues::SimulatedDex;

/// Swap intake wired to the in-process adapters.
pub type SwapIntake = SubmitSwapUseCase<InMemoryOrderRepository, InMemoryJobQueue>;

/// Job processor wired to the in-process adapters.
pub type SwapJobProcessor = ExecuteOrderJobProcessor<OrderExecutor, InMemoryOrderRepository>;

/// Dependency injection container.
///
/// Holds all wired dependencies for the application. Build with
/// `Container::from_config` or, with custom venue adapters,
/// `Container::with_dexes`.
pub struct Container {
    orders: Arc<InMemoryOrderRepository>,
    queue: Arc<InMemoryJobQueue>,
    router: Arc<DexRouter>,
    progress: Arc<OrderProgressBuffer>,
    submit_swap: Arc<SwapIntake>,
    worker_pool: Arc<WorkerPool>,
    routing_shutdown: CancellationToken,
}

impl Container {
    /// Wire everything with one simulated adapter per configured venue.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateVenue` if a venue is listed twice.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let dexes = config
            .venues
            .iter()
            .map(|venue| {
                Arc::new(SimulatedDex::new(venue.id, venue.simulated_config())) as Arc<dyn Dex>
            })
            .collect();
        Self::with_dexes(config, dexes)
    }

    /// Wire everything around the given venue adapters, in routing order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateVenue` if two adapters share an id.
    pub fn with_dexes(config: &Config, dexes: Vec<Arc<dyn Dex>>) -> Result<Self, RegistryError> {
        let registry = Arc::new(DexRegistry::new(dexes)?);
        let routing_shutdown = CancellationToken::new();
        let router = Arc::new(
            DexRouter::new(registry, config.routing.router_config())
                .with_shutdown(routing_shutdown.clone()),
        );

        let orders = Arc::new(InMemoryOrderRepository::new());
        let queue = Arc::new(InMemoryJobQueue::new(config.queue.event_capacity));
        let progress = Arc::new(OrderProgressBuffer::new(config.progress.buffer_config()));

        let executor = Arc::new(OrderExecutor::new(
            Arc::clone(&router),
            config.wallet.credentials(),
        ));
        let processor: Arc<SwapJobProcessor> = Arc::new(ExecuteOrderJobProcessor::new(
            executor,
            Arc::clone(&orders),
            config.queue.retry_policy,
        ));
        let worker_pool = Arc::new(
            WorkerPool::new(Arc::clone(&queue), config.queue.worker_config())
                .with_handler(EXECUTE_ORDER_TOPIC, processor),
        );

        let submit_swap = Arc::new(SubmitSwapUseCase::new(
            Arc::clone(&orders),
            Arc::clone(&queue),
            config.queue.attempts,
        ));

        tracing::info!(
            venues = router.registry().len(),
            concurrency = config.queue.concurrency,
            attempts = config.queue.attempts,
            "Container wired"
        );

        Ok(Self {
            orders,
            queue,
            router,
            progress,
            submit_swap,
            worker_pool,
            routing_shutdown,
        })
    }

    /// Get the order repository.
    pub fn orders(&self) -> Arc<InMemoryOrderRepository> {
        Arc::clone(&self.orders)
    }

    /// Get the job queue.
    pub fn queue(&self) -> Arc<InMemoryJobQueue> {
        Arc::clone(&self.queue)
    }

    /// Get the best-quote router.
    pub fn router(&self) -> Arc<DexRouter> {
        Arc::clone(&self.router)
    }

    /// Get the progress buffer.
    pub fn progress(&self) -> Arc<OrderProgressBuffer> {
        Arc::clone(&self.progress)
    }

    /// Get the swap intake use case.
    pub fn submit_swap(&self) -> Arc<SwapIntake> {
        Arc::clone(&self.submit_swap)
    }

    /// HTTP state for the REST and WebSocket handlers.
    pub fn app_state(&self, version: impl Into<String>) -> AppState<InMemoryOrderRepository, InMemoryJobQueue> {
        AppState {
            submit_swap: Arc::clone(&self.submit_swap),
            progress: Arc::clone(&self.progress),
            version: version.into(),
        }
    }

    /// Start the progress buffer and the worker pool.
    ///
    /// The buffer subscribes before the workers start so no event of a job
    /// processed by this container is missed. Cancelling `shutdown` also
    /// cancels in-flight venue quote calls.
    pub fn start(&self, shutdown: &CancellationToken) -> BackgroundTasks {
        let stop = shutdown.clone();
        let routing = self.routing_shutdown.clone();
        tokio::spawn(async move {
            stop.cancelled().await;
            routing.cancel();
        });

        let progress = self
            .progress
            .spawn(self.queue.subscribe(), shutdown.child_token());
        let worker = tokio::spawn(Arc::clone(&self.worker_pool).run(shutdown.child_token()));
        BackgroundTasks { progress, worker }
    }
}

/// Handles of the long-running tasks started by `Container::start`.
pub struct BackgroundTasks {
    progress: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Wait for both tasks to finish.
    pub async fn join(self) {
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Worker pool task failed");
        }
        if let Err(e) = self.progress.await {
            tracing::error!(error = %e, "Progress buffer task failed");
        }
    }
}
