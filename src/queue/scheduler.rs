//! Priority Request Queue
//!
//! Bounded-concurrency, priority-ordered scheduler with retry-with-backoff
//! for requests marked critical.
//!
//! # Scheduling discipline
//!
//! - Requests are kept in priority order; equal priorities are FIFO.
//! - A drain pass dispatches work while slots are free. Only one pass owns
//!   the queue at a time (`is_processing`), and a pass is re-triggered every
//!   time a slot frees, so reentrant invocations can never double-dispatch.
//! - A failed critical request re-enters at the absolute front of the queue
//!   after its backoff delay, ahead of all pending work. This bounds
//!   worst-case latency for critical operations but can starve lower
//!   priorities under sustained critical churn.

use crate::error::ProofGateError;
use crate::metrics;
use crate::queue::request::{
    CompletionHandle, EnqueueOptions, Operation, Priority, QueueStatus, QueuedRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Default maximum number of concurrently executing operations
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default maximum number of retries for a critical request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for retry backoff (doubled per attempt)
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Default upper bound on the random jitter added to each backoff delay
pub const DEFAULT_RETRY_JITTER_MS: u64 = 100;

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of operations executing at once
    pub max_concurrent: usize,

    /// Maximum retries for a critical request before its failure is terminal
    pub max_retries: u32,

    /// Base backoff delay in milliseconds; attempt `n` waits `2^n * base`
    pub retry_base_delay_ms: u64,

    /// Upper bound on the uniform random jitter added to each backoff delay
    pub retry_jitter_ms: u64,

    /// Optional bound on queued (not yet started) requests; `None` = unbounded
    pub max_queued: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_jitter_ms: DEFAULT_RETRY_JITTER_MS,
            max_queued: None,
        }
    }
}

impl QueueConfig {
    /// Compute the backoff delay for the given retry attempt
    ///
    /// `delay = 2^attempt * base + uniform_random(0, jitter)`. The exponent
    /// is clamped so large attempt counts cannot overflow.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(20);
        let backoff_ms = self.retry_base_delay_ms.saturating_mul(factor);
        let jitter_ms = (rand::random::<f64>() * self.retry_jitter_ms as f64) as u64;
        Duration::from_millis(backoff_ms.saturating_add(jitter_ms))
    }
}

/// Position at which a new request of the given priority is inserted
///
/// Returns the index of the first entry whose priority rank is strictly
/// greater than the new request's, or `None` to append. Inserting there keeps
/// the queue priority-ordered and FIFO within equal priorities.
pub(crate) fn insertion_index<I>(priorities: I, new: Priority) -> Option<usize>
where
    I: IntoIterator<Item = Priority>,
{
    priorities
        .into_iter()
        .position(|p| p.rank() > new.rank())
}

struct QueueInner<T> {
    queue: VecDeque<QueuedRequest<T>>,
    active: usize,
    total_processed: u64,
    is_processing: bool,
}

/// Priority-ordered, bounded-concurrency request scheduler
///
/// Cloning is cheap and shares the same underlying queue. Constructed
/// service objects are injected where needed; there is no global instance.
pub struct RequestQueue<T: Send + 'static> {
    config: QueueConfig,
    inner: Arc<Mutex<QueueInner<T>>>,
}

impl<T: Send + 'static> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> RequestQueue<T> {
    /// Create a queue with the given configuration
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(QueueInner {
                queue: VecDeque::new(),
                active: 0,
                total_processed: 0,
                is_processing: false,
            })),
        }
    }

    /// Create a queue with default configuration
    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Current queue configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Admit an operation into the queue
    ///
    /// The request is inserted at its priority position (FIFO within equal
    /// priorities) and the drain loop is kicked if idle. Fails synchronously
    /// with a validation error when a configured capacity bound is exceeded.
    pub fn enqueue(
        &self,
        operation: Operation<T>,
        options: EnqueueOptions,
    ) -> Result<CompletionHandle<T>, ProofGateError> {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let request = QueuedRequest {
            id,
            operation,
            priority: options.priority,
            critical: options.critical,
            enqueued_at: Instant::now(),
            started_at: None,
            retries: 0,
            completion: tx,
        };

        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(cap) = self.config.max_queued {
                if inner.queue.len() >= cap {
                    return Err(ProofGateError::Validation(format!(
                        "queue is at capacity ({} queued requests)",
                        cap
                    )));
                }
            }
            match insertion_index(inner.queue.iter().map(|r| r.priority), options.priority) {
                Some(idx) => inner.queue.insert(idx, request),
                None => inner.queue.push_back(request),
            }
        }

        metrics::REQUESTS_ENQUEUED_TOTAL.inc();
        tracing::debug!(
            request_id = %id,
            priority = ?options.priority,
            critical = options.critical,
            "request enqueued"
        );

        self.drain();
        Ok(CompletionHandle::new(id, rx))
    }

    /// Read-only snapshot of queue state; no side effects
    pub fn status(&self) -> QueueStatus {
        let inner = self.inner.lock().unwrap();
        QueueStatus {
            queued_requests: inner.queue.len(),
            active_operations: inner.active,
            total_processed: inner.total_processed,
            is_processing: inner.is_processing,
        }
    }

    /// Cancel every request still waiting in the queue
    ///
    /// Each pending request's handle settles with a cancellation error.
    /// Requests already executing are unaffected; there is no preemption
    /// once execution starts. Returns the number of cancelled requests.
    pub fn clear(&self) -> usize {
        let drained: Vec<QueuedRequest<T>> = {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.drain(..).collect()
        };

        let cancelled = drained.len();
        for request in drained {
            tracing::debug!(request_id = %request.id, "request cancelled before start");
            let _ = request.completion.send(Err(ProofGateError::Cancelled));
            metrics::REQUESTS_CANCELLED_TOTAL.inc();
        }

        if cancelled > 0 {
            tracing::info!(cancelled, "queue cleared");
        }
        cancelled
    }

    /// Dispatch queued requests while concurrency slots are free
    ///
    /// The `is_processing` flag makes one pass the sole owner of shrinking
    /// the queue; reentrant callers return immediately and the owning pass
    /// (or the next settlement) picks up their work.
    fn drain(&self) {
        let mut dispatch = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.is_processing {
                return;
            }
            inner.is_processing = true;

            while inner.active < self.config.max_concurrent {
                let Some(mut request) = inner.queue.pop_front() else {
                    break;
                };
                inner.active += 1;
                request.started_at = Some(Instant::now());
                dispatch.push(request);
            }

            inner.is_processing = false;
        }

        for request in dispatch {
            self.spawn_attempt(request);
        }
    }

    /// Execute one attempt of a dispatched request on its own task
    fn spawn_attempt(&self, mut request: QueuedRequest<T>) {
        let queue = self.clone();
        metrics::ACTIVE_OPERATIONS.inc();

        let waited = request.enqueued_at.elapsed();
        tracing::debug!(
            request_id = %request.id,
            wait_ms = waited.as_millis() as u64,
            retries = request.retries,
            "request dispatched"
        );

        tokio::spawn(async move {
            let attempt = (request.operation)();
            match attempt.await {
                Ok(value) => {
                    metrics::REQUESTS_COMPLETED_TOTAL.inc();
                    tracing::debug!(request_id = %request.id, "request completed");
                    let _ = request.completion.send(Ok(value));
                    queue.on_settled();
                }
                Err(err) => {
                    if request.critical && request.retries < queue.config.max_retries {
                        request.retries += 1;
                        let delay = queue.config.backoff_delay(request.retries);
                        metrics::REQUESTS_RETRIED_TOTAL.inc();
                        tracing::warn!(
                            request_id = %request.id,
                            retry = request.retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "critical request failed, scheduling retry"
                        );
                        // Free the slot first so the backoff only delays this
                        // request, never the scheduler as a whole.
                        queue.on_settled();
                        tokio::time::sleep(delay).await;
                        queue.requeue_front(request);
                    } else {
                        let retries = request.retries;
                        metrics::REQUESTS_FAILED_TOTAL.inc();
                        tracing::warn!(
                            request_id = %request.id,
                            retries,
                            error = %err,
                            "request failed"
                        );
                        let _ = request
                            .completion
                            .send(Err(ProofGateError::Execution {
                                retries,
                                source: err,
                            }));
                        queue.on_settled();
                    }
                }
            }
        });
    }

    /// Account for a settled attempt and resume draining
    fn on_settled(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.active = inner.active.saturating_sub(1);
            inner.total_processed += 1;
        }
        metrics::ACTIVE_OPERATIONS.dec();
        self.drain();
    }

    /// Re-admit a retried critical request at the absolute front of the queue
    ///
    /// Bypasses normal priority ordering so the retried request runs ahead
    /// of all pending work.
    fn requeue_front(&self, request: QueuedRequest<T>) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.push_front(request);
        }
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::request::operation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry_config() -> QueueConfig {
        QueueConfig {
            retry_base_delay_ms: 5,
            retry_jitter_ms: 2,
            ..QueueConfig::default()
        }
    }

    #[test]
    fn test_insertion_index_ordering() {
        use Priority::*;
        // Empty queue appends.
        assert_eq!(insertion_index(vec![], Normal), None);
        // Equal priority appends after existing entries (FIFO).
        assert_eq!(insertion_index(vec![Normal, Normal], Normal), None);
        // Higher priority goes before the first lower-ranked entry.
        assert_eq!(insertion_index(vec![High, Normal, Low], High), Some(1));
        assert_eq!(insertion_index(vec![High, Normal, Low], Normal), Some(2));
        assert_eq!(insertion_index(vec![High, Normal, Low], Low), None);
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let config = QueueConfig {
            retry_base_delay_ms: 100,
            retry_jitter_ms: 0,
            ..QueueConfig::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_delay_jitter_bounds() {
        let config = QueueConfig {
            retry_base_delay_ms: 100,
            retry_jitter_ms: 50,
            ..QueueConfig::default()
        };
        for _ in 0..20 {
            let delay = config.backoff_delay(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_single_request_completes() {
        let queue: RequestQueue<u32> = RequestQueue::with_defaults();
        let handle = queue
            .enqueue(operation(|| async { Ok(42) }), EnqueueOptions::default())
            .unwrap();
        assert_eq!(handle.wait().await.unwrap(), 42);

        let status = queue.status();
        assert_eq!(status.queued_requests, 0);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        // Scenario: max_concurrent = 2, three operations resolving after 10ms.
        let queue: RequestQueue<usize> = RequestQueue::new(QueueConfig {
            max_concurrent: 2,
            ..QueueConfig::default()
        });

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for i in 0..3 {
            let in_flight = Arc::clone(&in_flight);
            let max_observed = Arc::clone(&max_observed);
            let handle = queue
                .enqueue(
                    operation(move || {
                        let in_flight = Arc::clone(&in_flight);
                        let max_observed = Arc::clone(&max_observed);
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            max_observed.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(i)
                        }
                    }),
                    EnqueueOptions::default(),
                )
                .unwrap();
            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.wait().await.unwrap());
        }

        assert!(max_observed.load(Ordering::SeqCst) <= 2);
        // FIFO among equal-priority requests: settled in enqueue order.
        assert_eq!(results, vec![0, 1, 2]);
        assert_eq!(queue.status().total_processed, 3);
    }

    #[tokio::test]
    async fn test_priority_ordering_respected() {
        // Single slot occupied by a blocker, then low/high/normal enqueued.
        let queue: RequestQueue<&'static str> = RequestQueue::new(QueueConfig {
            max_concurrent: 1,
            ..QueueConfig::default()
        });

        let order = Arc::new(Mutex::new(Vec::new()));

        let record = |label: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| {
            let order = Arc::clone(order);
            operation(move || {
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(label);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(label)
                }
            })
        };

        let blocker = queue
            .enqueue(record("blocker", &order), EnqueueOptions::default())
            .unwrap();
        let low = queue
            .enqueue(record("low", &order), EnqueueOptions::with_priority(Priority::Low))
            .unwrap();
        let high = queue
            .enqueue(record("high", &order), EnqueueOptions::with_priority(Priority::High))
            .unwrap();
        let normal = queue
            .enqueue(record("normal", &order), EnqueueOptions::default())
            .unwrap();

        blocker.wait().await.unwrap();
        high.wait().await.unwrap();
        normal.wait().await.unwrap();
        low.wait().await.unwrap();

        let observed = order.lock().unwrap().clone();
        assert_eq!(observed, vec!["blocker", "high", "normal", "low"]);
    }

    #[tokio::test]
    async fn test_critical_retry_succeeds_on_third_attempt() {
        let queue: RequestQueue<&'static str> = RequestQueue::new(fast_retry_config());
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let handle = queue
            .enqueue(
                operation(move || {
                    let attempts = Arc::clone(&attempts_clone);
                    async move {
                        let n = attempts.fetch_add(1, Ordering::SeqCst);
                        if n < 2 {
                            Err(anyhow::anyhow!("transient prover failure"))
                        } else {
                            Ok("proof")
                        }
                    }
                }),
                EnqueueOptions::critical(Priority::Normal),
            )
            .unwrap();

        assert_eq!(handle.wait().await.unwrap(), "proof");
        // Two failures, then success: three attempts total.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_critical_retries_exhausted() {
        let queue: RequestQueue<u32> = RequestQueue::new(fast_retry_config());
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let handle = queue
            .enqueue(
                operation(move || {
                    let attempts = Arc::clone(&attempts_clone);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(anyhow::anyhow!("backend is down"))
                    }
                }),
                EnqueueOptions::critical(Priority::Normal),
            )
            .unwrap();

        let err = handle.wait().await.unwrap_err();
        match err {
            ProofGateError::Execution { retries, source } => {
                assert_eq!(retries, 3);
                assert!(source.to_string().contains("backend is down"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
        // Initial attempt plus three retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_critical_failure_is_terminal() {
        let queue: RequestQueue<u32> = RequestQueue::new(fast_retry_config());
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let handle = queue
            .enqueue(
                operation(move || {
                    let attempts = Arc::clone(&attempts_clone);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(anyhow::anyhow!("bad witness"))
                    }
                }),
                EnqueueOptions::default(),
            )
            .unwrap();

        let err = handle.wait().await.unwrap_err();
        match err {
            ProofGateError::Execution { retries, .. } => assert_eq!(retries, 0),
            other => panic!("expected execution error, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_cancels_pending_only() {
        // Scenario: one active request, two pending; clear settles the two
        // pending with cancellation and the active request completes.
        let queue: RequestQueue<&'static str> = RequestQueue::new(QueueConfig {
            max_concurrent: 1,
            ..QueueConfig::default()
        });

        let active = queue
            .enqueue(
                operation(|| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok("active")
                }),
                EnqueueOptions::default(),
            )
            .unwrap();
        // Give the drain loop a moment to dispatch the first request.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let pending1 = queue
            .enqueue(operation(|| async { Ok("p1") }), EnqueueOptions::default())
            .unwrap();
        let pending2 = queue
            .enqueue(operation(|| async { Ok("p2") }), EnqueueOptions::default())
            .unwrap();

        let cancelled = queue.clear();
        assert_eq!(cancelled, 2);

        assert!(matches!(
            pending1.wait().await,
            Err(ProofGateError::Cancelled)
        ));
        assert!(matches!(
            pending2.wait().await,
            Err(ProofGateError::Cancelled)
        ));
        assert_eq!(active.wait().await.unwrap(), "active");
    }

    #[tokio::test]
    async fn test_enqueue_after_clear_is_safe() {
        let queue: RequestQueue<u32> = RequestQueue::with_defaults();
        queue.clear();
        let handle = queue
            .enqueue(operation(|| async { Ok(1) }), EnqueueOptions::default())
            .unwrap();
        assert_eq!(handle.wait().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_bound_rejects_synchronously() {
        let queue: RequestQueue<u32> = RequestQueue::new(QueueConfig {
            max_concurrent: 1,
            max_queued: Some(1),
            ..QueueConfig::default()
        });

        let _active = queue
            .enqueue(
                operation(|| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(0)
                }),
                EnqueueOptions::default(),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let _queued = queue
            .enqueue(operation(|| async { Ok(1) }), EnqueueOptions::default())
            .unwrap();

        let overflow = queue.enqueue(operation(|| async { Ok(2) }), EnqueueOptions::default());
        assert!(matches!(overflow, Err(ProofGateError::Validation(_))));
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let queue: RequestQueue<u32> = RequestQueue::with_defaults();
        let first = queue.status();
        let second = queue.status();
        assert_eq!(first, second);
    }
}
