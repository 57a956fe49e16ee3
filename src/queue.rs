//! Trim job queue.
//!
//! A [`Trimmer`] owns a bounded rayon thread pool and runs one
//! [`trim_file`] job per submission. Submissions return immediately; the
//! result arrives through a callback or a [`TrimHandle`].
//!
//! ## Per-file exclusion
//!
//! Jobs for different files run in parallel. Jobs for the *same* file never
//! overlap: the first submission for a path claims it in the in-flight map,
//! later submissions for that path are parked in a FIFO behind it, and the
//! worker that finishes a job picks up the next parked job for the same path
//! before releasing the claim. Paths are compared in canonical form, so
//! `shots/a.png` and `./shots/a.png` share a claim.
//!
//! ```text
//! submit(a) ──► claim a ──► pool ──► run a#1 ──► callback ──► run a#2 ──► callback ──► release a
//! submit(a) ──► park behind a#1 ─────────────────────────────┘
//! submit(b) ──► claim b ──► pool ──► run b#1 ──► callback ──► release b
//! ```
//!
//! Callbacks run on a worker thread, after the job's file write has finished
//! and before the next job for that path starts.
//!
//! A panic inside the codec fails only that job, as
//! `CannotCreateImageFromSource`. A panicking callback is logged and
//! swallowed. Either way the path claim is released and the worker moves on.
//!
//! ## Shared instance
//!
//! [`Trimmer::shared`] is a process-wide trimmer so independent callers share
//! one bounded pool. It is built lazily with default config on first access;
//! call [`Trimmer::init_shared`] first to configure it.

use crate::config::{TrimConfig, effective_threads};
use crate::imaging::{BackendError, ImageBackend, Quality, RustBackend};
use crate::trim::{TrimError, TrimErrorKind, TrimOutcome, trim_file};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, mpsc};
use thiserror::Error;

pub type TrimResult = Result<TrimOutcome, TrimError>;

/// Completion callback, invoked exactly once on a worker thread.
pub type Completion = Box<dyn FnOnce(TrimResult) + Send + 'static>;

#[derive(Error, Debug)]
pub enum TrimmerError {
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Shared trimmer is already initialized")]
    AlreadyInitialized,
}

/// Lifecycle of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Skipped,
    Failed(TrimErrorKind),
}

impl JobState {
    fn finished(result: &TrimResult) -> Self {
        match result {
            Ok(TrimOutcome::Trimmed { .. }) => JobState::Succeeded,
            Ok(TrimOutcome::Skipped { .. }) => JobState::Skipped,
            Err(e) => JobState::Failed(e.kind()),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Queued | JobState::Running)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

struct Job {
    id: u64,
    path: PathBuf,
    key: PathBuf,
    state: Arc<Mutex<JobState>>,
    on_complete: Option<Completion>,
}

/// State shared between the submitting side and the workers.
struct Inner {
    backend: Arc<dyn ImageBackend>,
    quality: Quality,
    /// Claimed paths → jobs parked behind the running one.
    in_flight: Mutex<HashMap<PathBuf, VecDeque<Job>>>,
    idle: Condvar,
}

impl Inner {
    /// Run one job. Panics in the codec or the callback stay inside the job.
    fn run(&self, mut job: Job) {
        *lock(&job.state) = JobState::Running;
        log::debug!("trim job {} running: {}", job.id, job.path.display());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            trim_file(self.backend.as_ref(), &job.path, self.quality)
        }))
        .unwrap_or_else(|payload| {
            Err(TrimError::CannotCreateImageFromSource {
                path: job.path.clone(),
                source: BackendError::ProcessingFailed(format!(
                    "codec panicked: {}",
                    panic_message(&*payload)
                )),
            })
        });
        let state = JobState::finished(&result);
        match &result {
            Err(e) if e.kind().is_io() => log::warn!("trim job {} failed: {e}", job.id),
            _ => log::debug!("trim job {} finished: {state:?}", job.id),
        }

        // Deliver first so a terminal state always has a result behind it
        if let Some(on_complete) = job.on_complete.take() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(move || on_complete(result)));
            if let Err(payload) = delivered {
                log::warn!(
                    "trim job {} callback panicked: {}",
                    job.id,
                    panic_message(&*payload)
                );
            }
        }
        *lock(&job.state) = state;
    }

    /// Next parked job for `key`, or release the claim on `key`.
    fn next_for(&self, key: &Path) -> Option<Job> {
        let mut in_flight = lock(&self.in_flight);
        let next = in_flight.get_mut(key).and_then(VecDeque::pop_front);
        if next.is_none() {
            in_flight.remove(key);
            if in_flight.is_empty() {
                self.idle.notify_all();
            }
        }
        next
    }

    /// Run `job` and every job parked behind it for the same path.
    fn run_claimed(&self, mut job: Job) {
        loop {
            let key = job.key.clone();
            self.run(job);
            match self.next_for(&key) {
                Some(next) => job = next,
                None => break,
            }
        }
    }
}

/// Handle to one submitted job.
pub struct TrimHandle {
    path: PathBuf,
    state: Arc<Mutex<JobState>>,
    result: mpsc::Receiver<TrimResult>,
}

impl TrimHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> JobState {
        *lock(&self.state)
    }

    /// Result if the job has finished, without blocking.
    ///
    /// The result is delivered before [`state`](Self::state) turns terminal,
    /// so once the state is terminal this returns `Some` (the first time).
    pub fn try_result(&self) -> Option<TrimResult> {
        self.result.try_recv().ok()
    }

    /// Block until the job finishes.
    pub fn wait(self) -> TrimResult {
        self.result
            .recv()
            .expect("trim worker exited without reporting a result")
    }
}

/// Bounded trim job queue with per-file exclusion.
pub struct Trimmer {
    pool: rayon::ThreadPool,
    inner: Arc<Inner>,
    next_id: AtomicU64,
}

static SHARED: OnceLock<Trimmer> = OnceLock::new();

impl Trimmer {
    /// Trimmer backed by the `image` crate codec.
    pub fn new(config: &TrimConfig) -> Result<Self, TrimmerError> {
        Self::with_backend(Arc::new(RustBackend::new()), config)
    }

    pub fn with_backend(
        backend: Arc<dyn ImageBackend>,
        config: &TrimConfig,
    ) -> Result<Self, TrimmerError> {
        let threads = effective_threads(&config.processing);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("status-trim-{i}"))
            .panic_handler(|payload| {
                log::warn!("trim worker panicked: {}", panic_message(&*payload))
            })
            .build()?;
        log::debug!("trim pool started with {threads} workers");

        Ok(Self {
            pool,
            inner: Arc::new(Inner {
                backend,
                quality: Quality::new(config.output.quality),
                in_flight: Mutex::new(HashMap::new()),
                idle: Condvar::new(),
            }),
            next_id: AtomicU64::new(1),
        })
    }

    /// The process-wide trimmer, built with default config on first use.
    pub fn shared() -> &'static Trimmer {
        SHARED.get_or_init(|| {
            Trimmer::new(&TrimConfig::default()).expect("failed to start the shared trim pool")
        })
    }

    /// Build the process-wide trimmer from `config`.
    ///
    /// Fails with [`TrimmerError::AlreadyInitialized`] once [`Trimmer::shared`]
    /// or this function has already created it.
    pub fn init_shared(config: &TrimConfig) -> Result<&'static Trimmer, TrimmerError> {
        if SHARED.get().is_some() {
            return Err(TrimmerError::AlreadyInitialized);
        }
        let trimmer = Trimmer::new(config)?;
        let mut installed = false;
        let shared = SHARED.get_or_init(|| {
            installed = true;
            trimmer
        });
        if installed {
            Ok(shared)
        } else {
            Err(TrimmerError::AlreadyInitialized)
        }
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a trim of `path`. `on_complete` is called exactly once, on a
    /// worker thread, with the job's result.
    ///
    /// Never blocks on other jobs; the file is not touched before this returns.
    pub fn submit(&self, path: impl Into<PathBuf>, on_complete: Option<Completion>) {
        self.enqueue(path.into(), on_complete);
    }

    /// Queue a trim of `path` and get a handle to its result.
    pub fn submit_with_handle(&self, path: impl Into<PathBuf>) -> TrimHandle {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let state = self.enqueue(
            path.clone(),
            Some(Box::new(move |result: TrimResult| {
                // The handle may have been dropped; nobody is waiting then
                let _ = tx.send(result);
            })),
        );
        TrimHandle {
            path,
            state,
            result: rx,
        }
    }

    /// Trim every path and wait for all of them. Results are in input order.
    pub fn trim_all<I, P>(&self, paths: I) -> Vec<(PathBuf, TrimResult)>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let handles: Vec<TrimHandle> = paths
            .into_iter()
            .map(|p| self.submit_with_handle(p))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                let path = h.path.clone();
                (path, h.wait())
            })
            .collect()
    }

    /// Jobs queued or running.
    pub fn pending_jobs(&self) -> usize {
        lock(&self.inner.in_flight)
            .values()
            .map(|parked| 1 + parked.len())
            .sum()
    }

    /// Block until every submitted job has finished and delivered its result.
    ///
    /// Must not be called from a completion callback.
    pub fn wait_idle(&self) {
        let mut in_flight = lock(&self.inner.in_flight);
        while !in_flight.is_empty() {
            in_flight = self
                .inner
                .idle
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn enqueue(&self, path: PathBuf, on_complete: Option<Completion>) -> Arc<Mutex<JobState>> {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        let state = Arc::new(Mutex::new(JobState::Queued));
        let job = Job {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            path,
            key,
            state: Arc::clone(&state),
            on_complete,
        };

        let mut in_flight = lock(&self.inner.in_flight);
        if let Some(parked) = in_flight.get_mut(&job.key) {
            log::debug!(
                "trim job {} parked behind running job for {}",
                job.id,
                job.path.display()
            );
            parked.push_back(job);
            return state;
        }
        in_flight.insert(job.key.clone(), VecDeque::new());
        drop(in_flight);

        log::debug!("trim job {} queued: {}", job.id, job.path.display());
        let inner = Arc::clone(&self.inner);
        self.pool.spawn(move || inner.run_claimed(job));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{BackendError, CropParams, Dimensions};
    use crate::test_helpers::{create_test_png, image_size, snapshot};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn config(max_processes: usize) -> TrimConfig {
        TrimConfig {
            processing: ProcessingConfig {
                max_processes: Some(max_processes),
            },
            ..TrimConfig::default()
        }
    }

    /// Mock backend whose crop is slow and tracks overlapping crops.
    struct SlowBackend {
        inner: MockBackend,
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl SlowBackend {
        fn new(inner: MockBackend, delay: Duration) -> Self {
            Self {
                inner,
                delay,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }
    }

    impl ImageBackend for SlowBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.inner.identify(path)
        }

        fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let result = self.inner.crop(params);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[test]
    fn callback_runs_once_on_worker_thread() {
        let backend = Arc::new(MockBackend::with_image("/a.png", 750, 1334));
        let trimmer = Trimmer::with_backend(backend, &config(2)).unwrap();
        let (tx, rx) = mpsc::channel();

        trimmer.submit(
            "/a.png",
            Some(Box::new(move |result: TrimResult| {
                let name = std::thread::current().name().map(str::to_string);
                tx.send((result, name)).unwrap();
            })),
        );

        let (result, thread_name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Ok(TrimOutcome::Trimmed { .. })));
        assert!(thread_name.unwrap().starts_with("status-trim-"));

        trimmer.wait_idle();
        // Sender dropped after the single call
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn submit_without_callback_still_runs() {
        let backend = Arc::new(MockBackend::with_image("/a.png", 750, 1334));
        let trimmer = Trimmer::with_backend(backend.clone(), &config(1)).unwrap();

        trimmer.submit("/a.png", None);
        trimmer.wait_idle();

        assert_eq!(backend.crop_count(), 1);
        assert_eq!(trimmer.pending_jobs(), 0);
    }

    #[test]
    fn same_path_jobs_never_overlap() {
        let backend = Arc::new(SlowBackend::new(
            MockBackend::with_image("/a.png", 750, 1334),
            Duration::from_millis(50),
        ));
        let trimmer = Trimmer::with_backend(backend.clone(), &config(4)).unwrap();

        let first = trimmer.submit_with_handle("/a.png");
        let second = trimmer.submit_with_handle("/a.png");

        assert!(matches!(first.wait(), Ok(TrimOutcome::Trimmed { .. })));
        let err = second.wait().unwrap_err();
        assert_eq!(err.kind(), TrimErrorKind::ImageAlreadyTrimmed);

        assert_eq!(backend.inner.crop_count(), 1);
        assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_path_jobs_run_in_submission_order() {
        let backend = Arc::new(SlowBackend::new(
            MockBackend::with_image("/a.png", 750, 1334),
            Duration::from_millis(10),
        ));
        let trimmer = Trimmer::with_backend(backend, &config(4)).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            trimmer.submit(
                "/a.png",
                Some(Box::new(move |_: TrimResult| order.lock().unwrap().push(i))),
            );
        }
        trimmer.wait_idle();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn pending_jobs_counts_parked_submissions() {
        let backend = Arc::new(SlowBackend::new(
            MockBackend::with_image("/a.png", 750, 1334),
            Duration::from_millis(100),
        ));
        let trimmer = Trimmer::with_backend(backend, &config(1)).unwrap();

        let handles: Vec<_> = (0..3).map(|_| trimmer.submit_with_handle("/a.png")).collect();
        assert!(trimmer.pending_jobs() >= 2);

        for handle in handles {
            let _ = handle.wait();
        }
        trimmer.wait_idle();
        assert_eq!(trimmer.pending_jobs(), 0);
    }

    #[test]
    fn handle_reports_terminal_state() {
        let backend = Arc::new(MockBackend::with_image("/a.png", 123, 456));
        let trimmer = Trimmer::with_backend(backend, &config(1)).unwrap();

        let handle = trimmer.submit_with_handle("/a.png");
        assert_eq!(handle.path(), Path::new("/a.png"));
        trimmer.wait_idle();

        assert_eq!(handle.state(), JobState::Skipped);
        assert!(handle.state().is_terminal());
        assert!(matches!(
            handle.try_result(),
            Some(Ok(TrimOutcome::Skipped { .. }))
        ));
    }

    #[test]
    fn failed_job_state_carries_kind() {
        let backend = Arc::new(MockBackend::new());
        let trimmer = Trimmer::with_backend(backend, &config(1)).unwrap();

        let handle = trimmer.submit_with_handle("/missing.png");
        trimmer.wait_idle();

        assert_eq!(
            handle.state(),
            JobState::Failed(TrimErrorKind::CannotCreateImageSourceFromFile)
        );
    }

    #[test]
    fn trim_all_keeps_input_order() {
        let backend = MockBackend::with_image("/a.png", 750, 1334);
        backend.set_size("/b.png", 123, 456);
        backend.set_size("/c.png", 750, 1294);
        let trimmer = Trimmer::with_backend(Arc::new(backend), &config(2)).unwrap();

        let results = trimmer.trim_all(["/a.png", "/b.png", "/c.png"]);

        let paths: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a.png"),
                PathBuf::from("/b.png"),
                PathBuf::from("/c.png")
            ]
        );
        assert!(matches!(results[0].1, Ok(TrimOutcome::Trimmed { .. })));
        assert!(matches!(results[1].1, Ok(TrimOutcome::Skipped { .. })));
        assert!(matches!(
            &results[2].1,
            Err(e) if e.kind() == TrimErrorKind::ImageAlreadyTrimmed
        ));
    }

    #[test]
    fn pool_size_follows_config() {
        let trimmer = Trimmer::with_backend(Arc::new(MockBackend::new()), &config(1)).unwrap();
        assert_eq!(trimmer.threads(), 1);
    }

    #[test]
    fn shared_trimmer_is_a_singleton() {
        let a = Trimmer::shared();
        let b = Trimmer::shared();
        assert!(std::ptr::eq(a, b));
        assert!(matches!(
            Trimmer::init_shared(&TrimConfig::default()),
            Err(TrimmerError::AlreadyInitialized)
        ));
    }

    #[test]
    fn concurrent_real_file_trims_crop_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.png");
        create_test_png(&path, 750, 1334);
        let trimmer = Trimmer::new(&config(4)).unwrap();

        // Two spellings of the same file share one claim
        let dotted = tmp.path().join(".").join("IMG_0001.png");
        let handles = vec![
            trimmer.submit_with_handle(&path),
            trimmer.submit_with_handle(&dotted),
        ];
        let results: Vec<_> = handles.into_iter().map(TrimHandle::wait).collect();

        let trimmed = results.iter().filter(|r| r.is_ok()).count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() == TrimErrorKind::ImageAlreadyTrimmed))
            .count();
        assert_eq!((trimmed, already), (1, 1));
        assert_eq!(image_size(&path), (750, 1294));
    }

    #[test]
    fn real_unknown_size_left_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("diagram.png");
        create_test_png(&path, 123, 456);
        let before = snapshot(&path);
        let trimmer = Trimmer::new(&config(1)).unwrap();

        let result = trimmer.submit_with_handle(&path).wait();

        assert!(matches!(result, Ok(TrimOutcome::Skipped { .. })));
        assert_eq!(snapshot(&path), before);
    }

    /// Identifies every file as an iPhone 6 screenshot, then panics in crop.
    struct PanickingBackend;

    impl ImageBackend for PanickingBackend {
        fn identify(&self, _path: &Path) -> Result<Dimensions, BackendError> {
            Ok(Dimensions {
                width: 750,
                height: 1334,
            })
        }

        fn crop(&self, _params: &CropParams) -> Result<(), BackendError> {
            panic!("decoder blew up");
        }
    }

    #[test]
    fn panicking_callback_does_not_stop_later_jobs() {
        let backend = MockBackend::with_image("/a.png", 750, 1334);
        backend.set_size("/b.png", 750, 1334);
        let trimmer = Trimmer::with_backend(Arc::new(backend), &config(1)).unwrap();

        fn failing_callback(_: TrimResult) {
            panic!("callback failed");
        }
        trimmer.submit("/a.png", Some(Box::new(failing_callback)));
        let other_path = trimmer.submit_with_handle("/b.png");
        let same_path = trimmer.submit_with_handle("/a.png");

        assert!(matches!(other_path.wait(), Ok(TrimOutcome::Trimmed { .. })));
        let err = same_path.wait().unwrap_err();
        assert_eq!(err.kind(), TrimErrorKind::ImageAlreadyTrimmed);

        trimmer.wait_idle();
        assert_eq!(trimmer.pending_jobs(), 0);
    }

    #[test]
    fn codec_panic_fails_only_that_job() {
        let trimmer = Trimmer::with_backend(Arc::new(PanickingBackend), &config(1)).unwrap();

        let first = trimmer.submit_with_handle("/a.png");
        let second = trimmer.submit_with_handle("/a.png");

        for handle in [first, second] {
            let err = handle.wait().unwrap_err();
            assert_eq!(err.kind(), TrimErrorKind::CannotCreateImageFromSource);
            assert!(err.to_string().contains("decoder blew up"));
        }
        trimmer.wait_idle();
        assert_eq!(trimmer.pending_jobs(), 0);
    }

    #[test]
    fn terminal_state_has_result_ready() {
        let backend = Arc::new(SlowBackend::new(
            MockBackend::with_image("/a.png", 750, 1334),
            Duration::from_millis(20),
        ));
        let trimmer = Trimmer::with_backend(backend, &config(1)).unwrap();

        let handle = trimmer.submit_with_handle("/a.png");
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !handle.state().is_terminal() {
            assert!(std::time::Instant::now() < deadline, "job never finished");
            std::thread::yield_now();
        }

        assert_eq!(handle.state(), JobState::Succeeded);
        assert!(matches!(
            handle.try_result(),
            Some(Ok(TrimOutcome::Trimmed { .. }))
        ));
    }
}
