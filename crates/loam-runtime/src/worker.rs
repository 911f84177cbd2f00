use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use loam_edit::EditLog;
use loam_world::ChunkCoord;
use parking_lot::RwLock;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{BuildFailure, ChunkSource, ChunkStore, CommitOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildJob {
    pub coord: ChunkCoord,
    /// Zero for the first try.
    pub attempt: u32,
    pub job_id: u64,
}

#[derive(Debug)]
pub enum JobResult {
    Committed(CommitOutcome),
    /// The slot was no longer Requested when a worker picked the job up.
    Cancelled,
    Failed(BuildFailure),
}

/// One per submitted job, always.
#[derive(Debug)]
pub struct JobOut {
    pub coord: ChunkCoord,
    pub attempt: u32,
    pub job_id: u64,
    pub result: JobResult,
    pub edits_applied: usize,
    pub t_gen_ms: u32,
    pub t_total_ms: u32,
}

struct WorkerCtx {
    source: Arc<dyn ChunkSource>,
    store: Arc<ChunkStore>,
    edits: Arc<RwLock<EditLog>>,
}

#[inline]
fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("builder panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("builder panicked: {s}")
    } else {
        "builder panicked".to_string()
    }
}

// Hands a failed claim back: transient failures return the slot to Requested
// for a retry, anything else frees it.
fn settle_failed_claim(store: &ChunkStore, coord: ChunkCoord, failure: &BuildFailure) {
    let res = if failure.is_transient() {
        store.release(coord).map(|_| ())
    } else {
        store.abandon(coord)
    };
    if let Err(e) = res {
        log::error!(target: "worker", "{e}");
    }
}

fn process_build_job(job: BuildJob, ctx: &WorkerCtx, tx: &Sender<JobOut>) {
    let BuildJob {
        coord,
        attempt,
        job_id,
    } = job;
    let t_job_start = Instant::now();
    let send = |result: JobResult, edits_applied: usize, t_gen_ms: u32| {
        let _ = tx.send(JobOut {
            coord,
            attempt,
            job_id,
            result,
            edits_applied,
            t_gen_ms,
            t_total_ms: elapsed_ms(t_job_start),
        });
    };

    if !ctx.store.try_claim_requested(coord) {
        send(JobResult::Cancelled, 0, 0);
        return;
    }

    let t0 = Instant::now();
    let built = panic::catch_unwind(AssertUnwindSafe(|| ctx.source.build_chunk(coord)));
    let t_gen_ms = elapsed_ms(t0);

    match built {
        Ok(Ok(mut chunk)) => {
            let snapshot = ctx.edits.read().snapshot_for_chunk(coord);
            let applied = chunk.apply_world_edits(&snapshot);
            match ctx.store.commit(coord, chunk) {
                Ok(outcome) => send(JobResult::Committed(outcome), applied, t_gen_ms),
                Err(e) => {
                    log::error!(target: "worker", "{e}");
                    if let Err(e) = ctx.store.abandon(coord) {
                        log::error!(target: "worker", "{e}");
                    }
                    send(JobResult::Failed(e.into()), applied, t_gen_ms);
                }
            }
        }
        Ok(Err(failure)) => {
            settle_failed_claim(&ctx.store, coord, &failure);
            send(JobResult::Failed(failure), 0, t_gen_ms);
        }
        Err(payload) => {
            let failure = BuildFailure::Transient(panic_message(payload));
            settle_failed_claim(&ctx.store, coord, &failure);
            send(JobResult::Failed(failure), 0, t_gen_ms);
        }
    }
}

/// Fixed pool of build workers fed by one job queue.
pub struct Runtime {
    job_tx: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    pub workers: usize,
}

impl Runtime {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        store: Arc<ChunkStore>,
        edits: Arc<RwLock<EditLog>>,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("loam-build-{i}"))
                .build()?,
        );
        let ctx = Arc::new(WorkerCtx {
            source,
            store,
            edits,
        });
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let ctx = ctx.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_build_job(job, ctx.as_ref(), &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
            workers,
        })
    }

    /// False when the workers are gone and the job was not queued.
    pub fn submit(&self, job: BuildJob) -> bool {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// Blocks for the next result. None only if every worker has exited.
    pub fn wait_result(&self) -> Option<JobOut> {
        self.res_rx.recv().ok()
    }

    /// (queued, in flight)
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_blocks::BlockKind;
    use loam_chunk::Chunk;

    struct Solid;

    impl ChunkSource for Solid {
        fn build_chunk(&self, coord: ChunkCoord) -> Result<Chunk, BuildFailure> {
            if coord.cx < 0 {
                panic!("negative column");
            }
            Ok(Chunk::from_blocks_local(coord, 2, 2, vec![BlockKind::Stone; 8]))
        }
    }

    fn runtime(store: &Arc<ChunkStore>, edits: &Arc<RwLock<EditLog>>) -> Runtime {
        Runtime::new(Arc::new(Solid), store.clone(), edits.clone(), 2).unwrap()
    }

    #[test]
    fn job_claims_builds_and_commits_with_logged_edits() {
        let store = Arc::new(ChunkStore::new());
        let edits = Arc::new(RwLock::new(EditLog::new(2)));
        edits.write().set(3, 1, 1, BlockKind::Leaves);
        let rt = runtime(&store, &edits);
        let c = ChunkCoord::new(1, 0);
        store.request(c);
        assert!(rt.submit(BuildJob { coord: c, attempt: 0, job_id: 1 }));
        let out = rt.wait_result().unwrap();
        assert!(matches!(out.result, JobResult::Committed(CommitOutcome::Installed)));
        assert_eq!(out.edits_applied, 1);
        assert_eq!(store.get(c).unwrap().get_local(1, 1, 1), BlockKind::Leaves);
    }

    #[test]
    fn queue_drains_once_results_are_in() {
        let store = Arc::new(ChunkStore::new());
        let edits = Arc::new(RwLock::new(EditLog::new(2)));
        let rt = runtime(&store, &edits);
        for i in 0..6 {
            let c = ChunkCoord::new(i, 0);
            store.request(c);
            assert!(rt.submit(BuildJob { coord: c, attempt: 0, job_id: i as u64 }));
        }
        for _ in 0..6 {
            rt.wait_result().unwrap();
        }
        let (queued, inflight) = rt.queue_counts();
        assert_eq!(queued, 0);
        assert!(inflight <= rt.workers);
        assert_eq!(store.ready_coords().len(), 6);
    }

    #[test]
    fn unrequested_job_is_cancelled() {
        let store = Arc::new(ChunkStore::new());
        let edits = Arc::new(RwLock::new(EditLog::new(2)));
        let rt = runtime(&store, &edits);
        rt.submit(BuildJob { coord: ChunkCoord::new(0, 0), attempt: 0, job_id: 7 });
        let out = rt.wait_result().unwrap();
        assert_eq!(out.job_id, 7);
        assert!(matches!(out.result, JobResult::Cancelled));
        assert!(store.is_empty());
    }

    #[test]
    fn panicking_build_is_transient_and_releases_the_slot() {
        let store = Arc::new(ChunkStore::new());
        let edits = Arc::new(RwLock::new(EditLog::new(2)));
        let rt = runtime(&store, &edits);
        let c = ChunkCoord::new(-1, 0);
        store.request(c);
        rt.submit(BuildJob { coord: c, attempt: 0, job_id: 1 });
        let out = rt.wait_result().unwrap();
        match out.result {
            JobResult::Failed(f) => assert!(f.is_transient(), "{f}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.state(c), Some(loam_chunk::ChunkState::Requested));
    }
}
