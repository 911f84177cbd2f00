use std::sync::Arc;

use loam_blocks::BlockKind;
use loam_chunk::{Chunk, ChunkBuilder, ChunkError, ChunkState};
use loam_edit::{EditLog, EditLogStats};
use loam_world::{ChunkCoord, WorldConfig, WorldError};
use parking_lot::RwLock;

use crate::{
    BuildJob, ChunkSource, ChunkStore, CommitOutcome, EditOutcome, EvictOutcome, JobOut,
    JobResult, RequestOutcome, Runtime, StoreError, StreamError,
};

/// The movement side of the world: polled once per tick.
pub trait Observer {
    fn observer_world_position(&self) -> [f64; 3];
}

impl Observer for [f64; 3] {
    #[inline]
    fn observer_world_position(&self) -> [f64; 3] {
        *self
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub requested: u64,
    pub built: u64,
    pub evicted: u64,
    pub deferred_evictions: u64,
    pub cancelled: u64,
    pub retried: u64,
    pub failed: u64,
    pub edits: u64,
}

/// What one evaluation (or flush) changed.
#[derive(Debug, Default)]
pub struct TickReport {
    pub center: Option<ChunkCoord>,
    /// False on the cheap path: the observer stayed in the same chunk.
    pub moved: bool,
    pub requested: Vec<ChunkCoord>,
    pub committed: Vec<ChunkCoord>,
    pub evicted: Vec<ChunkCoord>,
    pub deferred: Vec<ChunkCoord>,
    pub retried: Vec<ChunkCoord>,
    pub cancelled: usize,
    pub failures: Vec<StreamError>,
}

pub struct StreamingManager {
    config: WorldConfig,
    store: Arc<ChunkStore>,
    edits: Arc<RwLock<EditLog>>,
    runtime: Runtime,
    last_center: Option<ChunkCoord>,
    outstanding: usize,
    next_job_id: u64,
    stats: StreamStats,
}

impl StreamingManager {
    pub fn new(config: WorldConfig) -> Result<Self, StreamError> {
        let builder = ChunkBuilder::new(&config)?;
        Self::with_source(config, Arc::new(builder))
    }

    pub fn with_source(
        config: WorldConfig,
        source: Arc<dyn ChunkSource>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let store = Arc::new(ChunkStore::new());
        let edits = Arc::new(RwLock::new(EditLog::new(config.chunk_size)));
        let runtime = Runtime::new(source, store.clone(), edits.clone(), config.workers)?;
        log::info!(
            target: "stream",
            "streaming seed={} chunk={} height={} view={} workers={}",
            config.seed,
            config.chunk_size,
            config.max_height,
            config.view_distance,
            runtime.workers
        );
        Ok(Self {
            config,
            store,
            edits,
            runtime,
            last_center: None,
            outstanding: 0,
            next_job_id: 0,
            stats: StreamStats::default(),
        })
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    #[inline]
    pub fn center(&self) -> Option<ChunkCoord> {
        self.last_center
    }

    #[inline]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn edit_stats(&self) -> EditLogStats {
        self.edits.read().stats()
    }

    /// Builds submitted but not yet reported back.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Read-only snapshot of a ready chunk.
    #[inline]
    pub fn read_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.store.get(coord)
    }

    pub fn tick(&mut self, observer: &dyn Observer) -> TickReport {
        self.evaluate(observer.observer_world_position())
    }

    /// Collects finished builds, then reconciles the loaded set with the
    /// observer's chunk. Never waits on a build.
    pub fn evaluate(&mut self, pos: [f64; 3]) -> TickReport {
        let mut report = TickReport {
            center: self.last_center,
            ..TickReport::default()
        };
        for out in self.runtime.drain_worker_results() {
            self.handle_result(out, &mut report);
        }

        let center = match ChunkCoord::from_world_pos(pos[0], pos[2], self.config.chunk_size) {
            Ok(c) => c,
            Err(e) => {
                log::warn!(target: "stream", "observer ignored: {e}");
                report.failures.push(e.into());
                return report;
            }
        };
        report.center = Some(center);
        if self.last_center == Some(center) {
            return report;
        }
        let (queued, inflight) = self.runtime.queue_counts();
        log::debug!(
            target: "stream",
            "observer entered chunk {center} (queued {queued}, in flight {inflight})"
        );
        report.moved = true;
        self.last_center = Some(center);
        self.request_around(center, &mut report);
        self.evict_outside(center, &mut report);
        report
    }

    /// Waits until every submitted build, retries included, has reported.
    pub fn flush(&mut self) -> TickReport {
        let mut report = TickReport {
            center: self.last_center,
            ..TickReport::default()
        };
        while self.outstanding > 0 {
            match self.runtime.wait_result() {
                Some(out) => self.handle_result(out, &mut report),
                None => {
                    log::error!(
                        target: "worker",
                        "worker pool exited with {} builds outstanding",
                        self.outstanding
                    );
                    self.outstanding = 0;
                }
            }
        }
        report
    }

    fn submit(&mut self, coord: ChunkCoord, attempt: u32) {
        self.next_job_id += 1;
        let job = BuildJob {
            coord,
            attempt,
            job_id: self.next_job_id,
        };
        if self.runtime.submit(job) {
            self.outstanding += 1;
        } else {
            log::error!(target: "worker", "worker pool is gone; dropping request for {coord}");
            self.store.evict(coord);
        }
    }

    fn request_around(&mut self, center: ChunkCoord, report: &mut TickReport) {
        let v = self.config.view_distance as i32;
        let mut wanted = Vec::with_capacity(((2 * v + 1) * (2 * v + 1)) as usize);
        let mut unreachable = 0usize;
        for dz in -v..=v {
            for dx in -v..=v {
                match center.checked_offset(dx, dz) {
                    Some(c) => wanted.push(c),
                    None => unreachable += 1,
                }
            }
        }
        if unreachable > 0 {
            let e = WorldError::OutOfRange(format!(
                "{unreachable} chunk(s) around {center} are not addressable"
            ));
            log::warn!(target: "stream", "{e}");
            report.failures.push(e.into());
        }
        // Nearest first, so the observer's own chunk is built before the rim.
        wanted.sort_by_key(|c| (center.chebyshev(*c), c.cz, c.cx));
        for coord in wanted {
            match self.store.request(coord) {
                RequestOutcome::Inserted => {
                    self.stats.requested += 1;
                    report.requested.push(coord);
                    self.submit(coord, 0);
                }
                RequestOutcome::Reinstated => {
                    log::debug!(target: "stream", "chunk {coord} wanted again while generating");
                }
                RequestOutcome::AlreadyPresent => {}
            }
        }
    }

    fn evict_outside(&mut self, center: ChunkCoord, report: &mut TickReport) {
        let keep = u64::from(self.config.retention_radius());
        let mut far: Vec<ChunkCoord> = self
            .store
            .coords()
            .into_iter()
            .filter(|c| center.chebyshev(*c) > keep)
            .collect();
        far.sort();
        for coord in far {
            match self.store.evict(coord) {
                EvictOutcome::Evicted => {
                    self.stats.evicted += 1;
                    report.evicted.push(coord);
                    log::info!(target: "stream", "evicted chunk {coord}");
                }
                EvictOutcome::Cancelled => {
                    self.stats.cancelled += 1;
                    report.cancelled += 1;
                }
                EvictOutcome::Deferred => {
                    self.stats.deferred_evictions += 1;
                    report.deferred.push(coord);
                    log::debug!(
                        target: "stream",
                        "eviction of {coord} deferred until its build commits"
                    );
                }
                EvictOutcome::NotPresent => {}
            }
        }
    }

    fn handle_result(&mut self, out: JobOut, report: &mut TickReport) {
        self.outstanding = self.outstanding.saturating_sub(1);
        let JobOut {
            coord,
            attempt,
            result,
            t_gen_ms,
            t_total_ms,
            ..
        } = out;
        match result {
            JobResult::Committed(CommitOutcome::Installed) => {
                self.stats.built += 1;
                report.committed.push(coord);
                log::info!(
                    target: "stream",
                    "loaded chunk {coord} (gen {t_gen_ms}ms, total {t_total_ms}ms)"
                );
            }
            JobResult::Committed(CommitOutcome::EvictedOnCommit) => {
                self.stats.built += 1;
                self.stats.evicted += 1;
                report.evicted.push(coord);
                log::info!(target: "stream", "evicted chunk {coord} as its build landed");
            }
            JobResult::Cancelled => {
                log::trace!(target: "worker", "job for {coord} cancelled before start");
            }
            JobResult::Failed(failure)
                if failure.is_transient() && attempt < self.config.max_build_retries =>
            {
                if self.store.state(coord) == Some(ChunkState::Requested) {
                    log::warn!(
                        target: "worker",
                        "retrying chunk {coord} (attempt {}): {failure}",
                        attempt + 2
                    );
                    self.stats.retried += 1;
                    report.retried.push(coord);
                    self.submit(coord, attempt + 1);
                }
            }
            JobResult::Failed(failure) => {
                if failure.is_transient() {
                    // Leave nothing behind for a coordinate we gave up on.
                    self.store.evict(coord);
                }
                self.stats.failed += 1;
                log::warn!(target: "stream", "chunk {coord} failed: {failure}");
                report.failures.push(StreamError::BuildFailed {
                    coord,
                    attempts: attempt + 1,
                    source: failure,
                });
            }
        }
    }

    pub fn break_block(&mut self, wx: i32, wy: i32, wz: i32) -> Result<EditOutcome, StoreError> {
        self.place_block(wx, wy, wz, BlockKind::Air)
    }

    /// Sets the block at a world position. The edit is logged first, so it
    /// survives the chunk being evicted and rebuilt.
    pub fn place_block(
        &mut self,
        wx: i32,
        wy: i32,
        wz: i32,
        kind: BlockKind,
    ) -> Result<EditOutcome, StoreError> {
        let size = self.config.chunk_size;
        let coord = ChunkCoord::from_block(wx, wz, size);
        let x = (wx as i64 - coord.cx as i64 * size as i64) as usize;
        let z = (wz as i64 - coord.cz as i64 * size as i64) as usize;
        if wy < 0 || wy as u32 >= self.config.max_height {
            return Err(ChunkError::OutOfBounds {
                coord,
                x: x as i64,
                y: wy as i64,
                z: z as i64,
            }
            .into());
        }
        self.edits.write().set(wx, wy, wz, kind);
        self.stats.edits += 1;
        match self.store.edit(coord, x, wy as usize, z, kind) {
            Err(StoreError::NotReady { .. }) => Ok(EditOutcome::Logged),
            other => other,
        }
    }
}
