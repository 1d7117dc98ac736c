use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use glob::glob;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use pcq_core::classification;
use pcq_projection::CoordinateProjector;
use pcq_source::{LasSource, PointSource as _};

use crate::artifact::{utc_timestamp, write_json_atomic, ErrorArtifact};
use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::index::IndexBuilder;
use crate::job::{JobDescriptor, JobKind};
use crate::profile::{ProfileExtractor, ProfileRequest};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Root directory holding one subdirectory per dataset.
    pub data_dir: PathBuf,
    /// Failed jobs move to `queue/dead/` after this many attempts.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent attempt.
    pub backoff_base: Duration,
    /// Optional PROJ data directory for grid files.
    pub proj_data_dir: Option<PathBuf>,
}

impl DispatcherConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            max_attempts: 5,
            backoff_base: Duration::from_secs(30),
            proj_data_dir: None,
        }
    }
}

/// Terminal result of one descriptor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Artifacts written, descriptor dequeued.
    Done,
    /// Error artifact written, descriptor kept for a later attempt.
    Retried,
    /// Error artifact written, descriptor moved to `queue/dead/`.
    DeadLettered,
    /// Still backing off from an earlier failure; not touched this scan.
    Deferred,
}

#[derive(Debug)]
struct RetryState {
    attempts: u32,
    not_before: Option<Instant>,
}

/// Polls dataset queues and routes descriptors to the index builder or the
/// profile extractor.
///
/// One dispatcher instance owns a dataset tree: there is no claim or lease
/// mechanism on the queue, so a second instance scanning the same tree would
/// double-process jobs.
pub struct JobDispatcher {
    config: DispatcherConfig,
    cancel: CancelToken,
    retries: HashMap<PathBuf, RetryState>,
}

impl JobDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            retries: HashMap::new(),
        }
    }

    /// Token shared with running jobs; cancelling aborts the current job at
    /// its next chunk boundary and stops the scan.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// One pass over every dataset queue, in sorted descriptor order.
    /// Returns the number of descriptors processed (deferred ones excluded).
    pub fn scan_once(&mut self) -> usize {
        let pattern = self.config.data_dir.join("*/queue/*.json");
        let entries = match glob(&pattern.to_string_lossy()) {
            Ok(entries) => entries,
            Err(e) => {
                error!("bad queue pattern {:?}: {}", pattern, e);
                return 0;
            }
        };

        let mut descriptors: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        descriptors.sort();

        let mut processed = 0;
        for descriptor in descriptors {
            if self.cancel.is_cancelled() {
                break;
            }
            if self.process(&descriptor) != JobOutcome::Deferred {
                processed += 1;
            }
        }

        // Drop retry state for descriptors that disappeared underneath us.
        self.retries.retain(|path, _| path.exists());

        processed
    }

    pub fn process(&mut self, descriptor_path: &Path) -> JobOutcome {
        if let Some(state) = self.retries.get(descriptor_path) {
            if let Some(not_before) = state.not_before {
                if Instant::now() < not_before {
                    return JobOutcome::Deferred;
                }
            }
        }

        let Some(dataset_dir) = dataset_dir_of(descriptor_path) else {
            error!("descriptor outside a queue directory: {:?}", descriptor_path);
            return JobOutcome::Deferred;
        };
        let dataset_dir = dataset_dir.to_path_buf();

        let raw = match fs::read_to_string(descriptor_path) {
            Ok(raw) => raw,
            Err(e) => {
                // Probably dequeued or still being written; next scan decides.
                warn!("cannot read descriptor {:?}: {}", descriptor_path, e);
                return JobOutcome::Deferred;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                let err = EngineError::Input(format!("undecodable job descriptor: {e}"));
                return self.handle_failure(descriptor_path, &dataset_dir, Value::Null, err);
            }
        };

        let job: JobDescriptor = match serde_json::from_value(value.clone()) {
            Ok(job) => job,
            Err(e) => {
                let err = EngineError::Input(format!("malformed job descriptor: {e}"));
                return self.handle_failure(descriptor_path, &dataset_dir, value, err);
            }
        };

        info!("processing {:?} job {} for {:?}", job.kind, job.id, dataset_dir);
        match self.execute(&dataset_dir, &job) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(descriptor_path) {
                    warn!("finished job {} but cannot dequeue it: {}", job.id, e);
                }
                self.retries.remove(descriptor_path);
                info!("job {} finished", job.id);
                JobOutcome::Done
            }
            Err(err) => self.handle_failure(descriptor_path, &dataset_dir, value, err),
        }
    }

    fn execute(&self, dataset_dir: &Path, job: &JobDescriptor) -> Result<(), EngineError> {
        match job.kind {
            JobKind::Index => self.run_index(dataset_dir, job),
            JobKind::Profile => self.run_profile(dataset_dir, job),
            JobKind::Unknown => Err(EngineError::Input("unsupported job type".to_string())),
        }
    }

    fn open_source(&self, job: &JobDescriptor) -> Result<(LasSource, CoordinateProjector), EngineError> {
        let source = LasSource::open(&job.input_file)?;
        let (projector, warning) = CoordinateProjector::from_wkt(
            source.metadata().crs_wkt.as_deref(),
            self.config.proj_data_dir.as_deref(),
        );
        if let Some(warning) = warning {
            warn!("job {}: {}", job.id, warning);
        }
        Ok((source, projector))
    }

    fn run_index(&self, dataset_dir: &Path, job: &JobDescriptor) -> Result<(), EngineError> {
        let (mut source, mut projector) = self.open_source(job)?;
        let artifact =
            IndexBuilder::new(self.cancel.clone()).build(&mut source, &mut projector, &job.id)?;

        write_json_atomic(&dataset_dir.join("index.json"), &artifact)?;
        write_json_atomic(
            &dataset_dir.join("products").join("classes.json"),
            &classification::legend(),
        )?;
        Ok(())
    }

    fn run_profile(&self, dataset_dir: &Path, job: &JobDescriptor) -> Result<(), EngineError> {
        let request = ProfileRequest::from_job(job)?;
        let (mut source, mut projector) = self.open_source(job)?;
        let output = ProfileExtractor::new(self.cancel.clone()).run(
            &mut source,
            &mut projector,
            &request,
            &job.id,
            StdRng::from_entropy(),
        )?;

        let products = dataset_dir.join("products");
        write_json_atomic(&products.join("plan_points.geojson"), &output.plan)?;
        write_json_atomic(&products.join("profile.json"), &output.artifact)?;
        Ok(())
    }

    fn handle_failure(
        &mut self,
        descriptor_path: &Path,
        dataset_dir: &Path,
        job_value: Value,
        err: EngineError,
    ) -> JobOutcome {
        let artifact = ErrorArtifact {
            error: err.to_string(),
            failed_at: utc_timestamp(),
            job: job_value,
        };
        if let Err(e) = write_json_atomic(
            &dataset_dir.join("products").join("last_error.json"),
            &artifact,
        ) {
            error!("cannot write error artifact for {:?}: {}", descriptor_path, e);
        }

        let state = self
            .retries
            .entry(descriptor_path.to_path_buf())
            .or_insert(RetryState {
                attempts: 0,
                not_before: None,
            });
        state.attempts += 1;

        if err.is_terminal() || state.attempts >= self.config.max_attempts {
            let attempts = state.attempts;
            self.retries.remove(descriptor_path);
            match dead_letter(descriptor_path) {
                Ok(()) => error!(
                    "job {:?} dead-lettered after {} attempt(s): {}",
                    descriptor_path, attempts, err
                ),
                Err(e) => error!(
                    "job {:?} failed terminally ({}) but cannot be dead-lettered: {}",
                    descriptor_path, err, e
                ),
            }
            JobOutcome::DeadLettered
        } else {
            let exponent = (state.attempts - 1).min(6);
            let backoff = self.config.backoff_base * 2u32.pow(exponent);
            state.not_before = Some(Instant::now() + backoff);
            warn!(
                "job {:?} failed (attempt {}/{}), retrying in {:?}: {}",
                descriptor_path, state.attempts, self.config.max_attempts, backoff, err
            );
            JobOutcome::Retried
        }
    }
}

fn dataset_dir_of(descriptor_path: &Path) -> Option<&Path> {
    descriptor_path.parent()?.parent()
}

fn dead_letter(descriptor_path: &Path) -> std::io::Result<()> {
    let queue_dir = descriptor_path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no queue dir"))?;
    let file_name = descriptor_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no file name"))?;
    let dead_dir = queue_dir.join("dead");
    fs::create_dir_all(&dead_dir)?;
    fs::rename(descriptor_path, dead_dir.join(file_name))
}
