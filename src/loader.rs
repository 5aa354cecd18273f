use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;

use crate::env::TargetEnv;
use crate::error::Error;
use crate::model::{CleanLine, Entry, LoadReport, StatusMessage, WorkerId};
use crate::parser::{filter_lines, parse_str, retain_last_assignments};
use crate::partition::{parallelism_hint, partition};
use crate::worker::{ChunkOutcome, apply_chunk};

const DEFAULT_FILE: &str = ".env";

/// Load `path` into the process environment.
///
/// Never fails: an unreadable file is logged and, in verbose mode, printed
/// together with the other diagnostics. Returns only after every worker has
/// finished, so all assignments are visible once this returns.
///
/// # Safety
///
/// No other thread may read or write the process environment while this
/// runs. See [`TargetEnv::process`].
pub unsafe fn load_env(path: impl AsRef<Path>, verbose: bool) {
    let loader = EnvLoader::new()
        .path(path)
        .verbose(verbose)
        .target(unsafe { TargetEnv::process() });
    if let Err(err) = loader.load() {
        log::warn!("parenv: {err}");
    }
}

/// Builder-style parallel env loader.
#[derive(Debug)]
pub struct EnvLoader {
    path: PathBuf,
    verbose: bool,
    override_existing: bool,
    parallelism: Option<usize>,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Print per-worker diagnostics and the completion time to stdout.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    /// Upper bound on worker threads. Defaults to [`parallelism_hint`].
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Parse the file without touching the target.
    pub fn parse_only(&self) -> Result<Vec<Entry>, Error> {
        let content = read_file(&self.path)?;
        Ok(parse_str(&content))
    }

    /// Run the partition-and-apply pipeline.
    ///
    /// Returns after every worker has joined. The message channel is closed
    /// only after that barrier and drained afterwards, so the report holds
    /// every message that was sent.
    pub fn load(&self) -> Result<LoadReport, Error> {
        let started = Instant::now();

        let content = match read_file(&self.path) {
            Ok(content) => content,
            Err(err) => {
                if self.verbose {
                    println!("{err}");
                }
                return Err(err);
            }
        };
        let lines = retain_last_assignments(filter_lines(&content));

        if lines.is_empty() {
            log::debug!("no clean lines in {}", self.path.display());
            let report = LoadReport {
                elapsed: started.elapsed(),
                messages: vec![StatusMessage::NoEntries],
                ..LoadReport::default()
            };
            if self.verbose {
                println!("{}", StatusMessage::NoEntries);
            }
            return Ok(report);
        }

        let mut report = self.dispatch(&lines);
        report.elapsed = started.elapsed();

        if self.verbose {
            print_report(&report);
        }
        Ok(report)
    }

    fn dispatch(&self, lines: &[CleanLine]) -> LoadReport {
        let parallelism = self.parallelism.unwrap_or_else(parallelism_hint);
        let chunks = partition(lines.len(), parallelism);
        log::debug!(
            "dispatching {} lines to {} workers (parallelism {parallelism})",
            lines.len(),
            chunks.len()
        );

        // Room for one failure per line plus one completion per worker, so
        // no sender ever blocks before the drain.
        let (sender, receiver) = bounded(lines.len() + chunks.len());
        let target = &self.target;
        let override_existing = self.override_existing;

        let joined: Vec<(WorkerId, thread::Result<ChunkOutcome>)> = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .enumerate()
                .map(|(idx, chunk)| {
                    let worker = WorkerId::new(idx + 1);
                    let chunk_lines = &lines[chunk.range()];
                    let sender = sender.clone();
                    log::trace!("{worker}: lines [{}, {})", chunk.start, chunk.end);
                    let handle = scope.spawn(move || {
                        apply_chunk(worker, chunk_lines, target, override_existing, &sender)
                    });
                    (worker, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(worker, handle)| (worker, handle.join()))
                .collect()
        });

        let mut report = LoadReport {
            lines: lines.len(),
            workers: chunks.len(),
            ..LoadReport::default()
        };
        let mut panicked = Vec::new();
        for (worker, result) in joined {
            match result {
                Ok(outcome) => {
                    report.loaded += outcome.loaded;
                    report.failed += outcome.failed;
                    report.skipped_existing += outcome.skipped_existing;
                }
                Err(_) => {
                    log::warn!("{worker} panicked");
                    panicked.push(StatusMessage::WorkerPanicked { worker });
                }
            }
        }

        // Every worker clone is gone; dropping ours closes the channel.
        drop(sender);
        report.messages = receiver.iter().collect();
        report.messages.extend(panicked);
        report
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE),
            verbose: false,
            override_existing: true,
            parallelism: None,
            target: TargetEnv::memory(),
        }
    }
}

fn read_file(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let content = std::str::from_utf8(&bytes)?;
    Ok(content.to_owned())
}

fn print_report(report: &LoadReport) {
    for message in &report.messages {
        println!("{message}");
    }
    println!("Completion time: {:.6} seconds", report.elapsed.as_secs_f64());
}
