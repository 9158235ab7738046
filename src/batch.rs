//! Batch orchestration
//!
//! Fans the marker builder out over an ID set on a fixed pool of scoped
//! worker threads. Workers pull IDs from a shared job channel and send each
//! outcome back on a result channel; the calling thread is the only reader
//! of that channel, so it alone drives the progress bar and console output.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;

use crate::builder::{MarkerArtifact, MarkerBuilder, TaskError};
use crate::config::{MarkerSpec, OutputLayout};
use crate::ids::{MarkerId, MarkerIdSet};
use crate::progress::ProgressBar;
use crate::render::MarkerRenderer;
use crate::settings::DEFAULT_WORKERS;
use crate::template::TemplateBundle;
use crate::GenerateError;

pub const BANNER: &str = "Creating ALVAR marker SDF models";
pub const COMPLETED: &str = "SDF models creation completed";

/// How a batch is run and reported
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Size of the worker pool; 1 builds markers one after another
    pub workers: usize,
    /// Print a line per marker instead of the progress bar
    pub verbose: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            verbose: false,
        }
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count, at least one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Outcome of a finished batch, sorted by marker ID
#[derive(Debug)]
pub struct BatchReport {
    pub artifacts: Vec<MarkerArtifact>,
    pub failures: Vec<TaskError>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The artifacts, or every task failure when any marker failed
    pub fn into_result(self) -> Result<Vec<MarkerArtifact>, GenerateError> {
        if self.failures.is_empty() {
            Ok(self.artifacts)
        } else {
            Err(GenerateError::TaskFailures(self.failures))
        }
    }
}

/// Runs marker builds for whole ID sets
pub struct BatchGenerator<'a> {
    spec: &'a MarkerSpec,
    layout: &'a OutputLayout,
    templates: &'a TemplateBundle,
    renderer: &'a dyn MarkerRenderer,
    options: BatchOptions,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(
        spec: &'a MarkerSpec,
        layout: &'a OutputLayout,
        templates: &'a TemplateBundle,
        renderer: &'a dyn MarkerRenderer,
    ) -> Self {
        Self {
            spec,
            layout,
            templates,
            renderer,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Build every marker in `ids`, writing progress to `out`
    ///
    /// Returns once every task has finished. Failed markers are collected in
    /// the report and never stop the others.
    pub fn run(&self, ids: &MarkerIdSet, out: &mut dyn Write) -> Result<BatchReport, GenerateError> {
        let mut progress = ProgressBar::new(ids.len()).ok_or(GenerateError::BatchEmpty)?;
        let builder = MarkerBuilder::new(
            self.spec,
            self.layout,
            self.templates,
            self.renderer,
            ids.padding_width(),
        );
        let workers = self.options.workers.clamp(1, ids.len());
        log::info!(
            "building {} markers with {} workers into {}",
            ids.len(),
            workers,
            self.layout.base_dir().display()
        );

        let start = Instant::now();
        writeln!(out, "{}", BANNER)?;
        if !self.options.verbose {
            progress.display(out)?;
        }

        let (job_tx, job_rx) = unbounded::<MarkerId>();
        let (done_tx, done_rx) = unbounded::<Result<MarkerArtifact, TaskError>>();
        for id in ids.iter() {
            if job_tx.send(id).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut artifacts = Vec::with_capacity(ids.len());
        let mut failures = Vec::new();

        thread::scope(|scope| -> io::Result<()> {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let done = done_tx.clone();
                let builder = &builder;
                scope.spawn(move || {
                    for id in jobs.iter() {
                        if done.send(builder.build(id)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            for outcome in done_rx.iter() {
                match outcome {
                    Ok(artifact) => {
                        log::info!("marker {} written to {}", artifact.id, artifact.directory.display());
                        if self.options.verbose {
                            writeln!(out, "Created marker model with ID: {}", artifact.id)?;
                        }
                        artifacts.push(artifact);
                    }
                    Err(err) => {
                        log::error!("{}", err);
                        if self.options.verbose {
                            writeln!(out, "{}", failure_line(&err))?;
                        }
                        failures.push(err);
                    }
                }
                if !self.options.verbose {
                    progress.increment();
                    progress.display(out)?;
                }
            }
            Ok(())
        })?;

        if !self.options.verbose {
            progress.reset(out)?;
            for err in &failures {
                writeln!(out, "{}", failure_line(err))?;
            }
        }

        let elapsed = start.elapsed();
        writeln!(out, "Models created in: {:.3} s", elapsed.as_secs_f64())?;
        writeln!(out, "{}", COMPLETED)?;
        log::info!(
            "batch finished in {:?}: {} written, {} failed",
            elapsed,
            artifacts.len(),
            failures.len()
        );

        artifacts.sort_by_key(|a| a.id);
        failures.sort_by_key(|e| e.id);
        Ok(BatchReport {
            artifacts,
            failures,
            elapsed,
        })
    }
}

fn failure_line(err: &TaskError) -> String {
    format!("Failed to create marker model with ID: {}: {}", err.id, err.kind)
}
