// src/run/mod.rs
//
// The query loop: validate and reshape the input, start the session, query
// every row, gather results and per-row failures, and always tear the
// session down before returning.

pub mod sink;

pub use sink::{LogSink, MemorySink, NullSink, TracingSink};

use crate::automation::{QueryAutomation, QueryError};
use crate::driver::{Driver, WaitPolicy};
use crate::reformat::{reformat, ReformatError};
use crate::session::{Browser, LifecycleError, Session};
use crate::table::{RowRef, Table, TableError};
use crate::validate::ValidationError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Errors that end a run. The session is torn down before any of them is
/// returned.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("input rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("input could not be reformatted: {0}")]
    Reformat(#[from] ReformatError),

    #[error("input could not be read: {0}")]
    Input(TableError),

    /// Carries the rows gathered before the abort.
    #[error("result table changed shape mid-run: {source}")]
    HeaderMismatch {
        #[source]
        source: TableError,
        partial: Box<RunReport>,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("setup failed: {0}")]
    Setup(QueryError),

    /// A fatal row error; `partial` lists that row among its failures.
    #[error("row {key}: {source}")]
    Query {
        key: String,
        #[source]
        source: QueryError,
        partial: Box<RunReport>,
    },
}

impl RunError {
    /// Results gathered before a mid-run abort. `None` when the run stopped
    /// before its first row.
    pub fn partial(&self) -> Option<&RunReport> {
        match self {
            RunError::HeaderMismatch { partial, .. } | RunError::Query { partial, .. } => {
                Some(&**partial)
            }
            _ => None,
        }
    }
}

/// A row that could not be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub automation: String,
    pub output: Table,
    pub failures: Vec<RowFailure>,
    pub rows_attempted: usize,
    pub cancelled: bool,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

/// Serializable overview of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub automation: &'a str,
    pub rows_attempted: usize,
    pub rows_output: usize,
    pub failures: &'a [RowFailure],
    pub cancelled: bool,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            automation: &self.automation,
            rows_attempted: self.rows_attempted,
            rows_output: self.output.len(),
            failures: &self.failures,
            cancelled: self.cancelled,
            started: self.started,
            finished: self.finished,
        }
    }
}

/// Cooperative stop request, checked between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one automation against a driver, one session at a time.
pub struct Orchestrator {
    automation: Box<dyn QueryAutomation>,
    session: Mutex<Session>,
    output: Arc<dyn LogSink>,
    errors: Arc<dyn LogSink>,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(automation: Box<dyn QueryAutomation>, policy: WaitPolicy) -> Self {
        Self {
            automation,
            session: Mutex::new(Session::new(policy)),
            output: Arc::new(TracingSink::output()),
            errors: Arc::new(TracingSink::errors()),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_output_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.output = sink;
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.errors = sink;
        self
    }

    pub fn automation(&self) -> &dyn QueryAutomation {
        self.automation.as_ref()
    }

    /// Token that stops the current run before its next row. Each run clears
    /// it when it starts.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        match self.session.try_lock() {
            Ok(s) => s.is_running(),
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(p)) => p.into_inner().is_running(),
        }
    }

    /// Run the whole loop over `input` on `driver`.
    ///
    /// The driver is quit exactly once whatever happens: after the last row,
    /// on a fatal error, or while a panic unwinds.
    #[instrument(level = "info", skip_all, fields(automation = %self.automation.name()))]
    pub fn run(&self, input: &str, driver: Box<dyn Driver>) -> Result<RunReport, RunError> {
        let mut session = match self.session.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("rejected run: another run holds the session");
                let mut driver = driver;
                if let Err(e) = driver.quit() {
                    warn!(error = %e, "quitting rejected driver failed");
                }
                return Err(LifecycleError::AlreadyRunning.into());
            }
        };

        // a previous run already reported its failure
        session.reset();
        self.cancel.clear();
        session.start(driver)?;
        self.output
            .append(&format!("Running {}", self.automation.name()));

        let started = Utc::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drive(&mut session, input, started)));

        match outcome {
            Ok(Ok(report)) => {
                session.finish()?;
                info!(
                    attempted = report.rows_attempted,
                    output = report.output.len(),
                    failed = report.failures.len(),
                    cancelled = report.cancelled,
                    "run complete"
                );
                self.output.append(&format!(
                    "Done: {} rows attempted, {} failed",
                    report.rows_attempted,
                    report.failures.len()
                ));
                Ok(report)
            }
            Ok(Err(e)) => {
                let _ = session.fail();
                error!(error = %e, "run aborted");
                self.errors.append(&format!("Run aborted: {}", e));
                Err(e)
            }
            Err(payload) => {
                let _ = session.fail();
                error!("run panicked; session torn down");
                drop(session);
                panic::resume_unwind(payload)
            }
        }
    }

    /// [`Orchestrator::run`] on tokio's blocking pool.
    pub fn spawn(
        self: Arc<Self>,
        input: String,
        driver: Box<dyn Driver>,
    ) -> JoinHandle<Result<RunReport, RunError>> {
        tokio::task::spawn_blocking(move || self.run(&input, driver))
    }

    fn drive(
        &self,
        session: &mut Session,
        input: &str,
        started: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        let auto = self.automation.as_ref();
        let requirements = auto.requirements();

        requirements.validate_text(input)?;
        let reshaped = reformat(input, &requirements.header_names(), true)?;
        let rows = Table::parse(&reshaped).map_err(RunError::Input)?;
        info!(rows = rows.len(), "input accepted");

        let mut browser = session.browser();
        auto.prepare(&mut browser).map_err(RunError::Setup)?;

        let mut progress = Progress::default();
        for row in rows.rows() {
            if self.cancel.is_cancelled() {
                progress.cancelled = true;
                self.output.append("Cancelled; skipping remaining rows");
                break;
            }
            let key = auto.row_key(row);
            progress.attempted += 1;
            self.output.append(&format!("Querying {}", key));

            match self.query_row(&mut browser, row) {
                Ok(result) => {
                    debug!(%key, rows = result.len(), "row done");
                    let appended = match progress.output.as_mut() {
                        Some(acc) => acc.append(&result),
                        None => {
                            progress.output = Some(result);
                            Ok(())
                        }
                    };
                    if let Err(source) = appended {
                        return Err(RunError::HeaderMismatch {
                            source,
                            partial: Box::new(progress.into_report(auto.name(), started)),
                        });
                    }
                }
                Err(e) if e.is_fatal() => {
                    progress.failures.push(RowFailure {
                        key: key.clone(),
                        error: e.to_string(),
                    });
                    return Err(RunError::Query {
                        key,
                        source: e,
                        partial: Box::new(progress.into_report(auto.name(), started)),
                    });
                }
                Err(e) => {
                    warn!(%key, error = %e, "row failed");
                    self.errors.append(&format!("{}: {}", key, e));
                    progress.failures.push(RowFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(progress.into_report(auto.name(), started))
    }

    fn query_row(&self, browser: &mut Browser<'_>, row: RowRef<'_>) -> Result<Table, QueryError> {
        let auto = self.automation.as_ref();
        if let Some(url) = auto.query_url() {
            browser.navigate(url)?;
        }
        auto.submit_query(browser, row)?;
        let result = auto.read_result(browser)?;
        auto.annotate(row, result)
    }
}

/// What a run has gathered so far.
#[derive(Default)]
struct Progress {
    output: Option<Table>,
    failures: Vec<RowFailure>,
    attempted: usize,
    cancelled: bool,
}

impl Progress {
    fn into_report(self, automation: &str, started: DateTime<Utc>) -> RunReport {
        RunReport {
            automation: automation.to_string(),
            output: self.output.unwrap_or_default(),
            failures: self.failures,
            rows_attempted: self.attempted,
            cancelled: self.cancelled,
            started,
            finished: Utc::now(),
        }
    }
}
