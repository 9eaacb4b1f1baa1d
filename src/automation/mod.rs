// src/automation/mod.rs
//
// One query loop, many page integrations: each integration says which
// headers its input needs, how to type a row into the portal and how to read
// what comes back.

pub mod purchase_order;
pub mod requisition;

pub use purchase_order::BlanketPurchaseOrder;
pub use requisition::RequisitionHistory;

use crate::config::Config;
use crate::driver::DriverError;
use crate::session::{Browser, LifecycleError, SessionError};
use crate::table::{RowRef, Table, TableError};
use crate::validate::Requirements;
use thiserror::Error;

/// Failure while querying one row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("unexpected page: {0}")]
    Page(String),
}

impl From<SessionError> for QueryError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Lifecycle(l) => QueryError::Lifecycle(l),
            SessionError::Driver(d) => QueryError::Driver(d),
        }
    }
}

impl QueryError {
    /// Fatal errors abort the whole run; everything else only fails the row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueryError::Lifecycle(_))
    }
}

pub trait QueryAutomation: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn requirements(&self) -> &Requirements;

    /// Page loaded before every row.
    fn query_url(&self) -> Option<&str> {
        None
    }

    /// Runs once after the session starts. An error aborts the run.
    fn prepare(&self, _browser: &mut Browser<'_>) -> Result<(), QueryError> {
        Ok(())
    }

    /// Fill in and submit the query form for `row`.
    fn submit_query(&self, browser: &mut Browser<'_>, row: RowRef<'_>) -> Result<(), QueryError>;

    /// Read the rendered result of the last submission.
    fn read_result(&self, browser: &mut Browser<'_>) -> Result<Table, QueryError>;

    /// Attach identifying columns from `row` to its result.
    fn annotate(&self, _row: RowRef<'_>, result: Table) -> Result<Table, QueryError> {
        Ok(result)
    }

    /// How a row is named in progress and error output.
    fn row_key(&self, row: RowRef<'_>) -> String {
        self.requirements()
            .headers()
            .iter()
            .filter_map(|h| row.get(h.as_str()).ok())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &[requisition::NAME, purchase_order::NAME];

pub fn by_name(name: &str, config: &Config) -> Option<Box<dyn QueryAutomation>> {
    match name {
        requisition::NAME => Some(Box::new(RequisitionHistory::new(&config.base_url))),
        purchase_order::NAME => Some(Box::new(BlanketPurchaseOrder::new(&config.base_url))),
        _ => None,
    }
}

/// Every known automation, keyed by the name [`by_name`] accepts.
pub fn catalog(config: &Config) -> Vec<(&'static str, Box<dyn QueryAutomation>)> {
    NAMES
        .iter()
        .filter_map(|&n| by_name(n, config).map(|a| (n, a)))
        .collect()
}
