//! Read-only queries for what is already installed.
//!
//! A probe never installs anything. Its outcome is a [`ProbeResult`] and
//! each adapter states, through a [`ProbePolicy`], whether a missing tool or
//! a failed query means "nothing installed yet" or aborts the step.
pub mod parse;
pub mod repos;

use anyhow::Result;

use crate::error::EngineError;
use crate::exec::Executor;
use crate::inventory::{self, IdentifierSet};

/// Outcome of querying an external authority.
#[derive(Debug)]
pub enum ProbeResult<T> {
    /// The query ran and produced a value.
    Present(T),
    /// The queried tool is not installed.
    Absent {
        /// Program that could not be found.
        program: String,
    },
    /// The tool ran but the query failed.
    Failed(anyhow::Error),
}

/// What an adapter does with a probe that did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePolicy {
    /// `Absent` and `Failed` abort the step.
    Strict,
    /// `Absent` and `Failed` are treated as an empty existing set.
    DegradeToEmpty,
}

impl<T> ProbeResult<T> {
    /// Classify a fallible query. A [`EngineError::MissingExecutable`] root
    /// cause becomes `Absent`; any other error becomes `Failed`.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Present(value),
            Err(err) => match err.downcast_ref::<EngineError>() {
                Some(EngineError::MissingExecutable { program }) => Self::Absent {
                    program: program.clone(),
                },
                _ => Self::Failed(err),
            },
        }
    }

    /// Transform the value of a `Present` result.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProbeResult<U> {
        match self {
            Self::Present(value) => ProbeResult::Present(f(value)),
            Self::Absent { program } => ProbeResult::Absent { program },
            Self::Failed(err) => ProbeResult::Failed(err),
        }
    }

    /// Whether the query produced a value.
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Collapse into a value according to `policy`.
    ///
    /// # Errors
    ///
    /// Under [`ProbePolicy::Strict`], returns `MissingExecutable` for
    /// `Absent` and the original error for `Failed`.
    pub fn resolve(self, policy: ProbePolicy) -> Result<T>
    where
        T: Default,
    {
        match (self, policy) {
            (Self::Present(value), _) => Ok(value),
            (Self::Absent { program }, ProbePolicy::Strict) => {
                Err(EngineError::MissingExecutable { program }.into())
            }
            (Self::Failed(err), ProbePolicy::Strict) => Err(err),
            (Self::Absent { program }, ProbePolicy::DegradeToEmpty) => {
                tracing::debug!("probe: {program} not installed, assuming nothing present");
                Ok(T::default())
            }
            (Self::Failed(err), ProbePolicy::DegradeToEmpty) => {
                tracing::debug!("probe failed, assuming nothing present: {err:#}");
                Ok(T::default())
            }
        }
    }
}

/// Run a query command and return its stdout lines.
pub fn probe_lines(
    executor: &dyn Executor,
    program: &str,
    args: &[&str],
) -> ProbeResult<IdentifierSet> {
    ProbeResult::from_result(inventory::read_set_from_command(executor, program, args))
}

/// Run a query command and return its raw stdout.
pub fn probe_output(executor: &dyn Executor, program: &str, args: &[&str]) -> ProbeResult<String> {
    ProbeResult::from_result(executor.run(program, args).map(|r| r.stdout))
}
