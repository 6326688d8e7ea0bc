//! The desired → existing → delta → install protocol shared by every
//! set-based step.
use anyhow::Result;

use super::{Context, TaskResult, TaskStats};
use crate::delta;
use crate::inventory::IdentifierSet;
use crate::logging::DeltaCounts;

/// One resource category that converges by set difference.
pub trait Converge {
    /// Singular noun used in log lines ("package", "font", ...).
    fn category(&self) -> &str;

    /// Identifiers that should be present.
    ///
    /// # Errors
    ///
    /// Returns an error if the desired list cannot be read.
    fn desired(&self, ctx: &Context) -> Result<IdentifierSet>;

    /// Identifiers already present. Implementations choose their
    /// [`ProbePolicy`](crate::probe::ProbePolicy).
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails under a strict policy.
    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet>;

    /// Install exactly `delta`, which is never empty.
    ///
    /// # Errors
    ///
    /// Any install failure aborts the step.
    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()>;
}

/// Bring one category to its desired state.
///
/// An empty delta runs no command. In dry-run mode each missing identifier
/// is logged instead of installed.
///
/// # Errors
///
/// Propagates failures from `desired`, `probe_existing` and `install_delta`.
pub fn converge(adapter: &dyn Converge, ctx: &Context) -> Result<TaskResult> {
    let desired = adapter.desired(ctx)?;
    if desired.is_empty() {
        return Ok(TaskResult::Skipped(format!(
            "no {} entries listed",
            adapter.category()
        )));
    }

    let existing = adapter.probe_existing(ctx)?;
    let delta = delta::resolve(&desired, &existing);
    let stats = TaskStats {
        changed: delta.len(),
        already_ok: desired.len() - delta.len(),
        skipped: 0,
    };
    ctx.log.delta(
        adapter.category(),
        DeltaCounts {
            desired: desired.len(),
            present: existing.len(),
            missing: delta.len(),
        },
    );

    if delta.is_empty() {
        ctx.log.info(&stats.summary(false));
        return Ok(TaskResult::Ok);
    }

    if ctx.dry_run {
        for id in &delta {
            ctx.log
                .dry_run(&format!("would install {} {id}", adapter.category()));
        }
        return Ok(stats.finish(ctx));
    }

    adapter.install_delta(ctx, &delta)?;
    Ok(stats.finish(ctx))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::inventory::lines_to_set;
    use crate::test_support::{MockExecutor, MockFetcher, context};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Fake {
        desired: &'static str,
        existing: &'static str,
        installed: Mutex<Vec<IdentifierSet>>,
        fail: bool,
    }

    impl Converge for Fake {
        fn category(&self) -> &str {
            "thing"
        }
        fn desired(&self, _: &Context) -> Result<IdentifierSet> {
            Ok(lines_to_set(self.desired))
        }
        fn probe_existing(&self, _: &Context) -> Result<IdentifierSet> {
            Ok(lines_to_set(self.existing))
        }
        fn install_delta(&self, _: &Context, delta: &IdentifierSet) -> Result<()> {
            if self.fail {
                anyhow::bail!("install failed");
            }
            self.installed.lock().unwrap().push(delta.clone());
            Ok(())
        }
    }

    fn ctx() -> Context {
        context(
            Path::new("/h"),
            Arc::new(MockExecutor::new()),
            Arc::new(MockFetcher::new()),
        )
    }

    #[test]
    fn installs_only_the_delta() {
        let fake = Fake {
            desired: "a\nb\nc",
            existing: "b",
            ..Fake::default()
        };
        assert_eq!(converge(&fake, &ctx()).unwrap(), TaskResult::Ok);
        assert_eq!(*fake.installed.lock().unwrap(), [lines_to_set("a\nc")]);
    }

    #[test]
    fn empty_delta_installs_nothing() {
        let fake = Fake {
            desired: "a\nb",
            existing: "a\nb\nz",
            ..Fake::default()
        };
        assert_eq!(converge(&fake, &ctx()).unwrap(), TaskResult::Ok);
        assert!(fake.installed.lock().unwrap().is_empty());
    }

    #[test]
    fn dry_run_installs_nothing() {
        let fake = Fake {
            desired: "a",
            ..Fake::default()
        };
        let result = converge(&fake, &ctx().with_dry_run(true)).unwrap();
        assert_eq!(result, TaskResult::DryRun);
        assert!(fake.installed.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_desired_set_is_skipped() {
        let fake = Fake::default();
        assert!(matches!(
            converge(&fake, &ctx()).unwrap(),
            TaskResult::Skipped(_)
        ));
    }

    #[test]
    fn install_failure_propagates() {
        let fake = Fake {
            desired: "a",
            fail: true,
            ..Fake::default()
        };
        assert!(converge(&fake, &ctx()).is_err());
    }
}
