//! Reaction Implementation
//!
//! A reaction is a side-effecting computation that re-runs whenever a
//! signal it read during its last run is written.
//!
//! # How Reactions Work
//!
//! 1. When created, the reaction runs immediately and synchronously to
//!    discover its initial dependencies.
//!
//! 2. When any dependency is written, the reaction re-runs before the write
//!    returns.
//!
//! 3. Before re-running, the reaction drops its old dependencies and calls
//!    its cleanups, then tracks new dependencies during the run. Branches
//!    not taken on the latest run leave no edges behind.
//!
//! # Lifetime
//!
//! There is no disposal handle. A reaction stays installed for as long as
//! it has dependencies; a run that reads nothing retires it.

use tracing::trace;

use super::Runtime;
use crate::error::Result;
use crate::graph::SubscriberId;

impl Runtime {
    /// Install a reaction and run it once, immediately.
    ///
    /// A failure of the first run is handled per the runtime's
    /// `FailurePolicy`: logged under `Isolate`, re-raised as a panic under
    /// `Propagate`.
    pub fn create_reaction(&self, body: impl Fn() + 'static) -> SubscriberId {
        let id = self.insert_subscriber(body);
        trace!(?id, "reaction created");
        if let Err(err) = self.run_subscriber(id) {
            self.settle(err);
        }
        id
    }

    /// Like [`create_reaction`](Self::create_reaction), but returns a
    /// failure of the first run instead of settling it.
    pub fn try_create_reaction(&self, body: impl Fn() + 'static) -> Result<SubscriberId> {
        let id = self.insert_subscriber(body);
        self.run_subscriber(id)?;
        Ok(id)
    }
}
