/*!
GETNEXT subtree walks.

A walk keeps a cursor that starts at the subtree root and moves to each returned path. It finishes
when the device leaves the subtree or reports end of data. A walk also finishes when a returned path
does not sort strictly after the cursor, because a device that repeats or regresses would otherwise
loop forever.
*/

use thiserror::Error;
use tracing::{debug, warn};

use crate::acquisition::{
    core::{ManagementSession, SessionError, VarBind},
    path::Path,
};

/// Upper bound on bindings from a single walk.
pub const MAX_WALK_RESULTS: usize = 100_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("walk of {root} failed: {source}")]
    Session {
        root: Path,
        #[source]
        source: SessionError,
    },
    #[error("device returned {current} after {previous}, walk stopped")]
    NonIncreasing { previous: Path, current: Path },
    #[error("walk of {root} stopped after {limit} results")]
    TooManyResults { root: Path, limit: usize },
}

/// Everything one walk produced: the bindings that arrived, and why it stopped early (if it did).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    pub bindings: Vec<VarBind>,
    pub error: Option<WalkError>,
}

impl WalkOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Lazy walk over one subtree. Finite and not restartable: once finished, `next` keeps returning `None`.
pub struct Walk<'s, S: ManagementSession + ?Sized> {
    session: &'s mut S,
    root: Path,
    cursor: Path,
    count: usize,
    limit: usize,
    done: bool,
}

/// Starts a walk of the subtree under `root`.
pub fn walk<'s, S: ManagementSession + ?Sized>(session: &'s mut S, root: Path) -> Walk<'s, S> {
    Walk::new(session, root)
}

impl<'s, S: ManagementSession + ?Sized> Walk<'s, S> {
    pub fn new(session: &'s mut S, root: Path) -> Self {
        Self {
            session,
            cursor: root.clone(),
            root,
            count: 0,
            limit: MAX_WALK_RESULTS,
            done: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn finish(&mut self, error: Option<WalkError>) -> Option<Result<VarBind, WalkError>> {
        self.done = true;
        error.map(Err)
    }

    /// Fetches the next binding in the subtree, `None` once the walk is over.
    ///
    /// An `Err` is always the last item.
    pub async fn next(&mut self) -> Option<Result<VarBind, WalkError>> {
        if self.done {
            return None;
        }
        if self.count >= self.limit {
            let error = WalkError::TooManyResults { root: self.root.clone(), limit: self.limit };
            return self.finish(Some(error));
        }

        let varbind = match self.session.get_next(&self.cursor).await {
            Ok(varbind) => varbind,
            Err(source) => {
                let error = WalkError::Session { root: self.root.clone(), source };
                return self.finish(Some(error));
            }
        };

        if varbind.value.is_end_of_data() || !varbind.path.is_within(&self.root) {
            return self.finish(None);
        }

        if varbind.path <= self.cursor {
            let error = WalkError::NonIncreasing {
                previous: self.cursor.clone(),
                current: varbind.path,
            };
            return self.finish(Some(error));
        }

        self.cursor = varbind.path.clone();
        self.count += 1;
        Some(Ok(varbind))
    }

    /// Drains the walk. Bindings gathered before a failure are kept alongside the error.
    pub async fn collect(mut self) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        while let Some(item) = self.next().await {
            match item {
                Ok(varbind) => outcome.bindings.push(varbind),
                Err(error) => outcome.error = Some(error),
            }
        }
        match &outcome.error {
            Some(error) => warn!(
                root = %self.root,
                results = outcome.bindings.len(),
                error = %error,
                "Walk ended early"
            ),
            None => debug!(root = %self.root, results = outcome.bindings.len(), "Walk complete"),
        }
        outcome
    }
}
