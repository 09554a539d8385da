//! Clone driver: thin wrapper over the gix clone primitive.
//!
//! This is the only component allowed to touch the network for repository
//! content. Fetch time is measured by the caller.

use crate::error::CloneError;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Materializes the default branch of a repository at a local path.
///
/// Behind a trait so the task queue can be exercised with a local fixture
/// cloner in tests.
pub trait CloneDriver: Send + Sync {
    /// Fetches the default branch of `url` into `dest` at depth 1.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CloneError>;
}

/// Shallow clone via gix. Blocking; run it on a blocking thread.
#[derive(Debug, Default)]
pub struct GixCloner;

impl CloneDriver for GixCloner {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CloneError> {
        let parsed = gix::url::parse(url.into()).map_err(|err| CloneError::Url {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        let interrupt = AtomicBool::new(false);

        let (mut checkout, _outcome) = gix::prepare_clone(parsed, dest)
            .map_err(|err| CloneError::Fetch(err.to_string()))?
            .with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(NonZeroU32::MIN))
            .fetch_then_checkout(gix::progress::Discard, &interrupt)
            .map_err(|err| CloneError::Fetch(err.to_string()))?;

        checkout
            .main_worktree(gix::progress::Discard, &interrupt)
            .map_err(|err| CloneError::Checkout(err.to_string()))?;

        Ok(())
    }
}
