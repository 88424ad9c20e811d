//! Signing engines.
//!
//! Both engines honour the same contract: digest `i` of the output is the
//! digest of block `i` of the input, for every block including a short last
//! one.
//!
//! - [`stream`]: one reader and one hasher/writer thread joined by a
//!   [`BoundedBlockQueue`](crate::queue::BoundedBlockQueue); memory stays at
//!   `block_size * capacity`.
//! - [`mapped`]: any number of workers claiming block indices from a
//!   [`WorkPartitioner`](crate::partition::WorkPartitioner) and writing
//!   straight into a mapped signature file.

use std::io;
use std::thread::{Builder, Scope, ScopedJoinHandle};

use tracing::warn;

pub mod mapped;
pub mod stream;

/// Starts named scoped threads on behalf of an engine.
pub(crate) trait Spawner {
    fn spawn<'scope, T, F>(&mut self, scope: &'scope Scope<'scope, '_>, name: &str, f: F) -> io::Result<ScopedJoinHandle<'scope, T>>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope;
}

/// Plain OS threads through [`Builder::spawn_scoped`].
pub(crate) struct OsThreads;

impl Spawner for OsThreads {
    fn spawn<'scope, T, F>(&mut self, scope: &'scope Scope<'scope, '_>, name: &str, f: F) -> io::Result<ScopedJoinHandle<'scope, T>>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope,
    {
        Builder::new().name(name.to_owned()).spawn_scoped(scope, f)
    }
}

/// Spawns a named scoped thread, retrying failed spawns while `retries` lasts.
///
/// Each retry is taken out of `retries`, so one budget can be shared by a
/// whole batch of spawns. `make` builds a fresh closure for every attempt
/// since a failed spawn consumes the one it was given.
pub(crate) fn spawn_with_retry<'scope, T, F>(
    scope: &'scope Scope<'scope, '_>,
    spawner: &mut impl Spawner,
    name: &str,
    retries: &mut usize,
    mut make: impl FnMut() -> F,
) -> io::Result<ScopedJoinHandle<'scope, T>>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    loop {
        match spawner.spawn(scope, name, make()) {
            Ok(handle) => return Ok(handle),
            Err(err) if *retries > 0 => {
                *retries -= 1;
                warn!(thread = name, retries_left = *retries, error = %err, "thread spawn failed, retrying");
            }
            Err(err) => return Err(err),
        }
    }
}
