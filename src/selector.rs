//! Uniform random selection over the cache
//!
//! Every call re-enumerates the cache, so a pick always reflects whatever
//! files exist at that moment, even mid-refresh.

use crate::cache::CacheStore;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Pick one path uniformly at random, or `None` if the slice is empty
pub fn choose<'a, R>(files: &'a [PathBuf], rng: &mut R) -> Option<&'a PathBuf>
where
    R: Rng + ?Sized,
{
    files.choose(rng)
}

/// Pick a random cached file using the thread-local RNG
pub fn random_cached_file(store: &CacheStore) -> Option<PathBuf> {
    let files = store.enumerate();
    choose(&files, &mut rand::thread_rng()).cloned()
}

/// Random selector bound to a cache store (cloneable, shares its RNG)
#[derive(Clone, Debug)]
pub struct RandomSelector {
    store: CacheStore,
    rng: Arc<Mutex<StdRng>>,
}

impl RandomSelector {
    /// Create a selector seeded from OS entropy
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Create a selector with a fixed seed (deterministic sequence of picks)
    pub fn with_seed(store: CacheStore, seed: u64) -> Self {
        Self {
            store,
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Pick one cached file, or `None` when the cache is empty
    ///
    /// Does blocking filesystem I/O; async callers should go through
    /// [`Harvester::random_cached_file`](crate::Harvester::random_cached_file).
    pub fn pick(&self) -> Option<PathBuf> {
        let files = self.store.enumerate();
        if files.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        choose(&files, &mut *rng).cloned()
    }
}
