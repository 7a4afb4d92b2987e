// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use super::AudioSample;

/// The most conversion buffers kept around between acquisitions.
const MAX_IDLE: usize = 64;

/// Recycles audio sample storage so steady state playback doesn't allocate a conversion
/// buffer per frame.
#[derive(Clone, Default)]
pub struct SamplePool {
    inner: Arc<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    idle: Mutex<Vec<Vec<i16>>>,
    generation: AtomicU64,
    checked_out: AtomicUsize,
}

impl SamplePool {
    pub fn new() -> SamplePool {
        SamplePool::default()
    }

    /// Returns an empty sample ready to be initialized, reusing idle storage if there is
    /// any.
    pub fn acquire(&self) -> PooledAudioSample {
        let storage = self.inner.idle.lock().pop().unwrap_or_default();
        self.inner.checked_out.fetch_add(1, Ordering::SeqCst);
        PooledAudioSample {
            sample: AudioSample::with_storage(storage),
            pool: self.inner.clone(),
            generation: self.inner.generation.load(Ordering::SeqCst),
        }
    }

    /// Discards all idle storage. Samples checked out before the reset are not recycled
    /// when they come back.
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.idle.lock().clear();
    }

    /// The number of samples currently held outside the pool.
    pub fn checked_out(&self) -> usize {
        self.inner.checked_out.load(Ordering::SeqCst)
    }

    /// The number of idle buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.inner.idle.lock().len()
    }
}

/// An audio sample on loan from a [`SamplePool`]. Dropping it releases its frame and
/// returns its storage to the pool.
pub struct PooledAudioSample {
    sample: AudioSample,
    pool: Arc<PoolInner>,
    generation: u64,
}

impl Deref for PooledAudioSample {
    type Target = AudioSample;

    fn deref(&self) -> &AudioSample {
        &self.sample
    }
}

impl DerefMut for PooledAudioSample {
    fn deref_mut(&mut self) -> &mut AudioSample {
        &mut self.sample
    }
}

impl Drop for PooledAudioSample {
    fn drop(&mut self) {
        let storage = self.sample.take_storage();
        self.pool.checked_out.fetch_sub(1, Ordering::SeqCst);

        if self.generation != self.pool.generation.load(Ordering::SeqCst) {
            return;
        }
        let mut idle = self.pool.idle.lock();
        if idle.len() < MAX_IDLE {
            idle.push(storage);
        }
    }
}

impl fmt::Debug for PooledAudioSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.sample, f)
    }
}
