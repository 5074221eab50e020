/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::units::{TimeDelta, Timestamp};

/// Source of monotonic time for the policy. Every timer comparison made by
/// [DownlinkPolicy](crate::DownlinkPolicy) reads the time through this trait, once
/// per tick.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock backed implementation, counting from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::zero() + TimeDelta::from(self.start.elapsed())
    }
}

/// Manually advanced clock. Clones share the same time, so a test or a trace
/// replay can keep one handle, possibly on another thread, while the policy
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    now_us: Arc<AtomicI64>,
}

impl SimulatedClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now_us: Arc::new(AtomicI64::new(start.us())),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        // Goes through Timestamp arithmetic so infinities saturate.
        let _ = self
            .now_us
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now_us| {
                Some((Timestamp::from_micros(now_us) + delta).us())
            });
    }

    pub fn set(&self, at_time: Timestamp) {
        self.now_us.store(at_time.us(), Ordering::SeqCst);
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.now_us.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
