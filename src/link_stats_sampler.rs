/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::collections::HashMap;

use crate::api::{
    link_stats::{InboundVideoCounters, LinkStatistics, TransportCounters},
    units::{DataRate, DataSize, TimeDelta, Timestamp},
};

/// Turns cumulative transport counters into per-interval link statistics.
///
/// Counters are kept per SSRC between samples. A counter that went backwards
/// (the stream was recreated) contributes nothing for that interval.
#[derive(Debug, Default)]
pub struct LinkStatsSampler {
    last_sample_time: Option<Timestamp>,
    last_counters: HashMap<u32, InboundVideoCounters>,
}

impl LinkStatsSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_sample_time = None;
        self.last_counters.clear();
    }

    pub fn sample(&mut self, report: &TransportCounters) -> LinkStatistics {
        // Before the first report the counters are taken as zero a second ago.
        let interval = match self.last_sample_time {
            Some(last_time) => report.at_time - last_time,
            None => TimeDelta::from_seconds(1),
        };
        if interval <= TimeDelta::zero() {
            tracing::debug!("Non-positive sampling interval {:?}", interval);
        }

        let mut stats = LinkStatistics {
            bandwidth_estimate: report.available_incoming_bitrate.unwrap_or_default(),
            rtt: report.rtt,
            ..Default::default()
        };
        for counters in &report.streams {
            let last = self
                .last_counters
                .get(&counters.ssrc)
                .copied()
                .unwrap_or_default();
            stats.packets_lost += count_per_second(
                counters.packets_lost.saturating_sub(last.packets_lost),
                interval,
            );
            stats.nack_count +=
                count_per_second(counters.nack_count.saturating_sub(last.nack_count), interval);
            stats.used_bandwidth += bits_per_second(
                counters.bytes_received.bytes() - last.bytes_received.bytes(),
                interval,
            );
        }

        self.last_sample_time = Some(report.at_time);
        self.last_counters = report
            .streams
            .iter()
            .map(|counters| (counters.ssrc, *counters))
            .collect();
        stats
    }
}

fn count_per_second(delta: u64, interval: TimeDelta) -> u64 {
    if interval <= TimeDelta::zero() || interval.is_infinite() {
        return 0;
    }
    let per_second = u128::from(delta) * 1_000_000 / interval.us() as u128;
    u64::try_from(per_second).unwrap_or(u64::MAX)
}

fn bits_per_second(delta_bytes: i64, interval: TimeDelta) -> DataRate {
    if delta_bytes <= 0 || interval.is_infinite() {
        return DataRate::zero();
    }
    DataSize::from_bytes(delta_bytes) / interval
}
