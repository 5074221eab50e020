/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use super::units::{DataRate, DataSize, TimeDelta, Timestamp};

/// One sampling interval worth of downlink measurements. Counts are per
/// second over the interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatistics {
    pub bandwidth_estimate: DataRate,
    pub used_bandwidth: DataRate,
    pub packets_lost: u64,
    pub nack_count: u64,
    pub rtt: TimeDelta,
}

/// Cumulative receive counters of one inbound video stream, as reported by
/// the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundVideoCounters {
    pub ssrc: u32,
    pub bytes_received: DataSize,
    pub packets_lost: u64,
    pub nack_count: u64,
}

/// Raw transport report for one sampling instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportCounters {
    pub at_time: Timestamp,
    pub available_incoming_bitrate: Option<DataRate>,
    pub rtt: TimeDelta,
    pub streams: Vec<InboundVideoCounters>,
}
