/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use crate::{
    api::{
        link_stats::LinkStatistics,
        units::{DataRate, TimeDelta, Timestamp},
    },
    DownlinkPolicyConfig,
};

#[derive(Debug, Clone)]
pub struct TargetRateEstimatorConfig {
    pub default_bandwidth: DataRate,
    pub startup_period: TimeDelta,
    pub large_rate_change_trigger_percent: f64,
    pub max_target_rate: DataRate,
    pub spurious_packet_loss_threshold: u64,
    pub used_bandwidth_override_buffer: DataRate,
}

impl From<&DownlinkPolicyConfig> for TargetRateEstimatorConfig {
    fn from(config: &DownlinkPolicyConfig) -> Self {
        Self {
            default_bandwidth: config.default_bandwidth,
            startup_period: config.startup_period,
            large_rate_change_trigger_percent: config.large_rate_change_trigger_percent,
            max_target_rate: config.max_target_rate,
            spurious_packet_loss_threshold: config.spurious_packet_loss_threshold,
            used_bandwidth_override_buffer: config.used_bandwidth_override_buffer,
        }
    }
}

impl Default for TargetRateEstimatorConfig {
    fn default() -> Self {
        Self::from(&DownlinkPolicyConfig::default())
    }
}

// Turns the raw downlink bandwidth estimate into the budget the stream
// selector works with. Receive-side estimators routinely read delay jitter
// as congestion, so drops that come without packet loss are held back.
#[derive(Debug)]
pub struct TargetRateEstimator {
    config: TargetRateEstimatorConfig,
    startup_period: bool,
    using_prev_target_rate: bool,
    prev_target_rate: DataRate,
    first_estimate_time: Option<Timestamp>,
}

impl Default for TargetRateEstimator {
    fn default() -> Self {
        Self::new(TargetRateEstimatorConfig::default())
    }
}

impl TargetRateEstimator {
    pub fn new(config: TargetRateEstimatorConfig) -> Self {
        Self {
            config,
            startup_period: true,
            using_prev_target_rate: false,
            prev_target_rate: DataRate::zero(),
            first_estimate_time: None,
        }
    }

    pub fn reset(&mut self) {
        self.startup_period = true;
        self.using_prev_target_rate = false;
        self.prev_target_rate = DataRate::zero();
        self.first_estimate_time = None;
    }

    pub fn in_startup_period(&self) -> bool {
        self.startup_period
    }

    pub fn using_previous_target_rate(&self) -> bool {
        self.using_prev_target_rate
    }

    pub fn previous_target_rate(&self) -> DataRate {
        self.prev_target_rate
    }

    /// Records the target the caller acted on; it becomes the reference for
    /// noise rejection on the next tick.
    pub fn commit(&mut self, target_rate: DataRate) {
        self.prev_target_rate = target_rate;
    }

    /// Computes this tick's target. `floor` is the cheapest layer on offer,
    /// `probing` enables the used-bandwidth override while a probe runs.
    pub fn estimate(
        &mut self,
        at_time: Timestamp,
        current: &LinkStatistics,
        previous: &LinkStatistics,
        floor: DataRate,
        probing: bool,
    ) -> DataRate {
        let estimate = current.bandwidth_estimate;
        let mut target = if !estimate.is_zero() {
            let first_estimate_time = *self.first_estimate_time.get_or_insert(at_time);
            if self.startup_period
                && (estimate > self.config.default_bandwidth
                    || current.packets_lost > 0
                    || (at_time - first_estimate_time > self.config.startup_period
                        && estimate <= previous.bandwidth_estimate))
            {
                tracing::info!(
                    "Leaving startup period: estimate {:?} packets lost {}",
                    estimate,
                    current.packets_lost
                );
                self.startup_period = false;
                self.prev_target_rate = estimate;
            }

            if self.startup_period {
                self.config.default_bandwidth
            } else if probing
                && current.used_bandwidth > estimate
                && current.packets_lost <= self.config.spurious_packet_loss_threshold
            {
                tracing::info!(
                    "Probing, overriding estimate {:?} with actual receive bitrate {:?}",
                    estimate,
                    current.used_bandwidth
                );
                current.used_bandwidth + self.config.used_bandwidth_override_buffer
            } else {
                estimate
            }
        } else if self.first_estimate_time.is_none() {
            self.config.default_bandwidth
        } else {
            self.prev_target_rate
        };

        // Never budget below what the cheapest layer needs. The startup
        // default is reported as is.
        if !self.startup_period && target < floor {
            target = floor;
        }

        if !self.startup_period && current.packets_lost == 0 && self.is_spurious_drop(current) {
            tracing::debug!(
                "Rate validation: holding previous target {:?} over estimate {:?}",
                self.prev_target_rate,
                estimate
            );
            self.using_prev_target_rate = true;
            target = self.prev_target_rate;
        } else {
            self.using_prev_target_rate = false;
        }

        if target > self.config.max_target_rate {
            tracing::warn!(
                "Target rate {:?} exceeds the maximum {:?}",
                target,
                self.config.max_target_rate
            );
            target = self.config.max_target_rate;
        }
        target
    }

    fn is_spurious_drop(&self, current: &LinkStatistics) -> bool {
        let estimate = current.bandwidth_estimate;
        let trigger = self.config.large_rate_change_trigger_percent;
        (self.using_prev_target_rate && estimate < self.prev_target_rate)
            || estimate < self.prev_target_rate.percent(100.0 - trigger)
            || estimate < current.used_bandwidth.percent(trigger)
    }
}
