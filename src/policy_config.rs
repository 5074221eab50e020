/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use crate::api::units::{DataRate, TimeDelta};

#[derive(Debug, Clone)]
pub struct DownlinkPolicyConfig {
    // Target used while the estimator is still in its startup period, and
    // before any estimate has been reported at all.
    pub default_bandwidth: DataRate,
    // How long after the first non-zero estimate the startup period lasts
    // if the estimate is still climbing.
    pub startup_period: TimeDelta,
    // An estimate drop larger than this percentage of the previous target,
    // or an estimate under this percentage of the used bandwidth, is treated
    // as noise unless packets are being lost.
    pub large_rate_change_trigger_percent: f64,
    pub max_target_rate: DataRate,

    // Debounce between applied subscription changes.
    pub min_time_between_subscribe: TimeDelta,
    // Debounce right after a probe upgrade so the result shows up quickly.
    pub probe_subscribe_cooldown: TimeDelta,
    // The debounce is multiplied by this after a failed probe.
    pub failed_probe_cooldown_factor: i64,

    // Minimum spacing between probe attempts, and the floor of the hold
    // time before a pending probe starts.
    pub min_time_between_probes: TimeDelta,
    // The hold time doubles on every probe; this caps it.
    pub max_hold_before_probe: TimeDelta,
    pub max_allowed_probe_time: TimeDelta,
    // Packets lost per second tolerated during a probe before it is failed.
    pub spurious_packet_loss_threshold: u64,
    // Added to the used bandwidth when it overrides a lagging estimate
    // during a probe.
    pub used_bandwidth_override_buffer: DataRate,

    // Screen share layers below this max bitrate trust their avg bitrate.
    pub content_low_bitrate_threshold: DataRate,

    // Optional hysteresis: keep the previous decision while the target moved
    // less than this percentage. Doubled under `low_bitrate_threshold`.
    pub target_rate_change_trigger_percent: Option<f64>,
    pub low_bitrate_threshold: DataRate,

    // Emit the decision summary every this many recomputations.
    pub log_interval_ticks: u32,
}

impl Default for DownlinkPolicyConfig {
    fn default() -> Self {
        Self {
            default_bandwidth: DataRate::from_kilobits_per_sec(2800),
            startup_period: TimeDelta::from_millis(6000),
            large_rate_change_trigger_percent: 20.0,
            max_target_rate: DataRate::from_kilobits_per_sec(15000),
            min_time_between_subscribe: TimeDelta::from_millis(2000),
            probe_subscribe_cooldown: TimeDelta::from_millis(800),
            failed_probe_cooldown_factor: 3,
            min_time_between_probes: TimeDelta::from_millis(5000),
            max_hold_before_probe: TimeDelta::from_millis(60000),
            max_allowed_probe_time: TimeDelta::from_millis(60000),
            spurious_packet_loss_threshold: 0,
            used_bandwidth_override_buffer: DataRate::from_kilobits_per_sec(100),
            content_low_bitrate_threshold: DataRate::from_kilobits_per_sec(100),
            target_rate_change_trigger_percent: None,
            low_bitrate_threshold: DataRate::from_kilobits_per_sec(300),
            log_interval_ticks: 15,
        }
    }
}

impl DownlinkPolicyConfig {
    pub fn validate(&mut self) {
        let defaults = Self::default();
        if self.default_bandwidth.is_zero() || self.default_bandwidth.is_infinite() {
            tracing::warn!("Default bandwidth must be a positive finite rate");
            self.default_bandwidth = defaults.default_bandwidth;
        }
        if self.startup_period < TimeDelta::zero() || self.startup_period.is_infinite() {
            tracing::warn!("Startup period must be a finite, non-negative duration");
            self.startup_period = defaults.startup_period;
        }
        if !(0.0..100.0).contains(&self.large_rate_change_trigger_percent) {
            tracing::warn!("Large rate change trigger must be between 0 and 100 percent");
            self.large_rate_change_trigger_percent = defaults.large_rate_change_trigger_percent;
        }
        if self.max_target_rate < self.default_bandwidth {
            tracing::warn!(
                "Max target rate {:?} is below the default bandwidth {:?}",
                self.max_target_rate,
                self.default_bandwidth
            );
            self.max_target_rate = self.default_bandwidth.max(defaults.max_target_rate);
        }
        if self.min_time_between_subscribe < TimeDelta::zero() {
            tracing::warn!("Subscribe cooldown can't be negative");
            self.min_time_between_subscribe = defaults.min_time_between_subscribe;
        }
        if self.probe_subscribe_cooldown < TimeDelta::zero() {
            tracing::warn!("Probe subscribe cooldown can't be negative");
            self.probe_subscribe_cooldown = defaults.probe_subscribe_cooldown;
        }
        if self.failed_probe_cooldown_factor < 1 {
            tracing::warn!("Failed probe cooldown factor must be at least 1");
            self.failed_probe_cooldown_factor = defaults.failed_probe_cooldown_factor;
        }
        if self.min_time_between_probes <= TimeDelta::zero() {
            tracing::warn!("Time between probes must be positive");
            self.min_time_between_probes = defaults.min_time_between_probes;
        }
        if self.max_hold_before_probe < self.min_time_between_probes {
            tracing::warn!("Max hold before probe can't be shorter than the time between probes");
            self.max_hold_before_probe = self.min_time_between_probes;
        }
        if self.max_allowed_probe_time <= TimeDelta::zero() {
            tracing::warn!("Max allowed probe time must be positive");
            self.max_allowed_probe_time = defaults.max_allowed_probe_time;
        }
        if let Some(percent) = self.target_rate_change_trigger_percent {
            if !(0.0..50.0).contains(&percent) {
                tracing::warn!("Target rate change trigger must be between 0 and 50 percent");
                self.target_rate_change_trigger_percent = None;
            }
        }
        if self.log_interval_ticks == 0 {
            tracing::warn!("Log interval must be at least one tick");
            self.log_interval_ticks = defaults.log_interval_ticks;
        }
    }
}

#[cfg(test)]
mod test {
    use test_trace::test;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut config = DownlinkPolicyConfig::default();
        config.validate();
        assert_eq!(config.default_bandwidth.kbps(), 2800);
        assert_eq!(config.startup_period.ms(), 6000);
        assert_eq!(config.min_time_between_probes.ms(), 5000);
        assert_eq!(config.max_hold_before_probe.ms(), 60000);
        assert_eq!(config.probe_subscribe_cooldown.ms(), 800);
        assert!(config.target_rate_change_trigger_percent.is_none());
    }

    #[test]
    fn falls_back_on_invalid_values() {
        let mut config = DownlinkPolicyConfig {
            default_bandwidth: DataRate::zero(),
            large_rate_change_trigger_percent: 140.0,
            failed_probe_cooldown_factor: 0,
            min_time_between_probes: TimeDelta::zero(),
            max_hold_before_probe: TimeDelta::from_millis(10),
            target_rate_change_trigger_percent: Some(-5.0),
            log_interval_ticks: 0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.default_bandwidth.kbps(), 2800);
        assert_eq!(config.large_rate_change_trigger_percent, 20.0);
        assert_eq!(config.failed_probe_cooldown_factor, 3);
        assert_eq!(config.min_time_between_probes.ms(), 5000);
        assert_eq!(config.max_hold_before_probe.ms(), 5000);
        assert!(config.target_rate_change_trigger_percent.is_none());
        assert_eq!(config.log_interval_ticks, 15);
    }
}
