/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::fmt;

use crate::{
    api::units::{DataRate, TimeDelta, Timestamp},
    DownlinkPolicyConfig,
};

#[derive(Debug, Clone)]
pub struct RateProbeControllerConfig {
    pub min_time_between_probes: TimeDelta,
    pub max_hold_before_probe: TimeDelta,
    pub max_allowed_probe_time: TimeDelta,
    pub spurious_packet_loss_threshold: u64,
}

impl From<&DownlinkPolicyConfig> for RateProbeControllerConfig {
    fn from(config: &DownlinkPolicyConfig) -> Self {
        Self {
            min_time_between_probes: config.min_time_between_probes,
            max_hold_before_probe: config.max_hold_before_probe,
            max_allowed_probe_time: config.max_allowed_probe_time,
            spurious_packet_loss_threshold: config.spurious_packet_loss_threshold,
        }
    }
}

impl Default for RateProbeControllerConfig {
    fn default() -> Self {
        Self::from(&DownlinkPolicyConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateProbeState {
    NotProbing,
    // The selection has been stable; waiting out the backoff before probing.
    ProbePending,
    // An upgrade beyond the target rate has been applied speculatively.
    Probing,
}

impl fmt::Display for RateProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateProbeState::NotProbing => "Not Probing",
            RateProbeState::ProbePending => "Probe Pending",
            RateProbeState::Probing => "Probing",
        };
        f.write_str(name)
    }
}

/// Which receive set a tick should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveSetChoice {
    /// Whatever the selector chose this tick.
    NewOptimal,
    /// Keep the receive set of the previous decision.
    PreviousOptimal,
    /// Roll back to the set subscribed before the probe started.
    PreProbe,
}

/// Decides when a stable selection may be speculatively upgraded and when
/// such a probe has succeeded or must be rolled back. Probe attempts back off
/// exponentially until one succeeds.
#[derive(Debug)]
pub struct RateProbeController {
    config: RateProbeControllerConfig,
    state: RateProbeState,
    last_probe_time: Timestamp,
    pending_start_time: Timestamp,
    time_before_allow_probe: TimeDelta,
}

impl RateProbeController {
    pub fn new(config: RateProbeControllerConfig, at_time: Timestamp) -> Self {
        Self {
            time_before_allow_probe: config.min_time_between_probes,
            config,
            state: RateProbeState::NotProbing,
            last_probe_time: at_time,
            pending_start_time: Timestamp::minus_infinity(),
        }
    }

    pub fn reset(&mut self, at_time: Timestamp) {
        self.state = RateProbeState::NotProbing;
        self.last_probe_time = at_time;
        self.pending_start_time = Timestamp::minus_infinity();
        self.time_before_allow_probe = self.config.min_time_between_probes;
    }

    pub fn state(&self) -> RateProbeState {
        self.state
    }

    pub fn time_before_allow_probe(&self) -> TimeDelta {
        self.time_before_allow_probe
    }

    pub fn cancel(&mut self, at_time: Timestamp) {
        self.set_state(RateProbeState::NotProbing, at_time);
    }

    /// Advances towards a probe while the selection is stable and an upgrade
    /// is pending. Returns true on the tick the probe starts, at which point
    /// the caller snapshots its subscription and applies the upgrade.
    pub fn maybe_start_probe(&mut self, at_time: Timestamp) -> bool {
        match self.state {
            RateProbeState::NotProbing => {
                self.set_state(RateProbeState::ProbePending, at_time);
                false
            }
            RateProbeState::ProbePending => self.set_state(RateProbeState::Probing, at_time),
            RateProbeState::Probing => false,
        }
    }

    /// Judges a running probe. `packets_lost` is the loss reported this tick,
    /// `streams_unchanged` whether the selector picked the probed streams on its
    /// own and `probed_rate` what the probed selection costs.
    pub fn on_probing_tick(
        &mut self,
        at_time: Timestamp,
        packets_lost: u64,
        streams_unchanged: bool,
        target_rate: DataRate,
        probed_rate: DataRate,
    ) -> ReceiveSetChoice {
        if self.state != RateProbeState::Probing {
            return ReceiveSetChoice::NewOptimal;
        }

        if at_time - self.last_probe_time > self.config.max_allowed_probe_time {
            tracing::info!("Canceling probe due to timeout");
            self.set_state(RateProbeState::NotProbing, at_time);
            return ReceiveSetChoice::NewOptimal;
        }

        if packets_lost > 0 {
            tracing::info!("Probe encountering packets lost: {}", packets_lost);
            if packets_lost > self.config.spurious_packet_loss_threshold {
                tracing::info!("Canceling probe due to packets lost: {}", packets_lost);
                self.set_state(RateProbeState::NotProbing, at_time);
                return ReceiveSetChoice::PreProbe;
            }
        }

        if streams_unchanged || target_rate >= probed_rate {
            tracing::info!(
                "Probe successful, target {:?} probed {:?}",
                target_rate,
                probed_rate
            );
            self.set_state(RateProbeState::NotProbing, at_time);
            self.time_before_allow_probe = self.config.min_time_between_probes;
            return ReceiveSetChoice::NewOptimal;
        }

        ReceiveSetChoice::PreviousOptimal
    }

    // Returns whether the transition happened. Entering either probe state is
    // time gated and may be refused.
    fn set_state(&mut self, new_state: RateProbeState, at_time: Timestamp) -> bool {
        if self.state == new_state {
            return true;
        }

        match new_state {
            RateProbeState::NotProbing => {
                self.pending_start_time = Timestamp::minus_infinity();
            }
            RateProbeState::ProbePending => {
                if at_time - self.last_probe_time < self.config.min_time_between_probes {
                    tracing::debug!("Too soon after the last probe to go pending");
                    return false;
                }
                self.pending_start_time = at_time;
            }
            RateProbeState::Probing => {
                if at_time - self.pending_start_time < self.time_before_allow_probe {
                    return false;
                }
                self.last_probe_time = at_time;
                self.time_before_allow_probe = std::cmp::min(
                    self.time_before_allow_probe * 2,
                    self.config.max_hold_before_probe,
                );
            }
        }

        tracing::info!("Probe state {} -> {}", self.state, new_state);
        self.state = new_state;
        true
    }
}
