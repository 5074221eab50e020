/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::collections::HashSet;

use crate::{
    api::{
        clock::{Clock, MonotonicClock},
        link_stats::LinkStatistics,
        stream_index::{GroupId, RemoteStreamDescriptor, StreamId, StreamIdSet},
        units::{DataRate, TimeDelta, Timestamp},
    },
    rate_probe_controller::{
        RateProbeController, RateProbeControllerConfig, RateProbeState, ReceiveSetChoice,
    },
    stream_selector::{cheapest_layer_rate, normalize_bitrates, select_streams, StreamSelection},
    target_rate_estimator::{TargetRateEstimator, TargetRateEstimatorConfig},
    DownlinkPolicyConfig,
};

/// Decides which remote video streams to receive, one call per metrics tick.
///
/// Each tick turns the link statistics into a target rate, picks layers under
/// that budget and lets the probe controller speculatively upgrade a stable
/// selection. Decisions are debounced so the subscription layer is not asked
/// to renegotiate on every fluctuation.
#[derive(Debug)]
pub struct DownlinkPolicy<C: Clock = MonotonicClock> {
    config: DownlinkPolicyConfig,
    clock: C,
    estimator: TargetRateEstimator,
    probe_controller: RateProbeController,

    current_stats: LinkStatistics,
    previous_stats: LinkStatistics,

    optimal: StreamIdSet,
    subscribed: StreamIdSet,
    pre_probe: StreamIdSet,
    // Budgeted part of `optimal` and `pre_probe`; paused streams kept alive
    // are not in here.
    optimal_streams: Vec<RemoteStreamDescriptor>,
    pre_probe_streams: Vec<RemoteStreamDescriptor>,

    last_catalog: Vec<(GroupId, StreamId, DataRate)>,
    last_subscribe_time: Option<Timestamp>,
    subscribe_cooldown: TimeDelta,
    target_rate: DataRate,
    last_upgrade_rate: DataRate,
    target_rate_baseline: Option<DataRate>,
    wants_resubscribe: bool,
    log_count: u32,
}

impl Default for DownlinkPolicy<MonotonicClock> {
    fn default() -> Self {
        Self::new(DownlinkPolicyConfig::default(), MonotonicClock::new())
    }
}

impl<C: Clock> DownlinkPolicy<C> {
    pub fn new(mut config: DownlinkPolicyConfig, clock: C) -> Self {
        config.validate();
        let now = clock.now();
        Self {
            estimator: TargetRateEstimator::new(TargetRateEstimatorConfig::from(&config)),
            probe_controller: RateProbeController::new(
                RateProbeControllerConfig::from(&config),
                now,
            ),
            current_stats: LinkStatistics::default(),
            previous_stats: LinkStatistics::default(),
            optimal: StreamIdSet::new(),
            subscribed: StreamIdSet::new(),
            pre_probe: StreamIdSet::new(),
            optimal_streams: Vec::new(),
            pre_probe_streams: Vec::new(),
            last_catalog: Vec::new(),
            last_subscribe_time: None,
            subscribe_cooldown: config.min_time_between_subscribe,
            target_rate: config.default_bandwidth,
            last_upgrade_rate: DataRate::zero(),
            target_rate_baseline: None,
            wants_resubscribe: false,
            log_count: 0,
            config,
            clock,
        }
    }

    /// Back to the state of a freshly created policy, e.g. after the
    /// connection was rebuilt.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        tracing::info!("Resetting downlink policy");
        self.estimator.reset();
        self.probe_controller.reset(now);
        self.current_stats = LinkStatistics::default();
        self.previous_stats = LinkStatistics::default();
        self.optimal = StreamIdSet::new();
        self.subscribed = StreamIdSet::new();
        self.pre_probe = StreamIdSet::new();
        self.optimal_streams.clear();
        self.pre_probe_streams.clear();
        self.last_catalog.clear();
        self.last_subscribe_time = None;
        self.subscribe_cooldown = self.config.min_time_between_subscribe;
        self.target_rate = self.config.default_bandwidth;
        self.last_upgrade_rate = DataRate::zero();
        self.target_rate_baseline = None;
        self.wants_resubscribe = false;
        self.log_count = 0;
    }

    pub fn config(&self) -> &DownlinkPolicyConfig {
        &self.config
    }

    /// The decision of the last tick.
    pub fn optimal(&self) -> &StreamIdSet {
        &self.optimal
    }

    /// The receive set last handed to the subscription layer.
    pub fn subscribed(&self) -> &StreamIdSet {
        &self.subscribed
    }

    /// What was subscribed right before the current or last probe.
    pub fn pre_probe(&self) -> &StreamIdSet {
        &self.pre_probe
    }

    pub fn probe_state(&self) -> RateProbeState {
        self.probe_controller.state()
    }

    pub fn target_rate(&self) -> DataRate {
        self.target_rate
    }

    pub fn last_upgrade_rate(&self) -> DataRate {
        self.last_upgrade_rate
    }

    pub fn in_startup_period(&self) -> bool {
        self.estimator.in_startup_period()
    }

    /// True when the last tick changed the subscribed set.
    pub fn wants_resubscribe(&self) -> bool {
        self.wants_resubscribe
    }

    pub fn on_tick(
        &mut self,
        catalog: &[RemoteStreamDescriptor],
        link_stats: LinkStatistics,
        paused_attendees: &HashSet<String>,
    ) -> StreamIdSet {
        let now = self.clock.now();
        self.previous_stats = std::mem::replace(&mut self.current_stats, link_stats);
        self.wants_resubscribe = false;

        if catalog.is_empty() {
            self.optimal = StreamIdSet::new();
            self.optimal_streams.clear();
            self.last_catalog.clear();
            if !self.subscribed.is_empty() {
                tracing::info!("No remote video left, dropping all subscriptions");
                self.subscribed = StreamIdSet::new();
                self.wants_resubscribe = true;
            }
            return self.optimal.clone();
        }

        let mut candidates = Vec::with_capacity(catalog.len());
        let mut kept_alive = StreamIdSet::new();
        for stream in catalog {
            if !paused_attendees.contains(&stream.attendee_id) {
                candidates.push(stream.clone());
            } else if self.subscribed.contains(stream.stream_id) {
                kept_alive.add(stream.stream_id);
            }
        }
        if !kept_alive.is_empty() {
            tracing::debug!("Keeping paused streams {:?} subscribed", kept_alive);
        }

        let mut catalog_key: Vec<_> = candidates
            .iter()
            .map(RemoteStreamDescriptor::catalog_key)
            .collect();
        catalog_key.sort_unstable();
        let catalog_changed = catalog_key != self.last_catalog;
        if !catalog_changed
            && !self.estimator.in_startup_period()
            && self
                .last_subscribe_time
                .is_some_and(|last_time| now - last_time < self.subscribe_cooldown)
        {
            tracing::debug!(
                "Within subscribe cooldown {:?}, keeping {:?}",
                self.subscribe_cooldown,
                self.optimal
            );
            return self.optimal.clone();
        }
        self.last_catalog = catalog_key;
        self.subscribe_cooldown = self.config.min_time_between_subscribe;

        normalize_bitrates(&mut candidates, self.config.content_low_bitrate_threshold);
        let last_probe_state = self.probe_controller.state();
        let target_rate = self.estimator.estimate(
            now,
            &self.current_stats,
            &self.previous_stats,
            cheapest_layer_rate(&candidates),
            last_probe_state == RateProbeState::Probing,
        );
        self.target_rate = target_rate;

        let mut selection = select_streams(&candidates, target_rate);
        if !selection.last_upgrade_rate.is_zero() {
            self.last_upgrade_rate = selection.last_upgrade_rate;
        }

        // Probing only makes sense while the set of sources stays put.
        let choice = if catalog_changed || self.estimator.in_startup_period() {
            self.probe_controller.cancel(now);
            self.last_upgrade_rate = DataRate::zero();
            ReceiveSetChoice::NewOptimal
        } else if last_probe_state == RateProbeState::Probing {
            self.evaluate_probe(now, &selection, target_rate)
        } else {
            self.maybe_override_or_probe(now, &mut selection, target_rate)
        };

        match choice {
            ReceiveSetChoice::PreviousOptimal => {
                tracing::debug!("Keeping previous receive set {:?}", self.optimal);
                self.estimator.commit(target_rate);
            }
            ReceiveSetChoice::PreProbe => {
                tracing::info!("Reverting to pre-probe receive set {:?}", self.pre_probe);
                self.optimal = self.pre_probe.clone();
                self.optimal_streams = self.pre_probe_streams.clone();
            }
            ReceiveSetChoice::NewOptimal => {
                let mut receive_set = selection.stream_ids();
                for stream_id in kept_alive.iter() {
                    receive_set.add(stream_id);
                }
                self.optimal = receive_set;
                self.optimal_streams = selection.chosen;
                self.estimator.commit(target_rate);
            }
        }

        if self.optimal != self.subscribed {
            tracing::info!("Subscribing to {:?} at target {:?}", self.optimal, target_rate);
            self.subscribed = self.optimal.clone();
            self.last_subscribe_time = Some(now);
            self.wants_resubscribe = true;
        }

        self.log_decision(last_probe_state, catalog.len(), paused_attendees.len());
        self.optimal.clone()
    }

    fn evaluate_probe(
        &mut self,
        now: Timestamp,
        selection: &StreamSelection,
        target_rate: DataRate,
    ) -> ReceiveSetChoice {
        let probed_rate: DataRate = self
            .optimal_streams
            .iter()
            .map(|stream| stream.avg_bitrate)
            .sum();
        let choice = self.probe_controller.on_probing_tick(
            now,
            self.current_stats.packets_lost,
            selection.same_streams_as(&self.optimal_streams),
            target_rate,
            probed_rate,
        );
        if choice == ReceiveSetChoice::PreProbe {
            self.subscribe_cooldown = std::cmp::max(
                self.config.min_time_between_subscribe,
                self.subscribe_cooldown,
            ) * self.config.failed_probe_cooldown_factor;
            self.last_upgrade_rate = DataRate::zero();
        }
        choice
    }

    fn maybe_override_or_probe(
        &mut self,
        now: Timestamp,
        selection: &mut StreamSelection,
        target_rate: DataRate,
    ) -> ReceiveSetChoice {
        let same_streams = selection.same_streams_as(&self.optimal_streams);
        let Some(upgrade) = selection.upgrade.clone() else {
            if !same_streams {
                self.probe_controller.cancel(now);
                self.last_upgrade_rate = DataRate::zero();
            }
            return ReceiveSetChoice::NewOptimal;
        };

        let mut choice = ReceiveSetChoice::NewOptimal;
        if let Some(trigger_percent) = self.config.target_rate_change_trigger_percent {
            let trigger_percent = if target_rate > self.config.low_bitrate_threshold {
                trigger_percent
            } else {
                trigger_percent * 2.0
            };
            let baseline = *self
                .target_rate_baseline
                .get_or_insert(self.estimator.previous_target_rate());
            let delta = if target_rate > baseline {
                target_rate - baseline
            } else {
                baseline - target_rate
            };
            if !same_streams && delta < target_rate.percent(trigger_percent) {
                tracing::info!(
                    "Reusing last decision, target {:?} moved {:?} since {:?}",
                    target_rate,
                    delta,
                    baseline
                );
                choice = ReceiveSetChoice::PreviousOptimal;
            } else {
                self.target_rate_baseline = Some(target_rate);
            }
        }

        if self.current_stats.packets_lost > self.previous_stats.packets_lost {
            self.probe_controller.cancel(now);
            self.last_upgrade_rate = DataRate::zero();
            return choice;
        }

        if same_streams || choice == ReceiveSetChoice::PreviousOptimal {
            if self.probe_controller.maybe_start_probe(now) {
                self.pre_probe = self.subscribed.clone();
                self.pre_probe_streams = self.optimal_streams.clone();
                self.last_upgrade_rate = selection.apply_upgrade(&upgrade);
                self.subscribe_cooldown = self.config.probe_subscribe_cooldown;
                choice = ReceiveSetChoice::NewOptimal;
            }
        } else {
            self.probe_controller.cancel(now);
        }
        choice
    }

    fn log_decision(&mut self, last_probe_state: RateProbeState, catalog_size: usize, paused: usize) {
        let probe_state = self.probe_controller.state();
        if self.log_count % self.config.log_interval_ticks == 0 || probe_state != last_probe_state {
            let achieved: DataRate = self
                .optimal_streams
                .iter()
                .map(|stream| stream.avg_bitrate)
                .sum();
            tracing::info!(
                target_kbps = self.target_rate.kbps(),
                achieved_kbps = achieved.kbps(),
                last_upgrade_kbps = self.last_upgrade_rate.kbps(),
                probe_state = %probe_state,
                startup = self.estimator.in_startup_period(),
                catalog_size,
                paused,
                "Downlink decision {:?}",
                self.optimal
            );
            self.log_count = 0;
        }
        self.log_count += 1;
    }
}

#[cfg(test)]
mod test {
    use test_trace::test;

    use super::*;
    use crate::api::clock::SimulatedClock;

    fn kbps(value: i64) -> DataRate {
        DataRate::from_kilobits_per_sec(value)
    }

    fn stats(estimate_kbps: i64, used_kbps: i64, packets_lost: u64) -> LinkStatistics {
        LinkStatistics {
            bandwidth_estimate: kbps(estimate_kbps),
            used_bandwidth: kbps(used_kbps),
            packets_lost,
            ..Default::default()
        }
    }

    fn layer(group_id: u32, stream_id: u32, attendee: &str, kbps: i64) -> RemoteStreamDescriptor {
        RemoteStreamDescriptor::new(group_id, stream_id, attendee, kbps, kbps)
    }

    fn two_sources() -> Vec<RemoteStreamDescriptor> {
        vec![
            layer(1, 1, "a", 200),
            layer(1, 2, "a", 800),
            layer(2, 3, "b", 150),
            layer(2, 4, "b", 600),
        ]
    }

    fn ids(values: &[u32]) -> StreamIdSet {
        values.iter().copied().collect()
    }

    fn policy_with(config: DownlinkPolicyConfig) -> (SimulatedClock, DownlinkPolicy<SimulatedClock>) {
        let clock = SimulatedClock::new(Timestamp::from_seconds(0));
        let policy = DownlinkPolicy::new(config, clock.clone());
        (clock, policy)
    }

    fn policy() -> (SimulatedClock, DownlinkPolicy<SimulatedClock>) {
        policy_with(DownlinkPolicyConfig::default())
    }

    fn no_pause() -> HashSet<String> {
        HashSet::new()
    }

    fn groups_are_exclusive(catalog: &[RemoteStreamDescriptor], receive_set: &StreamIdSet) -> bool {
        let mut groups: Vec<u32> = catalog
            .iter()
            .filter(|stream| receive_set.contains(stream.stream_id))
            .map(|stream| stream.group_id)
            .collect();
        let count = groups.len();
        groups.sort_unstable();
        groups.dedup();
        groups.len() == count
    }

    // Loss on the first tick ends the startup period right away.
    fn settle(policy: &mut DownlinkPolicy<SimulatedClock>, estimate_kbps: i64) -> StreamIdSet {
        let receive_set = policy.on_tick(&two_sources(), stats(estimate_kbps, 0, 1), &no_pause());
        assert!(!policy.in_startup_period());
        receive_set
    }

    // Runs the default policy into a probe of stream 4 at t=10s.
    fn start_probe(clock: &SimulatedClock, policy: &mut DownlinkPolicy<SimulatedClock>) {
        assert_eq!(settle(policy, 500), ids(&[1, 3]));
        for _ in 0..9 {
            clock.advance(TimeDelta::from_seconds(1));
            assert_eq!(
                policy.on_tick(&two_sources(), stats(500, 350, 0), &no_pause()),
                ids(&[1, 3])
            );
        }
        assert_eq!(policy.probe_state(), RateProbeState::ProbePending);

        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&two_sources(), stats(500, 350, 0), &no_pause());
        assert_eq!(policy.probe_state(), RateProbeState::Probing);
        assert_eq!(receive_set, ids(&[1, 4]));
        assert_eq!(policy.pre_probe(), &ids(&[1, 3]));
        assert_eq!(policy.last_upgrade_rate(), kbps(450));
        assert!(policy.wants_resubscribe());
    }

    #[test]
    fn policy_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<DownlinkPolicy<SimulatedClock>>();
        assert_send::<DownlinkPolicy<MonotonicClock>>();

        let (clock, mut policy) = policy();
        let receive_set = std::thread::spawn(move || {
            clock.advance(TimeDelta::from_seconds(1));
            policy.on_tick(&two_sources(), stats(500, 0, 1), &HashSet::new())
        })
        .join()
        .unwrap();
        assert_eq!(receive_set, ids(&[1, 3]));
    }

    #[test]
    fn startup_default_on_first_tick() {
        let (_, mut policy) = policy();
        let mut catalog = two_sources();
        catalog.push(layer(3, 5, "c", 5000));
        policy.on_tick(&catalog, LinkStatistics::default(), &no_pause());
        assert!(policy.in_startup_period());
        assert_eq!(policy.target_rate(), kbps(2800));
    }

    #[test]
    fn end_to_end_selection() {
        let (_, mut policy) = policy();
        let receive_set = settle(&mut policy, 500);
        assert_eq!(receive_set, ids(&[1, 3]));
        assert_eq!(policy.target_rate(), kbps(500));
        assert_eq!(policy.subscribed(), &ids(&[1, 3]));
        assert!(policy.wants_resubscribe());
    }

    #[test]
    fn idempotent_within_cooldown() {
        let (clock, mut policy) = policy();
        let first = settle(&mut policy, 500);
        for _ in 0..3 {
            clock.advance(TimeDelta::from_millis(500));
            let receive_set = policy.on_tick(&two_sources(), stats(500, 0, 1), &no_pause());
            assert_eq!(receive_set, first);
            assert!(!policy.wants_resubscribe());
        }
    }

    #[test]
    fn cooldown_debounces_large_changes() {
        let (clock, mut policy) = policy();
        settle(&mut policy, 500);
        clock.advance(TimeDelta::from_seconds(1));
        assert_eq!(
            policy.on_tick(&two_sources(), stats(5000, 0, 1), &no_pause()),
            ids(&[1, 3])
        );
        clock.advance(TimeDelta::from_seconds(1));
        assert_eq!(
            policy.on_tick(&two_sources(), stats(5000, 0, 1), &no_pause()),
            ids(&[2, 4])
        );
    }

    #[test]
    fn rejects_estimate_drop_without_loss() {
        let (clock, mut policy) = policy();
        settle(&mut policy, 1000);
        assert_eq!(policy.target_rate(), kbps(1000));

        clock.advance(TimeDelta::from_seconds(3));
        policy.on_tick(&two_sources(), stats(750, 0, 0), &no_pause());
        assert_eq!(policy.target_rate(), kbps(1000));

        clock.advance(TimeDelta::from_seconds(3));
        policy.on_tick(&two_sources(), stats(750, 0, 1), &no_pause());
        assert_eq!(policy.target_rate(), kbps(750));
    }

    #[test]
    fn budget_and_group_exclusivity_hold() {
        let (clock, mut policy) = policy_with(DownlinkPolicyConfig {
            min_time_between_probes: TimeDelta::from_seconds(3600),
            ..Default::default()
        });
        let mut catalog = two_sources();
        catalog.extend([
            layer(3, 5, "c", 300),
            layer(3, 6, "c", 1100),
            layer(4, 7, "d#content", 400),
            layer(4, 8, "d#content", 1200),
        ]);

        for estimate in [500, 900, 300, 1200, 2000, 250, 700, 3000] {
            let receive_set = policy.on_tick(&catalog, stats(estimate, 0, 1), &no_pause());
            assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
            assert!(groups_are_exclusive(&catalog, &receive_set));

            let budgeted: DataRate = catalog
                .iter()
                .filter(|stream| receive_set.contains(stream.stream_id))
                .filter(|stream| !stream.is_content_share())
                .map(|stream| stream.avg_bitrate)
                .sum();
            assert!(budgeted <= policy.target_rate(), "estimate {}", estimate);
            assert!(receive_set.contains(7) || receive_set.contains(8));
            clock.advance(TimeDelta::from_seconds(3));
        }
    }

    #[test]
    fn paused_subscribed_stream_stays() {
        let (clock, mut policy) = policy();
        settle(&mut policy, 1000);
        assert_eq!(policy.subscribed(), &ids(&[1, 4]));

        let paused: HashSet<String> = ["b".to_string()].into_iter().collect();
        clock.advance(TimeDelta::from_seconds(3));
        let receive_set = policy.on_tick(&two_sources(), stats(1000, 0, 1), &paused);
        assert_eq!(receive_set, ids(&[2, 4]));

        clock.advance(TimeDelta::from_seconds(3));
        let receive_set = policy.on_tick(&two_sources(), stats(1000, 0, 1), &paused);
        assert_eq!(receive_set, ids(&[2, 4]));
    }

    #[test]
    fn paused_unsubscribed_stream_is_dropped() {
        let (_, mut policy) = policy();
        let paused: HashSet<String> = ["b".to_string()].into_iter().collect();
        let receive_set = policy.on_tick(&two_sources(), stats(500, 0, 1), &paused);
        assert_eq!(receive_set, ids(&[1]));
    }

    #[test]
    fn probe_succeeds() {
        let (clock, mut policy) = policy();
        start_probe(&clock, &mut policy);

        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&two_sources(), stats(900, 800, 0), &no_pause());
        assert_eq!(receive_set, ids(&[1, 4]));
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
        assert_eq!(policy.target_rate(), kbps(900));
    }

    #[test]
    fn probe_loss_rolls_back() {
        let (clock, mut policy) = policy();
        start_probe(&clock, &mut policy);
        let pre_probe = policy.pre_probe().clone();

        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&two_sources(), stats(500, 350, 3), &no_pause());
        assert_eq!(receive_set, pre_probe);
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
        assert!(policy.wants_resubscribe());

        // The failed probe stretches the cooldown to 3x the default.
        clock.advance(TimeDelta::from_seconds(5));
        assert_eq!(
            policy.on_tick(&two_sources(), stats(5000, 0, 3), &no_pause()),
            pre_probe
        );
        clock.advance(TimeDelta::from_seconds(1));
        assert_eq!(
            policy.on_tick(&two_sources(), stats(5000, 0, 3), &no_pause()),
            ids(&[2, 4])
        );
    }

    #[test]
    fn probe_holds_then_times_out() {
        let (clock, mut policy) = policy();
        start_probe(&clock, &mut policy);

        for _ in 0..60 {
            clock.advance(TimeDelta::from_seconds(1));
            let receive_set = policy.on_tick(&two_sources(), stats(500, 350, 0), &no_pause());
            assert_eq!(receive_set, ids(&[1, 4]));
            assert_eq!(policy.probe_state(), RateProbeState::Probing);
        }

        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&two_sources(), stats(500, 350, 0), &no_pause());
        assert_eq!(receive_set, ids(&[1, 3]));
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
    }

    #[test]
    fn screen_share_appearing_cancels_probe() {
        let (clock, mut policy) = policy();
        start_probe(&clock, &mut policy);

        let mut catalog = two_sources();
        catalog.push(layer(9, 20, "a#content", 100));
        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&catalog, stats(500, 350, 0), &no_pause());
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
        assert_eq!(receive_set, ids(&[1, 3, 20]));
        assert_eq!(policy.last_upgrade_rate(), DataRate::zero());
    }

    #[test]
    fn loss_increase_cancels_pending_probe() {
        let (clock, mut policy) = policy();
        settle(&mut policy, 500);
        for _ in 0..5 {
            clock.advance(TimeDelta::from_seconds(1));
            policy.on_tick(&two_sources(), stats(500, 350, 0), &no_pause());
        }
        assert_eq!(policy.probe_state(), RateProbeState::ProbePending);

        clock.advance(TimeDelta::from_seconds(1));
        policy.on_tick(&two_sources(), stats(500, 350, 2), &no_pause());
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
    }

    #[test]
    fn target_delta_hysteresis() {
        let (clock, mut policy) = policy_with(DownlinkPolicyConfig {
            target_rate_change_trigger_percent: Some(40.0),
            ..Default::default()
        });
        let catalog = vec![
            layer(1, 1, "a", 200),
            layer(1, 2, "a", 500),
            layer(2, 3, "b", 150),
            layer(2, 4, "b", 600),
        ];
        assert_eq!(
            policy.on_tick(&catalog, stats(500, 0, 1), &no_pause()),
            ids(&[1, 3])
        );

        // 660 would fit stream 2, but the target barely moved.
        clock.advance(TimeDelta::from_seconds(3));
        assert_eq!(
            policy.on_tick(&catalog, stats(660, 0, 1), &no_pause()),
            ids(&[1, 3])
        );
        assert_eq!(policy.target_rate(), kbps(660));

        clock.advance(TimeDelta::from_seconds(3));
        assert_eq!(
            policy.on_tick(&catalog, stats(1000, 0, 1), &no_pause()),
            ids(&[1, 4])
        );
    }

    #[test]
    fn empty_catalog() {
        let (clock, mut policy) = policy();
        settle(&mut policy, 500);

        clock.advance(TimeDelta::from_seconds(1));
        let receive_set = policy.on_tick(&[], stats(500, 0, 1), &no_pause());
        assert!(receive_set.is_empty());
        assert!(policy.optimal().is_empty());
        assert!(policy.wants_resubscribe());

        clock.advance(TimeDelta::from_seconds(1));
        assert!(policy.on_tick(&[], stats(500, 0, 1), &no_pause()).is_empty());
        assert!(!policy.wants_resubscribe());
    }

    #[test]
    fn zero_bitrate_catalog() {
        let (_, mut policy) = policy();
        let catalog = vec![
            RemoteStreamDescriptor::new(1, 1, "a", 0, 0),
            RemoteStreamDescriptor::new(2, 2, "b", 0, 0),
        ];
        let receive_set = policy.on_tick(&catalog, LinkStatistics::default(), &no_pause());
        assert_eq!(receive_set, ids(&[1, 2]));
    }

    #[test]
    fn reset_restores_startup() {
        let (clock, mut policy) = policy();
        start_probe(&clock, &mut policy);

        policy.reset();
        assert!(policy.in_startup_period());
        assert_eq!(policy.probe_state(), RateProbeState::NotProbing);
        assert!(policy.optimal().is_empty());
        assert!(policy.subscribed().is_empty());
        assert_eq!(policy.target_rate(), kbps(2800));

        let receive_set = policy.on_tick(&two_sources(), LinkStatistics::default(), &no_pause());
        assert_eq!(receive_set, ids(&[2, 4]));
    }
}
