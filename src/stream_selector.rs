/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::cmp::Ordering;

use crate::api::{
    stream_index::{RemoteStreamDescriptor, StreamIdSet},
    units::DataRate,
};

/// The next step up the bitrate ladder that did not fit the budget: either a
/// source that could not be admitted at all, or a higher layer of a source
/// already chosen. `delta` is what taking it would add to the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCandidate {
    pub stream: RemoteStreamDescriptor,
    pub delta: DataRate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSelection {
    /// At most one layer per group.
    pub chosen: Vec<RemoteStreamDescriptor>,
    /// Sum of the chosen avg bitrates, screen share included.
    pub total: DataRate,
    pub upgrade: Option<UpgradeCandidate>,
    /// Increase of the last upgrade applied, zero if none.
    pub last_upgrade_rate: DataRate,
}

impl StreamSelection {
    pub fn stream_ids(&self) -> StreamIdSet {
        self.chosen.iter().collect()
    }

    /// True when `previous` holds exactly the same stream ids, in any order.
    pub fn same_streams_as(&self, previous: &[RemoteStreamDescriptor]) -> bool {
        previous.len() == self.chosen.len()
            && previous.iter().all(|last| {
                self.chosen
                    .iter()
                    .any(|stream| stream.stream_id == last.stream_id)
            })
    }

    /// Takes `candidate` on top of the current choice, replacing the layer
    /// of the same group if there is one. Returns the bitrate added.
    pub fn apply_upgrade(&mut self, candidate: &UpgradeCandidate) -> DataRate {
        let upgrade = &candidate.stream;
        let increase = match self
            .chosen
            .iter_mut()
            .find(|stream| stream.group_id == upgrade.group_id)
        {
            Some(slot) => {
                let increase = upgrade.avg_bitrate - slot.avg_bitrate;
                tracing::info!(
                    "Upgrading stream {} to {} in group {} (+{:?})",
                    slot.stream_id,
                    upgrade.stream_id,
                    upgrade.group_id,
                    increase
                );
                *slot = upgrade.clone();
                increase
            }
            None => {
                tracing::info!(
                    "Adding stream {} of group {} (+{:?})",
                    upgrade.stream_id,
                    upgrade.group_id,
                    upgrade.avg_bitrate
                );
                self.chosen.push(upgrade.clone());
                upgrade.avg_bitrate
            }
        };
        self.total += increase;
        self.last_upgrade_rate = increase;
        increase
    }
}

/// Replaces missing or inconsistent avg bitrates. A zero avg means the
/// server has not measured the layer yet; an avg above max can't be right
/// either. Low bitrate screen share trusts its avg, everything else its max.
pub fn normalize_bitrates(
    streams: &mut [RemoteStreamDescriptor],
    content_low_bitrate_threshold: DataRate,
) {
    for stream in streams.iter_mut() {
        if stream.avg_bitrate.is_zero() || stream.avg_bitrate > stream.max_bitrate {
            if stream.is_content_share() && stream.max_bitrate < content_low_bitrate_threshold {
                stream.max_bitrate = stream.avg_bitrate;
            } else {
                stream.avg_bitrate = stream.max_bitrate;
            }
        }
    }
}

/// Smallest non-zero avg bitrate on offer, zero if there is none.
pub fn cheapest_layer_rate(streams: &[RemoteStreamDescriptor]) -> DataRate {
    streams
        .iter()
        .map(|stream| stream.avg_bitrate)
        .filter(|rate| !rate.is_zero())
        .min()
        .unwrap_or_default()
}

fn selection_order(a: &&RemoteStreamDescriptor, b: &&RemoteStreamDescriptor) -> Ordering {
    a.max_bitrate
        .cmp(&b.max_bitrate)
        .then(a.stream_id.cmp(&b.stream_id))
}

/// Greedy layer selection under `target`.
///
/// Screen share is admitted first regardless of the budget. Then every other
/// source gets its cheapest layer that fits, in ascending bitrate order.
/// Finally chosen layers are stepped up one layer at a time, round robin,
/// until no step fits. The result depends on this order and is not the
/// knapsack optimum.
pub fn select_streams(candidates: &[RemoteStreamDescriptor], target: DataRate) -> StreamSelection {
    let mut sorted: Vec<&RemoteStreamDescriptor> = candidates.iter().collect();
    sorted.sort_by(selection_order);

    let mut selection = StreamSelection::default();
    let has_group = |chosen: &[RemoteStreamDescriptor], group_id| {
        chosen.iter().any(|stream| stream.group_id == group_id)
    };

    for stream in sorted.iter().filter(|stream| stream.is_content_share()) {
        if !has_group(&selection.chosen, stream.group_id) {
            selection.total += stream.avg_bitrate;
            selection.chosen.push((*stream).clone());
        }
    }

    for stream in &sorted {
        if has_group(&selection.chosen, stream.group_id) {
            continue;
        }
        if selection.total + stream.avg_bitrate <= target {
            selection.total += stream.avg_bitrate;
            selection.chosen.push((*stream).clone());
        } else if selection.upgrade.is_none() {
            selection.upgrade = Some(UpgradeCandidate {
                stream: (*stream).clone(),
                delta: stream.avg_bitrate,
            });
        }
    }

    loop {
        let mut upgraded = false;
        let mut cheapest_failed: Option<UpgradeCandidate> = None;
        for slot in 0..selection.chosen.len() {
            let current = &selection.chosen[slot];
            let Some(next) = next_layer(&sorted, current) else {
                continue;
            };
            let increase = next.avg_bitrate - current.avg_bitrate;
            if selection.total + increase <= target {
                tracing::debug!(
                    "Stepping group {} up from stream {} to {} (+{:?})",
                    current.group_id,
                    current.stream_id,
                    next.stream_id,
                    increase
                );
                selection.total += increase;
                selection.chosen[slot] = next.clone();
                selection.last_upgrade_rate = increase;
                upgraded = true;
            } else if cheapest_failed
                .as_ref()
                .map_or(true, |failed| increase < failed.delta)
            {
                cheapest_failed = Some(UpgradeCandidate {
                    stream: next.clone(),
                    delta: increase,
                });
            }
        }
        if !upgraded {
            if selection.upgrade.is_none() {
                selection.upgrade = cheapest_failed;
            }
            break;
        }
    }

    selection
}

// The cheapest layer of the same group that is strictly better than `current`.
fn next_layer<'a>(
    sorted: &[&'a RemoteStreamDescriptor],
    current: &RemoteStreamDescriptor,
) -> Option<&'a RemoteStreamDescriptor> {
    sorted
        .iter()
        .copied()
        .filter(|stream| {
            stream.group_id == current.group_id
                && stream.avg_bitrate > current.avg_bitrate
                && stream.max_bitrate >= current.max_bitrate
        })
        .min_by(|a, b| {
            a.avg_bitrate
                .cmp(&b.avg_bitrate)
                .then_with(|| selection_order(a, b))
        })
}
