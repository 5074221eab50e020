/*
 *  Copyright (c) 2018 The WebRTC project authors. All Rights Reserved.
 *
 *  Use of this source code is governed by a BSD-style license
 *  that can be found in the LICENSE file in the root of the source
 *  tree. An additional intellectual property rights grant can be found
 *  in the file PATENTS.  All contributing project authors may
 *  be found in the AUTHORS file in the root of the source tree.
 */
use std::collections::BTreeSet;
use std::fmt;

use super::units::DataRate;

/// Attendee ids of screen-share sources carry this suffix.
pub const CONTENT_SHARE_MODALITY: &str = "#content";

pub type GroupId = u32;
pub type StreamId = u32;

/// One simulcast layer of a remote participant's video, as advertised by the
/// server. Layers sharing a `group_id` are alternatives for the same source.
/// An `avg_bitrate` of zero means the server has no measurement yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStreamDescriptor {
    pub group_id: GroupId,
    pub stream_id: StreamId,
    pub attendee_id: String,
    pub max_bitrate: DataRate,
    pub avg_bitrate: DataRate,
}

impl RemoteStreamDescriptor {
    pub fn new(
        group_id: GroupId,
        stream_id: StreamId,
        attendee_id: impl Into<String>,
        max_bitrate_kbps: i64,
        avg_bitrate_kbps: i64,
    ) -> Self {
        Self {
            group_id,
            stream_id,
            attendee_id: attendee_id.into(),
            max_bitrate: DataRate::from_kilobits_per_sec(max_bitrate_kbps),
            avg_bitrate: DataRate::from_kilobits_per_sec(avg_bitrate_kbps),
        }
    }

    pub fn is_content_share(&self) -> bool {
        self.attendee_id.ends_with(CONTENT_SHARE_MODALITY)
    }

    // Identity used for catalog change detection. Avg bitrate changes on
    // every refresh and is not part of it.
    pub(crate) fn catalog_key(&self) -> (GroupId, StreamId, DataRate) {
        (self.group_id, self.stream_id, self.max_bitrate)
    }
}

/// A set of stream ids to receive. Ordered so that logs and comparisons are
/// deterministic.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StreamIdSet(BTreeSet<StreamId>);

impl StreamIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stream_id: StreamId) -> bool {
        self.0.insert(stream_id)
    }

    pub fn remove(&mut self, stream_id: StreamId) -> bool {
        self.0.remove(&stream_id)
    }

    pub fn contains(&self, stream_id: StreamId) -> bool {
        self.0.contains(&stream_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<StreamId> {
        self.iter().collect()
    }
}

impl FromIterator<StreamId> for StreamIdSet {
    fn from_iter<I: IntoIterator<Item = StreamId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a RemoteStreamDescriptor> for StreamIdSet {
    fn from_iter<I: IntoIterator<Item = &'a RemoteStreamDescriptor>>(iter: I) -> Self {
        iter.into_iter().map(|stream| stream.stream_id).collect()
    }
}

impl fmt::Debug for StreamIdSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_content_share() {
        let camera = RemoteStreamDescriptor::new(1, 1, "attendee-a", 600, 500);
        let content = RemoteStreamDescriptor::new(2, 3, "attendee-a#content", 1200, 0);
        assert!(!camera.is_content_share());
        assert!(content.is_content_share());
        assert_eq!(content.avg_bitrate, DataRate::zero());
    }

    #[test]
    fn set_equality_ignores_insertion_order() {
        let a: StreamIdSet = [3, 1, 2].into_iter().collect();
        let mut b = StreamIdSet::new();
        b.add(1);
        b.add(2);
        b.add(3);
        assert_eq!(a, b);
        assert_eq!(a.to_vec(), vec![1, 2, 3]);
        assert!(b.remove(2));
        assert!(!b.contains(2));
        assert_eq!(format!("{:?}", b), "{1, 3}");
    }
}
