use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::types::Channel;

/// Latest display string per channel. Only the most recent value is kept.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    values: BTreeMap<Channel, String>,
    updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Snapshot with every channel present and empty.
    pub fn empty(channels: &[Channel]) -> Self {
        Self {
            values: channels.iter().map(|c| (*c, String::new())).collect(),
            updated_at: None,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.values.get(&channel).map(String::as_str)
    }

    pub fn channels(&self) -> impl Iterator<Item = (Channel, &str)> {
        self.values.iter().map(|(c, v)| (*c, v.as_str()))
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.updated_at.is_none()
    }

    fn set(&mut self, channel: Channel, value: String, at: DateTime<Utc>) {
        self.values.insert(channel, value);
        self.updated_at = Some(at);
    }

    /// Folds `other` into `self`, keeping the newer timestamp.
    pub(crate) fn absorb(&mut self, other: &Snapshot) {
        for (channel, value) in &other.values {
            self.values.insert(*channel, value.clone());
        }
        self.updated_at = self.updated_at.max(other.updated_at);
    }
}

/// Single-writer cell holding one source's [`Snapshot`].
///
/// The writer is the provider's callback context; readers either poll
/// [`SnapshotCell::current`] or await changes on a [`watch::Receiver`].
pub struct SnapshotCell {
    tx: watch::Sender<Snapshot>,
}

impl SnapshotCell {
    pub fn new(channels: &[Channel]) -> Self {
        let (tx, _rx) = watch::channel(Snapshot::empty(channels));
        Self { tx }
    }

    /// Overwrites the given channels and notifies observers once.
    pub fn publish<I>(&self, updates: I, at: DateTime<Utc>)
    where
        I: IntoIterator<Item = (Channel, String)>,
    {
        self.tx.send_modify(|snapshot| {
            for (channel, value) in updates {
                snapshot.set(channel, value, at);
            }
        });
    }

    pub fn current(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}
