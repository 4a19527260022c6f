//! Regrouping pool for collecting reduced channels before the global pass.

use crate::error::ReductionError;
use std::collections::BTreeMap;

/// Pool collecting per-channel results keyed by channel index.
///
/// Acts as the barrier between the per-channel stages and the pass over
/// all channels of a file: results can only be collected once every
/// expected channel has arrived, and they come back in index order.
#[derive(Debug)]
pub struct ChannelPool<T> {
    slots: BTreeMap<usize, T>,
    /// Expected total number of channels.
    expected_count: usize,
}

impl<T> ChannelPool<T> {
    /// Create with expected channel count.
    pub fn with_expected_count(expected: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            expected_count: expected,
        }
    }

    /// Deposit the result of channel `index`, replacing an earlier one.
    pub fn add(&mut self, index: usize, item: T) {
        if self.slots.insert(index, item).is_some() {
            log::warn!("channel {index} deposited twice, keeping the latest result");
        }
    }

    /// Number of channels that have arrived.
    pub fn arrived(&self) -> usize {
        self.slots.len()
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Check if every expected channel has arrived.
    pub fn is_complete(&self) -> bool {
        self.expected_count > 0
            && (0..self.expected_count).all(|i| self.slots.contains_key(&i))
    }

    /// Drain all channels in index order.
    ///
    /// Fails with [`ReductionError::IncompleteChannels`] while channels are
    /// still missing; the pool is left untouched in that case.
    pub fn collect(&mut self) -> Result<Vec<T>, ReductionError> {
        if !self.is_complete() {
            return Err(ReductionError::IncompleteChannels {
                expected: self.expected_count,
                arrived: self.arrived(),
            });
        }
        Ok(std::mem::take(&mut self.slots).into_values().collect())
    }
}
