//! Interval merge engine.
//!
//! An [`IntervalList`] partitions a window `[start, end)` into contiguous,
//! non-overlapping intervals sorted by start, with no two neighbours sharing a
//! status. Inserting an interval splits the intervals it overlaps at its
//! boundaries, raises the status of every covered segment to the more severe
//! of the two, and then re-merges equal neighbours around the touched region.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{FbInstance, FbStatus};
use crate::error::{CoreError, CoreResult};

/// A half-open time range tagged with a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: FbStatus,
    /// Instances that contributed to this range, deduplicated.
    pub instances: BTreeSet<FbInstance>,
}

impl Interval {
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, status: FbStatus) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidInterval { start, end });
        }
        Ok(Self {
            start,
            end,
            status,
            instances: BTreeSet::new(),
        })
    }

    /// Interval covering exactly one appointment instance.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if the instance ends before it starts.
    pub fn from_instance(instance: FbInstance) -> CoreResult<Self> {
        let mut interval = Self::new(instance.start, instance.end, instance.status)?;
        interval.instances.insert(instance);
        Ok(interval)
    }

    #[must_use]
    pub fn with_instance(mut self, instance: FbInstance) -> Self {
        self.instances.insert(instance);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    /// Truncates `self` at `at` and returns the remainder `[at, end)`.
    fn split_off(&mut self, at: DateTime<Utc>) -> Self {
        let tail = Self {
            start: at,
            end: self.end,
            status: self.status,
            instances: self.instances.clone(),
        };
        self.end = at;
        tail
    }
}

/// Minimal status partition of a bounded window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalList {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    intervals: Vec<Interval>,
}

impl IntervalList {
    /// Creates a list holding a single FREE interval over `[start, end)`.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        Self::filled(start, end, FbStatus::Free)
    }

    /// Creates a list holding a single interval of `status` over `[start, end)`.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn filled(start: DateTime<Utc>, end: DateTime<Utc>, status: FbStatus) -> CoreResult<Self> {
        Ok(Self {
            start,
            end,
            intervals: vec![Interval::new(start, end, status)?],
        })
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `(start, end)` of the window.
    #[must_use]
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    /// Status in effect at `at`, or `None` outside the window.
    #[must_use]
    pub fn status_at(&self, at: DateTime<Utc>) -> Option<FbStatus> {
        if at < self.start || at >= self.end {
            return None;
        }
        Some(self.intervals[self.anchor_index(at)].status)
    }

    /// Merges `candidate` into the partition.
    ///
    /// The candidate is clipped to the window first; anything left empty
    /// after clipping is ignored.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if the candidate ends before it starts.
    pub fn add_interval(&mut self, candidate: Interval) -> CoreResult<()> {
        if candidate.end < candidate.start {
            return Err(CoreError::InvalidInterval {
                start: candidate.start,
                end: candidate.end,
            });
        }

        let start = candidate.start.max(self.start);
        let end = candidate.end.min(self.end);
        if start >= end {
            tracing::trace!(
                start = %candidate.start,
                end = %candidate.end,
                "Interval outside window, ignoring"
            );
            return Ok(());
        }

        let anchor = self.anchor_index(start);
        let mut idx = anchor;

        if self.intervals[idx].start < start {
            let tail = self.intervals[idx].split_off(start);
            self.intervals.insert(idx + 1, tail);
            idx += 1;
        }

        while idx < self.intervals.len() && self.intervals[idx].start < end {
            if self.intervals[idx].end > end {
                let tail = self.intervals[idx].split_off(end);
                self.intervals.insert(idx + 1, tail);
            }
            let segment = &mut self.intervals[idx];
            segment.status = segment.status.combine(candidate.status);
            segment.instances.extend(candidate.instances.iter().cloned());
            idx += 1;
        }

        self.coalesce(anchor.saturating_sub(1), idx);
        Ok(())
    }

    /// Swaps statuses `a` and `b` everywhere, then re-merges neighbours.
    pub fn invert(&mut self, a: FbStatus, b: FbStatus) {
        for interval in &mut self.intervals {
            if interval.status == a {
                interval.status = b;
            } else if interval.status == b {
                interval.status = a;
            } else {
                // other statuses are left alone
            }
        }
        let last = self.intervals.len();
        self.coalesce(0, last);
    }

    /// Index of the interval containing `at`, i.e. the last one starting at or before it.
    fn anchor_index(&self, at: DateTime<Utc>) -> usize {
        self.intervals
            .partition_point(|interval| interval.start <= at)
            .saturating_sub(1)
    }

    /// Merges equal-status neighbours among `intervals[from..=through]`.
    fn coalesce(&mut self, from: usize, through: usize) {
        let mut last = through.min(self.intervals.len().saturating_sub(1));
        let mut idx = from;
        while idx < last {
            if self.intervals[idx].status == self.intervals[idx + 1].status {
                let next = self.intervals.remove(idx + 1);
                let current = &mut self.intervals[idx];
                current.end = next.end;
                current.instances.extend(next.instances);
                last -= 1;
            } else {
                idx += 1;
            }
        }
    }

    /// Checks the partition invariants.
    ///
    /// ## Errors
    /// Returns `CoreError::InvariantViolation` naming the first broken invariant.
    pub fn check_invariants(&self) -> CoreResult<()> {
        let (Some(first), Some(last)) = (self.intervals.first(), self.intervals.last()) else {
            return Err(CoreError::InvariantViolation("interval list is empty"));
        };
        if first.start != self.start || last.end != self.end {
            return Err(CoreError::InvariantViolation(
                "interval list does not span its window",
            ));
        }
        for pair in self.intervals.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(CoreError::InvariantViolation(
                    "interval list is not contiguous",
                ));
            }
            if pair[0].status == pair[1].status {
                return Err(CoreError::InvariantViolation(
                    "adjacent intervals share a status",
                ));
            }
        }
        if self.intervals.iter().any(|i| i.end < i.start) {
            return Err(CoreError::InvariantViolation("interval ends before it starts"));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a IntervalList {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
