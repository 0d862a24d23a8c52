//! Overlap detection and consolidation of date intervals.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::trace;
use trellis_core::Interval;

/// Orders the pair by start date, unknown starts first.
fn canonical<'a, S>(a: &'a Interval<S>, b: &'a Interval<S>) -> (&'a Interval<S>, &'a Interval<S>) {
    match (a.start, b.start) {
        (Some(sa), Some(sb)) if sb < sa => (b, a),
        (Some(_), None) => (b, a),
        _ => (a, b),
    }
}

/// Whole calendar days from `end` to `start`.
fn gap_days(end: DateTime<Utc>, start: DateTime<Utc>) -> i64 {
    (start.date_naive() - end.date_naive()).num_days()
}

/// Whether two intervals overlap, allowing a gap of up to `shift` days.
///
/// The day gap is only computed when the earlier interval has an end and the
/// later one a start; every other shape is an exact overlap already.
pub fn overlaps<S>(a: &Interval<S>, b: &Interval<S>, shift: u32) -> bool {
    if a.start.is_some() && a.start == b.start {
        return true;
    }
    let (earlier, later) = canonical(a, b);
    match (earlier.end, later.start) {
        (Some(end), Some(start)) => end >= start || gap_days(end, start) <= i64::from(shift),
        // Ongoing, or both unbounded before.
        _ => true,
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        // Ongoing wins.
        _ => None,
    }
}

/// Combines two intervals: earliest known start, latest end, both provenances.
pub fn merge_pair<S>(a: Interval<S>, b: Interval<S>) -> Interval<S> {
    let mut sources = a.sources;
    sources.extend(b.sources);
    Interval {
        start: earliest(a.start, b.start),
        end: latest(a.end, b.end),
        unknown_start: a.unknown_start || b.unknown_start,
        sources,
    }
}

/// Consolidates intervals already sorted by end date, most recent first.
///
/// Each interval is compared with the block built so far; the descending end
/// order means a block can only grow backwards in time, so one pass suffices.
pub fn merge_sorted<S>(intervals: Vec<Interval<S>>, shift: u32) -> Vec<Interval<S>> {
    let input = intervals.len();
    let merged = intervals
        .into_iter()
        .fold(Vec::with_capacity(input), |mut merged: Vec<Interval<S>>, next| {
            match merged.pop() {
                Some(block) if overlaps(&block, &next, shift) => {
                    merged.push(merge_pair(block, next))
                }
                Some(block) => {
                    merged.push(block);
                    merged.push(next);
                }
                None => merged.push(next),
            }
            merged
        });
    trace!(input, output = merged.len(), shift, "intervals merged");
    merged
}

/// Orders ongoing intervals first, then by end date descending.
/// Stable, so equal ends keep their input order.
pub fn sort_by_end_desc<S>(intervals: &mut [Interval<S>]) {
    intervals.sort_by(|a, b| match (a.end, b.end) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    });
}

/// Sorts then merges arbitrary intervals.
pub fn consolidate<S>(mut intervals: Vec<Interval<S>>, shift: u32) -> Vec<Interval<S>> {
    sort_by_end_desc(&mut intervals);
    merge_sorted(intervals, shift)
}

/// The most recent consolidated block, e.g. the latest line of therapy.
pub fn most_recent_therapy<S>(intervals: Vec<Interval<S>>, shift: u32) -> Option<Interval<S>> {
    consolidate(intervals, shift).into_iter().next()
}
