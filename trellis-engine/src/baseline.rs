//! Baseline selection for change-from-baseline calculations.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use tracing::debug;
use trellis_core::{Event, Subject, Value};

/// Something that can be chosen as a baseline.
pub trait BaselineCandidate {
    fn event_date(&self) -> Option<DateTime<Utc>>;
}

/// Grouping key for baseline assignment; carries the reference date.
pub trait BaselineKey: Eq + Hash + Clone {
    fn reference_date(&self) -> Option<DateTime<Utc>>;
}

impl BaselineCandidate for Event {
    fn event_date(&self) -> Option<DateTime<Utc>> {
        self.start
    }
}

impl BaselineCandidate for DateTime<Utc> {
    fn event_date(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

/// `(rank, distance)`: rank 0 on or after the reference, 1 before it.
/// On/after candidates always win, whatever their distance.
fn proximity(date: DateTime<Utc>, reference: DateTime<Utc>) -> (u8, i64) {
    let rank = if date >= reference { 0 } else { 1 };
    let distance = date
        .signed_duration_since(reference)
        .num_milliseconds()
        .abs();
    (rank, distance)
}

/// Index of the candidate nearest to `reference`. Earliest index wins exact ties.
pub fn nearest<'a, C, I>(candidates: I, reference: DateTime<Utc>) -> Option<usize>
where
    C: BaselineCandidate + 'a,
    I: IntoIterator<Item = &'a C>,
{
    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            candidate
                .event_date()
                .map(|date| (proximity(date, reference), index))
        })
        .min()
        .map(|(_, index)| index)
}

/// Chooses one baseline per key group and enriches every grouped event with it.
///
/// Events whose key is `None` are passed through untouched, as are groups
/// without a reference date or without any dated candidate. Input order is kept.
pub fn assign_baselines<E, K, KF, MF>(events: Vec<E>, key_fn: KF, merge_fn: MF) -> Vec<E>
where
    E: BaselineCandidate + Clone,
    K: BaselineKey,
    KF: Fn(&E) -> Option<K>,
    MF: Fn(E, &E) -> E,
{
    let keys: Vec<Option<K>> = events.iter().map(&key_fn).collect();

    let mut groups: HashMap<&K, Vec<usize>> = HashMap::new();
    for (index, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            groups.entry(key).or_default().push(index);
        }
    }

    let chosen: HashMap<&K, E> = groups
        .iter()
        .filter_map(|(key, members)| {
            let reference = key.reference_date()?;
            let best = nearest(members.iter().map(|&i| &events[i]), reference)?;
            Some((*key, events[members[best]].clone()))
        })
        .collect();

    debug!(
        groups = groups.len(),
        matched = chosen.len(),
        "baselines assigned"
    );

    events
        .iter()
        .zip(&keys)
        .map(|(event, key)| {
            match key.as_ref().and_then(|key| chosen.get(key)) {
                Some(baseline) => merge_fn(event.clone(), baseline),
                None => event.clone(),
            }
        })
        .collect()
}

/// Picks the summary baseline date among a subject's candidate dates,
/// nearest to the first treatment date.
pub fn choose_summary_baseline(
    dates: &[DateTime<Utc>],
    subject: &Subject,
) -> Option<DateTime<Utc>> {
    let reference = subject.first_treatment_date?;
    let mut distinct: Vec<DateTime<Utc>> = Vec::with_capacity(dates.len());
    for date in dates {
        if !distinct.contains(date) {
            distinct.push(*date);
        }
    }
    nearest(distinct.iter(), reference).map(|index| distinct[index])
}

/// Groups measurements of the same kind for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementKey {
    pub subject_id: String,
    pub measurement: String,
    pub reference: Option<DateTime<Utc>>,
}

impl MeasurementKey {
    /// Keyed by the `measurement` attribute; events without one are excluded.
    pub fn for_event(event: &Event) -> Option<Self> {
        let measurement = match event.attribute("measurement") {
            Value::Text(name) => name,
            _ => return None,
        };
        Some(Self {
            subject_id: event.subject_id().to_string(),
            measurement,
            reference: event.subject.baseline_date,
        })
    }
}

impl BaselineKey for MeasurementKey {
    fn reference_date(&self) -> Option<DateTime<Utc>> {
        self.reference
    }
}

/// Records the baseline on `event`: `baseline_date`, `baseline_value` and,
/// when both values are numeric, `change_from_baseline`.
pub fn with_change_from_baseline(event: Event, baseline: &Event) -> Event {
    let baseline_value = baseline.attribute("value");
    let change = match (event.attribute("value").as_number(), baseline_value.as_number()) {
        (Some(value), Some(base)) => Value::Number(value - base),
        _ => Value::Empty,
    };
    event
        .with_attribute("baseline_date", Value::from_option(baseline.start))
        .with_attribute("baseline_value", baseline_value)
        .with_attribute("change_from_baseline", change)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use trellis_core::EventKind;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn subject(id: &str, baseline: Option<DateTime<Utc>>) -> Arc<Subject> {
        let mut subject = Subject::new(id);
        subject.baseline_date = baseline;
        subject.first_treatment_date = baseline;
        Arc::new(subject)
    }

    fn lab(id: &str, subject: &Arc<Subject>, date: Option<DateTime<Utc>>, value: f64) -> Event {
        Event::new(id, subject.clone(), EventKind::LabResult)
            .with_dates(date, None)
            .with_attribute("measurement", "ALT")
            .with_attribute("value", value)
    }

    #[test]
    fn on_or_after_beats_closer_before() {
        let reference = at(2024, 3, 10);
        let candidates = vec![
            reference - Duration::hours(1),
            reference + Duration::days(1),
        ];
        assert_eq!(nearest(candidates.iter(), reference), Some(1));

        let symmetric = vec![reference - Duration::days(1), reference + Duration::days(1)];
        assert_eq!(nearest(symmetric.iter(), reference), Some(1));
    }

    #[test]
    fn exact_reference_date_wins() {
        let reference = at(2024, 3, 10);
        let candidates = vec![reference + Duration::days(2), reference];
        assert_eq!(nearest(candidates.iter(), reference), Some(1));
    }

    #[test]
    fn falls_back_to_nearest_before() {
        let reference = at(2024, 3, 10);
        let candidates = vec![reference - Duration::days(9), reference - Duration::days(2)];
        assert_eq!(nearest(candidates.iter(), reference), Some(1));
    }

    #[test]
    fn assigns_change_from_baseline_per_group() {
        let s1 = subject("S1", Some(at(2024, 1, 10)));
        let s2 = subject("S2", None);
        let events = vec![
            lab("L1", &s1, Some(at(2024, 1, 5)), 30.0),
            lab("L2", &s1, Some(at(2024, 1, 12)), 40.0),
            lab("L3", &s1, Some(at(2024, 2, 1)), 55.0),
            lab("L4", &s1, None, 60.0),
            lab("L5", &s2, Some(at(2024, 1, 12)), 20.0),
            Event::new("AE1", s1.clone(), EventKind::AdverseEvent),
        ];

        let enriched = assign_baselines(events, MeasurementKey::for_event, with_change_from_baseline);

        let change: Vec<(String, Value)> = enriched
            .iter()
            .map(|e| (e.id.clone(), e.attribute("change_from_baseline")))
            .collect();
        assert_eq!(
            change,
            vec![
                ("L1".to_string(), Value::Number(-10.0)),
                ("L2".to_string(), Value::Number(0.0)),
                ("L3".to_string(), Value::Number(15.0)),
                ("L4".to_string(), Value::Number(20.0)),
                ("L5".to_string(), Value::Empty),
                ("AE1".to_string(), Value::Empty),
            ]
        );
        assert_eq!(
            enriched[0].attribute("baseline_date"),
            Value::Date(at(2024, 1, 12))
        );
        // No reference date for S2: passed through without baseline attributes.
        assert!(!enriched[4].attributes.contains_key("baseline_value"));
    }

    #[test]
    fn summary_baseline_deduplicates_dates() {
        let s = subject("S1", Some(at(2024, 1, 10)));
        let dates = vec![at(2024, 1, 3), at(2024, 1, 3), at(2024, 1, 9), at(2024, 1, 12)];
        assert_eq!(choose_summary_baseline(&dates, &s), Some(at(2024, 1, 12)));

        let earlier_only = vec![at(2024, 1, 3), at(2024, 1, 9), at(2024, 1, 9)];
        assert_eq!(choose_summary_baseline(&earlier_only, &s), Some(at(2024, 1, 9)));

        assert_eq!(choose_summary_baseline(&[], &s), None);
        assert_eq!(choose_summary_baseline(&dates, &Subject::new("S9")), None);
    }
}
