//! Distinct-value discovery per axis ("trellis options").

use std::cmp::Ordering;
use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;
use trellis_core::{
    is_empty_label, Bin, EngineConfig, Event, GroupBy, TrellisError, TrellisOption, Value,
    EMPTY_LABEL,
};

use crate::resolver::{AttributeResolver, AxisKind, AxisPlan};

pub struct TrellisDiscoverer<'a> {
    config: &'a EngineConfig,
}

impl<'a> TrellisDiscoverer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Distinct rendered values of each axis across `events`.
    ///
    /// Every descriptor is validated before any event is touched. Axes whose
    /// values are all empty are left out of the result.
    pub fn discover(
        &self,
        events: &[Event],
        group_bys: &[GroupBy],
    ) -> Result<Vec<TrellisOption>, TrellisError> {
        let plans = group_bys
            .iter()
            .map(AxisPlan::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(plans
            .iter()
            .filter_map(|plan| self.discover_axis(events, plan))
            .collect())
    }

    fn discover_axis(&self, events: &[Event], plan: &AxisPlan) -> Option<TrellisOption> {
        let resolver = AttributeResolver::new(self.config);
        let items_of = |event: &Event| items(plan, resolver.resolve(plan, event));

        let resolved: Vec<Vec<Item>> = if events.len() >= self.config.parallel_threshold {
            events.par_iter().map(items_of).collect()
        } else {
            events.iter().map(items_of).collect()
        };

        let mut seen = HashSet::new();
        let mut rendered: Vec<(Item, String)> = resolved
            .into_iter()
            .flatten()
            .map(|item| {
                let label = item.render(plan);
                (item, label)
            })
            .filter(|(_, label)| seen.insert(label.clone()))
            .collect();

        if rendered.iter().all(|(_, label)| is_empty_label(label)) {
            debug!(axis = plan.axis(), "axis has only empty values, omitted");
            return None;
        }

        rendered.sort_by(|(a, a_label), (b, b_label)| {
            compare_items(a, a_label, b, b_label).then_with(|| a_label.cmp(b_label))
        });
        debug!(axis = plan.axis(), values = rendered.len(), "trellis axis discovered");

        Some(TrellisOption {
            axis: plan.axis().to_string(),
            values: rendered.into_iter().map(|(_, label)| label).collect(),
        })
    }
}

/// One displayable entry of an axis, before rendering.
#[derive(Debug)]
enum Item {
    Plain(Value),
    Drug(String, Value),
}

impl Item {
    fn render(&self, plan: &AxisPlan) -> String {
        match self {
            Item::Plain(value) => render_value(plan, value),
            Item::Drug(drug, value) => format!("{drug}--{value}"),
        }
    }
}

/// Splits one resolved value into its display entries.
fn items(plan: &AxisPlan, value: Value) -> Vec<Item> {
    match plan.kind {
        AxisKind::Range => match value {
            Value::List(items) if items.is_empty() => vec![Item::Plain(Value::Empty)],
            Value::List(items) => items.into_iter().map(Item::Plain).collect(),
            other => vec![Item::Plain(other)],
        },
        AxisKind::PerDrug => match value {
            Value::PerDrug(map) => map
                .into_iter()
                .filter(|(drug, _)| !drug.is_empty())
                .map(|(drug, value)| Item::Drug(drug, value))
                .collect(),
            other => vec![Item::Plain(other)],
        },
        AxisKind::Scalar => vec![Item::Plain(value)],
    }
}

fn render_value(plan: &AxisPlan, value: &Value) -> String {
    match (value, plan.def.label) {
        (Value::Empty | Value::Bin(Bin::Empty), _) => EMPTY_LABEL.to_string(),
        (value, Some(label)) => format!("{label} {value}"),
        (value, None) => value.to_string(),
    }
}

/// Empty entries last, then per-drug entries by drug name and value, then
/// plain values in their natural order.
fn compare_items(a: &Item, a_label: &str, b: &Item, b_label: &str) -> Ordering {
    match (is_empty_label(a_label), is_empty_label(b_label)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    match (a, b) {
        (Item::Plain(x), Item::Plain(y)) => compare_values(x, y),
        (Item::Drug(da, x), Item::Drug(db, y)) => {
            compare_alphanumeric(da, db).then_with(|| compare_values(x, y))
        }
        _ => compare_alphanumeric(a_label, b_label),
    }
}

/// Natural ordering for numbers, dates and bins; text and mixed kinds fall
/// back to the alphanumeric comparator on their display form.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Bin(x), Value::Bin(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => compare_alphanumeric(x, y),
        _ => compare_alphanumeric(&a.to_string(), &b.to_string()),
    }
}

/// Alphanumeric ordering with the empty label always last.
///
/// Digit runs compare as integers (`Item2 < Item10`), other runs as text.
pub fn compare_alphanumeric(a: &str, b: &str) -> Ordering {
    match (is_empty_label(a), is_empty_label(b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunks(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
    let y_digits = y.starts_with(|c: char| c.is_ascii_digit());
    if x_digits && y_digits {
        let x = x.trim_start_matches('0');
        let y = y.trim_start_matches('0');
        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
    } else {
        x.cmp(y)
    }
}

/// Splits a string into maximal runs of digits and non-digits.
struct Chunks<'s> {
    rest: &'s str,
}

impl<'s> Chunks<'s> {
    fn new(s: &'s str) -> Self {
        Self { rest: s }
    }
}

impl<'s> Iterator for Chunks<'s> {
    type Item = &'s str;

    fn next(&mut self) -> Option<&'s str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use trellis_core::{EventKind, Subject, TimestampType};

    use super::*;

    fn sorted(mut values: Vec<&str>) -> Vec<&str> {
        values.sort_by(|a, b| compare_alphanumeric(a, b));
        values
    }

    #[test]
    fn numeric_runs_order_as_integers() {
        assert_eq!(
            sorted(vec!["Item2", "Item10", "Item1"]),
            vec!["Item1", "Item2", "Item10"]
        );
        assert_eq!(
            sorted(vec!["10 - 14", "5 - 9", "0 - 4", "100 - 104"]),
            vec!["0 - 4", "5 - 9", "10 - 14", "100 - 104"]
        );
        assert_eq!(compare_alphanumeric("Item007", "Item7"), Ordering::Equal);
        assert_eq!(compare_alphanumeric("Item", "Item1"), Ordering::Less);
    }

    #[test]
    fn empty_always_last() {
        assert_eq!(
            sorted(vec!["(empty)", "b", "(Empty)", "a10", "A", "a2", "(EMPTY)"]),
            vec!["A", "a2", "a10", "b", "(empty)", "(Empty)", "(EMPTY)"]
        );
    }

    #[test]
    fn huge_digit_runs_do_not_overflow() {
        assert_eq!(
            compare_alphanumeric("x99999999999999999999999", "x100000000000000000000000"),
            Ordering::Less
        );
    }

    fn graded(grades: &[Option<f64>]) -> Vec<Event> {
        let subject = Arc::new(Subject::new("S-1"));
        grades
            .iter()
            .enumerate()
            .map(|(i, grade)| {
                let event = Event::new(format!("AE-{i}"), subject.clone(), EventKind::AdverseEvent);
                match grade {
                    Some(grade) => event.with_attribute("grade", *grade),
                    None => event,
                }
            })
            .collect()
    }

    #[test]
    fn severity_options_sort_with_empty_last() {
        let config = EngineConfig::default();
        let events = graded(&[Some(1.0), Some(2.0), Some(2.0), None, Some(3.0)]);
        let options = TrellisDiscoverer::new(&config)
            .discover(&events, &[GroupBy::new("severity")])
            .unwrap();
        assert_eq!(
            options,
            vec![TrellisOption {
                axis: "severity".to_string(),
                values: vec![
                    "CTC Grade 1".to_string(),
                    "CTC Grade 2".to_string(),
                    "CTC Grade 3".to_string(),
                    "(Empty)".to_string(),
                ],
            }]
        );
    }

    #[test]
    fn all_empty_axes_are_omitted() {
        let config = EngineConfig::default();
        let events = graded(&[None, None]);
        let options = TrellisDiscoverer::new(&config)
            .discover(&events, &[GroupBy::new("severity"), GroupBy::new("subject")])
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].axis, "subject");

        assert!(TrellisDiscoverer::new(&config)
            .discover(&[], &[GroupBy::new("severity")])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn per_drug_values_are_flattened() {
        let config = EngineConfig::default();
        let subject = Arc::new(Subject::new("S-1"));
        let mut doses = BTreeMap::new();
        doses.insert("Drug A".to_string(), Value::Number(100.0));
        doses.insert(String::new(), Value::Number(5.0));
        doses.insert("Drug B".to_string(), Value::Empty);
        let events = vec![
            Event::new("EX-1", subject.clone(), EventKind::Therapy)
                .with_attribute("dose", Value::PerDrug(doses)),
            Event::new("EX-2", subject, EventKind::Therapy),
        ];
        let options = TrellisDiscoverer::new(&config)
            .discover(&events, &[GroupBy::new("dose")])
            .unwrap();
        assert_eq!(
            options[0].values,
            vec!["Drug A--100", "Drug B--(Empty)", "(Empty)"]
        );
    }

    #[test]
    fn range_values_are_flattened() {
        let config = EngineConfig::default();
        let subject = {
            let mut s = Subject::new("S-1");
            s.first_treatment_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
            Arc::new(s)
        };
        let day = |d| Some(Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        let events = vec![
            Event::new("AE-1", subject.clone(), EventKind::AdverseEvent).with_dates(day(1), day(15)),
            Event::new("AE-2", subject.clone(), EventKind::AdverseEvent).with_dates(day(20), None),
            Event::new("AE-3", subject, EventKind::AdverseEvent).with_dates(day(8), day(9)),
        ];
        let group_by = GroupBy::new("start_date")
            .timestamp(TimestampType::Weeks)
            .including_duration();
        let options = TrellisDiscoverer::new(&config)
            .discover(&events, &[group_by])
            .unwrap();
        assert_eq!(options[0].values, vec!["0", "1", "2", "(Empty)"]);
    }

    #[test]
    fn negative_relative_bins_sort_chronologically() {
        let config = EngineConfig::default();
        let subject = {
            let mut s = Subject::new("S-1");
            s.first_treatment_date = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
            Arc::new(s)
        };
        let events: Vec<Event> = [1, 10, 20, 28]
            .iter()
            .map(|&d| {
                let start = Some(Utc.with_ymd_and_hms(2024, 2, d, 0, 0, 0).unwrap());
                Event::new(format!("AE-{d}"), subject.clone(), EventKind::AdverseEvent)
                    .with_dates(start, None)
            })
            .collect();
        let group_by = GroupBy::new("start_date")
            .timestamp(TimestampType::Days)
            .bin_size(7);
        let options = TrellisDiscoverer::new(&config)
            .discover(&events, &[group_by])
            .unwrap();
        assert_eq!(
            options[0].values,
            vec!["-35 - -29", "-21 - -15", "-14 - -8", "-7 - -1"]
        );
    }

    #[test]
    fn numbers_sort_by_value_not_by_text() {
        assert_eq!(
            compare_values(&Value::Number(1.25), &Value::Number(1.5)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Number(-10.0), &Value::Number(-2.0)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Text("Item10".into()), &Value::Text("Item2".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn parallel_discovery_matches_sequential() {
        let grades: Vec<Option<f64>> = (0..200)
            .map(|i| if i % 7 == 0 { None } else { Some(f64::from(i % 5)) })
            .collect();
        let events = graded(&grades);
        let sequential = EngineConfig {
            parallel_threshold: usize::MAX,
            ..EngineConfig::default()
        };
        let parallel = EngineConfig {
            parallel_threshold: 1,
            ..EngineConfig::default()
        };
        let group_bys = [GroupBy::new("severity")];
        assert_eq!(
            TrellisDiscoverer::new(&sequential).discover(&events, &group_bys).unwrap(),
            TrellisDiscoverer::new(&parallel).discover(&events, &group_bys).unwrap()
        );
    }

    #[test]
    fn configuration_error_aborts_discovery() {
        let config = EngineConfig::default();
        let result = TrellisDiscoverer::new(&config).discover(
            &graded(&[Some(1.0)]),
            &[GroupBy::new("severity"), GroupBy::new("severity").bin_size(2)],
        );
        assert!(matches!(result, Err(TrellisError::UnsupportedOption { .. })));
    }
}
