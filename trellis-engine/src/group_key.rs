use rayon::prelude::*;
use serde::Serialize;
use trellis_core::{Event, Value};

use crate::resolver::{AttributeResolver, AxisKind, AxisPlan};

/// Resolved axis values of one event, in group-by order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GroupKey {
    entries: Vec<(String, Value)>,
}

impl GroupKey {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, axis: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// One key per combination of range items. Scalar entries are kept as-is;
    /// an empty range list expands to [`Value::Empty`].
    pub fn expand_ranges(&self) -> Vec<GroupKey> {
        self.entries
            .iter()
            .fold(vec![GroupKey::default()], |keys, (axis, value)| {
                let items: Vec<Value> = match value {
                    Value::List(items) if items.is_empty() => vec![Value::Empty],
                    Value::List(items) => items.clone(),
                    other => vec![other.clone()],
                };
                keys.iter()
                    .flat_map(|key| {
                        items.iter().map(move |item| {
                            let mut entries = key.entries.clone();
                            entries.push((axis.clone(), item.clone()));
                            GroupKey { entries }
                        })
                    })
                    .collect()
            })
    }
}

pub fn group_key(resolver: &AttributeResolver<'_>, plans: &[AxisPlan], event: &Event) -> GroupKey {
    GroupKey::new(
        plans
            .iter()
            .map(|plan| {
                let value = resolver.resolve(plan, event);
                // Only range axes keep list values as separate items; elsewhere
                // a list is one rendered item.
                let value = match (plan.kind, value) {
                    (AxisKind::Range, value) => value,
                    (_, Value::List(items)) if items.is_empty() => Value::Empty,
                    (_, list @ Value::List(_)) => Value::Text(list.to_string()),
                    (_, value) => value,
                };
                (plan.axis().to_string(), value)
            })
            .collect(),
    )
}

/// Keys for every event, in event order.
pub fn group_keys(
    resolver: &AttributeResolver<'_>,
    plans: &[AxisPlan],
    events: &[Event],
    parallel_threshold: usize,
) -> Vec<GroupKey> {
    if events.len() >= parallel_threshold {
        events
            .par_iter()
            .map(|event| group_key(resolver, plans, event))
            .collect()
    } else {
        events
            .iter()
            .map(|event| group_key(resolver, plans, event))
            .collect()
    }
}
