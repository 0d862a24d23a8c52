//! JSON loading of subjects and their events.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use trellis_core::{Event, EventKind, Subject, TrellisError, Value};

#[derive(Deserialize)]
struct RawDataset {
    #[serde(default)]
    subjects: Vec<Subject>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    subject_id: String,
    #[serde(default = "default_kind")]
    kind: EventKind,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

fn default_kind() -> EventKind {
    EventKind::Other
}

/// Subjects and their events, each event sharing its subject.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    subjects: Vec<Arc<Subject>>,
    events: Vec<Event>,
}

impl Dataset {
    pub fn from_json_str(json: &str) -> Result<Self, TrellisError> {
        let raw: RawDataset =
            serde_json::from_str(json).map_err(|err| TrellisError::Parse(err.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDataset) -> Result<Self, TrellisError> {
        let subjects: Vec<Arc<Subject>> = raw.subjects.into_iter().map(Arc::new).collect();
        let mut by_id: HashMap<&str, &Arc<Subject>> = HashMap::with_capacity(subjects.len());
        for subject in &subjects {
            if by_id.insert(subject.id.as_str(), subject).is_some() {
                return Err(TrellisError::Parse(format!(
                    "Duplicate subject id {}",
                    subject.id
                )));
            }
        }

        let events = raw
            .events
            .into_iter()
            .map(|event| -> Result<Event, TrellisError> {
                let subject = by_id.get(event.subject_id.as_str()).ok_or_else(|| {
                    TrellisError::Parse(format!(
                        "Event {} references unknown subject {}",
                        event.id, event.subject_id
                    ))
                })?;
                Ok(Event {
                    id: event.id,
                    subject: Arc::clone(subject),
                    kind: event.kind,
                    start: event.start,
                    end: event.end,
                    attributes: event.attributes,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            subjects = subjects.len(),
            events = events.len(),
            "dataset loaded"
        );
        Ok(Self { subjects, events })
    }

    pub fn subjects(&self) -> &[Arc<Subject>] {
        &self.subjects
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn subject(&self, id: &str) -> Option<&Arc<Subject>> {
        self.subjects.iter().find(|subject| subject.id == id)
    }
}
