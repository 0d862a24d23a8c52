use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Value;

/// Bệnh nhân/đối tượng nghiên cứu cùng các mốc thời gian tham chiếu.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub baseline_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_treatment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub randomisation_date: Option<DateTime<Utc>>,
    /// Ngày dùng liều đầu tiên theo tên thuốc.
    #[serde(default)]
    pub first_dose_dates: BTreeMap<String, DateTime<Utc>>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn first_dose_of(&self, drug: &str) -> Option<DateTime<Utc>> {
        self.first_dose_dates.get(drug).copied()
    }
}

/// Nhóm dữ liệu lâm sàng của sự kiện.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AdverseEvent,
    LabResult,
    Vital,
    TumourAssessment,
    Therapy,
    Other,
}

/// Trường ngày của sự kiện mà một trục đọc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Start,
    End,
}

/// Một bản ghi lâm sàng. Chỉ đọc sau khi nạp.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub subject: Arc<Subject>,
    pub kind: EventKind,
    /// Ngày khởi phát, ngày đo hoặc ngày dùng thuốc tùy loại sự kiện.
    pub start: Option<DateTime<Utc>>,
    /// `None` khi đang tiếp diễn hoặc với bản ghi tại một thời điểm.
    pub end: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(id: impl Into<String>, subject: Arc<Subject>, kind: EventKind) -> Self {
        Self {
            id: id.into(),
            subject,
            kind,
            start: None,
            end: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_dates(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn subject_id(&self) -> &str {
        &self.subject.id
    }

    /// Thuộc tính vắng mặt trả về [`Value::Empty`].
    pub fn attribute(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Empty)
    }

    pub fn date(&self, field: DateField) -> Option<DateTime<Utc>> {
        match field {
            DateField::Start => self.start,
            DateField::End => self.end,
        }
    }
}
