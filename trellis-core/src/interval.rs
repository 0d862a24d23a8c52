use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Khoảng thời gian kèm nguồn gốc (các bản ghi đã được gộp vào).
///
/// `start == None`: không rõ ngày bắt đầu; `end == None`: đang tiếp diễn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interval<S> {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Bật khi khoảng này hoặc bất kỳ khoảng nào đã gộp vào không có ngày bắt đầu.
    pub unknown_start: bool,
    pub sources: Vec<S>,
}

impl<S> Interval<S> {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, source: S) -> Self {
        Self {
            start,
            end,
            unknown_start: start.is_none(),
            sources: vec![source],
        }
    }
}
