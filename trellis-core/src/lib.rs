//! Kiểu dữ liệu lõi cho bộ máy gom nhóm và trellis của dữ liệu lâm sàng.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

mod bin;
mod group_by;
mod interval;
mod model;
mod value;

pub use bin::{exact_i64, Bin, DateUnit};
pub use group_by::{GroupBy, GroupByParams, StartDateRule, TimestampType};
pub use interval::Interval;
pub use model::{DateField, Event, EventKind, Subject};
pub use value::{format_numeric, Value};

/// Nhãn hiển thị của giá trị rỗng.
pub const EMPTY_LABEL: &str = "(Empty)";

/// Nhãn đã hiển thị có phải nhãn rỗng không, không phân biệt hoa thường ASCII.
pub fn is_empty_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(EMPTY_LABEL)
}

/// Cấu hình bộ máy tổng hợp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Số sự kiện tối thiểu để chuyển sang phân giải song song.
    pub parallel_threshold: usize,
    /// Mốc neo cho bin ngày/tuần/tháng tuyệt đối.
    pub date_anchor: NaiveDate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 512,
            // Thứ Hai, để bin tuần chạy từ Thứ Hai tới Chủ Nhật.
            date_anchor: NaiveDate::from_ymd_opt(1970, 1, 5).unwrap_or_default(),
        }
    }
}

/// Một trục trellis và các giá trị phân biệt đã sắp xếp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrellisOption {
    pub axis: String,
    pub values: Vec<String>,
}

/// Lỗi cấu hình và lỗi đọc dữ liệu.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrellisError {
    #[error("Unknown axis: {0}")]
    UnknownAxis(String),
    #[error("Axis {axis} does not support option {option}")]
    UnsupportedOption { axis: String, option: String },
    #[error("Axis {axis}: bin size must be positive")]
    InvalidBinSize { axis: String },
    #[error("No period calculation for timestamp type {timestamp_type} with start date rule {start_date_rule}")]
    UnsupportedPeriod {
        timestamp_type: TimestampType,
        start_date_rule: StartDateRule,
    },
    #[error("Timestamp type {0} is not a relative period")]
    NotAPeriod(TimestampType),
    #[error("Axis {axis}: start date rule FIRST_DOSE_OF_DRUG requires a drug name")]
    MissingDrugName { axis: String },
    #[error("Unknown timestamp type: {0}")]
    UnknownTimestampType(String),
    #[error("Unknown start date rule: {0}")]
    UnknownStartDateRule(String),
    #[error("Could not read data: {0}")]
    Parse(String),
}

impl TrellisError {
    /// Lỗi cấu hình là lỗi phía gọi, báo như lỗi client.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, TrellisError::Parse(_))
    }
}
