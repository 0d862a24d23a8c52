use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DateUnit, TrellisError};

/// Cách diễn giải trục thời gian.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampType {
    /// Ngày lịch tuyệt đối.
    Date,
    Days,
    DaysWithHours,
    Weeks,
}

impl TimestampType {
    /// Giá trị có phải khoảng thời gian tính từ mốc tham chiếu không.
    pub fn is_period(&self) -> bool {
        !matches!(self, TimestampType::Date)
    }
}

impl FromStr for TimestampType {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DATE" => Ok(TimestampType::Date),
            "DAYS" => Ok(TimestampType::Days),
            "DAYS_WITH_HOURS" => Ok(TimestampType::DaysWithHours),
            "WEEKS" => Ok(TimestampType::Weeks),
            other => Err(TrellisError::UnknownTimestampType(other.to_string())),
        }
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimestampType::Date => "DATE",
            TimestampType::Days => "DAYS",
            TimestampType::DaysWithHours => "DAYS_WITH_HOURS",
            TimestampType::Weeks => "WEEKS",
        })
    }
}

/// Mốc tham chiếu để tính khoảng thời gian tương đối.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartDateRule {
    FirstDose,
    Randomisation,
    /// Cần `drug_name`.
    FirstDoseOfDrug,
}

impl FromStr for StartDateRule {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIRST_DOSE" => Ok(StartDateRule::FirstDose),
            "RANDOMISATION" => Ok(StartDateRule::Randomisation),
            "FIRST_DOSE_OF_DRUG" => Ok(StartDateRule::FirstDoseOfDrug),
            other => Err(TrellisError::UnknownStartDateRule(other.to_string())),
        }
    }
}

impl fmt::Display for StartDateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StartDateRule::FirstDose => "FIRST_DOSE",
            StartDateRule::Randomisation => "RANDOMISATION",
            StartDateRule::FirstDoseOfDrug => "FIRST_DOSE_OF_DRUG",
        })
    }
}

/// Tham số cấu hình của một trục nhóm.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupByParams {
    pub bin_size: Option<u32>,
    pub bin_includes_duration: bool,
    pub timestamp_type: Option<TimestampType>,
    pub start_date_rule: Option<StartDateRule>,
    pub drug_name: Option<String>,
    /// Đơn vị thùng lịch cho trục `DATE` tuyệt đối.
    pub date_unit: Option<DateUnit>,
}

/// Mô tả một trục nhóm do lớp cấu hình cung cấp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupBy {
    pub axis: String,
    #[serde(default)]
    pub params: GroupByParams,
}

impl GroupBy {
    pub fn new(axis: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            params: GroupByParams::default(),
        }
    }

    pub fn bin_size(mut self, size: u32) -> Self {
        self.params.bin_size = Some(size);
        self
    }

    pub fn including_duration(mut self) -> Self {
        self.params.bin_includes_duration = true;
        self
    }

    pub fn timestamp(mut self, timestamp_type: TimestampType) -> Self {
        self.params.timestamp_type = Some(timestamp_type);
        self
    }

    pub fn start_date_rule(mut self, rule: StartDateRule) -> Self {
        self.params.start_date_rule = Some(rule);
        self
    }

    pub fn drug(mut self, drug_name: impl Into<String>) -> Self {
        self.params.drug_name = Some(drug_name.into());
        self
    }

    pub fn date_unit(mut self, unit: DateUnit) -> Self {
        self.params.date_unit = Some(unit);
        self
    }
}
