use std::fmt;

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::EMPTY_LABEL;

/// Cận dưới của `i64` dưới dạng `f64`; cận trên (không gồm) là số đối của nó.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;

/// Giá trị số nguyên biểu diễn chính xác trong `i64`, nếu có.
pub fn exact_i64(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= I64_MIN_F64 && value < -I64_MIN_F64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Đơn vị lịch cho bin ngày tháng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateUnit {
    Day,
    Week,
    Month,
}

impl Default for DateUnit {
    fn default() -> Self {
        DateUnit::Day
    }
}

/// Một "thùng" rời rạc trên trục.
///
/// Thứ tự biến thể quan trọng: thứ tự dẫn xuất đặt mọi bin cụ thể trước
/// [`Bin::Empty`], hai bin rỗng bằng nhau.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bin {
    /// `[start, start + size)`, `start` luôn là bội của `size`.
    Numeric { start: i64, size: u32 },
    /// Thùng lịch gồm `size` đơn vị, bắt đầu từ `start`.
    Date {
        start: NaiveDate,
        unit: DateUnit,
        size: u32,
    },
    Empty,
}

impl Bin {
    pub fn is_empty(&self) -> bool {
        matches!(self, Bin::Empty)
    }

    /// Bin kế tiếp cùng độ rộng.
    pub fn next_bin(&self) -> Bin {
        match *self {
            Bin::Numeric { start, size } => match start.checked_add(i64::from(size)) {
                Some(start) => Bin::Numeric { start, size },
                None => Bin::Empty,
            },
            Bin::Date { start, unit, size } => match advance(start, unit, size) {
                Some(start) => Bin::Date { start, unit, size },
                None => Bin::Empty,
            },
            Bin::Empty => Bin::Empty,
        }
    }

    /// Hai bin có cùng dạng trục (loại, đơn vị, độ rộng) hay không.
    pub fn same_shape(&self, other: &Bin) -> bool {
        match (self, other) {
            (Bin::Numeric { size: a, .. }, Bin::Numeric { size: b, .. }) => a == b,
            (
                Bin::Date {
                    unit: ua, size: a, ..
                },
                Bin::Date {
                    unit: ub, size: b, ..
                },
            ) => ua == ub && a == b,
            _ => false,
        }
    }

    /// Kiểm tra thuộc bin số; bin ngày và bin rỗng không chứa số nào.
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Bin::Numeric { start, size } => match exact_i64(value) {
                Some(value) => {
                    let offset = i128::from(value) - i128::from(start);
                    (0..i128::from(size)).contains(&offset)
                }
                None => {
                    let lower = start as f64;
                    value >= lower && value < lower + f64::from(size)
                }
            },
            _ => false,
        }
    }

    /// Cận trên (bao gồm) của bin số.
    pub fn numeric_end(&self) -> Option<i64> {
        match *self {
            Bin::Numeric { start, size } => Some(start + i64::from(size) - 1),
            _ => None,
        }
    }

    /// Ngày cuối cùng mà bin ngày bao phủ.
    pub fn date_end(&self) -> Option<NaiveDate> {
        match *self {
            Bin::Date { start, unit, size } => {
                advance(start, unit, size).and_then(|next| next.pred_opt())
            }
            _ => None,
        }
    }
}

fn advance(start: NaiveDate, unit: DateUnit, size: u32) -> Option<NaiveDate> {
    match unit {
        DateUnit::Day => start.checked_add_signed(Duration::days(i64::from(size))),
        DateUnit::Week => start.checked_add_signed(Duration::weeks(i64::from(size))),
        DateUnit::Month => start.checked_add_months(Months::new(size)),
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Bin::Numeric { start, size: 1 } => write!(f, "{start}"),
            Bin::Numeric { start, size } => {
                write!(f, "{start} - {}", start + i64::from(size) - 1)
            }
            Bin::Date {
                start,
                unit: DateUnit::Month,
                size: 1,
            } => write!(f, "{}", start.format("%Y-%m")),
            Bin::Date {
                start,
                unit: DateUnit::Day,
                size: 1,
            } => write!(f, "{}", start.format("%Y-%m-%d")),
            Bin::Date { start, .. } => match self.date_end() {
                Some(end) => write!(f, "{} - {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
                None => write!(f, "{}", start.format("%Y-%m-%d")),
            },
            Bin::Empty => f.write_str(EMPTY_LABEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_sorts_after_concrete_bins() {
        let mut bins = vec![
            Bin::Empty,
            Bin::Numeric { start: 10, size: 5 },
            Bin::Numeric { start: -5, size: 5 },
        ];
        bins.sort();
        assert_eq!(
            bins,
            vec![
                Bin::Numeric { start: -5, size: 5 },
                Bin::Numeric { start: 10, size: 5 },
                Bin::Empty,
            ]
        );
        assert_eq!(Bin::Empty.cmp(&Bin::Empty), std::cmp::Ordering::Equal);
    }

    #[test]
    fn next_month_bin_handles_year_rollover() {
        let bin = Bin::Date {
            start: day(2023, 11, 1),
            unit: DateUnit::Month,
            size: 2,
        };
        assert_eq!(
            bin.next_bin(),
            Bin::Date {
                start: day(2024, 1, 1),
                unit: DateUnit::Month,
                size: 2,
            }
        );
        assert_eq!(bin.date_end(), Some(day(2023, 12, 31)));
    }

    #[test]
    fn numeric_overflow_yields_empty() {
        let bin = Bin::Numeric {
            start: i64::MAX - 1,
            size: 5,
        };
        assert_eq!(bin.next_bin(), Bin::Empty);
    }

    #[test]
    fn renders_labels() {
        assert_eq!(Bin::Numeric { start: 0, size: 5 }.to_string(), "0 - 4");
        assert_eq!(Bin::Numeric { start: 7, size: 1 }.to_string(), "7");
        assert_eq!(
            Bin::Date {
                start: day(2024, 1, 1),
                unit: DateUnit::Week,
                size: 1
            }
            .to_string(),
            "2024-01-01 - 2024-01-07"
        );
        assert_eq!(Bin::Empty.to_string(), "(Empty)");
    }

    #[test]
    fn contains_is_half_open() {
        let bin = Bin::Numeric { start: 10, size: 5 };
        assert!(bin.contains(10.0));
        assert!(bin.contains(14.9));
        assert!(!bin.contains(15.0));
        assert!(!Bin::Empty.contains(10.0));
    }
}
