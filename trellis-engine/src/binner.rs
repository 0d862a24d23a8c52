//! Numeric and calendar binning.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use trellis_core::{exact_i64, Bin, DateUnit, Value};

/// Bucket `value` into `[floor(value / size) * size, .. + size)`.
///
/// Values whose bin start does not fit in an `i64` fall into the empty bin.
pub fn bin_number(value: f64, size: u32) -> Bin {
    if !value.is_finite() || size == 0 {
        return Bin::Empty;
    }
    let size_i = i64::from(size);
    let start = match exact_i64(value) {
        Some(integer) => integer.div_euclid(size_i).checked_mul(size_i),
        // A non-integral f64 is below 2^52 in magnitude, so this stays in range.
        None if value.abs() < 4_503_599_627_370_496.0 => {
            let mut index = (value / f64::from(size)).floor() as i64;
            if ((index * size_i) as f64) > value {
                index -= 1;
            } else if (((index + 1) * size_i) as f64) <= value {
                index += 1;
            }
            Some(index * size_i)
        }
        None => None,
    };
    match start {
        Some(start) => Bin::Numeric { start, size },
        None => Bin::Empty,
    }
}

/// Bucket a date into `size`-unit calendar bins counted from `anchor`.
pub fn bin_date(date: NaiveDate, unit: DateUnit, size: u32, anchor: NaiveDate) -> Bin {
    if size == 0 {
        return Bin::Empty;
    }
    let size_i = i64::from(size);
    let start = match unit {
        DateUnit::Day => {
            let index = (date - anchor).num_days().div_euclid(size_i);
            anchor.checked_add_signed(Duration::days(index * size_i))
        }
        DateUnit::Week => {
            let index = (date - anchor).num_days().div_euclid(7 * size_i);
            anchor.checked_add_signed(Duration::weeks(index * size_i))
        }
        DateUnit::Month => {
            let months = month_ordinal(date) - month_ordinal(anchor);
            let offset = months.div_euclid(size_i) * size_i;
            add_months(first_of_month(anchor), offset)
        }
    };
    match start {
        Some(start) => Bin::Date { start, unit, size },
        None => Bin::Empty,
    }
}

pub fn bin_datetime(date: DateTime<Utc>, unit: DateUnit, size: u32, anchor: NaiveDate) -> Bin {
    bin_date(date.date_naive(), unit, size, anchor)
}

/// Bins a resolved value. Lists and per-drug maps are binned element-wise;
/// anything that is not a number or date becomes the empty bin.
pub fn bin_value(value: &Value, size: u32, unit: DateUnit, anchor: NaiveDate) -> Value {
    match value {
        Value::Number(number) => Value::Bin(bin_number(*number, size)),
        Value::Date(date) => Value::Bin(bin_datetime(*date, unit, size, anchor)),
        Value::Bin(bin) => Value::Bin(*bin),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| bin_value(item, size, unit, anchor))
                .collect(),
        ),
        Value::PerDrug(map) => Value::PerDrug(
            map.iter()
                .map(|(drug, item)| (drug.clone(), bin_value(item, size, unit, anchor)))
                .collect(),
        ),
        Value::Empty | Value::Text(_) => Value::Bin(Bin::Empty),
    }
}

/// Every bin from `start` to `end` inclusive, or `[Empty]` when there is no valid range.
pub fn bins_between(start: Bin, end: Bin) -> Vec<Bin> {
    if start.is_empty() || end.is_empty() || !start.same_shape(&end) || start > end {
        return vec![Bin::Empty];
    }
    let mut bins = Vec::new();
    let mut current = start;
    while !current.is_empty() && current <= end {
        bins.push(current);
        current = current.next_bin();
    }
    bins
}

/// Contiguous categories spanning the smallest to the largest concrete bin.
/// A trailing [`Bin::Empty`] is kept when any input bin was empty.
pub fn bin_categories(bins: &[Bin]) -> Vec<Bin> {
    let has_empty = bins.iter().any(Bin::is_empty);
    let concrete = bins.iter().filter(|bin| !bin.is_empty());
    let (min, max) = (concrete.clone().min(), concrete.max());

    let mut categories = match (min, max) {
        (Some(min), Some(max)) => bins_between(*min, *max),
        _ => Vec::new(),
    };
    if has_empty && categories.last() != Some(&Bin::Empty) {
        categories.push(Bin::Empty);
    }
    categories
}

fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}
