//! Attribute resolution: validated axis plans and per-event value lookup.

use chrono::{DateTime, Utc};
use trellis_core::{
    Bin, DateUnit, EngineConfig, Event, GroupBy, StartDateRule, Subject, TimestampType,
    TrellisError, Value,
};

use crate::binner::{bin_value, bins_between};
use crate::registry::{self, AxisDef, AxisOption, AxisSource};

/// How resolved values of an axis are flattened for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Scalar,
    /// Values are sequences of range items (bins or list entries).
    Range,
    /// Values are `drug -> value` maps.
    PerDrug,
}

/// Reference date used for relative periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceDate {
    FirstDose,
    Randomisation,
    FirstDoseOf(String),
}

impl ReferenceDate {
    pub fn for_subject(&self, subject: &Subject) -> Option<DateTime<Utc>> {
        match self {
            ReferenceDate::FirstDose => subject.first_treatment_date,
            ReferenceDate::Randomisation => subject.randomisation_date,
            ReferenceDate::FirstDoseOf(drug) => subject.first_dose_of(drug),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timing {
    Absolute,
    Relative {
        period: TimestampType,
        reference: ReferenceDate,
    },
}

/// A group-by descriptor checked against the axis registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisPlan {
    pub def: &'static AxisDef,
    pub kind: AxisKind,
    pub timing: Option<Timing>,
    pub bin_size: Option<u32>,
    pub date_unit: DateUnit,
    pub includes_duration: bool,
    pub drug_name: Option<String>,
}

impl AxisPlan {
    pub fn new(group_by: &GroupBy) -> Result<Self, TrellisError> {
        let def = registry::lookup(&group_by.axis)
            .ok_or_else(|| TrellisError::UnknownAxis(group_by.axis.clone()))?;
        let params = &group_by.params;
        let unsupported = |option: AxisOption| TrellisError::UnsupportedOption {
            axis: def.id.to_string(),
            option: option.name().to_string(),
        };

        if let Some(size) = params.bin_size {
            if !def.supports(AxisOption::BinSize) {
                return Err(unsupported(AxisOption::BinSize));
            }
            if size == 0 {
                return Err(TrellisError::InvalidBinSize {
                    axis: def.id.to_string(),
                });
            }
        }
        if params.bin_includes_duration && !def.supports(AxisOption::BinIncludesDuration) {
            return Err(unsupported(AxisOption::BinIncludesDuration));
        }
        if params.drug_name.is_some() && !def.supports(AxisOption::DrugName) {
            return Err(unsupported(AxisOption::DrugName));
        }
        if (params.timestamp_type.is_some() || params.start_date_rule.is_some())
            && !def.supports(AxisOption::TimestampType)
        {
            return Err(unsupported(AxisOption::TimestampType));
        }

        let timing = if def.capabilities.timestamp {
            Some(timing_for(def, group_by)?)
        } else {
            None
        };

        let includes_duration = params.bin_includes_duration
            || (def.capabilities.range && def.end_source.is_some());
        let kind = if def.capabilities.has_drug_option {
            AxisKind::PerDrug
        } else if def.capabilities.range || includes_duration {
            AxisKind::Range
        } else {
            AxisKind::Scalar
        };

        Ok(Self {
            def,
            kind,
            timing,
            // Duration-spanning axes always bin, one unit wide unless told otherwise.
            bin_size: params.bin_size.or(includes_duration.then_some(1)),
            date_unit: params.date_unit.unwrap_or_default(),
            includes_duration,
            drug_name: params.drug_name.clone(),
        })
    }

    pub fn axis(&self) -> &'static str {
        self.def.id
    }
}

fn timing_for(def: &AxisDef, group_by: &GroupBy) -> Result<Timing, TrellisError> {
    let params = &group_by.params;
    let period = params.timestamp_type.unwrap_or(TimestampType::Date);
    match (period, params.start_date_rule) {
        (TimestampType::Date, None) => Ok(Timing::Absolute),
        (TimestampType::Date, Some(rule)) => Err(TrellisError::UnsupportedPeriod {
            timestamp_type: period,
            start_date_rule: rule,
        }),
        (period, rule) => {
            let reference = match rule.unwrap_or(StartDateRule::FirstDose) {
                StartDateRule::FirstDose => ReferenceDate::FirstDose,
                StartDateRule::Randomisation => ReferenceDate::Randomisation,
                StartDateRule::FirstDoseOfDrug => match &params.drug_name {
                    Some(drug) if !drug.is_empty() => ReferenceDate::FirstDoseOf(drug.clone()),
                    _ => {
                        return Err(TrellisError::MissingDrugName {
                            axis: def.id.to_string(),
                        })
                    }
                },
            };
            Ok(Timing::Relative { period, reference })
        }
    }
}

/// Length of the period from `reference` to `date` in the requested unit.
///
/// `DAYS` counts calendar days, `DAYS_WITH_HOURS` elapsed hours over 24 and
/// `WEEKS` whole weeks (floored). Negative before the reference date.
pub fn period(
    period: TimestampType,
    reference: DateTime<Utc>,
    date: DateTime<Utc>,
) -> Result<f64, TrellisError> {
    let days = (date.date_naive() - reference.date_naive()).num_days();
    match period {
        TimestampType::Days => Ok(days as f64),
        TimestampType::DaysWithHours => {
            Ok(date.signed_duration_since(reference).num_hours() as f64 / 24.0)
        }
        TimestampType::Weeks => Ok(days.div_euclid(7) as f64),
        TimestampType::Date => Err(TrellisError::NotAPeriod(period)),
    }
}

/// Resolves axis values off events. Never fails: absent data becomes [`Value::Empty`].
#[derive(Debug, Clone, Copy)]
pub struct AttributeResolver<'a> {
    config: &'a EngineConfig,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, plan: &AxisPlan, event: &Event) -> Value {
        let start = self.timed(plan, event, read_source(plan.def.source, event));

        if plan.includes_duration {
            let end = match plan.def.end_source {
                Some(source) => self.timed(plan, event, read_source(source, event)),
                None => Value::Empty,
            };
            return Value::List(
                bins_between(self.bin_of(plan, &start), self.bin_of(plan, &end))
                    .into_iter()
                    .map(Value::Bin)
                    .collect(),
            );
        }

        let value = match (&plan.drug_name, start) {
            (Some(drug), Value::PerDrug(map)) if !plan.def.capabilities.timestamp => {
                Value::PerDrug(map.into_iter().filter(|(name, _)| name == drug).collect())
            }
            (_, value) => value,
        };

        match plan.bin_size {
            Some(size) => bin_value(&value, size, plan.date_unit, self.config.date_anchor),
            None => value,
        }
    }

    fn bin_of(&self, plan: &AxisPlan, value: &Value) -> Bin {
        let size = plan.bin_size.unwrap_or(1);
        match bin_value(value, size, plan.date_unit, self.config.date_anchor) {
            Value::Bin(bin) => bin,
            _ => Bin::Empty,
        }
    }

    /// Applies the axis timing to a raw date value.
    fn timed(&self, plan: &AxisPlan, event: &Event, raw: Value) -> Value {
        match (&plan.timing, raw) {
            (Some(Timing::Relative { period: unit, reference }), Value::Date(date)) => {
                let Some(reference) = reference.for_subject(&event.subject) else {
                    return Value::Empty;
                };
                period(*unit, reference, date)
                    .map(Value::from)
                    .unwrap_or(Value::Empty)
            }
            (_, raw) => raw,
        }
    }
}

fn read_source(source: AxisSource, event: &Event) -> Value {
    match source {
        AxisSource::Subject => Value::Text(event.subject_id().to_string()),
        AxisSource::Attribute(name) => event.attribute(name),
        AxisSource::Date(field) => Value::from_option(event.date(field)),
    }
}
