//! Static table of known axes and what each one supports.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use trellis_core::DateField;

/// Where an axis reads its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    Subject,
    Attribute(&'static str),
    Date(DateField),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub binnable: bool,
    pub has_drug_option: bool,
    pub timestamp: bool,
    pub range: bool,
}

impl Capabilities {
    const SCALAR: Capabilities = Capabilities {
        binnable: false,
        has_drug_option: false,
        timestamp: false,
        range: false,
    };
    const BINNABLE: Capabilities = Capabilities {
        binnable: true,
        ..Capabilities::SCALAR
    };
    const TIMESTAMP: Capabilities = Capabilities {
        binnable: true,
        timestamp: true,
        ..Capabilities::SCALAR
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisDef {
    pub id: &'static str,
    pub source: AxisSource,
    /// Second date source for duration-spanning bins.
    pub end_source: Option<AxisSource>,
    pub capabilities: Capabilities,
    /// Prefix shown in front of rendered values, e.g. `CTC Grade 3`.
    pub label: Option<&'static str>,
}

/// Options a group-by descriptor may ask of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOption {
    BinSize,
    BinIncludesDuration,
    TimestampType,
    DrugName,
}

impl AxisOption {
    pub fn name(&self) -> &'static str {
        match self {
            AxisOption::BinSize => "bin_size",
            AxisOption::BinIncludesDuration => "bin_includes_duration",
            AxisOption::TimestampType => "timestamp_type",
            AxisOption::DrugName => "drug_name",
        }
    }
}

impl AxisDef {
    pub fn supports(&self, option: AxisOption) -> bool {
        let caps = self.capabilities;
        match option {
            AxisOption::BinSize => caps.binnable,
            AxisOption::BinIncludesDuration => caps.binnable && self.end_source.is_some(),
            AxisOption::TimestampType => caps.timestamp,
            // Timestamp axes take a drug name for FIRST_DOSE_OF_DRUG.
            AxisOption::DrugName => caps.has_drug_option || caps.timestamp,
        }
    }
}

const fn axis(id: &'static str, source: AxisSource, capabilities: Capabilities) -> AxisDef {
    AxisDef {
        id,
        source,
        end_source: None,
        capabilities,
        label: None,
    }
}

const START: AxisSource = AxisSource::Date(DateField::Start);
const END: AxisSource = AxisSource::Date(DateField::End);

const AXES: [AxisDef; 16] = [
    axis("subject", AxisSource::Subject, Capabilities::SCALAR),
    axis("arm", AxisSource::Attribute("arm"), Capabilities::SCALAR),
    AxisDef {
        label: Some("CTC Grade"),
        ..axis("severity", AxisSource::Attribute("grade"), Capabilities::SCALAR)
    },
    axis("serious", AxisSource::Attribute("serious"), Capabilities::SCALAR),
    axis(
        "preferred_term",
        AxisSource::Attribute("preferred_term"),
        Capabilities::SCALAR,
    ),
    axis(
        "system_organ_class",
        AxisSource::Attribute("system_organ_class"),
        Capabilities::SCALAR,
    ),
    axis(
        "measurement",
        AxisSource::Attribute("measurement"),
        Capabilities::SCALAR,
    ),
    axis("value", AxisSource::Attribute("value"), Capabilities::BINNABLE),
    axis(
        "change_from_baseline",
        AxisSource::Attribute("change_from_baseline"),
        Capabilities::BINNABLE,
    ),
    axis("visit", AxisSource::Attribute("visit"), Capabilities::BINNABLE),
    axis("response", AxisSource::Attribute("response"), Capabilities::SCALAR),
    AxisDef {
        end_source: Some(END),
        ..axis("start_date", START, Capabilities::TIMESTAMP)
    },
    axis("end_date", END, Capabilities::TIMESTAMP),
    AxisDef {
        end_source: Some(END),
        ..axis(
            "exposure_window",
            START,
            Capabilities {
                range: true,
                ..Capabilities::TIMESTAMP
            },
        )
    },
    axis(
        "cycles",
        AxisSource::Attribute("cycles"),
        Capabilities {
            range: true,
            ..Capabilities::BINNABLE
        },
    ),
    axis(
        "dose",
        AxisSource::Attribute("dose"),
        Capabilities {
            has_drug_option: true,
            ..Capabilities::BINNABLE
        },
    ),
];

static REGISTRY: Lazy<HashMap<&'static str, AxisDef>> =
    Lazy::new(|| AXES.iter().map(|def| (def.id, *def)).collect());

pub fn lookup(axis: &str) -> Option<&'static AxisDef> {
    REGISTRY.get(axis)
}

/// Whether `axis` is known and supports `option`.
pub fn supports(axis: &str, option: AxisOption) -> bool {
    lookup(axis).map_or(false, |def| def.supports(option))
}

/// All registered axes in declaration order.
pub fn all_axes() -> impl Iterator<Item = &'static AxisDef> {
    AXES.iter()
}
