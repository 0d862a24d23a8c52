//! Temporal aggregation and grouping engine for per-subject clinical events.
//!
//! Resolves axis values off events, bins them, matches baselines, merges
//! overlapping intervals and discovers the distinct values of each axis.

pub mod baseline;
pub mod binner;
pub mod dataset;
pub mod group_key;
pub mod intervals;
pub mod registry;
pub mod resolver;
pub mod trellis;

use trellis_core::{EngineConfig, GroupBy, TrellisError, TrellisOption};

pub use baseline::{
    assign_baselines, choose_summary_baseline, with_change_from_baseline, BaselineCandidate,
    BaselineKey, MeasurementKey,
};
pub use binner::{bin_categories, bin_date, bin_number, bin_value, bins_between};
pub use dataset::Dataset;
pub use group_key::{group_key, group_keys, GroupKey};
pub use intervals::{consolidate, merge_pair, merge_sorted, most_recent_therapy, overlaps};
pub use resolver::{period, AttributeResolver, AxisKind, AxisPlan};
pub use trellis::{compare_alphanumeric, compare_values, TrellisDiscoverer};

/// Discover trellis options from a dataset JSON string.
pub fn discover_options_str(
    dataset_json: &str,
    group_bys: &[GroupBy],
    config: &EngineConfig,
) -> Result<Vec<TrellisOption>, TrellisError> {
    let dataset = Dataset::from_json_str(dataset_json)?;
    TrellisDiscoverer::new(config).discover(dataset.events(), group_bys)
}

/// One group-by per registered axis, without parameters.
pub fn default_group_bys() -> Vec<GroupBy> {
    registry::all_axes().map(|def| GroupBy::new(def.id)).collect()
}
