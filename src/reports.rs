use crate::loader::plan_fact_variance;
use crate::types::{KpiSummary, Record};
use crate::util::month_index;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tabled::Tabled;

/// Dimensions the record set is grouped and filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Vertical,
    Supplier,
    MediaType,
    City,
    Month,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Vertical => "Vertical",
            Dimension::Supplier => "Supplier",
            Dimension::MediaType => "Media type",
            Dimension::City => "City",
            Dimension::Month => "Month",
        }
    }

    fn value(self, record: &Record) -> &str {
        match self {
            Dimension::Vertical => &record.vertical,
            Dimension::Supplier => &record.supplier,
            Dimension::MediaType => &record.media_type,
            Dimension::City => &record.city,
            Dimension::Month => &record.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct GroupTotalsRow {
    #[serde(rename = "Группа")]
    #[tabled(rename = "Группа")]
    pub group: String,
    #[serde(rename = "План")]
    #[tabled(rename = "План")]
    pub plan: i64,
    #[serde(rename = "Факт")]
    #[tabled(rename = "Факт")]
    pub actual: i64,
    #[serde(rename = "Разница")]
    #[tabled(rename = "Разница", display_with = "crate::util::display_variance")]
    pub variance: f64,
}

/// Sum Plan and Fact per group and derive each group's variance.
///
/// Month groups sort in calendar order; every other dimension sorts by
/// group name.
pub fn group_totals(records: &[Record], dimension: Dimension) -> Vec<GroupTotalsRow> {
    let mut map: HashMap<String, (i64, i64)> = HashMap::new();
    for record in records {
        let entry = map.entry(dimension.value(record).to_string()).or_default();
        entry.0 += record.plan;
        entry.1 += record.actual;
    }
    let mut rows: Vec<GroupTotalsRow> = map
        .into_iter()
        .map(|(group, (plan, actual))| GroupTotalsRow {
            variance: plan_fact_variance(plan, actual),
            group,
            plan,
            actual,
        })
        .collect();
    match dimension {
        Dimension::Month => rows.sort_by_key(|row| (month_index(&row.group), row.group.clone())),
        _ => rows.sort_by(|a, b| a.group.cmp(&b.group)),
    }
    rows
}

/// Totals over the whole selection, with the overall variance computed by
/// the same rule the pipeline uses per row.
pub fn kpi_totals(records: &[Record]) -> KpiSummary {
    let total_plan: i64 = records.iter().map(|r| r.plan).sum();
    let total_actual: i64 = records.iter().map(|r| r.actual).sum();
    KpiSummary {
        total_plan,
        total_actual,
        variance: plan_fact_variance(total_plan, total_actual),
    }
}

/// Multi-value selection filter over the four filterable dimensions.
///
/// An unset dimension passes every record; an explicitly empty set passes
/// none.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub verticals: Option<BTreeSet<String>>,
    pub suppliers: Option<BTreeSet<String>>,
    pub media_types: Option<BTreeSet<String>>,
    pub cities: Option<BTreeSet<String>>,
}

impl RecordFilter {
    pub fn set(&mut self, dimension: Dimension, values: Option<BTreeSet<String>>) {
        match dimension {
            Dimension::Vertical => self.verticals = values,
            Dimension::Supplier => self.suppliers = values,
            Dimension::MediaType => self.media_types = values,
            Dimension::City => self.cities = values,
            // months are not filtered, only grouped
            Dimension::Month => {}
        }
    }

    pub fn is_unset(&self) -> bool {
        self.verticals.is_none()
            && self.suppliers.is_none()
            && self.media_types.is_none()
            && self.cities.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        fn pass(set: &Option<BTreeSet<String>>, value: &str) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }
        pass(&self.verticals, &record.vertical)
            && pass(&self.suppliers, &record.supplier)
            && pass(&self.media_types, &record.media_type)
            && pass(&self.cities, &record.city)
    }

    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

/// Sorted distinct values of a dimension, for building filter prompts.
pub fn distinct_values(records: &[Record], dimension: Dimension) -> Vec<String> {
    let set: BTreeSet<&str> = records.iter().map(|r| dimension.value(r)).collect();
    set.into_iter().map(str::to_string).collect()
}
