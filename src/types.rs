use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Column headers of the canonical record set, in contract order.
///
/// These are the headers the monthly reports carry, the column names of the
/// remote table, and the header row of every export. Field order in
/// [`Record`] must stay in sync with this list.
pub const COLUMNS: [&str; 13] = [
    "Вертикаль",
    "Кампания",
    "Тип",
    "Город",
    "Подрядчик",
    "Месяц",
    "Старт",
    "Окончание",
    "Единица",
    "План",
    "Факт",
    "Разница",
    "Комментарий",
];

/// One plan-vs-actual monitoring line item.
///
/// `variance` is always derived from `plan` and `actual`; it is never taken
/// from source input. Optional fields serialize as `null`, dates as
/// `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(default)]
pub struct Record {
    #[serde(rename = "Вертикаль")]
    #[tabled(rename = "Вертикаль")]
    pub vertical: String,
    #[serde(rename = "Кампания")]
    #[tabled(rename = "Кампания")]
    pub campaign: String,
    #[serde(rename = "Тип")]
    #[tabled(rename = "Тип")]
    pub media_type: String,
    #[serde(rename = "Город")]
    #[tabled(rename = "Город")]
    pub city: String,
    #[serde(rename = "Подрядчик")]
    #[tabled(rename = "Подрядчик")]
    pub supplier: String,
    #[serde(rename = "Месяц")]
    #[tabled(rename = "Месяц")]
    pub month: String,
    #[serde(rename = "Старт")]
    #[tabled(rename = "Старт", display_with = "crate::util::display_opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "Окончание")]
    #[tabled(rename = "Окончание", display_with = "crate::util::display_opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "Единица")]
    #[tabled(rename = "Единица")]
    pub unit: String,
    #[serde(rename = "План")]
    #[tabled(rename = "План")]
    pub plan: i64,
    #[serde(rename = "Факт")]
    #[tabled(rename = "Факт")]
    pub actual: i64,
    #[serde(rename = "Разница")]
    #[tabled(rename = "Разница", display_with = "crate::util::display_variance")]
    pub variance: f64,
    #[serde(rename = "Комментарий")]
    #[tabled(rename = "Комментарий", display_with = "crate::util::display_opt_text")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_plan: i64,
    pub total_actual: i64,
    pub variance: f64,
}
