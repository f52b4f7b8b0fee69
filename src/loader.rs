// The workbook-to-record-set pipeline.
//
// Three stages, applied in order:
// - sheet selection by the monthly report naming convention,
// - row normalization at a fixed header offset and column window,
// - schema reconciliation so every record carries the full column set.
//
// Row-level problems (malformed numbers, unparseable dates, missing cells)
// are absorbed by coercion and defaulting. The run aborts only when the
// workbook itself is unreadable or contains no report sheets.
use crate::error::PipelineError;
use crate::types::Record;
use crate::util::{cell_amount, cell_date, cell_text};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

/// Monthly report sheets are named `План vs Факт_<Месяц>`.
pub const SHEET_PREFIX: &str = "План vs Факт_";

// The header occupies the fourth sheet row; data starts right below it.
const HEADER_ROW: u32 = 3;
const FIRST_DATA_ROW: u32 = HEADER_ROW + 1;
// The 13-wide data window B..=N.
const WINDOW_FIRST_COL: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub sheets_matched: usize,
    pub rows_scanned: usize,
    pub dropped_no_identity: usize,
    pub dropped_zero: usize,
}

/// A normalized row before schema reconciliation.
///
/// Text and date fields stay optional here; `reconcile` turns absences into
/// the canonical defaults. `plan`, `actual` and `variance` are already
/// final: coercion and the variance rule run during normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDraft {
    pub vertical: Option<String>,
    pub campaign: Option<String>,
    pub media_type: Option<String>,
    pub city: Option<String>,
    pub supplier: Option<String>,
    pub month: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub unit: Option<String>,
    pub plan: i64,
    pub actual: i64,
    pub variance: f64,
    pub comment: Option<String>,
}

/// Plan-vs-actual variance with the explicit zero-base policy:
/// a positive plan uses the ratio formula, actuals over a zero plan count
/// as +100%, an all-zero pair is flat. Non-finite results collapse to 0.
pub fn plan_fact_variance(plan: i64, actual: i64) -> f64 {
    let variance = if plan > 0 {
        actual as f64 / plan as f64 - 1.0
    } else if actual > 0 {
        1.0
    } else {
        0.0
    };
    if variance.is_finite() {
        variance
    } else {
        0.0
    }
}

/// Select the monthly report sheets, in workbook order.
///
/// An upload without a single matching sheet is rejected outright.
pub fn select_report_sheets(names: &[String]) -> Result<Vec<String>, PipelineError> {
    let selected: Vec<String> = names
        .iter()
        .filter(|name| name.starts_with(SHEET_PREFIX))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(PipelineError::NoMatchingSheets);
    }
    Ok(selected)
}

/// Normalize one report sheet into row drafts, keeping row order.
pub fn normalize_sheet(range: &Range<Data>, report: &mut LoadReport) -> Vec<RowDraft> {
    let mut drafts = Vec::new();
    let Some((end_row, _)) = range.end() else {
        return drafts;
    };
    for row in FIRST_DATA_ROW..=end_row {
        report.rows_scanned += 1;
        let cell = |offset: u32| range.get_value((row, WINDOW_FIRST_COL + offset));

        // Window layout: B Вертикаль, C Кампания, D Тип, E Город,
        // F Подрядчик, G Месяц, H Старт, I Окончание, J Единица, K План,
        // L Факт, M Разница (ignored, always recomputed), N Комментарий.
        let vertical = cell_text(cell(0));
        let campaign = cell_text(cell(1));
        if vertical.is_none() && campaign.is_none() {
            report.dropped_no_identity += 1;
            continue;
        }

        let plan = cell_amount(cell(9));
        let actual = cell_amount(cell(10));
        if plan == 0 && actual == 0 {
            report.dropped_zero += 1;
            continue;
        }

        drafts.push(RowDraft {
            vertical,
            campaign,
            media_type: cell_text(cell(2)),
            city: cell_text(cell(3)),
            supplier: cell_text(cell(4)).map(|s| s.to_uppercase()),
            month: cell_text(cell(5)),
            start_date: cell_date(cell(6)),
            end_date: cell_date(cell(7)),
            unit: cell_text(cell(8)),
            plan,
            actual,
            variance: plan_fact_variance(plan, actual),
            comment: cell_text(cell(12)),
        });
    }
    drafts
}

/// Guarantee the canonical 13-field schema on every record.
///
/// Fields the source sheets never carried get type-appropriate defaults:
/// empty text, absent dates and comment, zero amounts. Already-complete
/// drafts pass through unchanged.
pub fn reconcile(drafts: Vec<RowDraft>) -> Vec<Record> {
    drafts
        .into_iter()
        .map(|draft| Record {
            vertical: draft.vertical.unwrap_or_default(),
            campaign: draft.campaign.unwrap_or_default(),
            media_type: draft.media_type.unwrap_or_default(),
            city: draft.city.unwrap_or_default(),
            supplier: draft.supplier.unwrap_or_default(),
            month: draft.month.unwrap_or_default(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            unit: draft.unit.unwrap_or_default(),
            plan: draft.plan,
            actual: draft.actual,
            variance: draft.variance,
            comment: draft.comment,
        })
        .collect()
}

/// Run the full pipeline over a workbook on disk.
///
/// Concatenation order is the matched-sheet order; row order within each
/// sheet is preserved.
pub fn process_workbook<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<Record>, LoadReport), PipelineError> {
    let mut workbook = open_workbook_auto(path.as_ref())?;
    let names = workbook.sheet_names().to_owned();
    let selected = select_report_sheets(&names)?;

    let mut report = LoadReport {
        sheets_matched: selected.len(),
        ..LoadReport::default()
    };
    let mut drafts = Vec::new();
    for name in &selected {
        let range = workbook.worksheet_range(name)?;
        let rows = normalize_sheet(&range, &mut report);
        debug!(sheet = %name, rows = rows.len(), "normalized sheet");
        drafts.extend(rows);
    }

    let records = reconcile(drafts);
    info!(
        sheets = report.sheets_matched,
        scanned = report.rows_scanned,
        kept = records.len(),
        "processed workbook"
    );
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    fn f(value: f64) -> Data {
        Data::Float(value)
    }

    /// Build a sheet range with the report layout: three leading rows, a
    /// header row, then the given data rows in the B..=N window.
    fn sheet_with_rows(rows: &[Vec<Data>]) -> Range<Data> {
        let end_row = FIRST_DATA_ROW + rows.len().max(1) as u32 - 1;
        let mut range = Range::new((0, 0), (end_row, 14));
        for (i, row) in rows.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                range.set_value(
                    (FIRST_DATA_ROW + i as u32, WINDOW_FIRST_COL + j as u32),
                    cell.clone(),
                );
            }
        }
        range
    }

    fn full_row(supplier: &str, plan: f64, actual: f64) -> Vec<Data> {
        vec![
            s("Авто"),
            s("Кампания 1"),
            s("OOH"),
            s("Москва"),
            s(supplier),
            s("Март"),
            s("2024-03-01"),
            s("2024-03-31"),
            s("показы"),
            f(plan),
            f(actual),
            Data::Empty,
            s("без замечаний"),
        ]
    }

    #[test]
    fn selects_prefixed_sheets_in_workbook_order() {
        let names = vec![
            "Сводка".to_string(),
            "План vs Факт_Март".to_string(),
            "План vs Факт_Январь".to_string(),
            "Справочник".to_string(),
        ];
        let selected = select_report_sheets(&names).unwrap();
        assert_eq!(selected, vec!["План vs Факт_Март", "План vs Факт_Январь"]);
    }

    #[test]
    fn rejects_workbooks_without_report_sheets() {
        let names = vec!["Сводка".to_string(), "Лист1".to_string()];
        assert!(matches!(
            select_report_sheets(&names),
            Err(PipelineError::NoMatchingSheets)
        ));
    }

    #[test]
    fn variance_follows_the_three_branch_rule() {
        assert!((plan_fact_variance(100, 120) - 0.2).abs() < 1e-9);
        assert_eq!(plan_fact_variance(0, 50), 1.0);
        assert_eq!(plan_fact_variance(0, 0), 0.0);
        assert_eq!(plan_fact_variance(100, 0), -1.0);
    }

    #[test]
    fn rows_without_identity_are_dropped() {
        let mut row = full_row("AVITO", 100.0, 120.0);
        row[0] = Data::Empty;
        row[1] = s("   ");
        let range = sheet_with_rows(&[row, full_row("AVITO", 100.0, 120.0)]);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        assert_eq!(drafts.len(), 1);
        assert_eq!(report.dropped_no_identity, 1);
        assert_eq!(report.rows_scanned, 2);
    }

    #[test]
    fn one_identity_field_is_enough_to_keep_a_row() {
        let mut row = full_row("AVITO", 100.0, 120.0);
        row[0] = Data::Empty;
        let range = sheet_with_rows(&[row]);
        let mut report = LoadReport::default();
        assert_eq!(normalize_sheet(&range, &mut report).len(), 1);
    }

    #[test]
    fn all_zero_rows_are_dropped_after_coercion() {
        let mut zero = full_row("AVITO", 0.0, 0.0);
        zero[9] = s("n/a");
        zero[10] = Data::Empty;
        let range = sheet_with_rows(&[zero, full_row("AVITO", 100.0, 120.0)]);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        assert_eq!(drafts.len(), 1);
        assert_eq!(report.dropped_zero, 1);
    }

    #[test]
    fn malformed_plan_defaults_to_zero_and_variance_uses_zero_base_policy() {
        let mut row = full_row("AVITO", 0.0, 10.0);
        row[9] = s("abc");
        let range = sheet_with_rows(&[row]);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        assert_eq!(drafts[0].plan, 0);
        assert_eq!(drafts[0].actual, 10);
        assert_eq!(drafts[0].variance, 1.0);
    }

    #[test]
    fn supplier_case_variants_normalize_to_one_form() {
        let rows = vec![
            full_row("avito", 100.0, 100.0),
            full_row("AVITO", 100.0, 100.0),
            full_row("Avito", 100.0, 100.0),
            full_row("авито", 100.0, 100.0),
        ];
        let range = sheet_with_rows(&rows);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        assert_eq!(drafts[0].supplier.as_deref(), Some("AVITO"));
        assert_eq!(drafts[1].supplier.as_deref(), Some("AVITO"));
        assert_eq!(drafts[2].supplier.as_deref(), Some("AVITO"));
        assert_eq!(drafts[3].supplier.as_deref(), Some("АВИТО"));
    }

    #[test]
    fn source_variance_column_is_ignored() {
        let mut row = full_row("AVITO", 100.0, 120.0);
        row[11] = f(9.9);
        let range = sheet_with_rows(&[row]);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        assert!((drafts[0].variance - 0.2).abs() < 1e-9);
    }

    #[test]
    fn narrow_sheets_reconcile_to_the_full_schema() {
        // Only columns B, C and K present: the sheet stops short of the
        // 13-wide window.
        let row = vec![
            s("Авто"),
            s("Кампания 1"),
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            f(100.0),
        ];
        let range = sheet_with_rows(&[row]);
        let mut report = LoadReport::default();
        let records = reconcile(normalize_sheet(&range, &mut report));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.vertical, "Авто");
        assert_eq!(record.media_type, "");
        assert_eq!(record.supplier, "");
        assert_eq!(record.month, "");
        assert_eq!(record.start_date, None);
        assert_eq!(record.end_date, None);
        assert_eq!(record.unit, "");
        assert_eq!(record.plan, 100);
        assert_eq!(record.actual, 0);
        assert_eq!(record.variance, -1.0);
        assert_eq!(record.comment, None);
    }

    #[test]
    fn reconciling_an_already_canonical_set_is_a_no_op() {
        let range = sheet_with_rows(&[full_row("AVITO", 100.0, 120.0)]);
        let mut report = LoadReport::default();
        let drafts = normalize_sheet(&range, &mut report);
        let records = reconcile(drafts);

        let roundtrip: Vec<RowDraft> = records
            .iter()
            .map(|r| RowDraft {
                vertical: Some(r.vertical.clone()),
                campaign: Some(r.campaign.clone()),
                media_type: Some(r.media_type.clone()),
                city: Some(r.city.clone()),
                supplier: Some(r.supplier.clone()),
                month: Some(r.month.clone()),
                start_date: r.start_date,
                end_date: r.end_date,
                unit: Some(r.unit.clone()),
                plan: r.plan,
                actual: r.actual,
                variance: r.variance,
                comment: r.comment.clone(),
            })
            .collect();
        assert_eq!(reconcile(roundtrip), records);
    }

    #[test]
    fn processes_a_workbook_end_to_end_in_sheet_order() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("План vs Факт_Март").unwrap();
        sheet.write_string(HEADER_ROW, 1, "Вертикаль").unwrap();
        sheet.write_string(HEADER_ROW, 2, "Кампания").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 1, "Авто").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 2, "Кампания 1").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 3, "OOH").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 4, "Москва").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 5, "avito").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 6, "Март").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 7, "2024-03-01").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 8, "31.03.2024").unwrap();
        sheet.write_string(FIRST_DATA_ROW, 9, "показы").unwrap();
        sheet.write_number(FIRST_DATA_ROW, 10, 100.0).unwrap();
        sheet.write_number(FIRST_DATA_ROW, 11, 120.0).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("План vs Факт_Январь").unwrap();
        second.write_string(FIRST_DATA_ROW, 1, "Недвижимость").unwrap();
        second.write_string(FIRST_DATA_ROW, 2, "Зима").unwrap();
        second.write_string(FIRST_DATA_ROW, 5, "гпм").unwrap();
        second.write_string(FIRST_DATA_ROW, 6, "Январь").unwrap();
        second.write_number(FIRST_DATA_ROW, 10, 50.0).unwrap();
        second.write_number(FIRST_DATA_ROW, 11, 50.0).unwrap();

        let ignored = workbook.add_worksheet();
        ignored.set_name("Сводка").unwrap();
        ignored.write_string(0, 0, "не отчет").unwrap();

        workbook.save(&path).unwrap();

        let (records, report) = process_workbook(&path).unwrap();
        assert_eq!(report.sheets_matched, 2);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].vertical, "Авто");
        assert_eq!(records[0].supplier, "AVITO");
        assert_eq!(records[0].plan, 100);
        assert_eq!(records[0].actual, 120);
        assert!((records[0].variance - 0.2).abs() < 1e-9);
        assert_eq!(records[0].start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(records[0].end_date, NaiveDate::from_ymd_opt(2024, 3, 31));

        assert_eq!(records[1].month, "Январь");
        assert_eq!(records[1].supplier, "ГПМ");
        assert_eq!(records[1].variance, 0.0);
    }

    #[test]
    fn unreadable_files_abort_with_the_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_workbook.xlsx");
        std::fs::write(&path, b"plain text, not a spreadsheet").unwrap();
        assert!(matches!(
            process_workbook(&path),
            Err(PipelineError::SourceUnreadable(_))
        ));
    }
}
