use crate::types::{Record, COLUMNS};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Sheet name of the re-exported workbook.
pub const EXPORT_SHEET: &str = "Data";

/// Write the record set as a single-sheet workbook: header row with the
/// canonical columns in canonical order, one row per record, dates as
/// `YYYY-MM-DD` strings.
pub fn write_xlsx<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, &record.vertical)?;
        worksheet.write_string(row, 1, &record.campaign)?;
        worksheet.write_string(row, 2, &record.media_type)?;
        worksheet.write_string(row, 3, &record.city)?;
        worksheet.write_string(row, 4, &record.supplier)?;
        worksheet.write_string(row, 5, &record.month)?;
        if let Some(date) = record.start_date {
            worksheet.write_string(row, 6, date.to_string())?;
        }
        if let Some(date) = record.end_date {
            worksheet.write_string(row, 7, date.to_string())?;
        }
        worksheet.write_string(row, 8, &record.unit)?;
        worksheet.write_number(row, 9, record.plan as f64)?;
        worksheet.write_number(row, 10, record.actual as f64)?;
        worksheet.write_number(row, 11, record.variance)?;
        if let Some(comment) = &record.comment {
            worksheet.write_string(row, 12, comment)?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;

    #[test]
    fn exported_workbook_has_canonical_header_and_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let record = Record {
            vertical: "Авто".to_string(),
            campaign: "Кампания 1".to_string(),
            media_type: "OOH".to_string(),
            city: "Москва".to_string(),
            supplier: "AVITO".to_string(),
            month: "Март".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: None,
            unit: "показы".to_string(),
            plan: 100,
            actual: 120,
            variance: 0.2,
            comment: None,
        };
        write_xlsx(&path, &[record]).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names().to_owned(), vec![EXPORT_SHEET]);
        let range = workbook.worksheet_range(EXPORT_SHEET).unwrap();

        for (col, name) in COLUMNS.iter().enumerate() {
            assert_eq!(
                range.get_value((0, col as u32)),
                Some(&Data::String(name.to_string()))
            );
        }
        assert_eq!(
            range.get_value((1, 6)),
            Some(&Data::String("2024-03-01".to_string()))
        );
        assert_eq!(range.get_value((1, 9)), Some(&Data::Float(100.0)));
        assert_eq!(range.get_value((1, 11)), Some(&Data::Float(0.2)));
    }
}
