// Entry point and interactive CLI flow.
//
// The binary drives the monitoring pipeline end to end:
// - Option [1] processes a report workbook and stores the record set,
//   fully replacing whatever was stored before.
// - Option [2] renders the dashboard (KPIs, group totals, detail preview)
//   over the stored data with the session filters applied.
// - Option [3] edits the session filters.
// - Option [4] exports the filtered selection to Excel/CSV/JSON files.
// - Option [5] clears the remote table.
mod error;
mod loader;
mod output;
mod reports;
mod storage;
mod types;
mod util;

use once_cell::sync::Lazy;
use reports::{distinct_values, group_totals, kpi_totals, Dimension, RecordFilter};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Mutex;
use storage::{StoreConfig, TableStore};
use tracing_subscriber::EnvFilter;
use types::Record;
use util::format_int;

// Session state: the active filter selection. The record set itself lives
// in the remote table and is fetched per action.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    filter: RecordFilter,
}

const FILTER_DIMENSIONS: [Dimension; 4] = [
    Dimension::Vertical,
    Dimension::Supplier,
    Dimension::MediaType,
    Dimension::City,
];

const EXPORT_FILE: &str = "dashboard_data_export.xlsx";

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Fetch the stored record set, reporting store problems to the console.
fn fetch_stored(store: &TableStore) -> Option<Vec<Record>> {
    match store.fetch_all() {
        Ok(records) => Some(records),
        Err(e) => {
            eprintln!("Failed to load data from the store: {}\n", e);
            None
        }
    }
}

/// Handle option [1]: process a workbook and store the record set.
fn handle_process(store: &TableStore) {
    let path = read_line("Path to the report workbook (.xlsx): ");
    if path.is_empty() {
        println!("No path given.\n");
        return;
    }
    match loader::process_workbook(&path) {
        Ok((records, report)) => {
            println!(
                "Processed {} sheet(s): {} rows scanned, {} without identity, {} with empty plan/fact, {} records kept.",
                report.sheets_matched,
                format_int(report.rows_scanned as i64),
                format_int(report.dropped_no_identity as i64),
                format_int(report.dropped_zero as i64),
                format_int(records.len() as i64)
            );
            output::preview_rows(&records, 5);
            match store.replace_all(&records) {
                Ok(()) => println!("Data saved to the table store.\n"),
                Err(e) => eprintln!("Failed to store the record set: {}\n", e),
            }
        }
        Err(e) => eprintln!("Upload rejected: {}\n", e),
    }
}

/// Handle option [2]: KPIs, group totals and a detail preview over the
/// stored data, with the session filters applied.
fn handle_dashboard(store: &TableStore) {
    let Some(records) = fetch_stored(store) else {
        return;
    };
    if records.is_empty() {
        println!("The table store is empty. Process a report first (option 1).\n");
        return;
    }
    let filter = APP_STATE.lock().unwrap().filter.clone();
    let selection = filter.apply(&records);
    if !filter.is_unset() {
        println!(
            "Filters active: {} of {} records selected.\n",
            format_int(selection.len() as i64),
            format_int(records.len() as i64)
        );
    }

    let kpi = kpi_totals(&selection);
    println!("Plan:     {}", format_int(kpi.total_plan));
    println!("Fact:     {}", format_int(kpi.total_actual));
    println!("Variance: {:.1}%\n", kpi.variance * 100.0);

    for dimension in [Dimension::Supplier, Dimension::MediaType, Dimension::Month] {
        println!("Plan/Fact by {}:", dimension.label());
        output::preview_rows(&group_totals(&selection, dimension), 12);
    }

    println!("Detail ({} rows):", format_int(selection.len() as i64));
    output::preview_rows(&selection, 10);
}

/// Handle option [3]: edit the session filters, one dimension at a time.
fn handle_filters(store: &TableStore) {
    let Some(records) = fetch_stored(store) else {
        return;
    };
    if records.is_empty() {
        println!("The table store is empty. Nothing to filter.\n");
        return;
    }
    let mut state = APP_STATE.lock().unwrap();
    for dimension in FILTER_DIMENSIONS {
        let options = distinct_values(&records, dimension);
        println!("{} values: {}", dimension.label(), options.join(", "));
        let input = read_line("Keep (comma-separated, empty = all): ");
        let selection: Option<BTreeSet<String>> = if input.is_empty() {
            None
        } else {
            Some(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        };
        state.filter.set(dimension, selection);
    }
    println!();
}

/// Handle option [4]: export the filtered selection.
fn handle_export(store: &TableStore) {
    let Some(records) = fetch_stored(store) else {
        return;
    };
    let filter = APP_STATE.lock().unwrap().filter.clone();
    let selection = filter.apply(&records);
    if selection.is_empty() {
        println!("Nothing to export.\n");
        return;
    }

    if let Err(e) = output::write_xlsx(EXPORT_FILE, &selection) {
        eprintln!("Write error: {}", e);
    }
    println!("Exported {} records to {}.", selection.len(), EXPORT_FILE);

    for (dimension, file) in [
        (Dimension::Supplier, "totals_by_supplier.csv"),
        (Dimension::MediaType, "totals_by_media_type.csv"),
        (Dimension::Month, "totals_by_month.csv"),
    ] {
        if let Err(e) = output::write_csv(file, &group_totals(&selection, dimension)) {
            eprintln!("Write error: {}", e);
        }
        println!("Exported {} totals to {}.", dimension.label(), file);
    }

    if let Err(e) = output::write_json("summary.json", &kpi_totals(&selection)) {
        eprintln!("Write error: {}", e);
    }
    println!("Exported KPI summary to summary.json.\n");
}

/// Handle option [5]: clear the remote table.
fn handle_clear(store: &TableStore) {
    match store.clear() {
        Ok(()) => println!("Data cleared. You can upload a new report.\n"),
        Err(e) => eprintln!("Failed to clear the store: {}\n", e),
    }
}

fn main() {
    dotenv::dotenv().ok();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env).init();

    let store = match StoreConfig::from_env() {
        Ok(config) => TableStore::new(config),
        Err(e) => {
            eprintln!("Store configuration error: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        println!("Advertising monitoring dashboard");
        println!("[1] Process & store a report workbook");
        println!("[2] Show dashboard");
        println!("[3] Set filters");
        println!("[4] Export current selection");
        println!("[5] Clear stored data");
        println!("[0] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_process(&store),
            "2" => handle_dashboard(&store),
            "3" => handle_filters(&store),
            "4" => handle_export(&store),
            "5" => handle_clear(&store),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
}
