//! Lookup sources: Excel-family workbooks (xlsx, xlsm, xls, xlsb, ods) and CSV.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use ingsync_recon::{DataSourceError, LookupTable, ReconError, SyncConfig};

/// Raw `(code, ingredients)` pairs in sheet order. `None` = blank cell.
pub type SourceRows = Vec<(String, Option<String>)>;

/// Build the lookup table named by `config`, applying its duplicate policy.
pub fn load_lookup_table(config: &SyncConfig) -> Result<LookupTable, ReconError> {
    let rows = read_rows(
        &config.excel_path,
        &config.sheet_name,
        config.code_column(),
        config.ingredients_column(),
    )?;
    let raw_rows = rows.len();
    let table = LookupTable::from_rows(rows).with_policy(config.duplicate_codes)?;
    tracing::info!(
        source = %config.excel_path.display(),
        rows = raw_rows,
        entries = table.len(),
        ambiguous = table.ambiguous_codes().len(),
        "lookup table loaded"
    );
    Ok(table)
}

/// Read the two named columns from `path`. `sheet` is ignored for CSV.
pub fn read_rows(
    path: &Path,
    sheet: &str,
    code_column: &str,
    ingredients_column: &str,
) -> Result<SourceRows, DataSourceError> {
    if !path.exists() {
        return Err(DataSourceError::Missing { path: path.to_path_buf() });
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => {
            read_csv_rows(path, code_column, ingredients_column)
        }
        _ => read_workbook_rows(path, sheet, code_column, ingredients_column),
    }
}

fn unreadable(path: &Path, message: impl Into<String>) -> DataSourceError {
    DataSourceError::Unreadable {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Index of each named column in the header row.
fn column_indices<'a, I>(headers: I, wanted: [&str; 2]) -> Result<[usize; 2], DataSourceError>
where
    I: Iterator<Item = &'a str> + Clone,
{
    let mut found = [0usize; 2];
    for (slot, name) in found.iter_mut().zip(wanted) {
        *slot = headers
            .clone()
            .position(|h| h.trim() == name.trim())
            .ok_or_else(|| DataSourceError::MissingColumn { column: name.to_string() })?;
    }
    Ok(found)
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

fn read_workbook_rows(
    path: &Path,
    sheet: &str,
    code_column: &str,
    ingredients_column: &str,
) -> Result<SourceRows, DataSourceError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if !sheet_names.iter().any(|name| name == sheet) {
        return Err(DataSourceError::SheetNotFound {
            sheet: sheet.to_string(),
            available: sheet_names,
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| unreadable(path, format!("sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let [code_idx, ingredients_idx] = column_indices(
        headers.iter().map(String::as_str),
        [code_column, ingredients_column],
    )?;

    Ok(rows
        .map(|row| {
            let code = row.get(code_idx).map(cell_text).unwrap_or_default();
            let ingredients = row
                .get(ingredients_idx)
                .map(cell_text)
                .filter(|s| !s.is_empty());
            (code, ingredients)
        })
        .collect())
}

/// Cell as text. Integral numbers drop their fraction so numeric codes
/// compare equal to the codes in the product document.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv_rows(
    path: &Path,
    code_column: &str,
    ingredients_column: &str,
) -> Result<SourceRows, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| unreadable(path, e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    let [code_idx, ingredients_idx] = column_indices(
        headers.iter().map(String::as_str),
        [code_column, ingredients_column],
    )?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| unreadable(path, e.to_string()))?;
        let code = record.get(code_idx).unwrap_or_default().to_string();
        let ingredients = record
            .get(ingredients_idx)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        rows.push((code, ingredients));
    }
    Ok(rows)
}
