//! Load one worksheet into a [`SpecTable`] with calamine.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, info};

use crate::spec::{SpecTable, XlsxFormatError};
use crate::util::derive_datetime_text_from_excel_serial;

/// Inferred storage type of one sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnKind {
    Empty,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Text,
}

/// Read `sheet_name` (or the first sheet) of an `.xlsx` workbook.
///
/// Returns the table and the resolved sheet name. The first used row is the
/// header.
pub fn read_table(
    path: &Path,
    sheet_name: Option<&str>,
) -> Result<(SpecTable, String), XlsxFormatError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let l_sheet_names = workbook.sheet_names();

    let c_sheet_name = match sheet_name {
        Some(name) if l_sheet_names.iter().any(|c| c == name) => name.to_string(),
        Some(name) => {
            return Err(XlsxFormatError::Input(format!(
                "Sheet not found: {name:?} (available: {})",
                l_sheet_names.join(", ")
            )));
        }
        None => l_sheet_names.first().cloned().ok_or_else(|| {
            XlsxFormatError::Input(format!("Workbook has no sheets: {}", path.display()))
        })?,
    };

    let range = workbook.worksheet_range(&c_sheet_name)?;
    let table = derive_table_from_range(&range)?;
    info!(
        file_in = %path.display(),
        sheet = %c_sheet_name,
        rows = table.height(),
        cols = table.width(),
        "table loaded"
    );
    Ok((table, c_sheet_name))
}

/// Build a table from a used cell range: header row, then body rows.
pub fn derive_table_from_range(range: &Range<Data>) -> Result<SpecTable, XlsxFormatError> {
    let mut it_rows = range.rows();
    let Some(v_header) = it_rows.next() else {
        return Ok(SpecTable::new(DataFrame::empty()));
    };
    let l_header = derive_header_names(v_header);
    let l_body: Vec<&[Data]> = it_rows.collect();

    let mut l_cols = Vec::with_capacity(l_header.len());
    let mut l_cols_datetime = Vec::new();
    for (n_idx_col, c_name) in l_header.iter().enumerate() {
        let l_cells: Vec<&Data> = l_body
            .iter()
            .map(|row| row.get(n_idx_col).unwrap_or(&Data::Empty))
            .collect();
        let kind = derive_column_kind(&l_cells);
        debug!(col = %c_name, ?kind, "column type inferred");
        if kind == EnumColumnKind::DateTime {
            l_cols_datetime.push(c_name.clone());
        }
        l_cols.push(derive_column(c_name, kind, &l_cells));
    }

    let df = DataFrame::new(l_cols)?;
    Ok(SpecTable::new(df).with_datetime_columns(l_cols_datetime))
}

/// Header texts; blanks become `Unnamed: <i>`, repeats get `.1`, `.2`, ...
fn derive_header_names(v_header: &[Data]) -> Vec<String> {
    let mut dict_seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut l_names = Vec::with_capacity(v_header.len());

    for (n_idx_col, cell) in v_header.iter().enumerate() {
        let c_base = derive_data_text(cell)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| format!("Unnamed: {n_idx_col}"));

        let mut c_name = c_base.clone();
        while let Some(n_count) = dict_seen.get_mut(&c_name) {
            *n_count += 1;
            c_name = format!("{c_base}.{}", *n_count);
        }
        dict_seen.insert(c_name.clone(), 0);
        l_names.push(c_name);
    }
    l_names
}

fn derive_column_kind(cells: &[&Data]) -> EnumColumnKind {
    let mut kind = EnumColumnKind::Empty;
    for cell in cells {
        let kind_cell = match cell {
            Data::Empty => continue,
            Data::Int(_) => EnumColumnKind::Integer,
            Data::Float(val) if is_integral(*val) => EnumColumnKind::Integer,
            Data::Float(_) => EnumColumnKind::Decimal,
            Data::Bool(_) => EnumColumnKind::Boolean,
            Data::DateTime(_) => EnumColumnKind::DateTime,
            _ => return EnumColumnKind::Text,
        };
        kind = match (kind, kind_cell) {
            (EnumColumnKind::Empty, k) => k,
            (a, b) if a == b => a,
            (EnumColumnKind::Integer, EnumColumnKind::Decimal)
            | (EnumColumnKind::Decimal, EnumColumnKind::Integer) => EnumColumnKind::Decimal,
            _ => return EnumColumnKind::Text,
        };
    }
    kind
}

fn derive_column(name: &str, kind: EnumColumnKind, cells: &[&Data]) -> Column {
    match kind {
        EnumColumnKind::Integer => {
            let l_values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(val) => Some(*val),
                    Data::Float(val) => Some(*val as i64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumColumnKind::Decimal => {
            let l_values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(val) => Some(*val as f64),
                    Data::Float(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumColumnKind::Boolean => {
            let l_values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumColumnKind::DateTime => {
            let l_values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::DateTime(val) => Some(val.as_f64()),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumColumnKind::Empty | EnumColumnKind::Text => {
            let l_values: Vec<Option<String>> =
                cells.iter().map(|cell| derive_data_text(cell)).collect();
            Column::new(name.into(), l_values)
        }
    }
}

/// Text of one sheet cell; `None` for blanks.
fn derive_data_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(val) => Some(val.clone()),
        Data::Float(val) => Some(val.to_string()),
        Data::Int(val) => Some(val.to_string()),
        Data::Bool(val) => Some(if *val { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(val) => Some(derive_datetime_text_from_excel_serial(val.as_f64())),
        other => Some(other.to_string()),
    }
}

fn is_integral(val: f64) -> bool {
    val.is_finite() && val.fract() == 0.0 && val.abs() < 9_007_199_254_740_992.0
}
