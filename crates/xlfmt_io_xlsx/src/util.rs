//! Stateless helper utilities shared by the reader, writer and formatter.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeDelta};
use polars::prelude::{AnyValue, Column, DataFrame};
use rust_xlsxwriter::{Color, Format, FormatBorder};

use crate::conf::{
    C_EXT_XLSX, C_SUFFIX_OUTPUT_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{
    EnumCellValue, EnumRowIndex, SpecAutofitCellsPolicy, SpecCellFormat, SpecCellRange,
    XlsxFormatError,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Normalize a polars value into the write pipeline representation.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// Render a cell the way it is measured for spacing.
pub fn derive_cell_text(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => String::new(),
        EnumCellValue::String(s) => s.clone(),
        EnumCellValue::Number(n) => n.to_string(),
        EnumCellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        EnumCellValue::DateTime(n) => derive_datetime_text_from_excel_serial(*n),
    }
}

/// Render an Excel serial as `YYYY-MM-DD HH:MM:SS`.
///
/// Serials before 1900-03-01 are off by one day (Excel's 1900 leap-year bug).
/// Non-finite or out-of-range serials fall back to the plain number.
pub fn derive_datetime_text_from_excel_serial(serial: f64) -> String {
    let Some(dt_epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    if !serial.is_finite() || serial.abs() > 2_958_465.0 {
        return serial.to_string();
    }

    let n_millis = (serial * 86_400_000.0).round() as i64;
    match TimeDelta::try_milliseconds(n_millis).and_then(|delta| dt_epoch.checked_add_signed(delta))
    {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnWidth

/// Display length of `s`, counted in characters.
pub fn estimate_text_len(s: &str) -> usize {
    s.chars().count()
}

/// Clamp `n_len_text_max + padding` into the policy bounds.
pub fn calculate_column_width(n_len_text_max: usize, policy: &SpecAutofitCellsPolicy) -> usize {
    let n_min = usize::max(1, policy.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy.width_cell_max));
    usize::min(
        n_max,
        usize::max(n_min, n_len_text_max + policy.width_cell_padding),
    )
}

/// Reject policies whose bounds cannot be satisfied.
pub fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

/// Prepend index levels to the data columns, like resetting a multi-index.
///
/// Unnamed levels become `level_<i>`.
pub fn flatten_row_index(
    df_data: &DataFrame,
    row_index: &EnumRowIndex,
) -> Result<DataFrame, XlsxFormatError> {
    let EnumRowIndex::Levels(l_levels) = row_index else {
        validate_unique_columns(&derive_column_names(df_data.get_columns()))
            .map_err(XlsxFormatError::Data)?;
        return Ok(df_data.clone());
    };

    let n_height = if df_data.width() == 0 {
        l_levels.first().map_or(0, Column::len)
    } else {
        df_data.height()
    };

    let mut l_cols = Vec::with_capacity(l_levels.len() + df_data.width());
    for (n_idx_level, level) in l_levels.iter().enumerate() {
        if level.len() != n_height {
            return Err(XlsxFormatError::Data(format!(
                "Index level {n_idx_level} has {} rows; expected {n_height}.",
                level.len()
            )));
        }
        let mut col = level.clone();
        if col.name().is_empty() {
            col.rename(format!("level_{n_idx_level}").into());
        }
        l_cols.push(col);
    }
    l_cols.extend(df_data.get_columns().iter().cloned());

    validate_unique_columns(&derive_column_names(&l_cols)).map_err(XlsxFormatError::Data)?;
    Ok(DataFrame::new(l_cols)?)
}

fn derive_column_names(cols: &[Column]) -> Vec<String> {
    cols.iter().map(|col| col.name().to_string()).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RangePlanning

/// Header row across all columns; `None` when there are no columns.
pub fn plan_header_range(width: usize) -> Option<SpecCellRange> {
    if width == 0 {
        return None;
    }
    Some(SpecCellRange {
        row_first: 0,
        col_first: 0,
        row_last: 0,
        col_last: width - 1,
    })
}

/// Last data row (`row == height`); `None` when there are no data rows.
pub fn plan_last_row_range(height: usize, width: usize) -> Option<SpecCellRange> {
    if height == 0 || width == 0 {
        return None;
    }
    Some(SpecCellRange {
        row_first: height,
        col_first: 0,
        row_last: height,
        col_last: width - 1,
    })
}

/// Data rows `1..=height`, header excluded; `None` when there are no data rows.
pub fn plan_body_range(height: usize, width: usize) -> Option<SpecCellRange> {
    if height == 0 || width == 0 {
        return None;
    }
    Some(SpecCellRange {
        row_first: 1,
        col_first: 0,
        row_last: height,
        col_last: width - 1,
    })
}

/// Reject inverted or out-of-sheet ranges.
pub fn validate_cell_range(range: &SpecCellRange) -> Result<(), XlsxFormatError> {
    if range.row_first > range.row_last || range.col_first > range.col_last {
        return Err(XlsxFormatError::Range(format!("Inverted cell range: {range}")));
    }
    if range.row_last >= N_NROWS_EXCEL_MAX || range.col_last >= N_NCOLS_EXCEL_MAX {
        return Err(XlsxFormatError::Range(format!(
            "Cell range exceeds worksheet limits: {range}"
        )));
    }
    Ok(())
}

pub fn cast_row_num(value: usize) -> Result<u32, XlsxFormatError> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(XlsxFormatError::Range(format!("row index overflow: {value}")));
    }
    u32::try_from(value).map_err(|_| XlsxFormatError::Range(format!("row index overflow: {value}")))
}

pub fn cast_col_num(value: usize) -> Result<u16, XlsxFormatError> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(XlsxFormatError::Range(format!(
            "column index overflow: {value}"
        )));
    }
    u16::try_from(value)
        .map_err(|_| XlsxFormatError::Range(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet1".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FilePaths

/// Whether `path` carries the `.xlsx` extension (any case).
pub fn is_xlsx_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(C_EXT_XLSX))
}

/// Check extension first, then existence; nothing is opened.
pub fn validate_input_xlsx_path(path: &Path) -> Result<(), XlsxFormatError> {
    if !is_xlsx_path(path) {
        return Err(XlsxFormatError::Input(format!(
            "The file to format must be a .{C_EXT_XLSX} file: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(XlsxFormatError::Input(format!(
            "File not found: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Resolve the output path, defaulting to `<stem>_formatted.xlsx` beside the input.
pub fn derive_output_xlsx_path(
    path_input: &Path,
    path_output: Option<&Path>,
) -> Result<PathBuf, XlsxFormatError> {
    let path_out = match path_output {
        Some(path) => path.to_path_buf(),
        None => {
            let c_stem = path_input
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();
            path_input.with_file_name(format!("{c_stem}{C_SUFFIX_OUTPUT_DEFAULT}.{C_EXT_XLSX}"))
        }
    };

    if !is_xlsx_path(&path_out) {
        return Err(XlsxFormatError::Input(format!(
            "The output file must be a .{C_EXT_XLSX} file: {}",
            path_out.display()
        )));
    }

    let if_same_file = match (path_input.canonicalize(), path_out.canonicalize()) {
        (Ok(path_in_abs), Ok(path_out_abs)) => path_in_abs == path_out_abs,
        _ => path_input == path_out,
    };
    if if_same_file {
        return Err(XlsxFormatError::Input(format!(
            "Output path must differ from the input: {}",
            path_out.display()
        )));
    }

    Ok(path_out)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RustXlsxFormat

/// Build a writer format from a style descriptor.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Result<Format, XlsxFormatError> {
    let mut format = Format::new();

    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(derive_color(val)?);
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val)?);
    }
    if let Some(val) = &spec.border_color {
        format = format.set_border_color(derive_color(val)?);
    }

    Ok(format)
}

/// Parse `#RRGGBB` or a basic color name.
pub fn derive_color(text: &str) -> Result<Color, XlsxFormatError> {
    let c_value = text.trim();
    if let Some(c_hex) = c_value.strip_prefix('#') {
        if c_hex.len() == 6
            && c_hex.bytes().all(|b| b.is_ascii_hexdigit())
            && let Ok(n_rgb) = u32::from_str_radix(c_hex, 16)
        {
            return Ok(Color::RGB(n_rgb));
        }
        return Err(XlsxFormatError::Input(format!("Invalid hex color: {text:?}")));
    }

    let color = match c_value.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "blue" => Color::Blue,
        "brown" => Color::Brown,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "green" => Color::Green,
        "lime" => Color::Lime,
        "magenta" => Color::Magenta,
        "navy" => Color::Navy,
        "orange" => Color::Orange,
        "pink" => Color::Pink,
        "purple" => Color::Purple,
        "red" => Color::Red,
        "silver" => Color::Silver,
        "white" => Color::White,
        "yellow" => Color::Yellow,
        _ => {
            return Err(XlsxFormatError::Input(format!(
                "Unknown color: {text:?} (expected #RRGGBB or a basic color name)"
            )));
        }
    };
    Ok(color)
}

/// Map an Excel border code (0..=13) to the writer enum.
pub fn derive_format_border(border: i64) -> Result<FormatBorder, XlsxFormatError> {
    let format_border = match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => {
            return Err(XlsxFormatError::Data(format!(
                "Unknown border code: {border} (expected 0..=13)"
            )));
        }
    };
    Ok(format_border)
}

/// Map a border style name (`thin`, `medium_dashed`, ...) to its Excel code.
pub fn derive_border_code(name: &str) -> Option<i64> {
    let value = name.trim().to_ascii_lowercase().replace('-', "_");
    let n_code = match value.as_str() {
        "none" => 0,
        "thin" => 1,
        "medium" => 2,
        "dashed" => 3,
        "dotted" => 4,
        "thick" => 5,
        "double" => 6,
        "hair" => 7,
        "medium_dashed" => 8,
        "dash_dot" => 9,
        "medium_dash_dot" => 10,
        "dash_dot_dot" => 11,
        "medium_dash_dot_dot" => 12,
        "slant_dash_dot" => 13,
        _ => return None,
    };
    Some(n_code)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
