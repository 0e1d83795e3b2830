//! XLSX writer kernel that writes a validated table into a buffered workbook.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_datetime_format,
};
use crate::spec::{EnumCellValue, SpecTable, XlsxFormatError};
use crate::util::{cast_col_num, cast_row_num, derive_rust_xlsx_format, sanitize_sheet_name};

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::close`] is called, which
/// persists it atomically. Dropping an unclosed writer leaves no file behind.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    set_sheet_names_existing: BTreeSet<String>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path.
    pub fn new(path_file_out: PathBuf) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            set_sheet_names_existing: BTreeSet::new(),
            if_closed: false,
        }
    }

    /// Flush workbook to disk. Idempotent.
    ///
    /// Bytes go to a temp file in the output directory first, then replace the
    /// target in one rename.
    pub fn close(&mut self) -> Result<(), XlsxFormatError> {
        if self.if_closed {
            return Ok(());
        }
        let v_buffer = self.workbook.save_to_buffer()?;

        let path_dir_out = match self.path_file_out.parent() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => Path::new("."),
        };
        let mut file_tmp = NamedTempFile::new_in(path_dir_out)?;
        file_tmp.write_all(&v_buffer)?;
        file_tmp.flush()?;
        file_tmp
            .persist(&self.path_file_out)
            .map_err(|err| XlsxFormatError::Io(err.error))?;

        debug!(
            file_out = %self.path_file_out.display(),
            bytes = v_buffer.len(),
            "workbook saved"
        );
        self.if_closed = true;
        Ok(())
    }

    /// Write header and body of `table` into a new sheet.
    ///
    /// Returns the sheet name actually used (sanitized and made unique).
    pub fn write_table(
        &mut self,
        table: &SpecTable,
        sheet_name: &str,
    ) -> Result<String, XlsxFormatError> {
        if self.if_closed {
            return Err(XlsxFormatError::Input(
                "Cannot write after close().".to_string(),
            ));
        }
        if !table.is_validated() {
            return Err(XlsxFormatError::Data(
                "Table must be validated before writing.".to_string(),
            ));
        }
        if table.height() + 1 > N_NROWS_EXCEL_MAX || table.width() > N_NCOLS_EXCEL_MAX {
            return Err(XlsxFormatError::Data(format!(
                "Table of {} rows x {} columns exceeds worksheet limits.",
                table.height(),
                table.width()
            )));
        }

        let sheet_name_unique =
            self.derive_unique_sheet_name(&sanitize_sheet_name(sheet_name, "_"));
        let fmt_datetime = derive_rust_xlsx_format(&derive_datetime_format())?;

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        for (n_idx_col, c_name) in table.column_names().iter().enumerate() {
            worksheet.write_string(0, cast_col_num(n_idx_col)?, c_name)?;
        }

        for n_idx_row in 0..table.height() {
            for n_idx_col in 0..table.width() {
                let value = table.cell_value(n_idx_row, n_idx_col)?;
                write_cell(worksheet, n_idx_row + 1, n_idx_col, &value, &fmt_datetime)?;
            }
        }

        debug!(
            sheet = %sheet_name_unique,
            rows = table.height(),
            cols = table.width(),
            "table written"
        );
        Ok(sheet_name_unique)
    }

    /// Mutable handle to a sheet written by [`Self::write_table`].
    pub fn worksheet_mut(&mut self, sheet_name: &str) -> Result<&mut Worksheet, XlsxFormatError> {
        if self.if_closed {
            return Err(XlsxFormatError::Input(
                "Cannot format after close().".to_string(),
            ));
        }
        Ok(self.workbook.worksheet_from_name(sheet_name)?)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    fmt_datetime: &Format,
) -> Result<(), XlsxFormatError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        EnumCellValue::Number(val) if val.is_finite() => {
            worksheet.write_number(n_row, n_col, *val)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_string(n_row, n_col, val.to_string())?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, fmt_datetime)?;
        }
    }
    Ok(())
}
