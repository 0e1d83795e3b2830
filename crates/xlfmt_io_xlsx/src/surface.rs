//! Worksheet capabilities used by the formatter, with a writer-backed adapter
//! and an in-memory recorder.

use std::collections::{BTreeMap, BTreeSet};

use rust_xlsxwriter::{ConditionalFormatBlank, ConditionalFormatError, Worksheet};

use crate::spec::{EnumRangeRule, SpecCellFormat, SpecCellRange, XlsxFormatError};
use crate::util::{cast_col_num, cast_row_num, derive_rust_xlsx_format, validate_cell_range};

////////////////////////////////////////////////////////////////////////////////
// #region Capabilities

/// Sets the display width of one column.
pub trait ColumnWidthSetter {
    fn set_column_width(&mut self, col: usize, width: usize) -> Result<(), XlsxFormatError>;
}

/// Applies a style to the cells of a range that satisfy `rule`.
pub trait RangeFormatter {
    fn format_range(
        &mut self,
        range: &SpecCellRange,
        rule: EnumRangeRule,
        format: &SpecCellFormat,
    ) -> Result<(), XlsxFormatError>;
}

/// Freezes the view above `row` and left of `col`.
pub trait PaneFreezer {
    fn freeze_panes(&mut self, row: usize, col: usize) -> Result<(), XlsxFormatError>;
}

/// Everything the formatter needs from a worksheet.
pub trait SheetSurface: ColumnWidthSetter + RangeFormatter + PaneFreezer {}

impl<T: ColumnWidthSetter + RangeFormatter + PaneFreezer> SheetSurface for T {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxSheetSurface

/// Adapter over a `rust_xlsxwriter` worksheet.
///
/// Range styles are emitted as conditional formats so cell values stay as
/// written. Repeating an identical `(range, rule, format)` is skipped, which
/// keeps every operation idempotent on the saved sheet.
pub struct XlsxSheetSurface<'a> {
    worksheet: &'a mut Worksheet,
    set_ranges_applied: BTreeSet<(SpecCellRange, EnumRangeRule, SpecCellFormat)>,
}

impl<'a> XlsxSheetSurface<'a> {
    pub fn new(worksheet: &'a mut Worksheet) -> Self {
        Self {
            worksheet,
            set_ranges_applied: BTreeSet::new(),
        }
    }
}

impl ColumnWidthSetter for XlsxSheetSurface<'_> {
    fn set_column_width(&mut self, col: usize, width: usize) -> Result<(), XlsxFormatError> {
        self.worksheet
            .set_column_width(cast_col_num(col)?, width as f64)?;
        Ok(())
    }
}

impl RangeFormatter for XlsxSheetSurface<'_> {
    fn format_range(
        &mut self,
        range: &SpecCellRange,
        rule: EnumRangeRule,
        format: &SpecCellFormat,
    ) -> Result<(), XlsxFormatError> {
        validate_cell_range(range)?;
        let key = (*range, rule, format.clone());
        if self.set_ranges_applied.contains(&key) {
            return Ok(());
        }

        let fmt_xlsx = derive_rust_xlsx_format(format)?;
        let n_row_first = cast_row_num(range.row_first)?;
        let n_col_first = cast_col_num(range.col_first)?;
        let n_row_last = cast_row_num(range.row_last)?;
        let n_col_last = cast_col_num(range.col_last)?;

        match rule {
            EnumRangeRule::NoBlanks => {
                let cfmt = ConditionalFormatBlank::new().invert().set_format(fmt_xlsx);
                self.worksheet.add_conditional_format(
                    n_row_first,
                    n_col_first,
                    n_row_last,
                    n_col_last,
                    &cfmt,
                )?;
            }
            EnumRangeRule::NoErrors => {
                let cfmt = ConditionalFormatError::new().invert().set_format(fmt_xlsx);
                self.worksheet.add_conditional_format(
                    n_row_first,
                    n_col_first,
                    n_row_last,
                    n_col_last,
                    &cfmt,
                )?;
            }
        }

        self.set_ranges_applied.insert(key);
        Ok(())
    }
}

impl PaneFreezer for XlsxSheetSurface<'_> {
    fn freeze_panes(&mut self, row: usize, col: usize) -> Result<(), XlsxFormatError> {
        self.worksheet
            .set_freeze_panes(cast_row_num(row)?, cast_col_num(col)?)?;
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordingSheetSurface

/// In-memory worksheet state, for checking formatter output without a file.
///
/// Bounds are checked like the writer adapter. Set `if_reject_ranges` to make
/// every range call fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSheetSurface {
    /// Width per column.
    pub dict_widths_by_col: BTreeMap<usize, usize>,
    /// Styles applied per `(row, col)`.
    pub dict_formats_by_cell: BTreeMap<(usize, usize), BTreeSet<(EnumRangeRule, SpecCellFormat)>>,
    /// Frozen `(row, col)`, if set.
    pub freeze: Option<(usize, usize)>,
    /// Fail all range calls.
    pub if_reject_ranges: bool,
}

impl RecordingSheetSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows that received any style.
    pub fn touched_rows(&self) -> BTreeSet<usize> {
        self.dict_formats_by_cell.keys().map(|(row, _)| *row).collect()
    }

    /// Cells that received any style.
    pub fn touched_cells(&self) -> BTreeSet<(usize, usize)> {
        self.dict_formats_by_cell.keys().copied().collect()
    }

    /// Styles recorded for one cell.
    pub fn formats_at(&self, row: usize, col: usize) -> Vec<&SpecCellFormat> {
        self.dict_formats_by_cell
            .get(&(row, col))
            .map(|set_fmts| set_fmts.iter().map(|(_, fmt)| fmt).collect())
            .unwrap_or_default()
    }
}

impl ColumnWidthSetter for RecordingSheetSurface {
    fn set_column_width(&mut self, col: usize, width: usize) -> Result<(), XlsxFormatError> {
        cast_col_num(col)?;
        self.dict_widths_by_col.insert(col, width);
        Ok(())
    }
}

impl RangeFormatter for RecordingSheetSurface {
    fn format_range(
        &mut self,
        range: &SpecCellRange,
        rule: EnumRangeRule,
        format: &SpecCellFormat,
    ) -> Result<(), XlsxFormatError> {
        if self.if_reject_ranges {
            return Err(XlsxFormatError::Range(format!("Range rejected: {range}")));
        }
        validate_cell_range(range)?;
        derive_rust_xlsx_format(format)?;

        for cell in range.cells() {
            self.dict_formats_by_cell
                .entry(cell)
                .or_default()
                .insert((rule, format.clone()));
        }
        Ok(())
    }
}

impl PaneFreezer for RecordingSheetSurface {
    fn freeze_panes(&mut self, row: usize, col: usize) -> Result<(), XlsxFormatError> {
        cast_row_num(row)?;
        cast_col_num(col)?;
        self.freeze = Some((row, col));
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::Workbook;

    use super::*;
    use crate::conf::{N_NCOLS_EXCEL_MAX, derive_border_format, derive_header_format};

    fn header_range() -> SpecCellRange {
        SpecCellRange {
            row_first: 0,
            col_first: 0,
            row_last: 0,
            col_last: 1,
        }
    }

    #[test]
    fn recording_surface_records_every_cell_of_range() {
        let mut surface = RecordingSheetSurface::new();
        surface
            .format_range(
                &SpecCellRange {
                    row_first: 1,
                    col_first: 0,
                    row_last: 3,
                    col_last: 1,
                },
                EnumRangeRule::NoErrors,
                &derive_border_format(1, "black"),
            )
            .expect("format range");

        assert_eq!(surface.touched_cells().len(), 6);
        assert_eq!(surface.touched_rows(), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn recording_surface_rejects_bad_color() {
        let mut surface = RecordingSheetSurface::new();
        let err = surface
            .format_range(
                &header_range(),
                EnumRangeRule::NoBlanks,
                &derive_header_format("not-a-color"),
            )
            .expect_err("bad color");
        assert!(err.to_string().contains("Unknown color"));
    }

    #[test]
    fn recording_surface_checks_column_bounds() {
        let mut surface = RecordingSheetSurface::new();
        assert!(surface.set_column_width(N_NCOLS_EXCEL_MAX, 10).is_err());
        assert!(surface.freeze_panes(1, N_NCOLS_EXCEL_MAX).is_err());
    }

    #[test]
    fn xlsx_surface_applies_ranges_widths_and_panes() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let mut surface = XlsxSheetSurface::new(worksheet);

        surface
            .format_range(
                &header_range(),
                EnumRangeRule::NoBlanks,
                &derive_header_format("#FFB3B3"),
            )
            .expect("header");
        surface
            .format_range(
                &header_range(),
                EnumRangeRule::NoBlanks,
                &derive_header_format("#FFB3B3"),
            )
            .expect("repeat");
        assert_eq!(surface.set_ranges_applied.len(), 1);

        surface.set_column_width(0, 12).expect("width");
        surface.freeze_panes(1, 0).expect("panes");

        workbook.save_to_buffer().expect("save");
    }

    #[test]
    fn xlsx_surface_rejects_out_of_sheet_range() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let mut surface = XlsxSheetSurface::new(worksheet);

        let err = surface
            .format_range(
                &SpecCellRange {
                    row_first: 0,
                    col_first: 0,
                    row_last: 0,
                    col_last: N_NCOLS_EXCEL_MAX,
                },
                EnumRangeRule::NoBlanks,
                &derive_header_format("#FFB3B3"),
            )
            .expect_err("out of sheet");
        assert!(matches!(err, XlsxFormatError::Range(_)));
    }
}
