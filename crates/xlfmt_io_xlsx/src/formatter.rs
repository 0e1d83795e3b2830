//! Cosmetic worksheet operations over a validated table.

use tracing::{debug, error, warn};

use crate::conf::{
    derive_border_format, derive_default_autofit_policy, derive_grey_bottom_format,
    derive_header_format,
};
use crate::spec::{
    EnumFormatOperation, EnumRangeRule, SpecAutofitCellsPolicy, SpecTable, XlsxFormatError,
};
use crate::surface::SheetSurface;
use crate::util::{
    calculate_column_width, derive_cell_text, estimate_text_len, plan_body_range,
    plan_header_range, plan_last_row_range, validate_policy_autofit,
};

/// Applies formatting operations to one worksheet mirroring one table.
///
/// Every operation validates the table first (a no-op after the first
/// success), so operations may run in any order or subset. Failures of the
/// four formatting operations are returned as [`XlsxFormatError::Formatting`]
/// naming the operation.
pub struct XlsxFormatter<'a, S: SheetSurface> {
    table: &'a mut SpecTable,
    surface: &'a mut S,
    policy_autofit: SpecAutofitCellsPolicy,
}

impl<'a, S: SheetSurface> XlsxFormatter<'a, S> {
    pub fn new(table: &'a mut SpecTable, surface: &'a mut S) -> Self {
        Self {
            table,
            surface,
            policy_autofit: derive_default_autofit_policy(),
        }
    }

    /// Flatten the row index and check the table shape.
    ///
    /// Errors are returned as raised (a DataError for a bad shape).
    pub fn validate(&mut self) -> Result<(), XlsxFormatError> {
        self.table.validate().inspect_err(|err| {
            error!(
                operation = %EnumFormatOperation::Validate,
                error = %err,
                "table validation failed"
            );
        })
    }

    /// Set each column to its clamped content width.
    pub fn apply_spacing(&mut self) -> Result<(), XlsxFormatError> {
        let result = self.run_spacing();
        derive_operation_result(EnumFormatOperation::Spacing, result)
    }

    /// Color the header row; optionally bold-grey the last data row.
    pub fn apply_column_colors(
        &mut self,
        if_grey_bottom: bool,
        header_color: &str,
    ) -> Result<(), XlsxFormatError> {
        let result = self.run_column_colors(if_grey_bottom, header_color);
        derive_operation_result(EnumFormatOperation::ColumnColors, result)
    }

    /// Border every data cell; the header row is left untouched.
    pub fn apply_borders(
        &mut self,
        border: i64,
        border_color: &str,
    ) -> Result<(), XlsxFormatError> {
        let result = self.run_borders(border, border_color);
        derive_operation_result(EnumFormatOperation::Borders, result)
    }

    /// Freeze rows above `row` and columns left of `col`.
    pub fn freeze_panes(&mut self, row: usize, col: usize) -> Result<(), XlsxFormatError> {
        let result = self.run_freeze_panes(row, col);
        derive_operation_result(EnumFormatOperation::FreezePanes, result)
    }

    fn run_spacing(&mut self) -> Result<(), XlsxFormatError> {
        self.table.validate()?;
        validate_policy_autofit(&self.policy_autofit).map_err(XlsxFormatError::Data)?;

        let l_widths = derive_column_text_lens(self.table)?;
        for (n_idx_col, n_len_text_max) in l_widths.into_iter().enumerate() {
            let n_width = calculate_column_width(n_len_text_max, &self.policy_autofit);
            debug!(
                col = n_idx_col,
                len_text_max = n_len_text_max,
                width = n_width,
                "set column width"
            );
            self.surface.set_column_width(n_idx_col, n_width)?;
        }
        Ok(())
    }

    fn run_column_colors(
        &mut self,
        if_grey_bottom: bool,
        header_color: &str,
    ) -> Result<(), XlsxFormatError> {
        self.table.validate()?;
        let n_height = self.table.height();
        let n_width = self.table.width();

        if let Some(range) = plan_header_range(n_width) {
            debug!(%range, color = header_color, "color header row");
            self.surface.format_range(
                &range,
                EnumRangeRule::NoBlanks,
                &derive_header_format(header_color),
            )?;
        }

        if if_grey_bottom {
            match plan_last_row_range(n_height, n_width) {
                Some(range) => {
                    debug!(%range, "grey bottom row");
                    self.surface.format_range(
                        &range,
                        EnumRangeRule::NoBlanks,
                        &derive_grey_bottom_format(),
                    )?;
                }
                None => warn!("Table has no data rows; skipping grey bottom row."),
            }
        }
        Ok(())
    }

    fn run_borders(&mut self, border: i64, border_color: &str) -> Result<(), XlsxFormatError> {
        self.table.validate()?;

        let Some(range) = plan_body_range(self.table.height(), self.table.width()) else {
            warn!("Table has no data rows; skipping borders.");
            return Ok(());
        };
        debug!(%range, border, color = border_color, "border body cells");
        self.surface.format_range(
            &range,
            EnumRangeRule::NoErrors,
            &derive_border_format(border, border_color),
        )
    }

    fn run_freeze_panes(&mut self, row: usize, col: usize) -> Result<(), XlsxFormatError> {
        self.table.validate()?;
        debug!(row, col, "freeze panes");
        self.surface.freeze_panes(row, col)
    }
}

/// Longest rendered text per column, header included.
pub fn derive_column_text_lens(table: &SpecTable) -> Result<Vec<usize>, XlsxFormatError> {
    let l_colnames = table.column_names();
    let mut l_lens: Vec<usize> = l_colnames.iter().map(|c| estimate_text_len(c)).collect();

    for (n_idx_col, n_len) in l_lens.iter_mut().enumerate() {
        for n_idx_row in 0..table.height() {
            let value = table.cell_value(n_idx_row, n_idx_col)?;
            *n_len = usize::max(*n_len, estimate_text_len(&derive_cell_text(&value)));
        }
    }
    Ok(l_lens)
}

fn derive_operation_result(
    operation: EnumFormatOperation,
    result: Result<(), XlsxFormatError>,
) -> Result<(), XlsxFormatError> {
    result.map_err(|err| {
        error!(%operation, error = %err, "formatting operation failed");
        err.within(operation)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use polars::prelude::{Column, DataFrame};

    use super::*;
    use crate::conf::{C_COLOR_GREY_BOTTOM, C_COLOR_HEADER_DEFAULT};
    use crate::spec::EnumErrorKind;
    use crate::surface::RecordingSheetSurface;

    fn make_scores() -> SpecTable {
        let df = DataFrame::new(vec![
            Column::new("Name".into(), &["Alice", "Bob", "Carol"]),
            Column::new("Score".into(), &[10i64, 200, 3]),
        ])
        .expect("dataframe");
        SpecTable::new(df)
    }

    fn make_headers_only() -> SpecTable {
        let df = DataFrame::new(vec![
            Column::new("Name".into(), Vec::<String>::new()),
            Column::new("Score".into(), Vec::<i64>::new()),
        ])
        .expect("dataframe");
        SpecTable::new(df)
    }

    #[test]
    fn spacing_clamps_short_columns_to_minimum() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_spacing()
            .expect("spacing");

        assert_eq!(surface.dict_widths_by_col.get(&0), Some(&8));
        assert_eq!(surface.dict_widths_by_col.get(&1), Some(&8));
    }

    #[test]
    fn spacing_tracks_long_cells_until_maximum() {
        let df = DataFrame::new(vec![
            Column::new("Description".into(), &["short", "a considerably longer value"]),
            Column::new("Blob".into(), &["x".repeat(10), "y".repeat(200)]),
        ])
        .expect("dataframe");
        let mut table = SpecTable::new(df);
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_spacing()
            .expect("spacing");

        assert_eq!(surface.dict_widths_by_col.get(&0), Some(&29));
        assert_eq!(surface.dict_widths_by_col.get(&1), Some(&50));
    }

    #[test]
    fn spacing_measures_flattened_index_levels() {
        let mut table = make_scores().with_row_index(vec![Column::new(
            "department".into(),
            &["Research and Development", "Sales", "Sales"],
        )]);
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_spacing()
            .expect("spacing");

        assert_eq!(surface.dict_widths_by_col.len(), 3);
        assert_eq!(surface.dict_widths_by_col.get(&0), Some(&26));
    }

    #[test]
    fn column_colors_without_grey_bottom_touch_only_header() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_column_colors(false, C_COLOR_HEADER_DEFAULT)
            .expect("colors");

        assert_eq!(surface.touched_rows(), BTreeSet::from([0]));
        assert_eq!(
            surface.touched_cells(),
            BTreeSet::from([(0, 0), (0, 1)])
        );
        assert_eq!(
            surface.formats_at(0, 1)[0].bg_color.as_deref(),
            Some(C_COLOR_HEADER_DEFAULT)
        );
    }

    #[test]
    fn column_colors_with_grey_bottom_touch_last_data_row() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
            .expect("colors");

        assert_eq!(surface.touched_rows(), BTreeSet::from([0, 3]));
        let fmt_bottom = surface.formats_at(3, 0)[0];
        assert_eq!(fmt_bottom.bg_color.as_deref(), Some(C_COLOR_GREY_BOTTOM));
        assert_eq!(fmt_bottom.bold, Some(true));
    }

    #[test]
    fn borders_cover_exactly_the_body() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .apply_borders(1, "black")
            .expect("borders");

        let set_expected: BTreeSet<(usize, usize)> = (1..=3)
            .flat_map(|row| (0..2).map(move |col| (row, col)))
            .collect();
        assert_eq!(surface.touched_cells(), set_expected);
        assert!(!surface.touched_rows().contains(&0));
    }

    #[test]
    fn freeze_panes_records_position() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        XlsxFormatter::new(&mut table, &mut surface)
            .freeze_panes(1, 0)
            .expect("panes");

        assert_eq!(surface.freeze, Some((1, 0)));
    }

    #[test]
    fn operations_are_idempotent() {
        let mut table = make_scores();
        let mut surface_once = RecordingSheetSurface::new();
        {
            let mut formatter = XlsxFormatter::new(&mut table, &mut surface_once);
            formatter.apply_spacing().expect("spacing");
            formatter
                .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
                .expect("colors");
            formatter.apply_borders(1, "black").expect("borders");
            formatter.freeze_panes(1, 0).expect("panes");
        }

        let mut table = make_scores();
        let mut surface_twice = RecordingSheetSurface::new();
        {
            let mut formatter = XlsxFormatter::new(&mut table, &mut surface_twice);
            for _ in 0..2 {
                formatter.apply_spacing().expect("spacing");
                formatter
                    .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
                    .expect("colors");
                formatter.apply_borders(1, "black").expect("borders");
                formatter.freeze_panes(1, 0).expect("panes");
            }
        }

        assert_eq!(surface_once, surface_twice);
    }

    #[test]
    fn operation_order_does_not_change_result() {
        let mut table = make_scores();
        let mut surface_a = RecordingSheetSurface::new();
        {
            let mut formatter = XlsxFormatter::new(&mut table, &mut surface_a);
            formatter.apply_borders(1, "black").expect("borders");
            formatter
                .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
                .expect("colors");
            formatter.apply_spacing().expect("spacing");
        }

        let mut table = make_scores();
        let mut surface_b = RecordingSheetSurface::new();
        {
            let mut formatter = XlsxFormatter::new(&mut table, &mut surface_b);
            formatter.apply_spacing().expect("spacing");
            formatter
                .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
                .expect("colors");
            formatter.apply_borders(1, "black").expect("borders");
        }

        assert_eq!(surface_a, surface_b);
    }

    #[test]
    fn headers_only_table_skips_body_operations() {
        let mut table = make_headers_only();
        let mut surface = RecordingSheetSurface::new();
        let mut formatter = XlsxFormatter::new(&mut table, &mut surface);

        formatter.apply_borders(1, "black").expect("borders no-op");
        formatter
            .apply_column_colors(true, C_COLOR_HEADER_DEFAULT)
            .expect("header only");
        formatter.apply_spacing().expect("spacing");

        assert_eq!(surface.touched_rows(), BTreeSet::from([0]));
        assert_eq!(surface.dict_widths_by_col.len(), 2);
    }

    #[test]
    fn rejected_range_is_wrapped_with_operation() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface {
            if_reject_ranges: true,
            ..RecordingSheetSurface::default()
        };
        let err = XlsxFormatter::new(&mut table, &mut surface)
            .apply_borders(1, "black")
            .expect_err("rejected");

        assert_eq!(err.kind(), EnumErrorKind::Formatting);
        assert!(matches!(
            err,
            XlsxFormatError::Formatting {
                operation: EnumFormatOperation::Borders,
                ..
            }
        ));
    }

    #[test]
    fn invalid_table_fails_every_operation() {
        let mut table = SpecTable::new(DataFrame::empty());
        let mut surface = RecordingSheetSurface::new();
        let mut formatter = XlsxFormatter::new(&mut table, &mut surface);

        let err = formatter.apply_spacing().expect_err("spacing");
        assert!(matches!(
            err,
            XlsxFormatError::Formatting {
                operation: EnumFormatOperation::Spacing,
                ..
            }
        ));
        assert!(formatter.freeze_panes(1, 0).is_err());

        let err = formatter.validate().expect_err("validate");
        assert_eq!(err.kind(), EnumErrorKind::Data);
        assert!(matches!(err, XlsxFormatError::Data(_)));
    }

    #[test]
    fn unknown_border_code_is_rejected() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        let err = XlsxFormatter::new(&mut table, &mut surface)
            .apply_borders(99, "black")
            .expect_err("bad border code");

        assert_eq!(err.kind(), EnumErrorKind::Formatting);
        assert!(err.to_string().contains("Unknown border code"));
        assert!(surface.touched_cells().is_empty());
    }

    #[test]
    fn freeze_panes_out_of_sheet_is_formatting_error() {
        let mut table = make_scores();
        let mut surface = RecordingSheetSurface::new();
        let err = XlsxFormatter::new(&mut table, &mut surface)
            .freeze_panes(usize::MAX, 0)
            .expect_err("out of sheet");
        assert_eq!(err.kind(), EnumErrorKind::Formatting);
    }
}
