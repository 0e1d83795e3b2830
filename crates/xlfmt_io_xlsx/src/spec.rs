//! Shared XLSX models and top-level error types.

use std::collections::BTreeSet;
use std::fmt;

use polars::error::PolarsError;
use polars::prelude::{Column, DataFrame};
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::conf::{N_WIDTH_CELL_MAX, N_WIDTH_CELL_MIN, N_WIDTH_CELL_PADDING};
use crate::util::{derive_cell_value_from_any_value, flatten_row_index};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormat

/// Style descriptor applied to a cell range.
///
/// Immutable once handed to a [`crate::surface::RangeFormatter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
    /// Border style for all sides (Excel border code, `1` = thin).
    pub border: Option<i64>,
    /// Border color for all sides.
    pub border_color: Option<String>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

/// Normalized cell value during conversion/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Excel date/time serial (days since 1899-12-30).
    DateTime(f64),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellRange

/// Inclusive rectangular cell range, zero-based, row 0 being the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecCellRange {
    /// First row (inclusive).
    pub row_first: usize,
    /// First column (inclusive).
    pub col_first: usize,
    /// Last row (inclusive).
    pub row_last: usize,
    /// Last column (inclusive).
    pub col_last: usize,
}

impl SpecCellRange {
    /// Iterate all `(row, col)` pairs covered by the range.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row_first..=self.row_last)
            .flat_map(move |row| (self.col_first..=self.col_last).map(move |col| (row, col)))
    }
}

impl fmt::Display for SpecCellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.row_first, self.col_first, self.row_last, self.col_last
        )
    }
}

/// Cell rule restricting which cells of a range receive the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumRangeRule {
    /// Only non-blank cells.
    NoBlanks,
    /// Every cell that does not hold an error value.
    NoErrors,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Table

/// Row labeling carried by a [`SpecTable`].
#[derive(Debug, Clone, Default)]
pub enum EnumRowIndex {
    /// Plain positional rows.
    #[default]
    Range,
    /// Hierarchical row index, outermost level first.
    Levels(Vec<Column>),
}

impl EnumRowIndex {
    /// Number of index levels that become columns on flattening.
    pub fn n_levels(&self) -> usize {
        match self {
            Self::Range => 0,
            Self::Levels(l_levels) => l_levels.len(),
        }
    }
}

/// In-memory rectangular dataset being formatted.
#[derive(Debug, Clone)]
pub struct SpecTable {
    df_data: DataFrame,
    row_index: EnumRowIndex,
    set_cols_datetime: BTreeSet<String>,
    if_validated: bool,
}

impl SpecTable {
    /// Wrap a dataframe with a positional row index.
    pub fn new(df_data: DataFrame) -> Self {
        Self {
            df_data,
            row_index: EnumRowIndex::Range,
            set_cols_datetime: BTreeSet::new(),
            if_validated: false,
        }
    }

    /// Attach a hierarchical row index (one column per level).
    pub fn with_row_index(mut self, l_levels: Vec<Column>) -> Self {
        self.row_index = if l_levels.is_empty() {
            EnumRowIndex::Range
        } else {
            EnumRowIndex::Levels(l_levels)
        };
        self.if_validated = false;
        self
    }

    /// Mark columns whose numbers are Excel date/time serials.
    pub fn with_datetime_columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_cols_datetime.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Underlying data columns (index levels excluded until validated).
    pub fn dataframe(&self) -> &DataFrame {
        &self.df_data
    }

    /// Current row index.
    pub fn row_index(&self) -> &EnumRowIndex {
        &self.row_index
    }

    /// Whether [`Self::validate`] has already succeeded.
    pub fn is_validated(&self) -> bool {
        self.if_validated
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.df_data.height()
    }

    /// Number of data columns.
    pub fn width(&self) -> usize {
        self.df_data.width()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Whether the named column holds date/time serials.
    pub fn is_datetime_column(&self, name: &str) -> bool {
        self.set_cols_datetime.contains(name)
    }

    /// Flatten the row index into leading columns and check the shape.
    ///
    /// No-op once it has succeeded.
    pub fn validate(&mut self) -> Result<(), XlsxFormatError> {
        if self.if_validated {
            return Ok(());
        }

        let df_flat = flatten_row_index(&self.df_data, &self.row_index)?;
        if df_flat.width() == 0 {
            return Err(XlsxFormatError::Data(
                "Table has no columns; nothing to format.".to_string(),
            ));
        }

        self.df_data = df_flat;
        self.row_index = EnumRowIndex::Range;
        self.if_validated = true;
        Ok(())
    }

    /// Read one normalized cell (data row `n_idx_row`, zero-based).
    pub fn cell_value(
        &self,
        n_idx_row: usize,
        n_idx_col: usize,
    ) -> Result<EnumCellValue, XlsxFormatError> {
        let col = self.df_data.get_columns().get(n_idx_col).ok_or_else(|| {
            XlsxFormatError::Data(format!("Column index out of range: {n_idx_col}"))
        })?;
        let value = derive_cell_value_from_any_value(col.get(n_idx_row)?);

        match value {
            EnumCellValue::Number(n) if self.is_datetime_column(col.name().as_str()) => {
                Ok(EnumCellValue::DateTime(n))
            }
            _ => Ok(value),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FormatOptions

/// Column width policy for spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            width_cell_min: N_WIDTH_CELL_MIN,
            width_cell_max: N_WIDTH_CELL_MAX,
            width_cell_padding: N_WIDTH_CELL_PADDING,
        }
    }
}

/// Formatter operation names, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFormatOperation {
    /// Table normalization.
    Validate,
    /// Column width computation.
    Spacing,
    /// Header and summary-row coloring.
    ColumnColors,
    /// Body cell borders.
    Borders,
    /// Frozen pane.
    FreezePanes,
}

impl fmt::Display for EnumFormatOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Validate => "validate",
            Self::Spacing => "spacing",
            Self::ColumnColors => "color_columns",
            Self::Borders => "borders",
            Self::FreezePanes => "freeze_panes",
        };
        f.write_str(c_name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Error taxonomy used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumErrorKind {
    /// Missing file, wrong extension, unknown sheet.
    Input,
    /// Unsupported or empty table shape.
    Data,
    /// Failure while talking to the spreadsheet writer.
    Formatting,
    /// User interrupt.
    Interrupted,
}

/// Top-level error for reading, formatting and writing workbooks.
#[derive(Debug, Error)]
pub enum XlsxFormatError {
    /// Invalid input path or sheet selection.
    #[error("{0}")]
    Input(String),
    /// Unsupported table shape.
    #[error("{0}")]
    Data(String),
    /// Cell range rejected before reaching the writer.
    #[error("{0}")]
    Range(String),
    /// A formatter operation failed; `source` is the original cause.
    #[error("{operation} failed: {source}")]
    Formatting {
        /// Operation that failed.
        operation: EnumFormatOperation,
        /// Original cause.
        #[source]
        source: Box<XlsxFormatError>,
    },
    /// Writer library rejected a call.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// Workbook could not be read.
    #[error("xlsx read error: {0}")]
    Read(#[from] calamine::XlsxError),
    /// Dataframe construction or access failed.
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl XlsxFormatError {
    /// Classify into the reporting taxonomy.
    pub fn kind(&self) -> EnumErrorKind {
        match self {
            Self::Input(_) | Self::Read(_) => EnumErrorKind::Input,
            Self::Data(_) | Self::Polars(_) => EnumErrorKind::Data,
            Self::Range(_) | Self::Formatting { .. } | Self::Xlsx(_) => EnumErrorKind::Formatting,
            Self::Io(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                EnumErrorKind::Interrupted
            }
            Self::Io(_) => EnumErrorKind::Formatting,
        }
    }

    /// Wrap `self` as the cause of a failed `operation`.
    pub fn within(self, operation: EnumFormatOperation) -> Self {
        Self::Formatting {
            operation,
            source: Box::new(self),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame};

    use super::*;

    fn make_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Name".into(), &["Alice", "Bob", "Carol"]),
            Column::new("Score".into(), &[10i64, 200, 3]),
        ])
        .expect("dataframe")
    }

    #[test]
    fn validate_flattens_multi_level_index_into_leading_columns() {
        let mut table = SpecTable::new(make_df()).with_row_index(vec![
            Column::new("region".into(), &["N", "N", "S"]),
            Column::new("team".into(), &[1i64, 2, 1]),
        ]);

        table.validate().expect("validate");

        assert_eq!(table.height(), 3);
        assert_eq!(table.width(), 4);
        assert_eq!(table.column_names(), vec!["region", "team", "Name", "Score"]);
        assert_eq!(table.row_index().n_levels(), 0);
        assert!(table.is_validated());
    }

    #[test]
    fn validate_names_unnamed_levels() {
        let mut table = SpecTable::new(make_df()).with_row_index(vec![
            Column::new("".into(), &["a", "b", "c"]),
            Column::new("".into(), &[1i64, 2, 3]),
        ]);

        table.validate().expect("validate");

        assert_eq!(
            table.column_names(),
            vec!["level_0", "level_1", "Name", "Score"]
        );
    }

    #[test]
    fn validate_is_idempotent() {
        let mut table = SpecTable::new(make_df())
            .with_row_index(vec![Column::new("k".into(), &["a", "b", "c"])]);

        table.validate().expect("first");
        table.validate().expect("second");

        assert_eq!(table.width(), 3);
    }

    #[test]
    fn validate_rejects_tables_without_columns() {
        let mut table = SpecTable::new(DataFrame::empty());
        let err = table.validate().expect_err("no columns");
        assert_eq!(err.kind(), EnumErrorKind::Data);
        assert!(!table.is_validated());
    }

    #[test]
    fn validate_accepts_headers_only_table() {
        let df = DataFrame::new(vec![
            Column::new("Name".into(), Vec::<String>::new()),
            Column::new("Score".into(), Vec::<i64>::new()),
        ])
        .expect("dataframe");
        let mut table = SpecTable::new(df);

        table.validate().expect("headers only");
        assert_eq!(table.height(), 0);
        assert_eq!(table.width(), 2);
    }

    #[test]
    fn validate_rejects_index_level_clashing_with_column() {
        let mut table = SpecTable::new(make_df())
            .with_row_index(vec![Column::new("Name".into(), &["x", "y", "z"])]);
        let err = table.validate().expect_err("duplicate");
        assert_eq!(err.kind(), EnumErrorKind::Data);
        assert!(err.to_string().contains("Duplicate column names"));
    }

    #[test]
    fn validate_rejects_index_level_with_wrong_length() {
        let mut table =
            SpecTable::new(make_df()).with_row_index(vec![Column::new("k".into(), &["x"])]);
        let err = table.validate().expect_err("length mismatch");
        assert_eq!(err.kind(), EnumErrorKind::Data);
    }

    #[test]
    fn cell_value_maps_datetime_columns() {
        let df = DataFrame::new(vec![Column::new("when".into(), &[45_000.5f64])])
            .expect("dataframe");
        let table = SpecTable::new(df).with_datetime_columns(["when"]);

        assert_eq!(
            table.cell_value(0, 0).expect("cell"),
            EnumCellValue::DateTime(45_000.5)
        );
    }

    #[test]
    fn formatting_error_keeps_cause_and_kind() {
        let err = XlsxFormatError::Data("empty".to_string()).within(EnumFormatOperation::Borders);
        assert_eq!(err.kind(), EnumErrorKind::Formatting);
        assert_eq!(err.to_string(), "borders failed: empty");
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "empty");
    }

    #[test]
    fn interrupted_io_maps_to_interrupted_kind() {
        let err = XlsxFormatError::from(std::io::Error::from(std::io::ErrorKind::Interrupted));
        assert_eq!(err.kind(), EnumErrorKind::Interrupted);
    }
}
