//! XLSX constants and default preset factories.

use crate::spec::{SpecAutofitCellsPolicy, SpecCellFormat};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Accepted workbook file extension (compared case-insensitively).
pub const C_EXT_XLSX: &str = "xlsx";
/// Suffix appended to the input stem when no output path is given.
pub const C_SUFFIX_OUTPUT_DEFAULT: &str = "_formatted";

/// Header background color used when none is requested.
pub const C_COLOR_HEADER_DEFAULT: &str = "#FFB3B3";
/// Fill color of the highlighted summary row.
pub const C_COLOR_GREY_BOTTOM: &str = "#D9D9D9";
/// Border color used when none is requested.
pub const C_COLOR_BORDER_DEFAULT: &str = "black";
/// Border style name used when none is requested.
pub const C_BORDER_STYLE_DEFAULT: &str = "thin";

/// Number format applied to date/time columns.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

/// Minimum column width produced by spacing.
pub const N_WIDTH_CELL_MIN: usize = 8;
/// Maximum column width produced by spacing.
pub const N_WIDTH_CELL_MAX: usize = 50;
/// Padding added to the longest text in a column.
pub const N_WIDTH_CELL_PADDING: usize = 2;

/// Default frozen row: keep only the header visible.
pub const N_ROW_FREEZE_DEFAULT: usize = 1;
/// Default frozen column: none.
pub const N_COL_FREEZE_DEFAULT: usize = 0;

/// Header row fill.
pub fn derive_header_format(color: &str) -> SpecCellFormat {
    SpecCellFormat {
        bg_color: Some(color.to_string()),
        ..Default::default()
    }
}

/// Bold grey fill for the last data row.
pub fn derive_grey_bottom_format() -> SpecCellFormat {
    SpecCellFormat {
        bg_color: Some(C_COLOR_GREY_BOTTOM.to_string()),
        bold: Some(true),
        ..Default::default()
    }
}

/// Border on all four sides of each body cell.
pub fn derive_border_format(border: i64, border_color: &str) -> SpecCellFormat {
    SpecCellFormat {
        border: Some(border),
        border_color: Some(border_color.to_string()),
        ..Default::default()
    }
}

/// Cell format for date/time body cells written by [`crate::writer::XlsxWriter`].
pub fn derive_datetime_format() -> SpecCellFormat {
    SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_DATETIME.to_string()),
        ..Default::default()
    }
}

/// Build default spacing policy.
pub fn derive_default_autofit_policy() -> SpecAutofitCellsPolicy {
    SpecAutofitCellsPolicy::default()
}
