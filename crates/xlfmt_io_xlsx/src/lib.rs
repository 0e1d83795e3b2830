//! `xlfmt_io_xlsx` v1:
//! Rust-side XLSX reformatting kernel.
//!
//! - `conf`      : constants and default presets
//! - `spec`      : table model, format/range specs, errors
//! - `util`      : pure helper functions
//! - `reader`    : calamine sheet loader
//! - `writer`    : buffered rust_xlsxwriter workbook
//! - `surface`   : worksheet capability traits and adapters
//! - `formatter` : cosmetic worksheet operations
pub mod conf;
pub mod formatter;
pub mod reader;
pub mod spec;
pub mod surface;
pub mod util;
pub mod writer;

pub use conf::{
    C_BORDER_STYLE_DEFAULT, C_COLOR_BORDER_DEFAULT, C_COLOR_GREY_BOTTOM, C_COLOR_HEADER_DEFAULT,
    N_COL_FREEZE_DEFAULT, N_ROW_FREEZE_DEFAULT,
};
pub use formatter::XlsxFormatter;
pub use reader::read_table;
pub use spec::{
    EnumCellValue, EnumErrorKind, EnumFormatOperation, EnumRangeRule, EnumRowIndex,
    SpecAutofitCellsPolicy, SpecCellFormat, SpecCellRange, SpecTable, XlsxFormatError,
};
pub use surface::{
    ColumnWidthSetter, PaneFreezer, RangeFormatter, RecordingSheetSurface, SheetSurface,
    XlsxSheetSurface,
};
pub use util::{
    derive_border_code, derive_color, derive_output_xlsx_path, validate_input_xlsx_path,
};
pub use writer::XlsxWriter;
