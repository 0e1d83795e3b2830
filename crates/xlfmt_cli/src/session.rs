//! One formatting run: read, write, format, persist.

use std::error::Error;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};
use xlfmt_io_xlsx::{
    EnumErrorKind, N_COL_FREEZE_DEFAULT, N_ROW_FREEZE_DEFAULT, SheetSurface, SpecTable,
    XlsxFormatError, XlsxFormatter, XlsxSheetSurface, XlsxWriter, derive_output_xlsx_path,
    read_table, validate_input_xlsx_path,
};

use crate::cli::{Cli, SpecFormatPlan};

/// Exit status for a successful run.
pub const N_EXIT_OK: u8 = 0;
/// Exit status for any reported failure.
pub const N_EXIT_FAILURE: u8 = 1;
/// Exit status after a user interrupt.
pub const N_EXIT_INTERRUPTED: u8 = 130;

/// Format `cli.filename` into the output workbook and return its path.
///
/// The output is only written by the final `close`; on any earlier error the
/// writer is dropped and nothing is left on disk.
pub fn run_session(cli: &Cli) -> Result<PathBuf, XlsxFormatError> {
    validate_input_xlsx_path(&cli.filename)?;
    let path_out = derive_output_xlsx_path(&cli.filename, cli.output.as_deref())?;

    let plan = SpecFormatPlan::from_cli(cli);
    if plan.is_empty() {
        warn!("No formatting operation selected; the table is copied unchanged.");
    }
    debug!(?plan, "format plan");

    let (mut table, c_sheet) = read_table(&cli.filename, cli.sheet.as_deref())?;
    table.validate()?;

    let mut writer = XlsxWriter::new(path_out.clone());
    let c_sheet_out = writer.write_table(&table, &c_sheet)?;
    {
        let mut surface = XlsxSheetSurface::new(writer.worksheet_mut(&c_sheet_out)?);
        apply_plan(&plan, &mut table, &mut surface)?;
    }
    writer.close()?;

    info!(
        file_out = %path_out.display(),
        sheet = %c_sheet_out,
        "workbook written"
    );
    Ok(path_out)
}

/// Run the selected operations: borders, panes, colors, then spacing.
pub fn apply_plan<S: SheetSurface>(
    plan: &SpecFormatPlan,
    table: &mut SpecTable,
    surface: &mut S,
) -> Result<(), XlsxFormatError> {
    let mut formatter = XlsxFormatter::new(table, surface);
    formatter.validate()?;

    if plan.if_borders {
        formatter.apply_borders(plan.border, &plan.border_color)?;
    }
    if plan.if_freeze_panes {
        formatter.freeze_panes(N_ROW_FREEZE_DEFAULT, N_COL_FREEZE_DEFAULT)?;
    }
    if plan.if_color_columns {
        formatter.apply_column_colors(plan.if_grey_bottom, &plan.header_color)?;
    }
    if plan.if_spacing {
        formatter.apply_spacing()?;
    }
    Ok(())
}

/// Map an error to the process exit status.
pub fn derive_exit_code(err: &XlsxFormatError) -> u8 {
    match err.kind() {
        EnumErrorKind::Interrupted => N_EXIT_INTERRUPTED,
        EnumErrorKind::Input | EnumErrorKind::Data | EnumErrorKind::Formatting => N_EXIT_FAILURE,
    }
}

/// Log the terminal failure; with `if_verbose` also each underlying cause.
pub fn report_error(err: &XlsxFormatError, if_verbose: bool) {
    error!(kind = ?err.kind(), "{err}");
    if !if_verbose {
        return;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        error!("caused by: {cause}");
        source = cause.source();
    }
}
