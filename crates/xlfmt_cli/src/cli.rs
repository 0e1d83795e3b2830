//! Command-line arguments and the formatting plan derived from them.

use std::path::PathBuf;

use clap::Parser;
use xlfmt_io_xlsx::{
    C_BORDER_STYLE_DEFAULT, C_COLOR_BORDER_DEFAULT, C_COLOR_HEADER_DEFAULT, derive_border_code,
    derive_color,
};

#[derive(Debug, Parser)]
#[command(name = "xlfmt")]
#[command(
    version,
    about = "Apply cosmetic formatting (spacing, colors, borders, frozen panes) to an .xlsx sheet"
)]
pub struct Cli {
    /// Workbook to format (.xlsx)
    pub filename: PathBuf,

    /// Output workbook (default: <input_stem>_formatted.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sheet to format (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Border every data cell
    #[arg(long)]
    pub borders: bool,

    /// Freeze the header row
    #[arg(long)]
    pub freeze_panes: bool,

    /// Color the header row
    #[arg(long)]
    pub color_columns: bool,

    /// Fit column widths to their content
    #[arg(long)]
    pub spacing: bool,

    /// Grey and bold the last data row when coloring columns
    #[arg(long)]
    pub grey_bottom: bool,

    /// Apply borders, frozen panes, column colors and spacing
    #[arg(long)]
    pub all: bool,

    /// Header background color (#RRGGBB or a basic color name)
    #[arg(long, default_value = C_COLOR_HEADER_DEFAULT, value_parser = parse_color)]
    pub header_color: String,

    /// Border style name (thin, medium, dashed, dotted, thick, double, ...)
    #[arg(long, default_value = C_BORDER_STYLE_DEFAULT, value_parser = parse_border_style)]
    pub border_style: i64,

    /// Border color (#RRGGBB or a basic color name)
    #[arg(long, default_value = C_COLOR_BORDER_DEFAULT, value_parser = parse_color)]
    pub border_color: String,

    /// Log debug details
    #[arg(short, long)]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_color(value: &str) -> Result<String, String> {
    derive_color(value)
        .map(|_| value.trim().to_string())
        .map_err(|err| err.to_string())
}

fn parse_border_style(value: &str) -> Result<i64, String> {
    derive_border_code(value).ok_or_else(|| format!("Unknown border style: {value:?}"))
}

/// Operations to run and the styles they use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFormatPlan {
    pub if_borders: bool,
    pub if_freeze_panes: bool,
    pub if_color_columns: bool,
    pub if_spacing: bool,
    pub if_grey_bottom: bool,
    pub header_color: String,
    pub border: i64,
    pub border_color: String,
}

impl SpecFormatPlan {
    /// `--all` switches on the four operations; each flag still works alone.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            if_borders: cli.all || cli.borders,
            if_freeze_panes: cli.all || cli.freeze_panes,
            if_color_columns: cli.all || cli.color_columns,
            if_spacing: cli.all || cli.spacing,
            if_grey_bottom: cli.grey_bottom,
            header_color: cli.header_color.clone(),
            border: cli.border_style,
            border_color: cli.border_color.clone(),
        }
    }

    /// No operation selected.
    pub fn is_empty(&self) -> bool {
        !(self.if_borders || self.if_freeze_panes || self.if_color_columns || self.if_spacing)
    }
}
