//! Reading and writing the XLSX documents.
//!
//! Documents are always regenerated as a whole with `rust_xlsxwriter`: an existing document is
//! first read back into the model with `calamine`, changed in memory, and rendered again. This is
//! what makes saves idempotent (old item rows cannot leak into a new save) and guarantees a single
//! chart per project document.

mod project;
mod store;
mod summary;

pub use project::ProjectDocument;
pub use store::Store;

use crate::config::Labels;
use crate::error::Res;
use crate::model::SIGNIFICANT_DIGITS;
use crate::Config;
use anyhow::{anyhow, bail};
use calamine::{Data, Range, Reader, Xlsx};
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, XlsxError};
use std::fmt::Display;
use std::io::Cursor;
use std::str::FromStr;

const HEADER_FILL: u32 = 0xBDD7EE;

/// What the documents look like: the label texts and the money number format.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout<'a> {
    labels: &'a Labels,
    currency_format: &'a str,
}

impl<'a> Layout<'a> {
    pub(crate) fn new(config: &'a Config) -> Self {
        Self {
            labels: config.labels(),
            currency_format: config.currency_format(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with(labels: &'a Labels, currency_format: &'a str) -> Self {
        Self {
            labels,
            currency_format,
        }
    }

    pub(crate) fn labels(&self) -> &Labels {
        self.labels
    }

    fn formats(&self) -> Formats {
        let cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        Formats {
            header: cell.clone().set_bold().set_background_color(HEADER_FILL),
            money: cell.clone().set_num_format(self.currency_format),
            title: Format::new().set_bold(),
            cell,
        }
    }
}

/// Reusable cell formats.
struct Formats {
    header: Format,
    cell: Format,
    money: Format,
    title: Format,
}

fn xlsx_err(e: XlsxError) -> anyhow::Error {
    anyhow!("Unable to build the workbook: {e}")
}

fn read_err(e: impl Display) -> anyhow::Error {
    anyhow!("Unable to read the workbook: {e}")
}

/// Opens XLSX bytes for reading.
fn open(bytes: &[u8]) -> Res<Xlsx<Cursor<&[u8]>>> {
    Xlsx::new(Cursor::new(bytes)).map_err(read_err)
}

/// Reads a sheet into a dense grid of rows, where `grid[r][c]` is the cell at row `r`, column `c`
/// counted from A1. Returns `None` if the workbook has no sheet by that name.
fn sheet_grid(workbook: &mut Xlsx<Cursor<&[u8]>>, name: &str) -> Res<Option<Vec<Vec<Data>>>> {
    if !workbook.sheet_names().iter().any(|n| n == name) {
        return Ok(None);
    }
    let range = workbook.worksheet_range(name).map_err(read_err)?;
    Ok(Some(grid(&range)))
}

fn grid(range: &Range<Data>) -> Vec<Vec<Data>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let mut rows = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![Data::Empty; first_col as usize];
        cells.extend(row.iter().cloned());
        rows.push(cells);
    }
    rows
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| match c {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

/// The text of a cell. Numbers are rendered without a trailing `.0`.
fn text(row: &[Data], col: usize) -> String {
    match row.get(col) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Some(other) => other.to_string(),
    }
}

/// The numeric value of a cell. Text cells holding a number are accepted too.
fn number(row: &[Data], col: usize) -> Res<Decimal> {
    match row.get(col) {
        Some(Data::Float(f)) => {
            decimal_from_f64(*f).ok_or_else(|| anyhow!("The number {f} cannot be represented"))
        }
        Some(Data::Int(i)) => Ok(Decimal::from(*i)),
        Some(Data::String(s)) => Decimal::from_str(s.trim().replace(',', "").as_str())
            .map_err(|_| anyhow!("Expected a number but found '{s}'")),
        Some(other) => bail!("Expected a number but found '{other}'"),
        None => bail!("Expected a number but the cell is empty"),
    }
}

/// Spreadsheet numbers are floats. Rounding to the significant digits a cell holds gives back
/// exactly the decimal that was written, as long as it had no more digits than that, and drops
/// binary noise such as `0.30000000000000004`.
fn decimal_from_f64(f: f64) -> Option<Decimal> {
    let scientific = format!("{f:.prec$e}", prec = (SIGNIFICANT_DIGITS - 1) as usize);
    let (mantissa, exponent) = scientific.split_once('e')?;
    // Trailing zeros of the mantissa would use up scale that tiny values need.
    let mantissa = Decimal::from_str(mantissa).ok()?.normalize();
    Decimal::from_scientific(&format!("{mantissa}e{exponent}"))
        .ok()
        .map(|d| d.normalize())
}
