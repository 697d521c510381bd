//! The summary document: one sheet with a `Project | Total Cost` table.

use super::{is_blank, number, open, sheet_grid, text, xlsx_err, Layout};
use crate::error::Res;
use crate::model::{Money, Summary, SummaryRow};
use anyhow::{bail, Context};
use rust_xlsxwriter::Workbook;

pub(crate) fn render(summary: &Summary, layout: &Layout<'_>) -> Res<Vec<u8>> {
    let labels = layout.labels();
    let f = layout.formats();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&labels.summary_sheet).map_err(xlsx_err)?;
    sheet.set_column_width(0, 30.0).map_err(xlsx_err)?;
    sheet.set_column_width(1, 18.0).map_err(xlsx_err)?;

    for (col, header) in labels.summary_headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, header, &f.header)
            .map_err(xlsx_err)?;
    }
    let mut row: u32 = 0;
    for summary_row in summary.rows() {
        row += 1;
        sheet
            .write_string_with_format(row, 0, summary_row.project(), &f.cell)
            .map_err(xlsx_err)?
            .write_number_with_format(row, 1, summary_row.total().to_f64(), &f.money)
            .map_err(xlsx_err)?;
    }
    workbook.save_to_buffer().map_err(xlsx_err)
}

pub(crate) fn parse(bytes: &[u8], layout: &Layout<'_>) -> Res<Summary> {
    let labels = layout.labels();
    let mut workbook = open(bytes)?;
    let Some(grid) = sheet_grid(&mut workbook, &labels.summary_sheet)? else {
        bail!("The summary document has no '{}' sheet", labels.summary_sheet)
    };
    let mut rows = Vec::new();
    for (ix, row) in grid.iter().enumerate().skip(1) {
        if is_blank(row) {
            break;
        }
        let project = text(row, 0);
        if project.is_empty() {
            bail!("Row {} of the summary has no project name", ix + 1)
        }
        let total = number(row, 1)
            .with_context(|| format!("Invalid total for '{project}' in row {}", ix + 1))?;
        rows.push(SummaryRow::new(project, Money::from(total)));
    }
    Ok(Summary::from_rows(rows))
}
