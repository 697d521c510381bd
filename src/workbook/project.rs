//! The per-project document.
//!
//! ```text
//! Sheet: Items
//! | Description | Quantity | Unit | Unit Price | Total   |
//! |-------------|----------|------|------------|---------|
//! | Cement      | 10       | bag  | $25.00     | $250.00 |
//! | Cement      | 5        | bag  | $25.00     | $125.00 |
//! | Labor       | 8        | hour | $40.00     | $320.00 |
//!
//! Totals by Category
//! | Category | Total   |
//! | Cement   | $375.00 |
//! | Labor    | $320.00 |
//!
//! [column chart of the totals]
//!
//! Sheet: Information (only once the project information has been saved)
//! | Field | Value |  followed by the participants table
//! ```

use super::{is_blank, number, open, sheet_grid, text, xlsx_err, Layout};
use crate::error::Res;
use crate::model::{
    format_date, parse_date, Items, Ledger, LineItem, Money, Participant, ProjectInfo,
};
use anyhow::{bail, Context};
use calamine::Data;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Chart, ChartType, Workbook, Worksheet};

/// Number of blank rows left between the totals table and the chart.
const CHART_GAP: u32 = 3;

/// Everything stored in a project document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDocument {
    items: Items,
    info: Option<ProjectInfo>,
}

impl ProjectDocument {
    pub fn new(items: Items, info: Option<ProjectInfo>) -> Self {
        Self { items, info }
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Items {
        &mut self.items
    }

    /// Replaces the whole item set.
    pub fn set_items(&mut self, items: Items) {
        self.items = items;
    }

    pub fn info(&self) -> Option<&ProjectInfo> {
        self.info.as_ref()
    }

    pub fn set_info(&mut self, info: ProjectInfo) {
        self.info = Some(info);
    }

    /// The category totals of the current items.
    pub fn ledger(&self) -> Res<Ledger> {
        Ledger::from_items(self.items.iter())
    }

    /// Renders the document to XLSX bytes.
    pub(crate) fn render(&self, layout: &Layout<'_>) -> Res<Vec<u8>> {
        let mut workbook = Workbook::new();
        write_items_sheet(workbook.add_worksheet(), layout, &self.items, &self.ledger()?)?;
        if let Some(info) = &self.info {
            write_info_sheet(workbook.add_worksheet(), layout, info)?;
        }
        workbook.save_to_buffer().map_err(xlsx_err)
    }

    /// Parses XLSX bytes previously produced by `render`. A missing information sheet means the
    /// information was never saved; a missing items sheet is an error.
    pub(crate) fn parse(bytes: &[u8], layout: &Layout<'_>) -> Res<Self> {
        let labels = layout.labels();
        let mut workbook = open(bytes)?;
        let items_grid = sheet_grid(&mut workbook, &labels.items_sheet)?
            .with_context(|| format!("The document has no '{}' sheet", labels.items_sheet))?;
        let items = parse_items(&items_grid)?;
        let info = match sheet_grid(&mut workbook, &labels.info_sheet)? {
            Some(grid) => Some(parse_info(&grid).context("Unable to read the project information")?),
            None => None,
        };
        Ok(Self { items, info })
    }
}

fn write_items_sheet(
    sheet: &mut Worksheet,
    layout: &Layout<'_>,
    items: &Items,
    ledger: &Ledger,
) -> Res<()> {
    let labels = layout.labels();
    let f = layout.formats();
    sheet.set_name(&labels.items_sheet).map_err(xlsx_err)?;
    for (col, width) in [28.0, 12.0, 12.0, 16.0, 16.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width).map_err(xlsx_err)?;
    }

    for (col, header) in labels.item_headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, header, &f.header)
            .map_err(xlsx_err)?;
    }

    let mut row: u32 = 1;
    for item in items.iter() {
        sheet
            .write_string_with_format(row, 0, item.description(), &f.cell)
            .map_err(xlsx_err)?
            .write_number_with_format(row, 1, item.quantity().to_f64().unwrap_or_default(), &f.cell)
            .map_err(xlsx_err)?
            .write_string_with_format(row, 2, item.unit(), &f.cell)
            .map_err(xlsx_err)?
            .write_number_with_format(row, 3, item.unit_price().to_f64(), &f.money)
            .map_err(xlsx_err)?
            .write_number_with_format(row, 4, item.total().to_f64(), &f.money)
            .map_err(xlsx_err)?;
        row += 1;
    }

    // One blank row, then the totals table.
    row += 1;
    sheet
        .write_string_with_format(row, 0, &labels.totals_title, &f.title)
        .map_err(xlsx_err)?;
    row += 1;
    for (col, header) in labels.totals_headers.iter().enumerate() {
        sheet
            .write_string_with_format(row, col as u16, header, &f.header)
            .map_err(xlsx_err)?;
    }
    let first_total_row = row + 1;
    for (category, total) in ledger.iter() {
        row += 1;
        sheet
            .write_string_with_format(row, 0, category, &f.cell)
            .map_err(xlsx_err)?
            .write_number_with_format(row, 1, total.to_f64(), &f.money)
            .map_err(xlsx_err)?;
    }

    if !ledger.is_empty() {
        let mut chart = Chart::new(ChartType::Column);
        chart
            .add_series()
            .set_categories((labels.items_sheet.as_str(), first_total_row, 0, row, 0))
            .set_values((labels.items_sheet.as_str(), first_total_row, 1, row, 1));
        chart.title().set_name(labels.chart_title.as_str());
        chart.x_axis().set_name(labels.chart_x_axis.as_str());
        chart.y_axis().set_name(labels.chart_y_axis.as_str());
        chart.legend().set_hidden();
        sheet
            .insert_chart(row + CHART_GAP, 0, &chart)
            .map_err(xlsx_err)?;
    }
    Ok(())
}

fn write_info_sheet(sheet: &mut Worksheet, layout: &Layout<'_>, info: &ProjectInfo) -> Res<()> {
    let labels = layout.labels();
    let f = layout.formats();
    sheet.set_name(&labels.info_sheet).map_err(xlsx_err)?;
    sheet.set_column_width(0, 24.0).map_err(xlsx_err)?;
    sheet.set_column_width(1, 30.0).map_err(xlsx_err)?;
    sheet.set_column_width(2, 18.0).map_err(xlsx_err)?;

    for (col, header) in labels.info_headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, header, &f.header)
            .map_err(xlsx_err)?;
    }
    let [manager, email, opened, completion, cost] = &labels.info_fields;
    let text_fields = [
        (manager, info.manager().to_string()),
        (email, info.manager_email().to_string()),
        (opened, format_date(info.opened())),
        (completion, format_date(info.estimated_completion())),
    ];
    let mut row: u32 = 1;
    for (label, value) in text_fields {
        sheet
            .write_string_with_format(row, 0, label, &f.cell)
            .map_err(xlsx_err)?
            .write_string_with_format(row, 1, &value, &f.cell)
            .map_err(xlsx_err)?;
        row += 1;
    }
    sheet
        .write_string_with_format(row, 0, cost, &f.cell)
        .map_err(xlsx_err)?
        .write_number_with_format(row, 1, info.estimated_cost().to_f64(), &f.money)
        .map_err(xlsx_err)?;

    // One blank row, then the participants.
    row += 2;
    for (col, header) in labels.participant_headers.iter().enumerate() {
        sheet
            .write_string_with_format(row, col as u16, header, &f.header)
            .map_err(xlsx_err)?;
    }
    for p in info.participants() {
        row += 1;
        sheet
            .write_string_with_format(row, 0, p.name(), &f.cell)
            .map_err(xlsx_err)?
            .write_string_with_format(row, 1, p.email(), &f.cell)
            .map_err(xlsx_err)?
            .write_string_with_format(row, 2, p.phone().unwrap_or_default(), &f.cell)
            .map_err(xlsx_err)?;
    }
    Ok(())
}

/// Items are the rows after the header, up to the first blank row.
fn parse_items(grid: &[Vec<Data>]) -> Res<Items> {
    let mut items = Items::default();
    for (ix, row) in grid.iter().enumerate().skip(1) {
        if is_blank(row) {
            break;
        }
        let item = parse_item(row).with_context(|| format!("Invalid item in row {}", ix + 1))?;
        items.push(item);
    }
    Ok(items)
}

fn parse_item(row: &[Data]) -> Res<LineItem> {
    let quantity = number(row, 1)?;
    let unit_price = Money::from(number(row, 3)?);
    LineItem::new(text(row, 0), quantity, text(row, 2), unit_price)
}

/// Field rows 2 to 6, a blank row, the participant header, then participants up to the first
/// blank row.
fn parse_info(grid: &[Vec<Data>]) -> Res<ProjectInfo> {
    const FIELDS: usize = 5;
    if grid.len() < FIELDS + 1 {
        bail!("Expected {FIELDS} field rows but found {}", grid.len().saturating_sub(1))
    }
    let value = |ix: usize| text(&grid[ix + 1], 1);
    let manager = value(0);
    let manager_email = value(1);
    let opened = parse_date(&value(2))?;
    let completion = parse_date(&value(3))?;
    let cost = Money::from(number(&grid[5], 1).context("Invalid estimated cost")?);

    let mut participants = Vec::new();
    // grid[6] is blank and grid[7] is the participant header.
    for row in grid.iter().skip(FIELDS + 3) {
        if is_blank(row) {
            break;
        }
        let phone = text(row, 2);
        participants.push(Participant::new(
            text(row, 0),
            text(row, 1),
            Some(phone.as_str()),
        )?);
    }
    ProjectInfo::new(
        manager,
        manager_email,
        opened,
        completion,
        cost,
        participants,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Labels;
    use std::io::{Cursor, Read};
    use std::str::FromStr;

    const FORMAT: &str = "\"$\"#,##0.00";

    fn item(d: &str, q: &str, u: &str, p: &str) -> LineItem {
        LineItem::parse(d, q, u, p).unwrap()
    }

    fn worked_example() -> Items {
        Items::new(vec![
            item("Cement", "10", "bag", "25.0"),
            item("Cement", "5", "bag", "25.0"),
            item("Labor", "8", "hour", "40.0"),
        ])
    }

    fn info() -> ProjectInfo {
        ProjectInfo::new(
            "Maria Lima",
            "maria@example.com",
            parse_date("2025-03-01").unwrap(),
            parse_date("2025-09-30").unwrap(),
            Money::from_str("12500.75").unwrap(),
            vec![
                "Ana,ana@example.com,5551234".parse().unwrap(),
                "Bo,bo@example.com".parse().unwrap(),
            ],
        )
        .unwrap()
    }

    /// Counts chart parts inside the XLSX zip container.
    fn chart_count(bytes: &[u8]) -> usize {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive
            .file_names()
            .filter(|n| n.starts_with("xl/charts/chart") && n.ends_with(".xml"))
            .count()
    }

    fn shared_strings(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut s = String::new();
        if let Ok(mut f) = archive.by_name("xl/sharedStrings.xml") {
            f.read_to_string(&mut s).unwrap();
        }
        s
    }

    #[test]
    fn test_render_and_parse() {
        let labels = Labels::default();
        let layout = Layout::with(&labels, FORMAT);
        let doc = ProjectDocument::new(worked_example(), Some(info()));
        let bytes = doc.render(&layout).unwrap();
        let parsed = ProjectDocument::parse(&bytes, &layout).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(
            parsed.ledger().unwrap().grand_total().unwrap(),
            Money::from_str("695").unwrap()
        );
        assert_eq!(chart_count(&bytes), 1);
    }

    #[test]
    fn test_resave_replaces_items_and_keeps_one_chart() {
        let labels = Labels::default();
        let layout = Layout::with(&labels, FORMAT);
        let first = ProjectDocument::new(worked_example(), None);
        let bytes = first.render(&layout).unwrap();

        let mut doc = ProjectDocument::parse(&bytes, &layout).unwrap();
        doc.set_items(Items::new(vec![item("Paint", "3", "l", "12.5")]));
        let bytes = doc.render(&layout).unwrap();

        let parsed = ProjectDocument::parse(&bytes, &layout).unwrap();
        assert_eq!(parsed.items().len(), 1);
        assert_eq!(parsed.items().data()[0].description(), "Paint");
        assert_eq!(chart_count(&bytes), 1);
        assert!(!shared_strings(&bytes).contains("Cement"));
    }

    #[test]
    fn test_many_digit_values_read_back_exactly() {
        let labels = Labels::default();
        let layout = Layout::with(&labels, FORMAT);
        let doc = ProjectDocument::new(
            Items::new(vec![
                item("Bolts", "3", "each", "0.123456789012345"),
                item("Cable", "0.333333333333333", "m", "123456789012.345"),
                item("Land", "1", "lot", "999999999999999"),
            ]),
            None,
        );
        let bytes = doc.render(&layout).unwrap();
        let parsed = ProjectDocument::parse(&bytes, &layout).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(
            parsed.ledger().unwrap().grand_total().unwrap(),
            doc.ledger().unwrap().grand_total().unwrap()
        );
    }

    #[test]
    fn test_no_items_means_no_chart() {
        let labels = Labels::default();
        let layout = Layout::with(&labels, FORMAT);
        let doc = ProjectDocument::new(Items::default(), Some(info()));
        let bytes = doc.render(&layout).unwrap();
        assert_eq!(chart_count(&bytes), 0);
        let parsed = ProjectDocument::parse(&bytes, &layout).unwrap();
        assert!(parsed.items().is_empty());
        assert_eq!(parsed.info(), Some(&info()));
    }

    #[test]
    fn test_custom_labels() {
        let mut labels = Labels::default();
        labels.items_sheet = "Itens do Projeto".into();
        labels.info_sheet = "Informações".into();
        let layout = Layout::with(&labels, "\"R$\"#,##0.00");
        let doc = ProjectDocument::new(worked_example(), Some(info()));
        let bytes = doc.render(&layout).unwrap();
        assert_eq!(ProjectDocument::parse(&bytes, &layout).unwrap(), doc);

        // Reading with the default labels cannot find the items sheet.
        let default_labels = Labels::default();
        let other = Layout::with(&default_labels, FORMAT);
        assert!(ProjectDocument::parse(&bytes, &other).is_err());
    }

    #[test]
    fn test_parse_garbage() {
        let labels = Labels::default();
        let layout = Layout::with(&labels, FORMAT);
        assert!(ProjectDocument::parse(b"not a workbook", &layout).is_err());
    }
}
