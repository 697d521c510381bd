//! Line item command handlers. Each one saves the project document and then reconciles the
//! summary with the project's new total.

use crate::args::{ItemAddArgs, ItemImportArgs, ItemRemoveArgs};
use crate::commands::{existing_project, plural, project_name, save_and_reconcile, Out, Saved};
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Items, LineItem};
use crate::workbook::Store;
use crate::{utils, Config, Result};
use anyhow::{bail, Context};
use std::io::Cursor;
use tracing::debug;

const CSV_HEADERS: [&str; 4] = ["Description", "Quantity", "Unit", "Unit Price"];

/// Appends one line item to a project, creating the project if it does not exist yet.
///
/// # Errors
///
/// - Returns a `Validation` error for an empty description, a quantity that is not greater than
///   zero, a negative unit price, or numbers too large or too precise for the document.
/// - Returns a `FileInUse` error if the project document or the summary is open in another
///   program. If only the summary could not be written, the project document has been saved and
///   the error says so.
pub async fn items_add(config: Config, args: &ItemAddArgs) -> Result<Out<Saved>> {
    let name = project_name(args.project())?;
    let item = LineItem::parse(
        args.description(),
        args.quantity(),
        args.unit(),
        args.unit_price(),
    )
    .pub_result(ErrorType::Validation)?;
    let symbol = config.currency_symbol().to_string();
    let store = Store::new(config);

    let mut doc = store
        .load_or_new_project(&name)
        .await
        .pub_result(ErrorType::Io)?;
    debug!("Adding '{}' to '{name}'", item.description());
    doc.items_mut().push(item);
    let saved = save_and_reconcile(&store, &name, &doc).await?;
    Ok(Out::new(saved.message(&symbol), saved))
}

/// Replaces all line items of a project with the rows of a CSV file whose header is
/// `Description,Quantity,Unit,Unit Price`. Either every row is valid and the whole set is saved,
/// or nothing is saved.
pub async fn items_import(config: Config, args: &ItemImportArgs) -> Result<Out<Saved>> {
    let name = project_name(args.project())?;
    let text = utils::read(args.file()).await.pub_result(ErrorType::Io)?;
    let items = parse_csv(&text)
        .with_context(|| format!("Unable to import '{}'", args.file().display()))
        .pub_result(ErrorType::Validation)?;
    let symbol = config.currency_symbol().to_string();
    let store = Store::new(config);

    let mut doc = store
        .load_or_new_project(&name)
        .await
        .pub_result(ErrorType::Io)?;
    let count = items.len();
    doc.set_items(items);
    let saved = save_and_reconcile(&store, &name, &doc).await?;
    let message = format!(
        "Imported {count} item{} into '{name}'. {}",
        plural(count),
        saved.message(&symbol)
    );
    Ok(Out::new(message, saved))
}

fn parse_csv(text: &str) -> Res<Items> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(text.as_bytes()));

    let headers = reader.headers().context("Unable to read the CSV header")?;
    let found: Vec<&str> = headers.iter().collect();
    if found.len() != CSV_HEADERS.len()
        || !found
            .iter()
            .zip(CSV_HEADERS)
            .all(|(f, e)| f.eq_ignore_ascii_case(e))
    {
        bail!(
            "Expected the CSV header '{}' but found '{}'",
            CSV_HEADERS.join(","),
            found.join(",")
        )
    }

    let mut items = Items::default();
    for (ix, record) in reader.records().enumerate() {
        // The header is line 1.
        let line = ix + 2;
        let record = record.with_context(|| format!("Unable to read CSV line {line}"))?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let item = LineItem::parse(field(0), field(1), field(2), field(3))
            .with_context(|| format!("Invalid item on CSV line {line}"))?;
        items.push(item);
    }
    Ok(items)
}

/// Removes the line item at a 1-based position.
pub async fn items_remove(config: Config, args: &ItemRemoveArgs) -> Result<Out<Saved>> {
    let name = project_name(args.project())?;
    let symbol = config.currency_symbol().to_string();
    let store = Store::new(config);
    let mut doc = existing_project(&store, &name).await?;
    let removed = doc
        .items_mut()
        .remove(args.position())
        .pub_result(ErrorType::Validation)?;
    let saved = save_and_reconcile(&store, &name, &doc).await?;
    let message = format!(
        "Removed '{}' from '{name}'. {}",
        removed.description(),
        saved.message(&symbol)
    );
    Ok(Out::new(message, saved))
}
