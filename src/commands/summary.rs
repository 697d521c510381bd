use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::Summary;
use crate::workbook::Store;
use crate::{Config, Result};

/// Shows the latest total cost of every project, as held in the summary document.
pub async fn summary(config: Config) -> Result<Out<Summary>> {
    let symbol = config.currency_symbol().to_string();
    let summary = Store::new(config)
        .load_summary()
        .await
        .pub_result(ErrorType::Io)?;
    let count = summary.rows().len();
    let mut message = format!("{count} project{} in the summary", plural(count));
    for row in summary.rows() {
        message.push_str(&format!("\n  {}: {}", row.project(), row.total().render(&symbol)));
    }
    if !summary.is_empty() {
        let total = summary.total().pub_result(ErrorType::Validation)?;
        message.push_str(&format!("\n  Total: {}", total.render(&symbol)));
    }
    Ok(Out::new(message, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ItemAddArgs;
    use crate::commands::items_add;
    use crate::model::Money;
    use crate::test::TestEnv;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_summary_has_one_row_per_project() {
        let env = TestEnv::new().await;
        let out = summary(env.config()).await.unwrap();
        assert!(out.structure().unwrap().is_empty());

        for (project, price) in [("X", "100"), ("Y", "7"), ("X", "150")] {
            items_add(
                env.config(),
                &ItemAddArgs::new(project, "Work", "1", "", price),
            )
            .await
            .unwrap();
        }
        let out = summary(env.config()).await.unwrap();
        let rows = out.structure().unwrap().rows().to_vec();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].project(), "X");
        assert_eq!(rows[1].total(), Money::from_str("250").unwrap());
        assert!(out.message().contains("X: $250.00"));
        assert!(out.message().contains("Total: $257.00"));
    }
}
