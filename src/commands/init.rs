use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the tally home directory, its backups directory and an initial `config.json` with
/// default settings.
///
/// # Arguments
/// - `tally_home` - The directory that will hold the project documents, e.g. `$HOME/tally`
///
/// # Errors
/// - Returns an error if `config.json` already exists or any file operation fails.
pub async fn init(tally_home: &Path) -> Result<Out<()>> {
    let config = Config::create(tally_home).await?;
    Ok(format!(
        "Successfully created the tally directory and config at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_init_again() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("tally");
        let out = init(&home).await.unwrap();
        assert!(out.message().contains("Successfully created"));
        assert!(home.join("config.json").is_file());
        assert!(home.join(".backups").is_dir());

        let e = init(&home).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Config);
    }
}
