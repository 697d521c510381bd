use super::project::ProjectDocument;
use super::summary::{parse as parse_summary, render as render_summary};
use super::Layout;
use crate::error::Res;
use crate::model::{Money, ProjectName, Summary};
use crate::{utils, Config};
use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing::{debug, info};

/// Loads and saves the documents kept in the tally home directory.
///
/// Every save backs up the existing document and then replaces it atomically, so a document on
/// disk is always either the previous version or the new one.
#[derive(Debug, Clone)]
pub struct Store {
    config: Config,
}

impl Store {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn layout(&self) -> Layout<'_> {
        Layout::new(&self.config)
    }

    pub fn project_exists(&self, name: &ProjectName) -> bool {
        self.config.project_path(name).is_file()
    }

    /// Reads a project document. It is an error if the project does not exist.
    pub async fn load_project(&self, name: &ProjectName) -> Res<ProjectDocument> {
        let path = self.config.project_path(name);
        if !path.is_file() {
            bail!("There is no project named '{name}'")
        }
        let bytes = utils::read_bytes(&path).await?;
        ProjectDocument::parse(&bytes, &self.layout())
            .with_context(|| format!("The document of project '{name}' could not be read"))
    }

    /// Reads a project document, or starts an empty one if the project does not exist yet.
    pub async fn load_or_new_project(&self, name: &ProjectName) -> Res<ProjectDocument> {
        if self.project_exists(name) {
            self.load_project(name).await
        } else {
            debug!("Project '{name}' does not exist yet, starting a new document");
            Ok(ProjectDocument::default())
        }
    }

    /// Writes the whole project document, replacing any previous version.
    pub async fn save_project(&self, name: &ProjectName, doc: &ProjectDocument) -> Res<PathBuf> {
        let path = self.config.project_path(name);
        let bytes = doc.render(&self.layout())?;
        self.config.backup().copy_document(&path).await?;
        utils::replace(&path, &bytes).await?;
        info!("Saved project '{name}' to {}", path.display());
        Ok(path)
    }

    /// The names of all projects that have a document in the home directory, sorted.
    pub async fn list_projects(&self) -> Res<Vec<ProjectName>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(self.config.root()).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(name) = self.config.project_name_from_file(&file_name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a project document and removes its row from the summary.
    pub async fn delete_project(&self, name: &ProjectName) -> Res<()> {
        let path = self.config.project_path(name);
        if !path.is_file() {
            bail!("There is no project named '{name}'")
        }
        self.config.backup().copy_document(&path).await?;
        utils::remove(&path).await?;
        info!("Deleted {}", path.display());

        let mut summary = self.load_summary().await?;
        if summary.remove(name.as_str()) {
            self.save_summary(&summary).await?;
        }
        Ok(())
    }

    /// Reads the summary document. A missing document is an empty summary.
    pub async fn load_summary(&self) -> Res<Summary> {
        let path = self.config.summary_path();
        if !path.is_file() {
            return Ok(Summary::default());
        }
        let bytes = utils::read_bytes(&path).await?;
        parse_summary(&bytes, &self.layout()).context("The summary document could not be read")
    }

    pub async fn save_summary(&self, summary: &Summary) -> Res<PathBuf> {
        let path = self.config.summary_path();
        let bytes = render_summary(summary, &self.layout())?;
        self.config.backup().copy_document(&path).await?;
        utils::replace(&path, &bytes).await?;
        debug!("Saved the summary to {}", path.display());
        Ok(path)
    }

    /// Replaces the summary row of `name` with `total` and saves the summary.
    pub async fn record_total(&self, name: &ProjectName, total: Money) -> Res<Summary> {
        let mut summary = self.load_summary().await?;
        summary.reconcile(name.as_str(), total);
        self.save_summary(&summary).await?;
        info!("Recorded a total of {total} for '{name}' in the summary");
        Ok(summary)
    }
}
