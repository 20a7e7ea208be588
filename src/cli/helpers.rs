//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::library::{Library, LibraryError, LibraryStore};
use crate::core::view::{ViewConfig, ViewStore};
use crate::core::{Config, LoadSource, Project};

/// An opened workspace with its settings and document stores
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub library: LibraryStore,
    pub view: ViewStore,
    quiet: bool,
}

impl Workspace {
    /// Locate the workspace from `--project` or the current directory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project =
            Project::locate(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(&project));
        tracing::debug!(root = %project.root().display(), "workspace opened");

        Ok(Self {
            library: config.library_store(&project),
            view: config.view_store(&project),
            project,
            config,
            quiet: global.quiet,
        })
    }

    /// Read `data.json`, warning when a backup had to stand in for it
    pub fn load_library(&self) -> Result<Library> {
        let (library, source) = self.library.load()?;
        self.report_source("data.json", source);
        Ok(library)
    }

    /// Load, mutate and commit `data.json`
    pub fn modify<R>(
        &self,
        f: impl FnOnce(&mut Library) -> std::result::Result<R, LibraryError>,
    ) -> Result<R> {
        Ok(self.library.modify(f)?)
    }

    /// Read `config.json`
    pub fn load_view(&self) -> Result<ViewConfig> {
        let (view, source) = self.view.load()?;
        self.report_source("config.json", source);
        Ok(view)
    }

    /// Output format after applying the configured default
    pub fn format(&self, global: &GlobalOpts, fallback: OutputFormat) -> OutputFormat {
        global
            .format
            .resolve(self.config.default_format.as_deref(), fallback)
    }

    /// Ask before deleting unless disabled in settings or `--yes` was given
    pub fn confirm_delete(&self, what: &str, yes: bool) -> Result<bool> {
        if yes || !self.config.confirm_deletes() {
            return Ok(true);
        }
        confirm(&format!("Delete {}?", what))
    }

    fn report_source(&self, file: &str, source: LoadSource) {
        if self.quiet {
            return;
        }
        if let LoadSource::Backup(version) = source {
            eprintln!(
                "{} {} could not be read; using backup version {}",
                style("!").yellow(),
                style(file).cyan(),
                style(version).yellow()
            );
        }
    }
}

/// Interactive yes/no prompt; refuses when nobody is at the terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    if !console::user_attended() {
        return Err(miette::miette!(
            help = "Pass --yes to confirm, or set `confirm_deletes: false`",
            "{} (not running interactively)",
            prompt
        ));
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success line unless `--quiet`
pub fn success(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("żółw żółty", 7), "żółw...");
    }
}
