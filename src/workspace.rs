//! Workspace management for tabdelta operations

use crate::config::AppConfig;
use crate::error::{Result, TabdeltaError};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the workspace directory
pub const WORKSPACE_DIR: &str = ".tabdelta";

/// Manages the .tabdelta workspace directory
#[derive(Debug, Clone)]
pub struct TabdeltaWorkspace {
    /// Project root directory (where .tabdelta/ lives)
    pub root: PathBuf,
    /// .tabdelta/ directory path
    pub tabdelta_dir: PathBuf,
    /// .tabdelta/snapshots/ directory path
    pub snapshots_dir: PathBuf,
}

impl TabdeltaWorkspace {
    /// Find existing workspace or create a new one
    pub fn find_or_create(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        if let Some(workspace) = Self::find_existing(start)? {
            return Ok(workspace);
        }

        Self::create_new(start.to_path_buf())
    }

    /// Find existing .tabdelta workspace by walking up directory tree
    pub fn find_existing(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir;

        loop {
            let tabdelta_dir = current.join(WORKSPACE_DIR);
            if tabdelta_dir.is_dir() {
                return Ok(Some(Self::from_root(current.to_path_buf())));
            }

            // A git root is as far up as we look
            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Create a new workspace in the specified root directory
    pub fn create_new(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);
        workspace.initialize(false)?;
        log::info!("Created tabdelta workspace at: {}", workspace.root.display());
        Ok(workspace)
    }

    /// Create directories, config and .gitignore entries.
    ///
    /// An existing config.json is only replaced when `force` is set.
    pub fn initialize(&self, force: bool) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(TabdeltaError::workspace(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        if self.tabdelta_dir.exists() && !self.tabdelta_dir.is_dir() {
            return Err(TabdeltaError::workspace(format!(
                "{} exists but is not a directory",
                self.tabdelta_dir.display()
            )));
        }

        fs::create_dir_all(&self.tabdelta_dir)?;
        fs::create_dir_all(&self.snapshots_dir)?;
        self.create_config_with_force(force)?;
        self.ensure_gitignore()?;
        Ok(())
    }

    /// Create workspace from root directory path
    pub fn from_root(root: PathBuf) -> Self {
        let tabdelta_dir = root.join(WORKSPACE_DIR);
        let snapshots_dir = tabdelta_dir.join("snapshots");

        Self {
            root,
            tabdelta_dir,
            snapshots_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.tabdelta_dir.join("config.json")
    }

    /// Resolve a user-supplied path relative to the workspace root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Write the default configuration file
    pub fn create_config_with_force(&self, force: bool) -> Result<()> {
        let config_path = self.config_path();

        if config_path.exists() && !force {
            return Ok(());
        }

        AppConfig::default().save(&config_path)
    }

    /// Ensure .gitignore keeps snapshot bodies out of version control
    pub fn ensure_gitignore(&self) -> Result<()> {
        let gitignore_path = self.root.join(".gitignore");
        let entry = ".tabdelta/snapshots/*.csv.zst";
        let block = format!("# Ignore compressed tabdelta snapshots\n{}\n", entry);

        if gitignore_path.exists() {
            let content = fs::read_to_string(&gitignore_path)?;
            if !content.contains(entry) {
                let new_content = if content.ends_with('\n') {
                    format!("{}\n{}", content, block)
                } else {
                    format!("{}\n\n{}", content, block)
                };
                fs::write(gitignore_path, new_content)?;
                log::info!("Updated .gitignore with tabdelta entries");
            }
        } else {
            fs::write(gitignore_path, block)?;
            log::info!("Created .gitignore with tabdelta entries");
        }

        Ok(())
    }
}
