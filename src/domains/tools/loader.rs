//! Tool Loader - discovers tools from manifest files.
//!
//! A manifest is a JSON file with a top-level `tools` array. Every file must
//! define exactly one tool; files with zero or several candidates are skipped
//! with a warning. An entry either binds a compiled catalog `entrypoint` or
//! declares a subprocess `command`.
//!
//! Discovery never fails as a whole: every problem is logged with the path
//! and the loader moves on to the next file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::callable::Callable;
use super::catalog::Catalog;
use super::command::CommandTool;
use super::descriptor::{ParamSpec, ToolDescriptor};
use super::error::LoaderError;
use super::registry::{RegisteredTool, ToolOrigin};

const MANIFEST_EXTENSION: &str = "json";

/// On-disk manifest shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    pub tools: Vec<ManifestEntry>,
}

/// One candidate tool in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Name of a compiled catalog tool.
    #[serde(default)]
    pub entrypoint: Option<String>,

    /// Program to run for a subprocess plugin.
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub parameters: Vec<ParamSpec>,

    #[serde(default)]
    pub accepts_extra: bool,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ManifestEntry {
    /// Best available label for log messages.
    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.entrypoint.as_deref())
            .or(self.command.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// A tool produced by the loader, ready to register.
pub type LoadedTool = RegisteredTool;

/// Discovers manifests on disk and turns them into tools.
#[derive(Debug, Clone, Default)]
pub struct ToolLoader {
    catalog: Catalog,
}

impl ToolLoader {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load every path in order. Later tools with a duplicate name are kept;
    /// the registry decides who wins.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<LoadedTool> {
        paths.iter().flat_map(|path| self.load_path(path)).collect()
    }

    /// Load one file or directory.
    pub fn load_path(&self, path: &Path) -> Vec<LoadedTool> {
        if path.is_file() {
            if !is_manifest(path) {
                warn!(
                    "Provided tool path {} is a file but not a .json manifest. Skipping.",
                    path.display()
                );
                return Vec::new();
            }
            return self.load_logged(path).into_iter().collect();
        }

        if path.is_dir() {
            info!("Searching for tools in directory: {}", path.display());
            return manifest_files(path)
                .iter()
                .filter_map(|file| self.load_logged(file))
                .collect();
        }

        warn!(
            "Tools path {} is not a valid file or directory. Skipping.",
            path.display()
        );
        Vec::new()
    }

    fn load_logged(&self, path: &Path) -> Option<LoadedTool> {
        match self.load_file(path) {
            Ok(tool) => tool,
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// Load a single manifest. `Ok(None)` means the file was skipped with a warning.
    pub fn load_file(&self, path: &Path) -> Result<Option<LoadedTool>, LoaderError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: ToolManifest =
            serde_json::from_str(&text).map_err(|source| LoaderError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        match manifest.tools.as_slice() {
            [] => {
                warn!("No tool defined in {}. Skipping.", path.display());
                Ok(None)
            }
            [entry] => {
                let tool = self.build(path, entry)?;
                debug!("Loaded tool '{}' from {}", tool.name(), path.display());
                Ok(Some(tool))
            }
            entries => {
                let names: Vec<&str> = entries.iter().map(ManifestEntry::label).collect();
                warn!(
                    "Multiple tools ({}) defined in {}. Only one tool per manifest is allowed. Skipping.",
                    names.join(", "),
                    path.display()
                );
                Ok(None)
            }
        }
    }

    fn build(&self, path: &Path, entry: &ManifestEntry) -> Result<LoadedTool, LoaderError> {
        let (descriptor, callable, origin) = match (&entry.entrypoint, &entry.command) {
            (Some(entrypoint), None) => {
                if !entry.parameters.is_empty() || !entry.args.is_empty() {
                    return Err(LoaderError::invalid(
                        path,
                        "'parameters' and 'args' only apply to command tools",
                    ));
                }
                let (descriptor, callable) =
                    self.catalog.resolve(entrypoint).ok_or_else(|| {
                        LoaderError::UnknownEntrypoint {
                            path: path.to_path_buf(),
                            entrypoint: entrypoint.clone(),
                        }
                    })?;
                let origin = ToolOrigin::Catalog {
                    entrypoint: entrypoint.clone(),
                    manifest: path.to_path_buf(),
                };
                (descriptor, callable, origin)
            }
            (None, Some(command)) => {
                let Some(name) = &entry.name else {
                    return Err(LoaderError::invalid(path, "command tools need a 'name'"));
                };
                let manifest_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                let descriptor = ToolDescriptor::new(
                    name.clone(),
                    entry.description.clone().unwrap_or_default(),
                    entry.parameters.clone(),
                );
                let descriptor = if entry.accepts_extra {
                    descriptor.accepting_extra()
                } else {
                    descriptor
                };
                let callable = Callable::suspending(CommandTool::new(
                    command,
                    entry.args.clone(),
                    &manifest_dir,
                ));
                let origin = ToolOrigin::Command {
                    manifest: path.to_path_buf(),
                };
                (descriptor.suspending(), callable, origin)
            }
            (Some(_), Some(_)) => {
                return Err(LoaderError::invalid(
                    path,
                    "an entry has both 'entrypoint' and 'command'",
                ));
            }
            (None, None) => {
                return Err(LoaderError::invalid(
                    path,
                    "an entry needs an 'entrypoint' or a 'command'",
                ));
            }
        };

        let mut descriptor = descriptor;
        if let Some(name) = &entry.name {
            descriptor = descriptor.with_name(name.clone());
        }
        if let Some(description) = &entry.description {
            descriptor = descriptor.with_description(description.clone());
        }
        if let Some(secs) = entry.timeout_secs {
            descriptor = descriptor.with_timeout(Duration::from_secs(secs));
        }

        Ok(RegisteredTool {
            descriptor,
            callable,
            origin,
        })
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION)
}

/// Manifest files in a directory, sorted by file name, support files excluded.
fn manifest_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Cannot read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_manifest(path))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect();
    files.sort();
    files
}
