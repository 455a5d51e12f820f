//! Asset resolution: turning authored asset paths into bytes.
//!
//! Resolution state (working directory plus search paths) is captured in a
//! [ResolutionContext] value. Prims carry the context of the layer that
//! introduced them, so nested arcs resolve relative to where their content
//! was found rather than against whatever the resolver saw last.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable resolver snapshot: working directory and search paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResolutionContext {
    pub working_path: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
}

impl ResolutionContext {
    pub fn new(working_path: impl Into<PathBuf>) -> Self {
        Self {
            working_path: Some(working_path.into()),
            search_paths: Vec::new(),
        }
    }

    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.working_path.is_none() && self.search_paths.is_empty()
    }

    /// Context for content loaded from `resolved_path`: the asset's directory
    /// becomes the working path and is appended to the search paths.
    pub fn for_asset(&self, resolved_path: &Path) -> Self {
        let base_dir = resolved_path.parent().map(Path::to_path_buf);
        let mut search_paths = self.search_paths.clone();
        if let Some(dir) = &base_dir {
            if !search_paths.contains(dir) {
                search_paths.push(dir.clone());
            }
        }
        Self {
            working_path: base_dir.or_else(|| self.working_path.clone()),
            search_paths,
        }
    }

    /// Keeps this context's working path and falls back to `other`: its
    /// working path and search paths are appended after this one's.
    pub fn combined_with(&self, other: &ResolutionContext) -> Self {
        let mut search_paths = self.search_paths.clone();
        for dir in other.working_path.iter().chain(&other.search_paths) {
            if !search_paths.contains(dir) && self.working_path.as_ref() != Some(dir) {
                search_paths.push(dir.clone());
            }
        }
        Self {
            working_path: self.working_path.clone().or_else(|| other.working_path.clone()),
            search_paths,
        }
    }

    /// Returns `self`, or `fallback` when nothing was recorded.
    pub fn or<'a>(&'a self, fallback: &'a ResolutionContext) -> &'a ResolutionContext {
        if self.is_empty() {
            fallback
        } else {
            self
        }
    }
}

impl fmt::Display for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let working = self
            .working_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let search = self
            .search_paths
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "cwp: '{working}', search paths: [{search}]")
    }
}

/// Per-extension resolution override.
///
/// A registered handler takes precedence over filesystem access for asset
/// paths with its extension.
pub trait AssetHandler: Send + Sync {
    /// Resolves `asset_path`, returning `None` if it does not exist.
    fn resolve(&self, asset_path: &str, context: &ResolutionContext) -> Option<PathBuf>;

    fn read(&self, resolved_path: &Path) -> Result<Vec<u8>>;

    fn size(&self, resolved_path: &Path) -> Result<u64> {
        Ok(self.read(resolved_path)?.len() as u64)
    }

    fn write(&self, resolved_path: &Path, _data: &[u8]) -> Result<()> {
        bail!("Writing is not supported for {}", resolved_path.display())
    }
}

/// Bytes of an opened asset.
#[derive(Debug, Clone)]
pub struct Asset {
    pub asset_path: String,
    pub resolved_path: PathBuf,
    pub data: Vec<u8>,
}

/// Resolves asset paths against a working directory, search paths and
/// registered per-extension handlers.
#[derive(Default, Clone)]
pub struct AssetResolver {
    context: ResolutionContext,
    handlers: HashMap<String, Arc<dyn AssetHandler>>,
}

impl fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetResolver")
            .field("context", &self.context)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver seeded with `context`.
    pub fn with_context(context: ResolutionContext) -> Self {
        Self {
            context,
            handlers: HashMap::new(),
        }
    }

    pub fn set_current_working_path(&mut self, path: impl Into<PathBuf>) {
        self.context.working_path = Some(path.into());
    }

    pub fn current_working_path(&self) -> Option<&Path> {
        self.context.working_path.as_deref()
    }

    pub fn set_search_paths(&mut self, paths: Vec<PathBuf>) {
        self.context.search_paths = paths;
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.context.search_paths.contains(&path) {
            self.context.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.context.search_paths
    }

    /// Current resolution state.
    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Registers `handler` for asset paths ending in `.{extension}`.
    pub fn register_handler(&mut self, extension: &str, handler: impl AssetHandler + 'static) {
        self.handlers
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), Arc::new(handler));
    }

    pub fn unregister_handler(&mut self, extension: &str) -> bool {
        self.handlers
            .remove(&extension.trim_start_matches('.').to_ascii_lowercase())
            .is_some()
    }

    pub fn has_handler(&self, extension: &str) -> bool {
        self.handlers
            .contains_key(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    fn handler_for(&self, asset_path: &str) -> Option<&Arc<dyn AssetHandler>> {
        self.handlers.get(&extension(asset_path)?)
    }

    /// Returns `true` if `asset_path` resolves with the current state.
    pub fn find(&self, asset_path: &str) -> bool {
        self.resolve(asset_path).is_some()
    }

    /// Resolves with the resolver's own state.
    pub fn resolve(&self, asset_path: &str) -> Option<PathBuf> {
        self.resolve_in(asset_path, &self.context)
    }

    /// Resolves `asset_path` with an explicit context.
    ///
    /// Absolute paths are used as is. Relative paths are tried against the
    /// working path, then each search path in order, then the process
    /// working directory.
    pub fn resolve_in(&self, asset_path: &str, context: &ResolutionContext) -> Option<PathBuf> {
        let clean = clean_asset_path(asset_path);
        if clean.is_empty() {
            return None;
        }

        if let Some(handler) = self.handler_for(clean) {
            let resolved = handler.resolve(clean, context);
            log::trace!("Handler resolved '{clean}' to {resolved:?}");
            return resolved;
        }

        let candidate = Path::new(clean);
        let resolved = if candidate.is_absolute() {
            candidate.is_file().then(|| candidate.to_path_buf())
        } else {
            context
                .working_path
                .iter()
                .chain(context.search_paths.iter())
                .map(|dir| dir.join(candidate))
                .find(|path| path.is_file())
                .or_else(|| candidate.is_file().then(|| candidate.to_path_buf()))
        };

        let resolved = resolved.map(|path| path.canonicalize().unwrap_or(path));
        log::trace!("Resolved '{clean}' to {resolved:?} ({context})");
        resolved
    }

    /// Reads a resolved asset.
    pub fn open_asset(&self, resolved_path: &Path, asset_path: &str) -> Result<Asset> {
        let clean = clean_asset_path(asset_path);
        let data = match self.handler_for(clean) {
            Some(handler) => handler
                .read(resolved_path)
                .with_context(|| format!("Asset handler failed to read '{}'", resolved_path.display()))?,
            None => fs::read(resolved_path)
                .with_context(|| format!("Failed to read asset: {}", resolved_path.display()))?,
        };

        log::debug!("Opened asset '{clean}' ({} bytes)", data.len());

        Ok(Asset {
            asset_path: clean.to_owned(),
            resolved_path: resolved_path.to_path_buf(),
            data,
        })
    }

    /// Size of a resolved asset in bytes.
    pub fn asset_size(&self, resolved_path: &Path, asset_path: &str) -> Result<u64> {
        match self.handler_for(clean_asset_path(asset_path)) {
            Some(handler) => handler.size(resolved_path),
            None => Ok(fs::metadata(resolved_path)
                .with_context(|| format!("Failed to stat asset: {}", resolved_path.display()))?
                .len()),
        }
    }
}

/// Strips `@` delimiters and surrounding whitespace.
pub fn clean_asset_path(asset_path: &str) -> &str {
    asset_path.trim().trim_matches('@').trim()
}

/// Lowercased file extension of an asset path.
pub fn extension(asset_path: &str) -> Option<String> {
    Path::new(clean_asset_path(asset_path))
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
