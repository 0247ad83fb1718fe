//! Markpress
//!
//! Author a Markdown document, preview its rendered form, and export that
//! rendered form as a single-page raster PDF.
//!
//! # Features
//!
//! - **Live surface**: every edit re-renders the visual tree synchronously
//! - **Deterministic capture**: a built-in bitmap font and explicit theme
//!   palette, so the same text always produces the same pixels
//! - **Fail-fast colours**: colour notations the rasterizer cannot reproduce
//!   abort the capture instead of producing a wrong bitmap
//!
//! # Example
//!
//! ```no_run
//! use markpress::{sink::DirectorySink, WorkspaceConfig};
//!
//! # async fn run() -> markpress::Result<()> {
//! let config = WorkspaceConfig {
//!     viewport_width: 1024,
//!     ..Default::default()
//! };
//!
//! let mut workspace = markpress::new_workspace(config)?;
//! workspace.edit("# Report\n\nAll **green**.");
//! let outcome = workspace.export(&DirectorySink::new(".")).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{CaptureError, Error, FileLoadError, Result};

pub mod document;
pub mod export;
pub mod markup;
pub mod pdf;
pub mod rendering;
pub mod sink;
pub mod theme;
pub mod workspace;

pub use document::MarkupDocument;
pub use export::{ExportOutcome, ExportReport, ExportState, Exporter};
pub use markup::{render_markup, Extensions, VisualTree};
pub use pdf::{Artifact, Orientation, PageGeometry, EXPORT_FILE_NAME, PDF_MIME_TYPE};
pub use rendering::{Rasterizer, RegionHandle, RenderSnapshot, RenderSurface, CAPTURE_SCALE};
pub use theme::{Palette, PaletteOverrides, ThemeContext, ThemeMode, THEME_KEY};
pub use workspace::Workspace;

/// Largest accepted viewport width in CSS pixels
pub const MAX_VIEWPORT_WIDTH: u32 = 4096;

/// Capability to hand out a handle to the currently rendered region.
///
/// Handles are only ever obtained this way; the rasterizer never sees the
/// surface itself.
pub trait Renderable {
    fn capture_region_handle(&self) -> RegionHandle;
}

/// Configuration for a [`Workspace`]
///
/// # Examples
///
/// ```
/// let cfg = markpress::WorkspaceConfig::default();
/// assert_eq!(cfg.viewport_width, 800);
/// assert!(cfg.extensions.tables);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Width of the render region in CSS pixels
    pub viewport_width: u32,
    /// Enabled markup extensions
    pub extensions: Extensions,
    /// Where the theme preference is persisted. `None` uses the per-user default.
    pub theme_file: Option<PathBuf>,
    /// Colour overrides applied on top of the built-in palettes
    pub palette: PaletteOverrides,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            extensions: Extensions::gfm(),
            theme_file: None,
            palette: PaletteOverrides::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.viewport_width == 0 || self.viewport_width > MAX_VIEWPORT_WIDTH {
            return Err(Error::ConfigError(format!(
                "viewport_width must be between 1 and {}, got {}",
                MAX_VIEWPORT_WIDTH, self.viewport_width
            )));
        }
        Ok(())
    }

    pub fn theme_path(&self) -> PathBuf {
        self.theme_file
            .clone()
            .unwrap_or_else(theme::FileThemeStore::default_path)
    }
}

/// Create a workspace persisting its theme to the configured file
pub fn new_workspace(config: WorkspaceConfig) -> Result<Workspace> {
    config.validate()?;
    let store = theme::FileThemeStore::new(config.theme_path());
    Ok(Workspace::new(config, Box::new(store), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.viewport_width, 800);
        assert_eq!(config.extensions, Extensions::gfm());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let config = WorkspaceConfig {
            viewport_width: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markpress.json");
        std::fs::write(
            &path,
            r#"{ "viewport_width": 640, "extensions": { "tables": false }, "palette": { "dark": { "text": "oklch(0.9 0 0)" } } }"#,
        )
        .unwrap();
        let config = WorkspaceConfig::from_json_file(&path).unwrap();
        assert_eq!(config.viewport_width, 640);
        assert!(!config.extensions.tables);
        assert!(config.extensions.strikethrough);
        assert_eq!(config.palette.dark.text.as_deref(), Some("oklch(0.9 0 0)"));
    }

    #[test]
    fn test_config_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(WorkspaceConfig::from_json_file(&path), Err(Error::ConfigError(_))));
    }
}
