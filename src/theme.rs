//! Light/dark theme state, its persistence, and the colour palette each mode paints with

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Key under which the mode is persisted
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable storage for the single theme key.
pub trait ThemeStore {
    /// Raw persisted value, if any
    fn load(&self) -> Result<Option<String>>;
    fn store(&mut self, value: &str) -> Result<()>;
}

/// Stores the theme in a small JSON settings file (`{"theme": "dark"}`).
///
/// Other keys already present in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/markpress/settings.json`, falling back to the working directory
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("markpress");
        path.push("settings.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_settings(&self) -> Result<Option<BTreeMap<String, serde_json::Value>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Persistence(format!("{}: {}", self.path.display(), e))),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> Result<Option<String>> {
        let settings = self.read_settings()?;
        Ok(settings
            .and_then(|s| s.get(THEME_KEY).cloned())
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    fn store(&mut self, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking the write.
        let mut settings = self.read_settings().ok().flatten().unwrap_or_default();
        settings.insert(THEME_KEY.to_string(), serde_json::Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store; clones share the same slot, which lets tests simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryThemeStore {
    slot: Arc<Mutex<Option<String>>>,
    reject_writes: bool,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value.to_string()))),
            reject_writes: false,
        }
    }

    /// A store whose writes always fail
    pub fn read_only() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|g| g.clone())
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.value())
    }

    fn store(&mut self, value: &str) -> Result<()> {
        if self.reject_writes {
            return Err(Error::Persistence("store is read-only".into()));
        }
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| Error::Persistence("theme slot poisoned".into()))?;
        *guard = Some(value.to_string());
        Ok(())
    }
}

/// Colours a theme paints with, as CSS colour strings.
///
/// Values are interpreted only when a capture walks the rendered region, so a
/// notation the rasterizer does not understand surfaces there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub background: String,
    pub text: String,
    pub heading: String,
    pub muted: String,
    pub link: String,
    pub code_text: String,
    pub code_background: String,
    pub rule: String,
    pub quote_bar: String,
    pub table_header_background: String,
}

impl Palette {
    pub fn light() -> Self {
        Self {
            background: "#ffffff".into(),
            text: "#374151".into(),
            heading: "#111827".into(),
            muted: "#6b7280".into(),
            link: "#2563eb".into(),
            code_text: "#111827".into(),
            code_background: "#f3f4f6".into(),
            rule: "#e5e7eb".into(),
            quote_bar: "#d1d5db".into(),
            table_header_background: "#f9fafb".into(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#111827".into(),
            text: "#d1d5db".into(),
            heading: "#ffffff".into(),
            muted: "#9ca3af".into(),
            link: "#60a5fa".into(),
            code_text: "#e5e7eb".into(),
            code_background: "#1f2937".into(),
            rule: "#374151".into(),
            quote_bar: "#4b5563".into(),
            table_header_background: "#1f2937".into(),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }
}

/// Partial palette from configuration; `None` keeps the built-in colour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteOverride {
    pub background: Option<String>,
    pub text: Option<String>,
    pub heading: Option<String>,
    pub muted: Option<String>,
    pub link: Option<String>,
    pub code_text: Option<String>,
    pub code_background: Option<String>,
    pub rule: Option<String>,
    pub quote_bar: Option<String>,
    pub table_header_background: Option<String>,
}

impl PaletteOverride {
    pub fn apply(&self, mut base: Palette) -> Palette {
        let pairs = [
            (&self.background, &mut base.background),
            (&self.text, &mut base.text),
            (&self.heading, &mut base.heading),
            (&self.muted, &mut base.muted),
            (&self.link, &mut base.link),
            (&self.code_text, &mut base.code_text),
            (&self.code_background, &mut base.code_background),
            (&self.rule, &mut base.rule),
            (&self.quote_bar, &mut base.quote_bar),
            (&self.table_header_background, &mut base.table_header_background),
        ];
        for (over, slot) in pairs {
            if let Some(value) = over {
                *slot = value.clone();
            }
        }
        base
    }
}

/// Per-mode palette overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteOverrides {
    pub light: PaletteOverride,
    pub dark: PaletteOverride,
}

/// Process-scoped theme state, passed by reference to whoever needs the palette.
pub struct ThemeContext {
    mode: ThemeMode,
    store: Box<dyn ThemeStore>,
    overrides: PaletteOverrides,
}

impl ThemeContext {
    /// Resolve the initial mode: persisted value, else system preference, else light.
    pub fn initialize(store: Box<dyn ThemeStore>, system_preference: Option<ThemeMode>) -> Self {
        let persisted = match store.load() {
            Ok(Some(raw)) => {
                let mode = ThemeMode::parse(&raw);
                if mode.is_none() {
                    log::warn!("ignoring unrecognised persisted theme {:?}", raw);
                }
                mode
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("could not read persisted theme: {}", e);
                None
            }
        };
        let mode = persisted.or(system_preference).unwrap_or_default();
        log::debug!(
            "theme initialised to {} (persisted: {:?}, system: {:?})",
            mode,
            persisted,
            system_preference
        );
        Self {
            mode,
            store,
            overrides: PaletteOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: PaletteOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    /// Flip the mode and persist it; persistence failures only warn.
    pub fn toggle(&mut self) -> ThemeMode {
        self.mode = self.mode.toggled();
        if let Err(e) = self.store.store(self.mode.as_str()) {
            log::warn!("theme changed to {} but could not be saved: {}", self.mode, e);
        }
        self.mode
    }

    /// Palette for the active mode with configured overrides applied
    pub fn palette(&self) -> Palette {
        let overrides = match self.mode {
            ThemeMode::Light => &self.overrides.light,
            ThemeMode::Dark => &self.overrides.dark,
        };
        overrides.apply(Palette::for_mode(self.mode))
    }
}

impl std::fmt::Debug for ThemeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeContext")
            .field("mode", &self.mode)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_order() {
        let ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::with_value("dark")), Some(ThemeMode::Light));
        assert_eq!(ctx.mode(), ThemeMode::Dark);

        let ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::new()), Some(ThemeMode::Dark));
        assert_eq!(ctx.mode(), ThemeMode::Dark);

        let ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::new()), None);
        assert_eq!(ctx.mode(), ThemeMode::Light);
    }

    #[test]
    fn garbage_persisted_value_falls_through() {
        let ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::with_value("sepia")), Some(ThemeMode::Dark));
        assert_eq!(ctx.mode(), ThemeMode::Dark);
    }

    #[test]
    fn toggle_survives_persistence_failure() {
        let mut ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::read_only()), None);
        assert_eq!(ctx.toggle(), ThemeMode::Dark);
        assert_eq!(ctx.mode(), ThemeMode::Dark);
    }

    #[test]
    fn overrides_replace_only_named_colours() {
        let overrides = PaletteOverrides {
            dark: PaletteOverride {
                text: Some("oklch(0.9 0.01 250)".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = ThemeContext::initialize(Box::new(MemoryThemeStore::with_value("dark")), None)
            .with_overrides(overrides);
        let palette = ctx.palette();
        assert_eq!(palette.text, "oklch(0.9 0.01 250)");
        assert_eq!(palette.background, Palette::dark().background);
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"font_size": 14}"#).unwrap();

        let mut store = FileThemeStore::new(&path);
        store.store("dark").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("dark"));

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["font_size"], 14);
        assert_eq!(raw[THEME_KEY], "dark");
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThemeStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), None);
    }
}
