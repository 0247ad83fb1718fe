//! The markup document being edited and the file-load boundary that feeds it

use std::path::Path;

use crate::error::FileLoadError;

/// Media type accepted regardless of file name
pub const MARKDOWN_MEDIA_TYPE: &str = "text/markdown";

/// Source text shown in a fresh workspace
pub const INITIAL_SOURCE: &str = "# Hola, Markdown!";

/// The user-owned markup source.
///
/// Mutated on every edit or file load, reset (never destroyed) by `clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupDocument {
    source_text: String,
}

impl MarkupDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            source_text: text.into(),
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn set_source_text(&mut self, text: impl Into<String>) {
        self.source_text = text.into();
    }

    pub fn clear(&mut self) {
        self.source_text.clear();
    }

    /// Empty or whitespace-only documents have nothing worth exporting.
    pub fn is_blank(&self) -> bool {
        self.source_text.trim().is_empty()
    }

    /// Replace the source with the contents of a `.md` file.
    ///
    /// The document is left untouched when the file is rejected or unreadable.
    pub fn load_file(&mut self, path: &Path) -> Result<(), FileLoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if !is_markdown_source(&name, None) {
            return Err(FileLoadError::UnsupportedType { name });
        }

        let bytes = std::fs::read(path).map_err(|e| FileLoadError::Read {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        self.source_text = decode_text(&bytes);
        log::debug!("loaded {} ({} bytes) into the document", name, bytes.len());
        Ok(())
    }

    /// Same acceptance rules as `load_file`, for sources already in memory
    /// (drag and drop, pipes, uploads).
    pub fn load_bytes(
        &mut self,
        name: &str,
        media_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<(), FileLoadError> {
        if !is_markdown_source(name, media_type) {
            return Err(FileLoadError::UnsupportedType {
                name: name.to_string(),
            });
        }
        self.source_text = decode_text(bytes);
        Ok(())
    }
}

/// Whether a file with this name (and optional media type) may be loaded.
pub fn is_markdown_source(name: &str, media_type: Option<&str>) -> bool {
    if let Some(mime) = media_type {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(MARKDOWN_MEDIA_TYPE) {
            return true;
        }
    }
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

// UTF-8 is assumed; a BOM is dropped and invalid sequences become U+FFFD.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
