//! The editing workspace: document, theme, preview surface and exporter.
//!
//! Every mutation of the document or theme re-renders the surface before
//! returning, so the visual tree is always derived output of the current state.

use std::path::Path;
use std::rc::Rc;

use crate::document::{MarkupDocument, INITIAL_SOURCE};
use crate::error::Result;
use crate::export::{ExportOutcome, ExportState, Exporter};
use crate::markup::{Extensions, VisualTree};
use crate::rendering::{LayoutTree, Rasterizer, RenderSurface};
use crate::sink::ArtifactSink;
use crate::theme::{ThemeContext, ThemeMode, ThemeStore};
use crate::WorkspaceConfig;

#[derive(Debug)]
pub struct Workspace {
    document: MarkupDocument,
    theme: ThemeContext,
    surface: RenderSurface,
    exporter: Exporter,
}

impl Workspace {
    /// A workspace showing the initial document
    pub fn new(config: WorkspaceConfig, store: Box<dyn ThemeStore>, system_preference: Option<ThemeMode>) -> Self {
        let theme = ThemeContext::initialize(store, system_preference).with_overrides(config.palette.clone());
        let mut workspace = Self {
            document: MarkupDocument::with_text(INITIAL_SOURCE),
            theme,
            surface: RenderSurface::new(config.viewport_width, config.extensions),
            exporter: Exporter::new(Rasterizer::new()),
        };
        workspace.rerender();
        workspace
    }

    fn rerender(&mut self) {
        let palette = self.theme.palette();
        self.surface.render(&self.document, &palette);
    }

    pub fn document(&self) -> &MarkupDocument {
        &self.document
    }

    pub fn theme(&self) -> &ThemeContext {
        &self.theme
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut RenderSurface {
        &mut self.surface
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Replace the source text
    pub fn edit(&mut self, text: impl Into<String>) {
        self.document.set_source_text(text);
        self.rerender();
    }

    pub fn clear(&mut self) {
        self.document.clear();
        self.rerender();
    }

    /// Load a `.md` file. On failure the document is left as it was.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        self.document.load_file(path)?;
        self.rerender();
        Ok(())
    }

    pub fn load_bytes(&mut self, name: &str, media_type: Option<&str>, bytes: &[u8]) -> Result<()> {
        self.document.load_bytes(name, media_type, bytes)?;
        self.rerender();
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> ThemeMode {
        let mode = self.theme.toggle();
        self.rerender();
        mode
    }

    pub fn set_extensions(&mut self, extensions: Extensions) {
        self.surface.set_extensions(extensions);
        self.rerender();
    }

    pub fn visual_tree(&self) -> Rc<VisualTree> {
        self.surface.visual_tree()
    }

    /// Plain-text outline of what the preview shows
    pub fn preview(&self) -> String {
        self.surface.visual_tree().text_snapshot()
    }

    pub fn layout(&self) -> Option<LayoutTree> {
        self.surface.layout()
    }

    /// Export the current preview to `sink`
    pub async fn export<S: ArtifactSink>(&self, sink: &S) -> Result<ExportOutcome> {
        self.exporter
            .export(&self.document, &self.surface, &self.theme, sink)
            .await
    }

    pub fn last_export_state(&self) -> Option<ExportState> {
        self.exporter.last_state()
    }
}
