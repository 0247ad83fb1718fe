//! Render surface and the capture path behind it.
//!
//! The surface owns the mounted region. Re-rendering replaces the visual tree
//! synchronously and marks layout pending; layout is completed lazily by the
//! first capture that waits on the region, so a capture always sees the tree
//! current at the moment it settles.

pub mod fonts;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod style;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::document::MarkupDocument;
use crate::error::CaptureError;
use crate::markup::{render_markup, Extensions, VisualTree};
use crate::theme::Palette;
use crate::Renderable;

pub use layout::{layout_tree, LayoutItem, LayoutTree};
pub use raster::{Rasterizer, RenderSnapshot, CAPTURE_SCALE};

#[derive(Debug)]
struct Region {
    tree: Rc<VisualTree>,
    palette: Palette,
    width: u32,
    layout: Option<LayoutTree>,
}

impl Region {
    fn settle(&mut self) -> LayoutTree {
        let (tree, palette, width) = (&self.tree, &self.palette, self.width);
        self.layout
            .get_or_insert_with(|| layout_tree(tree, palette, width))
            .clone()
    }
}

/// Opaque reference to the surface's mounted region.
///
/// Only a [`RenderSurface`] hands these out. A handle does not keep the region
/// alive; once the surface is unmounted or dropped the handle is detached.
#[derive(Debug, Clone)]
pub struct RegionHandle {
    region: Weak<RefCell<Region>>,
}

impl RegionHandle {
    pub fn is_attached(&self) -> bool {
        self.region.strong_count() > 0
    }

    /// Let pending work run, then complete layout for the current tree.
    pub async fn settle(&self) -> Result<LayoutTree, CaptureError> {
        tokio::task::yield_now().await;
        let region = self.region.upgrade().ok_or(CaptureError::DetachedRegion)?;
        let layout = region.borrow_mut().settle();
        Ok(layout)
    }
}

/// The visible preview region
#[derive(Debug)]
pub struct RenderSurface {
    viewport_width: u32,
    extensions: Extensions,
    tree: Rc<VisualTree>,
    palette: Palette,
    region: Option<Rc<RefCell<Region>>>,
}

impl RenderSurface {
    /// A mounted surface showing the empty-document placeholder
    pub fn new(viewport_width: u32, extensions: Extensions) -> Self {
        let mut surface = Self {
            viewport_width,
            extensions,
            tree: Rc::new(render_markup("", extensions)),
            palette: Palette::light(),
            region: None,
        };
        surface.mount();
        surface
    }

    /// Re-render `document` styled with `palette`. Synchronous; the previous
    /// tree is discarded.
    pub fn render(&mut self, document: &MarkupDocument, palette: &Palette) -> Rc<VisualTree> {
        self.tree = Rc::new(render_markup(document.source_text(), self.extensions));
        self.palette = palette.clone();
        if let Some(region) = &self.region {
            let mut region = region.borrow_mut();
            region.tree = Rc::clone(&self.tree);
            region.palette = palette.clone();
            region.layout = None;
        }
        Rc::clone(&self.tree)
    }

    pub fn visual_tree(&self) -> Rc<VisualTree> {
        Rc::clone(&self.tree)
    }

    pub fn extensions(&self) -> Extensions {
        self.extensions
    }

    /// Takes effect on the next render
    pub fn set_extensions(&mut self, extensions: Extensions) {
        self.extensions = extensions;
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn is_mounted(&self) -> bool {
        self.region.is_some()
    }

    pub fn mount(&mut self) {
        if self.region.is_none() {
            self.region = Some(Rc::new(RefCell::new(Region {
                tree: Rc::clone(&self.tree),
                palette: self.palette.clone(),
                width: self.viewport_width,
                layout: None,
            })));
        }
    }

    /// Drop the mounted region. Outstanding handles become detached.
    pub fn unmount(&mut self) {
        self.region = None;
    }

    /// Layout of the current tree, computed now. `None` when unmounted.
    pub fn layout(&self) -> Option<LayoutTree> {
        self.region.as_ref().map(|region| region.borrow_mut().settle())
    }
}

impl Renderable for RenderSurface {
    fn capture_region_handle(&self) -> RegionHandle {
        RegionHandle {
            region: self.region.as_ref().map(Rc::downgrade).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_detaches_on_unmount() {
        let mut surface = RenderSurface::new(400, Extensions::gfm());
        let handle = surface.capture_region_handle();
        assert!(handle.is_attached());
        surface.unmount();
        assert!(!handle.is_attached());
        assert_eq!(handle.settle().await.unwrap_err(), CaptureError::DetachedRegion);
    }

    #[tokio::test]
    async fn settle_sees_latest_render() {
        let mut surface = RenderSurface::new(400, Extensions::gfm());
        let handle = surface.capture_region_handle();
        surface.render(&MarkupDocument::with_text("first"), &Palette::light());
        surface.render(&MarkupDocument::with_text("second"), &Palette::light());
        let layout = handle.settle().await.unwrap();
        assert_eq!(layout.text_items().collect::<Vec<_>>(), vec!["second"]);
    }

    #[test]
    fn unmounted_surface_has_no_layout() {
        let mut surface = RenderSurface::new(400, Extensions::gfm());
        assert!(surface.layout().is_some());
        surface.unmount();
        assert!(surface.layout().is_none());
        surface.mount();
        assert!(surface.is_mounted());
    }
}
