//! The recorded-content collaborator tiles raster from.

use std::rc::Rc;

use geometry::{IntRect, IntSize};

/// Premultiplied RGBA.
pub type Color = [u8; 4];

/// One immutable snapshot of a layer's recorded content. Tilings hold the
/// snapshot they were built against; a new commit swaps in a new snapshot
/// via `UpdateTilesToCurrentSource`.
pub trait RasterSource: std::fmt::Debug {
    /// Layer-space bounds of the recording.
    fn size(&self) -> IntSize;

    /// Whether the recording covers `content_rect` at `contents_scale` well
    /// enough to raster it. Tiles are never created over unrecorded area.
    fn can_raster(&self, contents_scale: f32, content_rect: IntRect) -> bool;

    /// Analysis result for one tile's content rect: `Some` when the area is
    /// provably a single color, letting the tile skip raster entirely.
    fn analyze_solid_color(&self, content_rect: IntRect, contents_scale: f32) -> Option<Color>;

    /// Whether the whole layer is a single color, in which case the layer
    /// needs no tilings at all.
    fn is_solid_color(&self) -> bool;
}

pub fn same_source(a: &Rc<dyn RasterSource>, b: &Rc<dyn RasterSource>) -> bool {
    Rc::ptr_eq(a, b)
}

/// A recording with fixed contents, used by tests and by solid-color layers.
#[derive(Debug, Clone)]
pub struct FixedRasterSource {
    size: IntSize,
    recorded: IntRect,
    solid_color: Option<Color>,
}

impl FixedRasterSource {
    /// A recording covering the full layer bounds.
    pub fn filled(size: IntSize) -> Rc<Self> {
        Rc::new(Self {
            size,
            recorded: IntRect::from_size(size),
            solid_color: None,
        })
    }

    /// A recording covering only part of the layer bounds.
    pub fn partially_filled(size: IntSize, recorded: IntRect) -> Rc<Self> {
        Rc::new(Self {
            size,
            recorded,
            solid_color: None,
        })
    }

    /// A recording with nothing in it.
    pub fn empty(size: IntSize) -> Rc<Self> {
        Rc::new(Self {
            size,
            recorded: IntRect::default(),
            solid_color: None,
        })
    }

    /// A recording that analyzes as one uniform color everywhere.
    pub fn solid(size: IntSize, color: Color) -> Rc<Self> {
        Rc::new(Self {
            size,
            recorded: IntRect::from_size(size),
            solid_color: Some(color),
        })
    }
}

impl RasterSource for FixedRasterSource {
    fn size(&self) -> IntSize {
        self.size
    }

    fn can_raster(&self, contents_scale: f32, content_rect: IntRect) -> bool {
        let recorded_content = self.recorded.scale_to_enclosing(contents_scale);
        recorded_content.contains_rect(
            content_rect.intersection(IntRect::from_size(geometry::scale_size_ceil(
                self.size,
                contents_scale,
            ))),
        ) && !content_rect.is_empty()
    }

    fn analyze_solid_color(&self, _content_rect: IntRect, _contents_scale: f32) -> Option<Color> {
        self.solid_color
    }

    fn is_solid_color(&self) -> bool {
        self.solid_color.is_some()
    }
}
