//! Shared fakes and the layer-pair harness used by scheduler tests.

use std::rc::Rc;

use crossbeam_channel::Sender;

use geometry::{IntRect, IntSize, Region};
use tile_model::{
    Color, FixedRasterSource, LayerId, RasterSource, TileFactory, TileSettings, WhichTree,
};
use tiled_layer::{DrawInputs, LayerCollection};

use crate::worker::{RasterCompletion, RasterTask, RasterWorker};

/// Completes every task the moment it is scheduled. Completions still wait
/// in the channel until the manager's next drain.
#[derive(Debug, Default)]
pub struct ImmediateRasterWorker;

impl RasterWorker for ImmediateRasterWorker {
    fn schedule(&mut self, task: RasterTask, completions: &Sender<RasterCompletion>) {
        let _ = completions.send(task.into_completion());
    }

    fn finish_all(&mut self) {}
}

/// Holds tasks until `finish_all`, for tests exercising the in-flight state.
#[derive(Default)]
pub struct DeferredRasterWorker {
    queued: Vec<(RasterTask, Sender<RasterCompletion>)>,
}

impl DeferredRasterWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }
}

impl RasterWorker for DeferredRasterWorker {
    fn schedule(&mut self, task: RasterTask, completions: &Sender<RasterCompletion>) {
        self.queued.push((task, completions.clone()));
    }

    fn finish_all(&mut self) {
        for (task, completions) in self.queued.drain(..) {
            let _ = completions.send(task.into_completion());
        }
    }
}

/// A recording whose per-tile analysis always proves a uniform color, while
/// the layer as a whole is not known solid and so still gets tilings.
#[derive(Debug)]
pub struct SolidTileRasterSource {
    size: IntSize,
    color: Color,
}

impl SolidTileRasterSource {
    pub fn new(size: IntSize, color: Color) -> Rc<Self> {
        Rc::new(Self { size, color })
    }
}

impl RasterSource for SolidTileRasterSource {
    fn size(&self) -> IntSize {
        self.size
    }

    fn can_raster(&self, _contents_scale: f32, content_rect: IntRect) -> bool {
        !content_rect.is_empty()
    }

    fn analyze_solid_color(&self, _content_rect: IntRect, _contents_scale: f32) -> Option<Color> {
        Some(self.color)
    }

    fn is_solid_color(&self) -> bool {
        false
    }
}

/// Owns the settings, factory, and registry a pair of trees share.
pub struct PairHarness {
    pub settings: Rc<TileSettings>,
    pub factory: Rc<TileFactory>,
    pub layers: LayerCollection,
}

impl PairHarness {
    pub fn new() -> Self {
        Self::with_settings(TileSettings::default())
    }

    pub fn with_settings(settings: TileSettings) -> Self {
        Self {
            settings: Rc::new(settings),
            factory: TileFactory::new(),
            layers: LayerCollection::new(),
        }
    }

    pub fn add_pending_layer(&mut self, id: LayerId, bounds: IntSize) {
        self.layers.create_pending_layer(
            id,
            FixedRasterSource::filled(bounds),
            self.settings.clone(),
            self.factory.clone(),
        );
    }

    /// A new commit for a layer already on the active tree: fresh pending
    /// layer, new recording, and the given invalidation.
    pub fn commit(&mut self, id: LayerId, bounds: IntSize, invalidation: Region) {
        self.add_pending_layer(id, bounds);
        self.layers
            .set_pending_raster_source(id, FixedRasterSource::filled(bounds), invalidation);
    }

    pub fn update_pending(&mut self, inputs: &DrawInputs) {
        self.layers.update_tiles(WhichTree::Pending, inputs);
    }

    pub fn update_active(&mut self, inputs: &DrawInputs) {
        self.layers.update_tiles(WhichTree::Active, inputs);
    }

    pub fn activate_all(&mut self) {
        self.layers.activate_all();
    }
}

impl Default for PairHarness {
    fn default() -> Self {
        Self::new()
    }
}
