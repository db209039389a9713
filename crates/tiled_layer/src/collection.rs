//! Registry pairing each layer's active and pending halves.

use std::collections::HashMap;
use std::rc::Rc;

use geometry::Region;
use tile_model::{LayerId, RasterSource, TileFactory, TileSettings, WhichTree};

use crate::inputs::DrawInputs;
use crate::layer::TiledLayer;

/// Both trees' views of one layer id. Either side may be absent.
#[derive(Clone, Copy)]
pub struct LayerPair<'a> {
    pub active: Option<&'a TiledLayer>,
    pub pending: Option<&'a TiledLayer>,
}

/// Owns every registered layer on both trees. The scheduler walks pairs so
/// that priority updates and queues always see a layer together with its
/// twin.
#[derive(Debug, Default)]
pub struct LayerCollection {
    active: HashMap<LayerId, TiledLayer>,
    pending: HashMap<LayerId, TiledLayer>,
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_pending_layer(
        &mut self,
        id: LayerId,
        raster_source: Rc<dyn RasterSource>,
        settings: Rc<TileSettings>,
        factory: Rc<TileFactory>,
    ) -> &mut TiledLayer {
        let layer = TiledLayer::new(id, WhichTree::Pending, raster_source, settings, factory);
        self.pending.insert(id, layer);
        self.pending.get_mut(&id).unwrap_or_else(|| unreachable!())
    }

    pub fn insert(&mut self, layer: TiledLayer) {
        let map = match layer.tree() {
            WhichTree::Active => &mut self.active,
            WhichTree::Pending => &mut self.pending,
        };
        map.insert(layer.id(), layer);
    }

    pub fn get(&self, tree: WhichTree, id: LayerId) -> Option<&TiledLayer> {
        match tree {
            WhichTree::Active => self.active.get(&id),
            WhichTree::Pending => self.pending.get(&id),
        }
    }

    pub fn get_mut(&mut self, tree: WhichTree, id: LayerId) -> Option<&mut TiledLayer> {
        match tree {
            WhichTree::Active => self.active.get_mut(&id),
            WhichTree::Pending => self.pending.get_mut(&id),
        }
    }

    pub fn remove(&mut self, tree: WhichTree, id: LayerId) -> Option<TiledLayer> {
        match tree {
            WhichTree::Active => self.active.remove(&id),
            WhichTree::Pending => self.pending.remove(&id),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    /// Every layer id present on either tree, with both halves attached.
    pub fn pairs(&self) -> impl Iterator<Item = LayerPair<'_>> {
        let mut ids: Vec<LayerId> = self.active.keys().copied().collect();
        for id in self.pending.keys() {
            if !self.active.contains_key(id) {
                ids.push(*id);
            }
        }
        ids.into_iter().map(|id| LayerPair {
            active: self.active.get(&id),
            pending: self.pending.get(&id),
        })
    }

    /// Delivers a freshly committed recording to a pending layer and shares
    /// the active twin's tilings and tiles with it.
    pub fn set_pending_raster_source(
        &mut self,
        id: LayerId,
        raster_source: Rc<dyn RasterSource>,
        invalidation: Region,
    ) {
        let Self { active, pending } = self;
        if let Some(layer) = pending.get_mut(&id) {
            layer.update_raster_source(raster_source, invalidation);
            if let Some(twin) = active.get(&id) {
                layer.sync_from_active(twin);
            }
        }
    }

    /// Per-frame priority pass over one tree. Each layer sees its twin from
    /// the other tree so shared tiles get both records refreshed.
    pub fn update_tiles(&mut self, tree: WhichTree, inputs: &DrawInputs) {
        let Self { active, pending } = self;
        match tree {
            WhichTree::Pending => {
                for (id, layer) in pending.iter_mut() {
                    layer.update_tiles(inputs, active.get(id));
                }
            }
            WhichTree::Active => {
                for (id, layer) in active.iter_mut() {
                    layer.update_tiles(inputs, pending.get(id));
                }
            }
        }
    }

    /// Active-tree tiling cleanup. Removals of non-ideal twin tilings are
    /// mirrored onto the pending layer so the trees stay in correspondence.
    pub fn cleanup_tilings(&mut self, used_scales: &[f32]) {
        let Self { active, pending } = self;
        for (id, layer) in active.iter_mut() {
            let twin_removals = layer.cleanup_tilings(used_scales, pending.get(id));
            if let Some(twin) = pending.get_mut(id) {
                for scale in twin_removals {
                    twin.remove_tiling(scale);
                }
            }
        }
    }

    /// Moves a pending layer onto the active tree, replacing the previous
    /// active layer of the same id.
    pub fn activate(&mut self, id: LayerId) {
        if let Some(mut layer) = self.pending.remove(&id) {
            layer.did_become_active();
            self.active.insert(id, layer);
        }
    }

    pub fn activate_all(&mut self) {
        let ids: Vec<LayerId> = self.pending.keys().copied().collect();
        for id in ids {
            self.activate(id);
        }
    }

    pub fn all_pending_required_tiles_are_ready_to_draw(&self) -> bool {
        self.pending
            .values()
            .all(TiledLayer::all_tiles_required_for_activation_are_ready_to_draw)
    }

    /// Routes a tile state change to the owning layers on both trees.
    pub fn notify_tile_state_changed(&mut self, id: LayerId) {
        if let Some(layer) = self.active.get_mut(&id) {
            layer.on_tile_state_changed();
        }
        if let Some(layer) = self.pending.get_mut(&id) {
            layer.on_tile_state_changed();
        }
    }

    pub fn gpu_memory_usage_bytes(&self) -> i64 {
        // Shared tiles sit on both trees; count each layer once through the
        // pending side where present.
        let mut total = 0;
        for pair in self.pairs() {
            let layer = pair.pending.or(pair.active);
            if let Some(layer) = layer {
                total += layer.gpu_memory_usage_bytes();
            }
        }
        total
    }
}
