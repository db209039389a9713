//! Tile creation, id assignment, and the live-tile registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use geometry::{IntRect, IntSize};

use crate::id::{LayerId, SCALE_BITS, TileId};
use crate::raster::RasterSource;
use crate::tile::{Tile, TileHandle};

/// Mints tiles with process-unique ids and keeps a weak registry of every
/// live tile so the manager can look tiles up by id.
#[derive(Debug, Default)]
pub struct TileFactory {
    inner: RefCell<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    scale_keys: HashMap<u32, u16>,
    next_generation: u16,
    tiles: HashMap<TileId, Weak<Tile>>,
}

impl TileFactory {
    pub fn new() -> Rc<Self> {
        Rc::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_tile(
        &self,
        layer_id: LayerId,
        raster_source: Rc<dyn RasterSource>,
        contents_scale: f32,
        content_rect: IntRect,
        desired_texture_size: IntSize,
        i: i32,
        j: i32,
    ) -> TileHandle {
        let mut inner = self.inner.borrow_mut();
        let next_key = inner.scale_keys.len() as u16;
        let scale_key = *inner
            .scale_keys
            .entry(contents_scale.to_bits())
            .or_insert_with(|| {
                assert!(
                    u32::from(next_key) < (1 << SCALE_BITS),
                    "too many distinct contents scales"
                );
                next_key
            });
        let generation = inner.next_generation;
        inner.next_generation = generation.wrapping_add(1);

        let id = TileId::pack(layer_id, scale_key, i, j, generation);
        let tile = Tile::new(
            id,
            layer_id,
            raster_source,
            contents_scale,
            content_rect,
            desired_texture_size,
        );
        let previous = inner.tiles.insert(id, Rc::downgrade(&tile));
        debug_assert!(
            previous.is_none_or(|weak| weak.upgrade().is_none()),
            "tile id collision"
        );
        tile
    }

    pub fn get(&self, id: TileId) -> Option<TileHandle> {
        self.inner.borrow().tiles.get(&id).and_then(Weak::upgrade)
    }

    /// Drops registry entries whose tiles have died.
    pub fn prune_dead(&self) {
        self.inner
            .borrow_mut()
            .tiles
            .retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn live_tile_count(&self) -> usize {
        self.inner
            .borrow()
            .tiles
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
