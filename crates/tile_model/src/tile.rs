//! The tile entity and its draw state.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use geometry::{IntRect, IntSize};

use crate::id::{LayerId, TileId};
use crate::priority::{TilePriority, TreePriority, WhichTree};
use crate::raster::{Color, RasterSource};
use crate::resources::{PooledResource, bytes_for_size};

pub type TileHandle = Rc<Tile>;

/// What a tile currently has to draw with.
#[derive(Debug, Default)]
pub enum TileDrawInfo {
    #[default]
    NoResource,
    /// A raster task has been scheduled but has not completed.
    PendingRaster,
    Resource(PooledResource),
    SolidColor(Color),
}

impl TileDrawInfo {
    pub fn is_ready_to_draw(&self) -> bool {
        matches!(self, TileDrawInfo::Resource(_) | TileDrawInfo::SolidColor(_))
    }

    pub fn has_resource(&self) -> bool {
        matches!(self, TileDrawInfo::Resource(_))
    }

    pub fn has_raster_task(&self) -> bool {
        matches!(self, TileDrawInfo::PendingRaster)
    }

    /// Drops any held resource and resets to `NoResource`. The resource
    /// returns to its pool through its drop hook.
    pub fn evict(&mut self) {
        *self = TileDrawInfo::NoResource;
    }
}

/// One rasterizable rectangle of one layer at one scale.
///
/// A tile's geometry is fixed at creation; invalidation destroys and
/// recreates rather than mutating. The pending tree may hold a second
/// reference to an active-tree tile when the content under it is unchanged,
/// in which case `is_shared` is set on the one shared object.
#[derive(Debug)]
pub struct Tile {
    id: TileId,
    layer_id: LayerId,
    contents_scale: f32,
    content_rect: IntRect,
    desired_texture_size: IntSize,
    raster_source: RefCell<Rc<dyn RasterSource>>,
    priority: [Cell<TilePriority>; 2],
    is_occluded: [Cell<bool>; 2],
    required_for_activation: Cell<bool>,
    is_shared: Cell<bool>,
    draw_info: RefCell<TileDrawInfo>,
}

impl Tile {
    pub(crate) fn new(
        id: TileId,
        layer_id: LayerId,
        raster_source: Rc<dyn RasterSource>,
        contents_scale: f32,
        content_rect: IntRect,
        desired_texture_size: IntSize,
    ) -> TileHandle {
        Rc::new(Tile {
            id,
            layer_id,
            contents_scale,
            content_rect,
            desired_texture_size,
            raster_source: RefCell::new(raster_source),
            priority: [Cell::new(TilePriority::default()), Cell::new(TilePriority::default())],
            is_occluded: [Cell::new(false), Cell::new(false)],
            required_for_activation: Cell::new(false),
            is_shared: Cell::new(false),
            draw_info: RefCell::new(TileDrawInfo::NoResource),
        })
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn grid_index(&self) -> (i32, i32) {
        self.id.grid_index()
    }

    pub fn contents_scale(&self) -> f32 {
        self.contents_scale
    }

    /// Content-space rect including border texels.
    pub fn content_rect(&self) -> IntRect {
        self.content_rect
    }

    pub fn desired_texture_size(&self) -> IntSize {
        self.desired_texture_size
    }

    pub fn bytes_if_allocated(&self) -> i64 {
        bytes_for_size(self.desired_texture_size)
    }

    pub fn raster_source(&self) -> Rc<dyn RasterSource> {
        self.raster_source.borrow().clone()
    }

    /// Swapped when a shared tile's content survives a commit but the layer
    /// re-records; the pixels are unchanged, only the provenance moves.
    pub fn set_raster_source(&self, raster_source: Rc<dyn RasterSource>) {
        *self.raster_source.borrow_mut() = raster_source;
    }

    pub fn priority(&self, tree: WhichTree) -> TilePriority {
        self.priority[tree.index()].get()
    }

    pub fn set_priority(&self, tree: WhichTree, priority: TilePriority) {
        self.priority[tree.index()].set(priority);
    }

    pub fn combined_priority(&self) -> TilePriority {
        TilePriority::combine(
            self.priority(WhichTree::Active),
            self.priority(WhichTree::Pending),
        )
    }

    pub fn priority_for_tree_priority(&self, tree_priority: TreePriority) -> TilePriority {
        match tree_priority {
            TreePriority::SmoothnessTakesPriority => self.priority(WhichTree::Active),
            TreePriority::NewContentTakesPriority => self.priority(WhichTree::Pending),
            TreePriority::SamePriorityForBothTrees => self.combined_priority(),
        }
    }

    pub fn is_occluded(&self, tree: WhichTree) -> bool {
        self.is_occluded[tree.index()].get()
    }

    pub fn set_is_occluded(&self, tree: WhichTree, occluded: bool) {
        self.is_occluded[tree.index()].set(occluded);
    }

    pub fn is_occluded_for_tree_priority(&self, tree_priority: TreePriority) -> bool {
        match tree_priority {
            TreePriority::SmoothnessTakesPriority => self.is_occluded(WhichTree::Active),
            TreePriority::NewContentTakesPriority => self.is_occluded(WhichTree::Pending),
            TreePriority::SamePriorityForBothTrees => {
                self.is_occluded(WhichTree::Active) && self.is_occluded(WhichTree::Pending)
            }
        }
    }

    pub fn required_for_activation(&self) -> bool {
        self.required_for_activation.get()
    }

    pub fn set_required_for_activation(&self, required: bool) {
        self.required_for_activation.set(required);
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared.get()
    }

    pub fn set_is_shared(&self, shared: bool) {
        self.is_shared.set(shared);
    }

    pub fn draw_info(&self) -> Ref<'_, TileDrawInfo> {
        self.draw_info.borrow()
    }

    pub fn draw_info_mut(&self) -> RefMut<'_, TileDrawInfo> {
        self.draw_info.borrow_mut()
    }

    pub fn is_ready_to_draw(&self) -> bool {
        self.draw_info().is_ready_to_draw()
    }

    pub fn has_resource(&self) -> bool {
        self.draw_info().has_resource()
    }

    pub fn has_raster_task(&self) -> bool {
        self.draw_info().has_raster_task()
    }

    /// Whether the tile still needs raster work scheduled.
    pub fn needs_raster(&self) -> bool {
        matches!(*self.draw_info(), TileDrawInfo::NoResource)
    }
}

#[cfg(test)]
mod tests {
    use geometry::{IntRect, IntSize};

    use crate::factory::TileFactory;
    use crate::id::LayerId;
    use crate::priority::{PriorityBin, TilePriority, TileResolution, TreePriority, WhichTree};
    use crate::raster::FixedRasterSource;
    use crate::resources::ResourcePool;

    use super::*;

    fn make_tile() -> TileHandle {
        let factory = TileFactory::new();
        let source = FixedRasterSource::filled(IntSize::new(1000, 1000));
        factory.create_tile(
            LayerId(1),
            source,
            1.0,
            IntRect::new(0, 0, 256, 256),
            IntSize::new(256, 256),
            0,
            0,
        )
    }

    #[test]
    fn draw_info_transitions() {
        let tile = make_tile();
        assert!(tile.needs_raster());
        assert!(!tile.is_ready_to_draw());

        *tile.draw_info_mut() = TileDrawInfo::PendingRaster;
        assert!(tile.has_raster_task());
        assert!(!tile.needs_raster());

        let mut pool = ResourcePool::new();
        *tile.draw_info_mut() = TileDrawInfo::Resource(pool.acquire(IntSize::new(256, 256)));
        assert!(tile.is_ready_to_draw());
        assert!(tile.has_resource());

        tile.draw_info_mut().evict();
        pool.process_returns();
        assert!(tile.needs_raster());
        assert_eq!(pool.acquired_resource_count(), 0);
    }

    #[test]
    fn solid_color_is_ready_without_a_resource() {
        let tile = make_tile();
        *tile.draw_info_mut() = TileDrawInfo::SolidColor([255, 0, 0, 255]);
        assert!(tile.is_ready_to_draw());
        assert!(!tile.has_resource());
    }

    #[test]
    fn tree_priority_selects_the_right_record() {
        let tile = make_tile();
        let active = TilePriority::new(TileResolution::HighResolution, PriorityBin::Eventually, 40.0);
        let pending = TilePriority::new(TileResolution::HighResolution, PriorityBin::Now, 0.0);
        tile.set_priority(WhichTree::Active, active);
        tile.set_priority(WhichTree::Pending, pending);

        assert_eq!(
            tile.priority_for_tree_priority(TreePriority::SmoothnessTakesPriority),
            active
        );
        assert_eq!(
            tile.priority_for_tree_priority(TreePriority::NewContentTakesPriority),
            pending
        );
        let combined = tile.priority_for_tree_priority(TreePriority::SamePriorityForBothTrees);
        assert_eq!(combined.priority_bin, PriorityBin::Now);
    }

    #[test]
    fn combined_occlusion_requires_both_trees() {
        let tile = make_tile();
        tile.set_is_occluded(WhichTree::Active, true);
        assert!(tile.is_occluded_for_tree_priority(TreePriority::SmoothnessTakesPriority));
        assert!(!tile.is_occluded_for_tree_priority(TreePriority::SamePriorityForBothTrees));
        tile.set_is_occluded(WhichTree::Pending, true);
        assert!(tile.is_occluded_for_tree_priority(TreePriority::SamePriorityForBothTrees));
    }
}
