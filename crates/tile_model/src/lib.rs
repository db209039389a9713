//! Tile entities and the process-wide state that hangs off them.
//!
//! A [`Tile`] is one rasterizable rectangle of one layer at one scale. Tiles
//! are reference counted so the pending tree can share unchanged tiles with
//! the active tree; all mutation goes through interior cells since the whole
//! compositing core runs on a single thread.

mod factory;
mod id;
mod priority;
mod raster;
mod resources;
mod settings;
mod tile;

pub use factory::TileFactory;
pub use id::{LayerId, TileId};
pub use priority::{PriorityBin, TilePriority, TileResolution, TreePriority, WhichTree};
pub use raster::{Color, FixedRasterSource, RasterSource};
pub use resources::{PooledResource, ResourceKey, ResourcePool};
pub use settings::{GlobalTileState, MemoryLimitPolicy, TileSettings};
pub use tile::{Tile, TileDrawInfo, TileHandle};
