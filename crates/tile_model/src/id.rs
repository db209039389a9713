//! Packed tile identifiers.

use static_assertions::const_assert_eq;

/// Identifies one logical layer across both trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u16);

pub(crate) const LAYER_BITS: u32 = 16;
pub(crate) const SCALE_BITS: u32 = 10;
pub(crate) const INDEX_BITS: u32 = 11;
pub(crate) const GENERATION_BITS: u32 = 16;

const_assert_eq!(
    LAYER_BITS + SCALE_BITS + INDEX_BITS * 2 + GENERATION_BITS,
    u64::BITS
);

const LAYER_SHIFT: u32 = SCALE_BITS + INDEX_BITS * 2 + GENERATION_BITS;
const SCALE_SHIFT: u32 = INDEX_BITS * 2 + GENERATION_BITS;
const I_SHIFT: u32 = INDEX_BITS + GENERATION_BITS;
const J_SHIFT: u32 = GENERATION_BITS;

/// Process-unique tile key. Packs the tile's layer, an interned scale key,
/// its grid coordinate, and a creation generation; the generation keeps the
/// key unique when invalidation recreates a tile at a coordinate whose old
/// tile is still alive on the other tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u64);

impl TileId {
    pub(crate) fn pack(layer: LayerId, scale_key: u16, i: i32, j: i32, generation: u16) -> Self {
        assert!(
            u32::from(scale_key) < (1 << SCALE_BITS),
            "scale key {scale_key} out of range"
        );
        assert!(
            (0..1 << INDEX_BITS).contains(&i) && (0..1 << INDEX_BITS).contains(&j),
            "tile index ({i}, {j}) does not fit in a tile id"
        );
        TileId(
            u64::from(layer.0) << LAYER_SHIFT
                | u64::from(scale_key) << SCALE_SHIFT
                | (i as u64) << I_SHIFT
                | (j as u64) << J_SHIFT
                | u64::from(generation),
        )
    }

    pub fn layer_id(self) -> LayerId {
        LayerId((self.0 >> LAYER_SHIFT) as u16)
    }

    pub fn grid_index(self) -> (i32, i32) {
        let mask = (1u64 << INDEX_BITS) - 1;
        (
            ((self.0 >> I_SHIFT) & mask) as i32,
            ((self.0 >> J_SHIFT) & mask) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_fields_round_trip() {
        let id = TileId::pack(LayerId(7), 3, 41, 1023, 9);
        assert_eq!(id.layer_id(), LayerId(7));
        assert_eq!(id.grid_index(), (41, 1023));
    }

    #[test]
    fn generation_distinguishes_recreated_tiles() {
        let a = TileId::pack(LayerId(1), 0, 5, 5, 0);
        let b = TileId::pack(LayerId(1), 0, 5, 5, 1);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn oversized_index_panics() {
        let _ = TileId::pack(LayerId(0), 0, 1 << INDEX_BITS, 0, 0);
    }
}
