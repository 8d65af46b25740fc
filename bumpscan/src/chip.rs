use std::fmt;

use serde::{Deserialize, Serialize};

/// Scan name of the injection-pattern runs.
pub const PIXEL_ALIVE: &str = "PixelAlive";

/// Address of one readout chip inside the acquisition store hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChipKey {
    pub board: u32,
    pub optical_group: u32,
    pub hybrid: u32,
    pub chip: u32,
}

impl ChipKey {
    pub fn new(chip: u32) -> Self {
        Self {
            chip,
            ..Self::default()
        }
    }

    pub fn with_location(board: u32, optical_group: u32, hybrid: u32, chip: u32) -> Self {
        Self {
            board,
            optical_group,
            hybrid,
            chip,
        }
    }

    pub fn directory(&self) -> String {
        format!(
            "Detector/Board_{}/OpticalGroup_{}/Hybrid_{}/Chip_{}",
            self.board, self.optical_group, self.hybrid, self.chip
        )
    }

    pub fn object_name(&self, scan: &str) -> String {
        format!(
            "D_B({})_O({})_H({})_{}_Chip({})",
            self.board, self.optical_group, self.hybrid, scan, self.chip
        )
    }

    pub fn object_path(&self, scan: &str) -> String {
        format!("{}/{}", self.directory(), self.object_name(scan))
    }
}

impl fmt::Display for ChipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "B{}/O{}/H{}/chip {}",
            self.board, self.optical_group, self.hybrid, self.chip
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_matches_store_layout() {
        let key = ChipKey::new(12);
        assert_eq!(
            key.object_path(PIXEL_ALIVE),
            "Detector/Board_0/OpticalGroup_0/Hybrid_0/Chip_12/D_B(0)_O(0)_H(0)_PixelAlive_Chip(12)"
        );
    }

    #[test]
    fn test_object_name_uses_full_location() {
        let key = ChipKey::with_location(1, 2, 3, 15);
        assert_eq!(key.directory(), "Detector/Board_1/OpticalGroup_2/Hybrid_3/Chip_15");
        assert_eq!(key.object_name("Noise2D"), "D_B(1)_O(2)_H(3)_Noise2D_Chip(15)");
    }
}
