// 12-bit FAT entry packing and mirroring
// Two entries share three bytes: the even entry takes the low 12 bits of
// the little-endian word at floor(cluster * 1.5), the odd entry the high
// 12 bits. Every write is mirrored into all FAT copies.

use floppygen_core::BuildError;
use log::trace;

use crate::geometry::Geometry;

// FAT12 entry values
pub const FAT12_FREE: u16 = 0x000;
pub const FAT12_EOC: u16 = 0xFFF; // written for chain ends
pub const FAT12_EOC_MIN: u16 = 0xFF8; // anything >= this reads as end of chain
pub const FAT12_MASK: u16 = 0x0FFF;

/// Write the reserved header entries at the start of every FAT copy:
/// entry 0 holds the media descriptor (low byte, rest set), entry 1 is a
/// permanent end-of-chain filler. Packed together they are the classic
/// `F0 FF FF` triad.
pub fn init_fat12_tables(image: &mut [u8], geometry: &Geometry) {
    let fat_size = geometry.fat_size();
    for copy in 0..geometry.fat_count as usize {
        let start = geometry.fat_start() + copy * fat_size;
        image[start] = geometry.media_descriptor;
        image[start + 1] = 0xFF;
        image[start + 2] = 0xFF;
    }
}

fn check_cluster(geometry: &Geometry, cluster: u16) -> Result<(), BuildError> {
    if cluster < 2 || cluster >= geometry.data_clusters() + 2 {
        return Err(BuildError::InvalidInput(format!(
            "cluster {} out of range (valid: 2..{})",
            cluster,
            geometry.data_clusters() + 2
        )));
    }
    Ok(())
}

/// Set the FAT entry for `cluster` to `value` (low 12 bits), mirroring the
/// write into every FAT copy.
pub fn set_fat12_entry(
    image: &mut [u8],
    geometry: &Geometry,
    cluster: u16,
    value: u16,
) -> Result<(), BuildError> {
    check_cluster(geometry, cluster)?;

    let offset = geometry.fat_start() + cluster as usize + cluster as usize / 2;
    let mut word = u16::from_le_bytes([image[offset], image[offset + 1]]);

    if cluster % 2 == 0 {
        word = (word & 0xF000) | (value & FAT12_MASK);
    } else {
        word = (word & 0x000F) | ((value & FAT12_MASK) << 4);
    }

    let bytes = word.to_le_bytes();
    for copy in 0..geometry.fat_count as usize {
        let mirrored = offset + copy * geometry.fat_size();
        image[mirrored..mirrored + 2].copy_from_slice(&bytes);
    }

    trace!("FAT[{}] = {:#05X}", cluster, value & FAT12_MASK);
    Ok(())
}

/// Read the FAT entry for `cluster` from FAT copy 1. Accepts the reserved
/// header entries 0 and 1 so tests can inspect them.
pub fn get_fat12_entry(
    image: &[u8],
    geometry: &Geometry,
    cluster: u16,
) -> Result<u16, BuildError> {
    if cluster >= geometry.data_clusters() + 2 {
        return Err(BuildError::InvalidInput(format!(
            "cluster {} out of range (valid: 0..{})",
            cluster,
            geometry.data_clusters() + 2
        )));
    }

    let offset = geometry.fat_start() + cluster as usize + cluster as usize / 2;
    let word = u16::from_le_bytes([image[offset], image[offset + 1]]);

    let entry = if cluster % 2 == 0 {
        word & FAT12_MASK
    } else {
        (word >> 4) & FAT12_MASK
    };
    Ok(entry)
}
