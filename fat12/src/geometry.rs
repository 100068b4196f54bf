// Disk geometry for the FAT12 image
// Every region offset is derived from these values; the boot sector's own
// BPB carries the same numbers, so both sides must agree out-of-band.

use floppygen_core::BuildError;

use crate::directory::DIR_ENTRY_SIZE;

// Standard 1.44MB floppy profile
pub const FLOPPY_SECTOR_SIZE: u32 = 512;
pub const FLOPPY_SECTORS_PER_CLUSTER: u8 = 1;
pub const FLOPPY_RESERVED_SECTORS: u32 = 1024; // boot sector + kernel area
pub const FLOPPY_FAT_COUNT: u8 = 2;
pub const FLOPPY_SECTORS_PER_FAT: u32 = 9;
pub const FLOPPY_ROOT_ENTRIES: u16 = 224;
pub const FLOPPY_TOTAL_SECTORS: u32 = 2880;
pub const MEDIA_REMOVABLE: u8 = 0xF0;

// FAT12 holds at most 4084 clusters; anything more is FAT16 territory
pub const FAT12_MAX_CLUSTERS: u32 = 4084;

/// Immutable disk layout. Constructed once and threaded through every
/// writer, so the encoder cannot disagree with itself about offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub sector_size: u32,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u32,
    pub fat_count: u8,
    pub sectors_per_fat: u32,
    pub root_entries: u16,
    pub total_sectors: u32,
    pub media_descriptor: u8,
}

impl Geometry {
    /// The profile used by the standard 1.44MB bootable floppy build.
    pub fn floppy_1440() -> Self {
        Geometry {
            sector_size: FLOPPY_SECTOR_SIZE,
            sectors_per_cluster: FLOPPY_SECTORS_PER_CLUSTER,
            reserved_sectors: FLOPPY_RESERVED_SECTORS,
            fat_count: FLOPPY_FAT_COUNT,
            sectors_per_fat: FLOPPY_SECTORS_PER_FAT,
            root_entries: FLOPPY_ROOT_ENTRIES,
            total_sectors: FLOPPY_TOTAL_SECTORS,
            media_descriptor: MEDIA_REMOVABLE,
        }
    }

    /// Bytes per allocation unit.
    pub fn cluster_size(&self) -> usize {
        self.sector_size as usize * self.sectors_per_cluster as usize
    }

    /// Total image size in bytes.
    pub fn image_size(&self) -> usize {
        self.total_sectors as usize * self.sector_size as usize
    }

    /// Byte offset of FAT copy 1.
    pub fn fat_start(&self) -> usize {
        self.reserved_sectors as usize * self.sector_size as usize
    }

    /// Size of a single FAT copy in bytes.
    pub fn fat_size(&self) -> usize {
        self.sectors_per_fat as usize * self.sector_size as usize
    }

    /// Byte offset of the root directory region.
    pub fn root_dir_start(&self) -> usize {
        self.fat_start() + self.fat_count as usize * self.fat_size()
    }

    /// Root directory sectors, rounded up to a whole sector.
    pub fn root_dir_sectors(&self) -> u32 {
        let bytes = self.root_entries as u32 * DIR_ENTRY_SIZE as u32;
        (bytes + self.sector_size - 1) / self.sector_size
    }

    /// Size of the root directory region in bytes (sector-rounded).
    pub fn root_dir_size(&self) -> usize {
        self.root_dir_sectors() as usize * self.sector_size as usize
    }

    /// Byte offset of the data region (cluster 2).
    pub fn data_start(&self) -> usize {
        self.root_dir_start() + self.root_dir_size()
    }

    /// Number of addressable data clusters. Cluster numbering starts at 2,
    /// so valid cluster numbers are `2..2 + data_clusters()`.
    ///
    /// Only meaningful for a geometry that passed `validate()`: the
    /// validator checks the untruncated count, so this cast cannot wrap
    /// for any accepted layout.
    pub fn data_clusters(&self) -> u16 {
        self.raw_data_clusters() as u16
    }

    fn raw_data_clusters(&self) -> usize {
        (self.image_size() - self.data_start()) / self.cluster_size()
    }

    /// Bytes available for the kernel in the reserved area (sector 1 on).
    pub fn kernel_capacity(&self) -> usize {
        (self.reserved_sectors as usize - 1) * self.sector_size as usize
    }

    /// Check that the derived regions are consistent and within FAT12
    /// limits. Run once before any byte is written.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.sector_size == 0
            || self.sectors_per_cluster == 0
            || self.fat_count == 0
            || self.total_sectors == 0
        {
            return Err(BuildError::InvalidGeometry(
                "sector size, sectors per cluster, FAT count and total sectors must be nonzero"
                    .to_string(),
            ));
        }

        if self.reserved_sectors < 1 {
            return Err(BuildError::InvalidGeometry(
                "at least one reserved sector is required for the boot sector".to_string(),
            ));
        }

        // Regions must appear in order and fit inside the image
        let fat_end = self.fat_start() + self.fat_count as usize * self.fat_size();
        if fat_end > self.root_dir_start() || self.root_dir_start() > self.data_start() {
            return Err(BuildError::InvalidGeometry(format!(
                "overlapping regions: FAT ends at {}, root directory at {}, data at {}",
                fat_end,
                self.root_dir_start(),
                self.data_start()
            )));
        }
        if self.data_start() > self.image_size() {
            return Err(BuildError::InvalidGeometry(format!(
                "data region starts at {} but the image is only {} bytes",
                self.data_start(),
                self.image_size()
            )));
        }

        // Checked untruncated: the u16 accessor would wrap a count past
        // 65535 back into the accepted range.
        let clusters = self.raw_data_clusters();
        if clusters > FAT12_MAX_CLUSTERS as usize {
            return Err(BuildError::InvalidGeometry(format!(
                "{} clusters exceeds the FAT12 maximum of {}",
                clusters, FAT12_MAX_CLUSTERS
            )));
        }

        // Each pair of 12-bit entries occupies three bytes; the table must
        // cover every data cluster plus the two reserved header entries.
        let fat_bytes_needed = ((clusters + 2) * 3 + 1) / 2;
        if fat_bytes_needed > self.fat_size() {
            return Err(BuildError::InvalidGeometry(format!(
                "FAT copy of {} bytes cannot hold {} entries ({} bytes needed)",
                self.fat_size(),
                clusters + 2,
                fat_bytes_needed
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floppy_1440_layout() {
        let geo = Geometry::floppy_1440();
        assert!(geo.validate().is_ok());
        assert_eq!(geo.image_size(), 1_474_560);
        assert_eq!(geo.cluster_size(), 512);
        assert_eq!(geo.fat_start(), 1024 * 512);
        assert_eq!(geo.fat_size(), 9 * 512);
        assert_eq!(geo.root_dir_start(), geo.fat_start() + 2 * 9 * 512);
        assert_eq!(geo.root_dir_size(), 224 * 32);
        assert_eq!(geo.data_start(), geo.root_dir_start() + 224 * 32);
        assert_eq!(geo.kernel_capacity(), 1023 * 512);
    }

    #[test]
    fn regions_cover_whole_image() {
        let geo = Geometry::floppy_1440();
        let data_bytes = geo.data_clusters() as usize * geo.cluster_size();
        // Data clusters fill the remainder exactly (1.44MB divides evenly)
        assert_eq!(geo.data_start() + data_bytes, geo.image_size());
    }

    #[test]
    fn rejects_undersized_fat() {
        let geo = Geometry {
            sectors_per_fat: 1,
            ..Geometry::floppy_1440()
        };
        assert!(matches!(
            geo.validate(),
            Err(floppygen_core::BuildError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn rejects_zero_sector_size() {
        let geo = Geometry {
            sector_size: 0,
            ..Geometry::floppy_1440()
        };
        assert!(geo.validate().is_err());
    }

    #[test]
    fn rejects_cluster_count_that_wraps_u16() {
        // 65,700 real data clusters: the u16 accessor alone would report
        // 164 and sneak past the FAT12 limit
        let geo = Geometry {
            reserved_sectors: 1,
            sectors_per_fat: 200,
            total_sectors: 66_115,
            ..Geometry::floppy_1440()
        };
        assert_eq!(geo.data_clusters(), 164);
        assert!(matches!(
            geo.validate(),
            Err(floppygen_core::BuildError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn rejects_fat16_sized_volume() {
        // Shrink the reserved area and the cluster count blows past FAT12
        let geo = Geometry {
            reserved_sectors: 1,
            total_sectors: 16_384,
            sectors_per_fat: 16,
            ..Geometry::floppy_1440()
        };
        assert!(matches!(
            geo.validate(),
            Err(floppygen_core::BuildError::InvalidGeometry(_))
        ));
    }
}
