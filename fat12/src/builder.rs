// Image builder
// Owns the whole disk image in memory and drives the region writers:
// payload embedding, FAT chains, root directory and file data. Nothing
// touches persistent storage until save(), so a failed build never leaves
// a partial image behind.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use floppygen_core::BuildError;
use log::{debug, info, warn};

use crate::directory::{self, attributes::ATTR_ARCHIVE};
use crate::fat::{self, FAT12_EOC};
use crate::geometry::Geometry;

type BuildResult<T> = Result<T, BuildError>;

/// In-memory FAT12 disk image under construction.
///
/// Files are allocated contiguously: a monotonic cursor starts at cluster
/// 2 and advances by the number of clusters each file consumes. There is
/// no free-list and no reuse, which keeps every chain a straight run of
/// ascending cluster numbers.
pub struct ImageBuilder {
    geometry: Geometry,
    data: Vec<u8>,
    next_cluster: u16,
}

impl ImageBuilder {
    /// Allocate the zeroed image buffer and initialize the FAT headers.
    pub fn new(geometry: Geometry) -> BuildResult<Self> {
        geometry.validate()?;

        let mut data = vec![0u8; geometry.image_size()];
        fat::init_fat12_tables(&mut data, &geometry);

        info!(
            "image: {} sectors of {} bytes, {} data clusters from offset {}",
            geometry.total_sectors,
            geometry.sector_size,
            geometry.data_clusters(),
            geometry.data_start()
        );

        Ok(ImageBuilder {
            geometry,
            data,
            next_cluster: 2,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Copy the boot sector binary to offset 0. An oversized boot sector
    /// is tolerated with a warning: the bytes past the first sector land
    /// in the kernel area and will be overwritten by a later
    /// `write_kernel` call.
    pub fn write_boot_sector(&mut self, bytes: &[u8]) {
        let sector_size = self.geometry.sector_size as usize;
        if bytes.len() > sector_size {
            warn!(
                "boot sector is {} bytes but the boot region is {} bytes; \
                 the overflow spills into the kernel area",
                bytes.len(),
                sector_size
            );
        }

        let len = bytes.len().min(self.data.len());
        self.data[..len].copy_from_slice(&bytes[..len]);
        info!("boot sector: {} bytes", bytes.len());
    }

    /// Copy the kernel binary into the reserved area starting at sector 1.
    pub fn write_kernel(&mut self, bytes: &[u8]) -> BuildResult<()> {
        let sector_size = self.geometry.sector_size as usize;
        let sectors = (bytes.len() + sector_size - 1) / sector_size;
        let capacity_sectors = self.geometry.reserved_sectors as usize - 1;

        if sectors > capacity_sectors {
            return Err(BuildError::Capacity(format!(
                "kernel needs {} sectors but the reserved area holds {}",
                sectors, capacity_sectors
            )));
        }

        self.data[sector_size..sector_size + bytes.len()].copy_from_slice(bytes);
        info!("kernel: {} bytes ({} sectors)", bytes.len(), sectors);
        Ok(())
    }

    /// Add a file to the root directory and write its content as a
    /// contiguous cluster chain. Returns the starting cluster.
    ///
    /// An empty file still takes one cluster so its directory entry has a
    /// chain to point at.
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> BuildResult<u16> {
        let cluster_size = self.geometry.cluster_size();
        let needed = ((content.len() + cluster_size - 1) / cluster_size).max(1);

        let used = (self.next_cluster - 2) as usize;
        let free = self.geometry.data_clusters() as usize - used;
        if needed > free {
            return Err(BuildError::Capacity(format!(
                "file '{}' needs {} clusters but only {} of {} are free",
                name,
                needed,
                free,
                self.geometry.data_clusters()
            )));
        }

        // Claim the directory slot before touching the FAT or data region,
        // so a full directory leaves the image unchanged.
        let slot = directory::find_free_entry(&self.data, &self.geometry)?;

        let start_cluster = self.next_cluster;
        let clusters = needed as u16;

        for i in 0..clusters {
            let cluster = start_cluster + i;

            let begin = i as usize * cluster_size;
            if begin < content.len() {
                let end = (begin + cluster_size).min(content.len());
                let offset =
                    self.geometry.data_start() + (cluster as usize - 2) * cluster_size;
                self.data[offset..offset + (end - begin)]
                    .copy_from_slice(&content[begin..end]);
                // A short final chunk keeps its zero padding from the
                // pre-zeroed buffer
            }

            let next = if i + 1 == clusters { FAT12_EOC } else { cluster + 1 };
            fat::set_fat12_entry(&mut self.data, &self.geometry, cluster, next)?;
        }

        let name_83 = directory::format_83_name(name);
        directory::write_dir_entry(
            &mut self.data,
            &self.geometry,
            slot,
            &name_83,
            ATTR_ARCHIVE,
            start_cluster,
            content.len() as u32,
        )?;

        self.next_cluster += clusters;
        debug!(
            "added '{}': {} bytes, clusters {}..={}, slot {}",
            name,
            content.len(),
            start_cluster,
            start_cluster + clusters - 1,
            slot
        );
        Ok(start_cluster)
    }

    /// Read back a FAT entry. Exposed for verification.
    pub fn fat_entry(&self, cluster: u16) -> BuildResult<u16> {
        fat::get_fat12_entry(&self.data, &self.geometry, cluster)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Write the finished image to `path` in one shot.
    pub fn save(&self, path: &Path) -> BuildResult<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.data)?;
        file.sync_all()?;
        info!("wrote {} ({} bytes)", path.display(), self.data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat::FAT12_FREE;
    use floppygen_core::BuildError;

    fn builder() -> ImageBuilder {
        ImageBuilder::new(Geometry::floppy_1440()).unwrap()
    }

    #[test]
    fn exact_multiple_of_cluster_size_chains_cleanly() {
        let mut b = builder();
        let content = vec![0xAA; 3 * 512];
        let start = b.add_file("data.bin", &content).unwrap();

        assert_eq!(start, 2);
        assert_eq!(b.fat_entry(2).unwrap(), 3);
        assert_eq!(b.fat_entry(3).unwrap(), 4);
        assert_eq!(b.fat_entry(4).unwrap(), FAT12_EOC);
        assert_eq!(b.fat_entry(5).unwrap(), FAT12_FREE);
    }

    #[test]
    fn short_tail_is_zero_padded() {
        let mut b = builder();
        let content: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        let start = b.add_file("readme.txt", &content).unwrap();

        assert_eq!(start, 2);
        assert_eq!(b.fat_entry(2).unwrap(), 3);
        assert_eq!(b.fat_entry(3).unwrap(), FAT12_EOC);

        let geo = b.geometry().clone();
        let data = b.as_bytes();
        let base = geo.data_start();
        assert_eq!(&data[base..base + 512], &content[..512]);
        assert_eq!(&data[base + 512..base + 700], &content[512..]);
        assert!(data[base + 700..base + 1024].iter().all(|&b| b == 0));
    }

    #[test]
    fn files_are_allocated_back_to_back() {
        let mut b = builder();
        assert_eq!(b.add_file("a.bin", &[1u8; 512]).unwrap(), 2);
        assert_eq!(b.add_file("b.bin", &[2u8; 1024]).unwrap(), 3);
        assert_eq!(b.add_file("c.bin", &[3u8; 1]).unwrap(), 5);
    }

    #[test]
    fn empty_file_takes_one_cluster() {
        let mut b = builder();
        let start = b.add_file("empty.txt", &[]).unwrap();
        assert_eq!(start, 2);
        assert_eq!(b.fat_entry(2).unwrap(), FAT12_EOC);
        assert_eq!(b.add_file("next.txt", &[0u8; 10]).unwrap(), 3);
    }

    #[test]
    fn data_region_capacity_is_enforced() {
        let mut b = builder();
        let clusters = b.geometry().data_clusters() as usize;
        let too_big = vec![0u8; (clusters + 1) * 512];
        assert!(matches!(
            b.add_file("huge.bin", &too_big),
            Err(BuildError::Capacity(_))
        ));
        // Nothing was allocated
        assert_eq!(b.fat_entry(2).unwrap(), FAT12_FREE);

        let exact = vec![0u8; clusters * 512];
        assert!(b.add_file("exact.bin", &exact).is_ok());
        assert!(matches!(
            b.add_file("one_more.txt", &[0u8; 1]),
            Err(BuildError::Capacity(_))
        ));
    }

    #[test]
    fn kernel_capacity_is_enforced() {
        let mut b = builder();
        let capacity = b.geometry().kernel_capacity();
        assert!(b.write_kernel(&vec![0x90u8; capacity]).is_ok());
        assert!(matches!(
            b.write_kernel(&vec![0x90u8; capacity + 1]),
            Err(BuildError::Capacity(_))
        ));
    }

    #[test]
    fn oversized_boot_sector_spills_but_succeeds() {
        let mut b = builder();
        let boot = vec![0xEBu8; 600];
        b.write_boot_sector(&boot);
        assert_eq!(&b.as_bytes()[..600], &boot[..]);
    }

    #[test]
    fn directory_full_after_root_entries_files() {
        let mut b = builder();
        let entries = b.geometry().root_entries;
        for i in 0..entries {
            b.add_file(&format!("f{}.bin", i), &[0u8; 1]).unwrap();
        }
        assert!(matches!(
            b.add_file("straw.txt", &[0u8; 1]),
            Err(BuildError::DirectoryFull)
        ));
    }
}
