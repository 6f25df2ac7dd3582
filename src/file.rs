//! File content helpers
//!
//! These combine a directory entry with the allocation table to find the
//! clusters that hold a file, and optionally read them.
use log::{debug, warn};

use std::fmt::{Display, Formatter, Result};
use std::io::{Read, Seek};

use crate::cluster::AllocationTable;
use crate::cluster_chain::{ChainEnd, ClusterChain};
use crate::directory_table::StandardEntry;
use crate::error::FAT12Error;
use crate::layout::LayoutDescriptor;
use crate::store::ImageStore;

/// Why a file's content stops early
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncationCause {
    /// The chain ran into a cluster marked bad
    BadCluster(u16),
    /// The chain ended before covering the file size
    ShortChain,
}

/// What became of a file's content
#[derive(Debug)]
pub enum ContentStatus {
    /// Every cluster the file size needs was found and read
    Complete,
    /// Some clusters were read but the chain stopped early
    Truncated(TruncationCause),
    /// The chain or the cluster data couldn't be read
    Unreadable(FAT12Error),
}

impl Display for ContentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ContentStatus::Complete => write!(f, "complete"),
            ContentStatus::Truncated(TruncationCause::BadCluster(cluster)) => {
                write!(f, "truncated: bad cluster after 0x{:03X}", cluster)
            }
            ContentStatus::Truncated(TruncationCause::ShortChain) => {
                write!(f, "truncated: chain shorter than file size")
            }
            ContentStatus::Unreadable(e) => write!(f, "unreadable: {}", e),
        }
    }
}

/// The clusters found for one file and what became of them
#[derive(Debug)]
pub struct ContentReport {
    /// Clusters in chain order, every one of them was read
    pub clusters: Vec<u16>,
    /// Clusters the recorded file size needs
    pub clusters_needed: u32,
    /// How the walk ended
    pub status: ContentStatus,
}

impl ContentReport {
    /// Returns true if the content is complete
    pub fn is_complete(&self) -> bool {
        matches!(self.status, ContentStatus::Complete)
    }
}

impl Display for ContentReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}, {} cluster", self.status, self.clusters.len())?;
        if self.clusters.len() != 1 {
            write!(f, "s")?;
        }
        if self.clusters.len() as u64 > u64::from(self.clusters_needed) {
            write!(
                f,
                " ({} slack)",
                self.clusters.len() as u64 - u64::from(self.clusters_needed)
            )?;
        }
        if !self.clusters.is_empty() {
            write!(f, " {:X?}", self.clusters)?;
        }
        Ok(())
    }
}

/// Number of clusters needed to hold `file_size` bytes
///
/// # Examples
///
/// ```
/// use fat12_image_reader::file::clusters_needed;
///
/// assert_eq!(clusters_needed(0, 512), 0);
/// assert_eq!(clusters_needed(512, 512), 1);
/// assert_eq!(clusters_needed(513, 512), 2);
/// ```
pub fn clusters_needed(file_size: u32, cluster_size: u32) -> u32 {
    if cluster_size == 0 {
        return 0;
    }
    file_size.div_ceil(cluster_size)
}

/// Walk the chain of a file and read every cluster on it.
///
/// Cluster data is appended to `data` when it's given, otherwise it's read
/// and thrown away to make sure it's there.  The whole chain is walked, even
/// past the clusters the file size needs.
///
/// Errors scoped to this one file end up in the returned
/// `ContentStatus::Unreadable`.
///
/// # Errors
///
/// Only errors that are fatal to the session are returned, see
/// `FAT12Error::is_fatal`.
pub fn read_chain<R: Read + Seek>(
    store: &mut ImageStore<R>,
    layout: &LayoutDescriptor,
    table: &AllocationTable,
    entry: &StandardEntry,
    max_chain_length: u32,
    mut data: Option<&mut Vec<u8>>,
) -> std::result::Result<ContentReport, FAT12Error> {
    let needed = clusters_needed(entry.file_size, layout.cluster_size());
    let mut report = ContentReport {
        clusters: Vec::new(),
        clusters_needed: needed,
        status: ContentStatus::Complete,
    };

    if entry.start_of_file == 0 {
        if entry.file_size != 0 {
            report.status = ContentStatus::Unreadable(FAT12Error::InvalidCluster {
                cluster: 0,
                cluster_count: layout.cluster_count(),
            });
        }
        return Ok(report);
    }

    let cluster_size = layout.cluster_size() as usize;
    let mut chain = ClusterChain::new(table, layout, entry.start_of_file, max_chain_length);

    for location in chain.by_ref() {
        let read = location.and_then(|location| {
            store
                .read_at(location.offset, cluster_size)
                .map(|bytes| (location, bytes))
        });
        let bytes = match read {
            Ok((location, bytes)) => {
                report.clusters.push(location.cluster);
                bytes
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}: {}", entry.full_filename(), e);
                report.status = ContentStatus::Unreadable(e);
                return Ok(report);
            }
        };
        if let Some(data) = data.as_mut() {
            data.extend_from_slice(&bytes);
        }
    }

    match chain.end() {
        Some(ChainEnd::BadCluster(cluster)) => {
            warn!(
                "{}: bad cluster after 0x{:03X}",
                entry.full_filename(),
                cluster
            );
            report.status = ContentStatus::Truncated(TruncationCause::BadCluster(cluster));
        }
        Some(ChainEnd::EndOfChain) if (report.clusters.len() as u64) < u64::from(needed) => {
            warn!(
                "{}: chain has {} clusters, file size needs {}",
                entry.full_filename(),
                report.clusters.len(),
                needed
            );
            report.status = ContentStatus::Truncated(TruncationCause::ShortChain);
        }
        _ => {
            debug!(
                "{}: {} clusters read",
                entry.full_filename(),
                report.clusters.len()
            );
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{read_chain, ContentStatus, TruncationCause};
    use crate::cluster::AllocationTable;
    use crate::directory_table::{standard_entry_parser, StandardEntry};
    use crate::error::FAT12Error;
    use crate::layout::parse_layout;
    use crate::store::ImageStore;
    use crate::test_image::{standard_slot, ImageBuilder};

    fn file_entry(cluster: u16, size: u32) -> StandardEntry {
        let raw = standard_slot(b"TEST       ", 0x20, cluster, size);
        standard_entry_parser(&raw).unwrap().1
    }

    /// Read a file out of an image built by `builder`
    fn read(builder: &ImageBuilder, entry: &StandardEntry) -> (super::ContentReport, Vec<u8>) {
        let mut store = ImageStore::new(builder.cursor());
        let (boot_record, layout) = parse_layout(&store.read_at(0, 512).unwrap()).unwrap();
        let table = AllocationTable::load(
            &mut store,
            &layout,
            boot_record.bios_parameter_block.media_descriptor,
        )
        .unwrap();
        let mut data = Vec::new();
        let report = read_chain(&mut store, &layout, &table, entry, 60, Some(&mut data)).unwrap();
        (report, data)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    /// Test that getting data from a cluster-size file works.
    #[test]
    fn one_cluster_file() {
        let contents = pattern(512);
        let builder = ImageBuilder::new().chain(&[2]).cluster_data(2, &contents);

        let (report, data) = read(&builder, &file_entry(2, 512));

        assert!(report.is_complete());
        assert_eq!(report.clusters, vec![2]);
        assert_eq!(data, contents);
    }

    /// Clusters are read in chain order, not in cluster number order
    #[test]
    fn three_cluster_file_out_of_order() {
        let contents = pattern(1400);
        let builder = ImageBuilder::new()
            .chain(&[7, 3, 5])
            .cluster_data(7, &contents[..512])
            .cluster_data(3, &contents[512..1024])
            .cluster_data(5, &contents[1024..]);

        let (report, data) = read(&builder, &file_entry(7, 1400));

        assert!(report.is_complete());
        assert_eq!(report.clusters, vec![7, 3, 5]);
        assert_eq!(report.clusters_needed, 3);
        assert_eq!(&data[..1400], &contents[..]);
        assert_eq!(data.len(), 1536);
    }

    #[test]
    fn empty_file_has_no_chain() {
        let builder = ImageBuilder::new();

        let (report, data) = read(&builder, &file_entry(0, 0));

        assert!(report.is_complete());
        assert!(report.clusters.is_empty());
        assert!(data.is_empty());
    }

    #[test]
    fn sized_file_without_start_cluster_is_unreadable() {
        let builder = ImageBuilder::new();

        let (report, _) = read(&builder, &file_entry(0, 100));

        assert!(matches!(
            report.status,
            ContentStatus::Unreadable(FAT12Error::InvalidCluster { cluster: 0, .. })
        ));
    }

    #[test]
    fn bad_cluster_truncates() {
        let builder = ImageBuilder::new().fat_entry(2, 3).fat_entry(3, 0xFF7);

        let (report, data) = read(&builder, &file_entry(2, 1500));

        assert_eq!(report.clusters, vec![2, 3]);
        assert!(matches!(
            report.status,
            ContentStatus::Truncated(TruncationCause::BadCluster(3))
        ));
        assert_eq!(data.len(), 1024);
    }

    #[test]
    fn short_chain_truncates() {
        let builder = ImageBuilder::new().chain(&[2]);

        let (report, _) = read(&builder, &file_entry(2, 1024));

        assert!(matches!(
            report.status,
            ContentStatus::Truncated(TruncationCause::ShortChain)
        ));
    }

    /// Extra clusters past the file size are still complete
    #[test]
    fn slack_clusters_are_listed() {
        let builder = ImageBuilder::new().chain(&[2, 3]);

        let (report, _) = read(&builder, &file_entry(2, 10));

        assert!(report.is_complete());
        assert_eq!(report.clusters, vec![2, 3]);
        assert_eq!(report.clusters_needed, 1);
        assert!(format!("{}", report).contains("1 slack"));
    }

    /// A cluster past the end of a cut-off image is a per-file problem
    #[test]
    fn truncated_image_is_unreadable() {
        let builder = ImageBuilder::new().chain(&[2, 3]);
        let cut = builder.data_offset() + 512 + 100;
        let builder = builder.truncate_to(cut);

        let (report, _) = read(&builder, &file_entry(2, 1024));

        assert_eq!(report.clusters, vec![2]);
        assert!(matches!(
            report.status,
            ContentStatus::Unreadable(FAT12Error::TruncatedRead { .. })
        ));
    }
}
