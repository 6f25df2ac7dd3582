use log::{debug, warn};
use nom::bytes::complete::take;
use nom::IResult;

use std::fmt::{Display, Formatter, Result, UpperHex};

use crate::error::FAT12Error;
use crate::layout::LayoutDescriptor;
use crate::sanity_check::SanityCheck;
use crate::store::ImageStore;

/// The meaning of entries in the FAT cluster map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FAT12ClusterEntry {
    /// Indicates a free cluster
    /// Valid values: 0x000
    FreeCluster,

    /// Reserved cluster
    /// Used temporarily by file systems during file allocation
    /// Valid values: 0x001
    Reserved1,

    /// Data Cluster
    /// Valid values: 0x002 - 0xFEF
    DataCluster(u16),

    /// Reserved
    /// Valid values: 0xFF0 - 0xFF5
    Reserved2(u16),

    /// Reserved
    /// Valid values: 0xFF6
    Reserved3,

    /// Bad Sector in Cluster Marker
    /// Valid values: 0xFF7
    BadCluster,

    /// End of Chain Marker
    /// Valid values: 0xFF8 - 0xFFF
    EndOfChainMarker(u16),
}

/// Print FAT12 cluster entries as 12-bit hex values
impl UpperHex for FAT12ClusterEntry {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            FAT12ClusterEntry::FreeCluster => write!(f, "000"),
            FAT12ClusterEntry::Reserved1 => write!(f, "001"),
            FAT12ClusterEntry::DataCluster(value) => write!(f, "{:03X}", value),
            FAT12ClusterEntry::Reserved2(value) => write!(f, "{:03X}", value),
            FAT12ClusterEntry::Reserved3 => write!(f, "FF6"),
            FAT12ClusterEntry::BadCluster => write!(f, "FF7"),
            FAT12ClusterEntry::EndOfChainMarker(value) => write!(f, "{:03X}", value),
        }
    }
}

/// Parse a FAT12 value as a FAT12ClusterEntry
/// Only the low 12 bits of `value` are looked at
pub fn parse_fat12_value(value: u16) -> FAT12ClusterEntry {
    let value = value & 0xFFF;
    match value {
        0x000 => FAT12ClusterEntry::FreeCluster,
        0x001 => FAT12ClusterEntry::Reserved1,
        0x002..=0xFEF => FAT12ClusterEntry::DataCluster(value),
        0xFF0..=0xFF5 => FAT12ClusterEntry::Reserved2(value),
        0xFF6 => FAT12ClusterEntry::Reserved3,
        0xFF7 => FAT12ClusterEntry::BadCluster,
        _ => FAT12ClusterEntry::EndOfChainMarker(value),
    }
}

/// What a table entry says comes after a cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterLink {
    /// The chain continues at this cluster
    Next(u16),
    /// The cluster is the last one of its chain, 0xFF8 - 0xFFF
    EndOfChain,
    /// The cluster is marked bad, 0xFF7
    BadCluster,
}

impl ClusterLink {
    /// Interpret a raw 12-bit table value
    pub fn from_value(value: u16) -> Self {
        match value & 0xFFF {
            0xFF8..=0xFFF => ClusterLink::EndOfChain,
            0xFF7 => ClusterLink::BadCluster,
            next => ClusterLink::Next(next),
        }
    }
}

/// Parse three bytes into two 12-bit values, little-endian format
/// So 0x12 0x34 0x56 -> 0x0412 0x0563
pub fn little_endian_12_bit_parser(i: &[u8]) -> IResult<&[u8], [u16; 2]> {
    let (i, working_data) = take(3_usize)(i)?;

    // Words are 12-bit words
    let first_word: u16 = (((working_data[1] & 0x0F) as u16) << 8) + (working_data[0] as u16);
    let second_word: u16 =
        ((working_data[2] as u16) << 4) + (((working_data[1] & 0xF0) as u16) >> 4);

    Ok((i, [first_word, second_word]))
}

/// Entry counts by kind, over the whole primary table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableSummary {
    /// Free clusters
    pub free: u32,
    /// Clusters linking to another cluster
    pub data: u32,
    /// Reserved values, 0x001 and 0xFF0 - 0xFF6
    pub reserved: u32,
    /// Clusters marked bad
    pub bad: u32,
    /// Clusters ending a chain
    pub end_of_chain: u32,
}

impl Display for TableSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "free: {}, ", self.free)?;
        write!(f, "data: {}, ", self.data)?;
        write!(f, "reserved: {}, ", self.reserved)?;
        write!(f, "bad: {}, ", self.bad)?;
        write!(f, "end_of_chain: {}", self.end_of_chain)
    }
}

/// The File Allocation Table, every copy of it as read from the image
///
/// Lookups only ever use the first copy. The other copies are kept so they
/// can be compared against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationTable {
    bytes: Vec<u8>,
    copy_len: usize,
    copies: usize,
    media_descriptor: Option<u8>,
}

impl AllocationTable {
    /// Wrap raw table bytes holding `copies` copies of `copy_len` bytes each
    pub fn new(bytes: Vec<u8>, copy_len: usize, copies: usize) -> Self {
        AllocationTable {
            bytes,
            copy_len,
            copies,
            media_descriptor: None,
        }
    }

    /// Read every table copy from the table section of the image.
    pub fn load<R: std::io::Read + std::io::Seek>(
        store: &mut ImageStore<R>,
        layout: &LayoutDescriptor,
        media_descriptor: u8,
    ) -> std::result::Result<Self, FAT12Error> {
        let copy_len = layout.table_copy_len();
        let copies = usize::from(layout.table_count());
        debug!(
            "Loading {} allocation table copies of {} bytes at 0x{:X}",
            copies,
            copy_len,
            layout.table_offset()
        );

        let bytes = store.read_at(layout.table_offset(), copy_len * copies)?;

        let mut table = AllocationTable::new(bytes, copy_len, copies);
        table.media_descriptor = Some(media_descriptor);
        Ok(table)
    }

    /// The first table copy, the one lookups use
    pub fn primary(&self) -> &[u8] {
        let len = self.copy_len.min(self.bytes.len());
        &self.bytes[..len]
    }

    /// Decode the raw 12-bit entry of cluster `n`.
    ///
    /// Entries are packed two to three bytes, so the pair holding entry `n`
    /// starts at byte `n * 1.5`. Even entries take the low 12 bits of the
    /// little-endian word at that byte, odd entries the high 12 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use fat12_image_reader::cluster::AllocationTable;
    ///
    /// let table = AllocationTable::new(vec![0x12, 0x34, 0x56, 0x00], 4, 1);
    ///
    /// assert_eq!(table.entry(0).unwrap(), 0x412);
    /// assert_eq!(table.entry(1).unwrap(), 0x563);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `FAT12Error::TableIndexOutOfRange` if the entry lies outside
    /// the primary table copy.
    pub fn entry(&self, n: u16) -> std::result::Result<u16, FAT12Error> {
        let table = self.primary();
        let byte_index = usize::from(n) + usize::from(n) / 2;

        if byte_index + 1 >= table.len() {
            return Err(FAT12Error::TableIndexOutOfRange {
                cluster: n,
                byte_index,
                table_len: table.len(),
            });
        }

        let word = u16::from_le_bytes([table[byte_index], table[byte_index + 1]]);
        if n % 2 == 1 {
            Ok(word >> 4)
        } else {
            Ok(word & 0xFFF)
        }
    }

    /// Find out what follows cluster `n` in its chain
    pub fn next_cluster(&self, n: u16) -> std::result::Result<ClusterLink, FAT12Error> {
        self.entry(n).map(ClusterLink::from_value)
    }

    /// Iterate over every entry of the primary copy, including the two
    /// reserved entries at the start
    pub fn entries(&self) -> impl Iterator<Item = FAT12ClusterEntry> + '_ {
        self.primary()
            .chunks_exact(3)
            .filter_map(|chunk| little_endian_12_bit_parser(chunk).ok())
            .flat_map(|(_, pair)| pair)
            .map(parse_fat12_value)
    }

    /// Count the entries for data clusters by kind
    pub fn summary(&self, cluster_count: u32) -> TableSummary {
        let mut summary = TableSummary::default();
        let clusters = usize::try_from(cluster_count).unwrap_or(usize::MAX);

        for entry in self.entries().skip(2).take(clusters) {
            match entry {
                FAT12ClusterEntry::FreeCluster => summary.free += 1,
                FAT12ClusterEntry::DataCluster(_) => summary.data += 1,
                FAT12ClusterEntry::Reserved1
                | FAT12ClusterEntry::Reserved2(_)
                | FAT12ClusterEntry::Reserved3 => summary.reserved += 1,
                FAT12ClusterEntry::BadCluster => summary.bad += 1,
                FAT12ClusterEntry::EndOfChainMarker(_) => summary.end_of_chain += 1,
            }
        }

        summary
    }

    /// Returns true if every table copy is identical to the first one
    pub fn copies_agree(&self) -> bool {
        let primary = self.primary();
        self.bytes
            .chunks(self.copy_len.max(1))
            .take(self.copies)
            .all(|copy| copy == primary)
    }
}

impl SanityCheck for AllocationTable {
    fn check(&self) -> bool {
        let mut passed = true;

        if !self.copies_agree() {
            warn!("Allocation table copies differ from the first copy");
            passed = false;
        }

        // Entry 0 holds the media descriptor in its low byte
        if let (Some(media), Ok(first)) = (self.media_descriptor, self.entry(0)) {
            if first != 0xF00 | u16::from(media) {
                warn!(
                    "First allocation table entry 0x{:03X} doesn't match media descriptor 0x{:02X}",
                    first, media
                );
                passed = false;
            }
        }

        passed
    }
}
