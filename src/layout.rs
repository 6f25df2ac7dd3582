/// Parse the FAT12 boot record and derive the volume layout
///
/// The first sector of a FAT12 volume holds the BIOS Parameter Block (BPB)
/// followed by the extended boot record.  Everything the reader needs to know
/// about where the allocation tables, the root directory and the data region
/// live is derived from a handful of BPB fields.
///
/// All multi-byte fields are little-endian.
use log::{debug, warn};
use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::IResult;

use std::fmt::{Display, Formatter, Result};

use crate::error::FAT12Error;
use crate::parse::{describe_error, fixed_bytes};
use crate::sanity_check::SanityCheck;

/// Size of the boot sector region read at open time
pub const BOOT_SECTOR_SIZE: usize = 512;

/// Size of one directory slot in bytes
pub const DIRECTORY_ENTRY_SIZE: u32 = 32;

/// FAT12 volumes have fewer than this many clusters
pub const FAT12_MAX_CLUSTERS: u32 = 4085;

/// Bytes in the largest possible FAT12 table: 4086 entries of 12 bits
pub const FAT12_MAX_TABLE_BYTES: u32 = 6129;

/// The signature in the last two bytes of a boot sector
pub const BOOT_SIGNATURE: u16 = 0xAA55;

/// The BIOS Parameter Block starts at offset eleven, after the jump
/// instruction and the OEM name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BIOSParameterBlock {
    /// Number of bytes per logical sector, usually 512
    pub bytes_per_logical_sector: u16,
    /// Logical sectors per cluster, valid values are one and powers of two up to and
    /// including 128
    pub logical_sectors_per_cluster: u8,
    /// Count of reserved logical sectors, the number of logical sectors before the first
    /// FAT in the filesystem
    pub count_of_reserved_logical_sectors: u16,
    /// Number of File Allocation Tables, usually two
    pub number_of_fats: u8,
    /// Maximum number of root directory entries
    pub maximum_number_of_root_directory_entries: u16,
    /// Total logical sectors, zero if the volume uses the 32-bit count
    pub total_logical_sectors: u16,
    /// Media Descriptor
    /// Valid values: 0xE5, 0xED, 0xEE, 0xEF, 0xF0, 0xF4, 0xF5, 0xF8, 0xF9, 0xFA
    ///               0xFB, 0xFC, 0xFD, 0xFE, 0xFF
    pub media_descriptor: u8,
    /// Logical sectors per File Allocation Table
    pub logical_sectors_per_fat: u16,
    /// Physical sectors per track, only meaningful for floppies
    pub sectors_per_track: u16,
    /// Number of heads, only meaningful for floppies
    pub number_of_heads: u16,
    /// Sectors preceding the volume on the medium
    pub hidden_sectors: u32,
    /// Total logical sectors if `total_logical_sectors` is zero
    pub large_sector_count: u32,
}

impl Display for BIOSParameterBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "  bytes per sector:     {}", self.bytes_per_logical_sector)?;
        writeln!(f, "  sectors per cluster:  {}", self.logical_sectors_per_cluster)?;
        writeln!(
            f,
            "  reserved sectors:     {}",
            self.count_of_reserved_logical_sectors
        )?;
        writeln!(f, "  number of FATs:       {}", self.number_of_fats)?;
        writeln!(
            f,
            "  root entries:         {}",
            self.maximum_number_of_root_directory_entries
        )?;
        writeln!(f, "  total sectors:        {}", self.total_logical_sectors)?;
        writeln!(f, "  media descriptor:     0x{:02X}", self.media_descriptor)?;
        writeln!(f, "  sectors per FAT:      {}", self.logical_sectors_per_fat)?;
        writeln!(f, "  sectors per track:    {}", self.sectors_per_track)?;
        writeln!(f, "  heads:                {}", self.number_of_heads)?;
        writeln!(f, "  hidden sectors:       {}", self.hidden_sectors)?;
        writeln!(f, "  large sector count:   {}", self.large_sector_count)
    }
}

/// The extended boot record that follows the BPB on DOS 4.0 and later disks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtendedBootRecord {
    /// BIOS drive number, 0x00 for floppies
    pub drive_number: u8,
    /// Reserved, used by Windows NT for dirty flags
    pub reserved: u8,
    /// Extended boot signature, 0x28 or 0x29
    pub signature: u8,
    /// Volume serial number
    pub volume_id: u32,
    /// Volume label, space padded
    pub volume_label: [u8; 11],
    /// File system type, space padded, informational only
    pub system_identifier: [u8; 8],
}

impl Display for ExtendedBootRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "  drive number:         0x{:02X}", self.drive_number)?;
        writeln!(f, "  extended signature:   0x{:02X}", self.signature)?;
        writeln!(f, "  volume id:            0x{:08X}", self.volume_id)?;
        writeln!(
            f,
            "  volume label:         {}",
            String::from_utf8_lossy(&self.volume_label).trim_end()
        )?;
        writeln!(
            f,
            "  system identifier:    {}",
            String::from_utf8_lossy(&self.system_identifier).trim_end()
        )
    }
}

/// The decoded boot sector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootRecord {
    /// A three-byte jump instruction, 0xEB ?? 0x90 or 0xE9 ?? ??
    pub jump_instruction: [u8; 3],
    /// Eight byte OEM name
    pub oem_name: [u8; 8],
    /// The BIOS Parameter Block
    pub bios_parameter_block: BIOSParameterBlock,
    /// The extended boot record
    pub extended_boot_record: ExtendedBootRecord,
    /// Boot signature, 0xAA55 on IBM PC compatible disks
    pub boot_signature: u16,
}

impl Display for BootRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Boot record:")?;
        writeln!(f, "  jump instruction:     {:02X?}", self.jump_instruction)?;
        writeln!(
            f,
            "  OEM name:             {}",
            String::from_utf8_lossy(&self.oem_name).trim_end()
        )?;
        write!(f, "{}", self.bios_parameter_block)?;
        write!(f, "{}", self.extended_boot_record)?;
        writeln!(f, "  boot signature:       0x{:04X}", self.boot_signature)
    }
}

/// Return true if the value is a valid media descriptor
pub fn verify_media_descriptor(value: &u8) -> bool {
    matches!(
        value,
        0xE5 | 0xED | 0xEE | 0xEF | 0xF0 | 0xF4 | 0xF5 | 0xF8 | 0xF9 | 0xFA | 0xFB | 0xFC | 0xFD
            | 0xFE
            | 0xFF
    )
}

/// Perform sanity checks on the boot record
/// None of these are fatal, the geometry fields are all the reader needs
impl SanityCheck for BootRecord {
    fn check(&self) -> bool {
        let mut passed = true;

        let jump = self.jump_instruction;
        if !((jump[0] == 0xEB && jump[2] == 0x90) || jump[0] == 0xE9) {
            warn!("Unexpected jump instruction: {:02X?}", jump);
            passed = false;
        }
        if !verify_media_descriptor(&self.bios_parameter_block.media_descriptor) {
            warn!(
                "Unknown media descriptor: 0x{:02X}",
                self.bios_parameter_block.media_descriptor
            );
            passed = false;
        }
        if self.boot_signature != BOOT_SIGNATURE {
            warn!("Boot signature should be 0xAA55: 0x{:04X}", self.boot_signature);
            passed = false;
        }
        if !matches!(self.extended_boot_record.signature, 0x28 | 0x29) {
            warn!(
                "Extended boot signature should be 0x28 or 0x29: 0x{:02X}",
                self.extended_boot_record.signature
            );
            passed = false;
        }

        passed
    }
}

/// Parse the BIOS Parameter Block
pub fn bios_parameter_block_parser(i: &[u8]) -> IResult<&[u8], BIOSParameterBlock> {
    let (i, bytes_per_logical_sector) = le_u16(i)?;
    let (i, logical_sectors_per_cluster) = le_u8(i)?;
    let (i, count_of_reserved_logical_sectors) = le_u16(i)?;
    let (i, number_of_fats) = le_u8(i)?;
    let (i, maximum_number_of_root_directory_entries) = le_u16(i)?;
    let (i, total_logical_sectors) = le_u16(i)?;
    let (i, media_descriptor) = le_u8(i)?;
    let (i, logical_sectors_per_fat) = le_u16(i)?;
    let (i, sectors_per_track) = le_u16(i)?;
    let (i, number_of_heads) = le_u16(i)?;
    let (i, hidden_sectors) = le_u32(i)?;
    let (i, large_sector_count) = le_u32(i)?;

    let bios_parameter_block = BIOSParameterBlock {
        bytes_per_logical_sector,
        logical_sectors_per_cluster,
        count_of_reserved_logical_sectors,
        number_of_fats,
        maximum_number_of_root_directory_entries,
        total_logical_sectors,
        media_descriptor,
        logical_sectors_per_fat,
        sectors_per_track,
        number_of_heads,
        hidden_sectors,
        large_sector_count,
    };

    Ok((i, bios_parameter_block))
}

/// Parse the extended boot record fields that follow the BPB
pub fn extended_boot_record_parser(i: &[u8]) -> IResult<&[u8], ExtendedBootRecord> {
    let (i, drive_number) = le_u8(i)?;
    let (i, reserved) = le_u8(i)?;
    let (i, signature) = le_u8(i)?;
    let (i, volume_id) = le_u32(i)?;
    let (i, volume_label) = fixed_bytes::<11>(i)?;
    let (i, system_identifier) = fixed_bytes::<8>(i)?;

    Ok((
        i,
        ExtendedBootRecord {
            drive_number,
            reserved,
            signature,
            volume_id,
            volume_label,
            system_identifier,
        },
    ))
}

/// Parse a whole 512 byte boot sector
pub fn boot_record_parser(i: &[u8]) -> IResult<&[u8], BootRecord> {
    let (i, jump_instruction) = fixed_bytes::<3>(i)?;
    let (i, oem_name) = fixed_bytes::<8>(i)?;
    let (i, bios_parameter_block) = bios_parameter_block_parser(i)?;
    let (i, extended_boot_record) = extended_boot_record_parser(i)?;
    // Boot code isn't interpreted
    let (i, _) = take(448_usize)(i)?;
    let (i, boot_signature) = le_u16(i)?;

    Ok((
        i,
        BootRecord {
            jump_instruction,
            oem_name,
            bios_parameter_block,
            extended_boot_record,
            boot_signature,
        },
    ))
}

/// Volume geometry derived from the boot record
///
/// Sector counts for each section are computed once, when the descriptor is
/// built, and never change afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutDescriptor {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    table_count: u8,
    sectors_per_table: u16,
    root_entry_capacity: u16,
    total_sectors: u32,

    table_sectors: u32,
    root_directory_sectors: u32,
    data_sectors: u32,
}

impl LayoutDescriptor {
    /// Build a layout from raw geometry fields.
    ///
    /// # Errors
    ///
    /// Returns `FAT12Error::MalformedLayout` if the sector or cluster size is
    /// zero, if one table is larger than any FAT12 table can be, or if the
    /// reserved, table and root directory sections don't fit in
    /// `total_sectors`.
    pub fn new(
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        reserved_sectors: u16,
        table_count: u8,
        sectors_per_table: u16,
        root_entry_capacity: u16,
        total_sectors: u32,
    ) -> std::result::Result<Self, FAT12Error> {
        if bytes_per_sector == 0 {
            return Err(FAT12Error::MalformedLayout(String::from(
                "bytes per sector is zero",
            )));
        }
        if sectors_per_cluster == 0 {
            return Err(FAT12Error::MalformedLayout(String::from(
                "sectors per cluster is zero",
            )));
        }

        // One table can't need more sectors than the largest FAT12 table
        let max_sectors_per_table = FAT12_MAX_TABLE_BYTES.div_ceil(u32::from(bytes_per_sector));
        if u32::from(sectors_per_table) > max_sectors_per_table {
            return Err(FAT12Error::MalformedLayout(format!(
                "{} sectors per table exceeds the FAT12 limit of {} sectors of {} bytes",
                sectors_per_table, max_sectors_per_table, bytes_per_sector
            )));
        }

        let table_sectors = u32::from(table_count) * u32::from(sectors_per_table);
        let root_directory_sectors = (u32::from(root_entry_capacity) * DIRECTORY_ENTRY_SIZE)
            .div_ceil(u32::from(bytes_per_sector));
        let system_sectors = u32::from(reserved_sectors) + table_sectors + root_directory_sectors;

        let data_sectors = total_sectors.checked_sub(system_sectors).ok_or_else(|| {
            FAT12Error::MalformedLayout(format!(
                "reserved ({}), table ({}) and root directory ({}) sectors exceed the {} total sectors",
                reserved_sectors, table_sectors, root_directory_sectors, total_sectors
            ))
        })?;

        Ok(LayoutDescriptor {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            table_count,
            sectors_per_table,
            root_entry_capacity,
            total_sectors,
            table_sectors,
            root_directory_sectors,
            data_sectors,
        })
    }

    /// Derive the layout from a parsed boot record.
    /// A zero 16-bit sector count defers to the 32-bit large sector count.
    pub fn from_boot_record(boot_record: &BootRecord) -> std::result::Result<Self, FAT12Error> {
        let bpb = &boot_record.bios_parameter_block;
        let total_sectors = if bpb.total_logical_sectors == 0 {
            bpb.large_sector_count
        } else {
            u32::from(bpb.total_logical_sectors)
        };

        LayoutDescriptor::new(
            bpb.bytes_per_logical_sector,
            bpb.logical_sectors_per_cluster,
            bpb.count_of_reserved_logical_sectors,
            bpb.number_of_fats,
            bpb.logical_sectors_per_fat,
            bpb.maximum_number_of_root_directory_entries,
            total_sectors,
        )
    }

    /// Bytes in one sector
    pub fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector
    }

    /// Sectors in one cluster
    pub fn sectors_per_cluster(&self) -> u8 {
        self.sectors_per_cluster
    }

    /// Number of allocation table copies
    pub fn table_count(&self) -> u8 {
        self.table_count
    }

    /// Sectors in one allocation table copy
    pub fn sectors_per_table(&self) -> u16 {
        self.sectors_per_table
    }

    /// Number of slots in the root directory
    pub fn root_entry_capacity(&self) -> u16 {
        self.root_entry_capacity
    }

    /// Total sectors on the volume
    pub fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    /// Sectors in the reserved section, including the boot sector
    pub fn reserved_sectors(&self) -> u32 {
        u32::from(self.reserved_sectors)
    }

    /// Sectors taken by all allocation table copies
    pub fn table_sectors(&self) -> u32 {
        self.table_sectors
    }

    /// Sectors taken by the root directory
    pub fn root_directory_sectors(&self) -> u32 {
        self.root_directory_sectors
    }

    /// Sectors in the data section
    pub fn data_sectors(&self) -> u32 {
        self.data_sectors
    }

    /// Byte offset of the first allocation table copy
    pub fn table_offset(&self) -> u64 {
        self.sectors_to_bytes(self.reserved_sectors())
    }

    /// Length in bytes of one allocation table copy
    pub fn table_copy_len(&self) -> usize {
        usize::from(self.sectors_per_table) * usize::from(self.bytes_per_sector)
    }

    /// Byte offset of the root directory
    pub fn root_directory_offset(&self) -> u64 {
        self.sectors_to_bytes(self.reserved_sectors() + self.table_sectors)
    }

    /// Byte offset of the data section, where cluster 2 starts
    pub fn data_offset(&self) -> u64 {
        self.sectors_to_bytes(
            self.reserved_sectors() + self.table_sectors + self.root_directory_sectors,
        )
    }

    /// Bytes in one cluster
    pub fn cluster_size(&self) -> u32 {
        u32::from(self.bytes_per_sector) * u32::from(self.sectors_per_cluster)
    }

    /// Number of whole clusters in the data section
    pub fn cluster_count(&self) -> u32 {
        self.data_sectors / u32::from(self.sectors_per_cluster)
    }

    /// Returns true if `cluster` addresses a cluster inside the data section
    pub fn is_data_cluster(&self, cluster: u16) -> bool {
        cluster >= 2 && u32::from(cluster) - 2 < self.cluster_count()
    }

    /// Byte offset of a data cluster
    ///
    /// Cluster numbering starts at 2, the first cluster of the data section.
    pub fn cluster_offset(&self, cluster: u16) -> u64 {
        self.data_offset() + u64::from(cluster.saturating_sub(2)) * u64::from(self.cluster_size())
    }

    fn sectors_to_bytes(&self, sectors: u32) -> u64 {
        u64::from(sectors) * u64::from(self.bytes_per_sector)
    }
}

impl Display for LayoutDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Layout:")?;
        writeln!(
            f,
            "  {:<16}{:>10} sectors  offset 0x{:08X}",
            "reserved",
            self.reserved_sectors(),
            0
        )?;
        writeln!(
            f,
            "  {:<16}{:>10} sectors  offset 0x{:08X}  ({} x {})",
            "tables",
            self.table_sectors,
            self.table_offset(),
            self.table_count,
            self.sectors_per_table
        )?;
        writeln!(
            f,
            "  {:<16}{:>10} sectors  offset 0x{:08X}  ({} entries)",
            "root directory",
            self.root_directory_sectors,
            self.root_directory_offset(),
            self.root_entry_capacity
        )?;
        writeln!(
            f,
            "  {:<16}{:>10} sectors  offset 0x{:08X}  ({} clusters of {} bytes)",
            "data",
            self.data_sectors,
            self.data_offset(),
            self.cluster_count(),
            self.cluster_size()
        )
    }
}

/// A volume with 4085 or more clusters is FAT16 or FAT32, whatever the
/// boot record claims
impl SanityCheck for LayoutDescriptor {
    fn check(&self) -> bool {
        if self.cluster_count() >= FAT12_MAX_CLUSTERS {
            warn!(
                "{} clusters is too many for a FAT12 volume",
                self.cluster_count()
            );
            false
        } else {
            true
        }
    }
}

/// Parse the boot sector and derive the layout of the volume.
///
/// # Errors
///
/// Returns `FAT12Error::MalformedLayout` if the header can't be decoded or
/// describes an impossible geometry.
pub fn parse_layout(
    header: &[u8],
) -> std::result::Result<(BootRecord, LayoutDescriptor), FAT12Error> {
    let (_, boot_record) = boot_record_parser(header).map_err(|e| {
        FAT12Error::MalformedLayout(format!(
            "couldn't parse boot record: {}",
            describe_error(header, e)
        ))
    })?;
    debug!("{}", boot_record);

    let layout = LayoutDescriptor::from_boot_record(&boot_record)?;
    debug!("{}", layout);

    Ok((boot_record, layout))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        bios_parameter_block_parser, boot_record_parser, parse_layout, LayoutDescriptor,
        BOOT_SIGNATURE,
    };
    use crate::error::FAT12Error;
    use crate::sanity_check::SanityCheck;
    use crate::test_image::ImageBuilder;

    /// Test that every geometry field survives a trip through a boot sector
    #[test]
    fn parse_layout_reproduces_geometry() {
        let builder = ImageBuilder::new()
            .bytes_per_sector(512)
            .sectors_per_cluster(4)
            .reserved_sectors(2)
            .fat_count(2)
            .sectors_per_fat(3)
            .root_entries(224)
            .total_sectors(2880);

        let (boot_record, layout) = parse_layout(&builder.boot_sector()).unwrap();

        assert_eq!(layout.bytes_per_sector(), 512);
        assert_eq!(layout.sectors_per_cluster(), 4);
        assert_eq!(layout.reserved_sectors(), 2);
        assert_eq!(layout.table_count(), 2);
        assert_eq!(layout.sectors_per_table(), 3);
        assert_eq!(layout.root_entry_capacity(), 224);
        assert_eq!(layout.total_sectors(), 2880);
        assert_eq!(boot_record.boot_signature, BOOT_SIGNATURE);
        assert!(boot_record.check());
    }

    /// Test that the section offsets chain without gaps or overlaps
    #[test]
    fn section_offsets_are_contiguous() {
        let layout = LayoutDescriptor::new(512, 1, 1, 2, 9, 224, 2880).unwrap();

        assert_eq!(layout.table_sectors(), 18);
        // 224 entries * 32 bytes = 7168 bytes = 14 sectors
        assert_eq!(layout.root_directory_sectors(), 14);
        assert_eq!(layout.data_sectors(), 2880 - 1 - 18 - 14);

        assert_eq!(layout.table_offset(), 512);
        assert_eq!(
            layout.root_directory_offset(),
            layout.table_offset() + 18 * 512
        );
        assert_eq!(layout.data_offset(), layout.root_directory_offset() + 14 * 512);
        assert_eq!(
            layout.data_offset() + u64::from(layout.data_sectors()) * 512,
            u64::from(layout.total_sectors()) * 512
        );
        assert_eq!(layout.cluster_offset(2), layout.data_offset());
        assert_eq!(layout.cluster_offset(3), layout.data_offset() + 512);
        assert!(layout.check());
    }

    #[test]
    fn root_directory_sectors_round_up() {
        // 17 entries need 544 bytes, which is two 512 byte sectors
        let layout = LayoutDescriptor::new(512, 1, 1, 1, 1, 17, 100).unwrap();

        assert_eq!(layout.root_directory_sectors(), 2);
    }

    #[test]
    fn zero_bytes_per_sector_is_malformed() {
        let result = LayoutDescriptor::new(0, 1, 1, 2, 9, 224, 2880);

        assert!(matches!(result, Err(FAT12Error::MalformedLayout(_))));
    }

    #[test]
    fn zero_sectors_per_cluster_is_malformed() {
        let builder = ImageBuilder::new().sectors_per_cluster(0);

        let result = parse_layout(&builder.boot_sector());

        assert!(matches!(result, Err(FAT12Error::MalformedLayout(_))));
    }

    #[test]
    fn negative_data_section_is_malformed() {
        // 1 + 2 * 9 + 14 sectors of metadata on a 20 sector volume
        let result = LayoutDescriptor::new(512, 1, 1, 2, 9, 224, 20);

        match result {
            Err(e @ FAT12Error::MalformedLayout(_)) => assert!(e.is_fatal()),
            other => panic!("Expected a malformed layout, got {:?}", other),
        }
    }

    #[test]
    fn oversized_table_is_malformed() {
        // 6129 bytes fit in 12 sectors of 512 bytes, but not in 11
        assert!(LayoutDescriptor::new(512, 1, 1, 2, 12, 224, 8192).is_ok());
        assert!(matches!(
            LayoutDescriptor::new(512, 1, 1, 2, 13, 224, 8192),
            Err(FAT12Error::MalformedLayout(_))
        ));
    }

    #[test]
    fn oversized_table_with_huge_sector_count_is_malformed() {
        let mut header = ImageBuilder::new()
            .bytes_per_sector(0xFFFF)
            .fat_count(255)
            .sectors_per_fat(0xFFFF)
            .boot_sector();
        // Defer to a 32-bit sector count big enough to hold every table
        header[19] = 0;
        header[20] = 0;
        header[32..36].copy_from_slice(&u32::MAX.to_le_bytes());

        let result = parse_layout(&header);

        match result {
            Err(e @ FAT12Error::MalformedLayout(_)) => assert!(e.is_fatal()),
            other => panic!("Expected a malformed layout, got {:?}", other),
        }
    }

    #[test]
    fn large_sector_count_used_when_short_count_is_zero() {
        let mut header = ImageBuilder::new().boot_sector();
        // total_logical_sectors at offset 19, large_sector_count at offset 32
        header[19] = 0;
        header[20] = 0;
        header[32..36].copy_from_slice(&100_u32.to_le_bytes());

        let (_, layout) = parse_layout(&header).unwrap();

        assert_eq!(layout.total_sectors(), 100);
    }

    #[test]
    fn short_header_is_malformed() {
        let header = ImageBuilder::new().boot_sector();

        let result = parse_layout(&header[..100]);

        assert!(matches!(result, Err(FAT12Error::MalformedLayout(_))));
    }

    #[test]
    fn bios_parameter_block_parser_works() {
        let data: [u8; 25] = [
            0x00, 0x02, 0x01, 0x01, 0x00, 0x02, 0xE0, 0x00, 0x40, 0x0B, 0xF0, 0x09, 0x00, 0x12,
            0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let (rest, bpb) = bios_parameter_block_parser(&data).unwrap();

        assert_eq!(rest.len(), 0);
        assert_eq!(bpb.bytes_per_logical_sector, 512);
        assert_eq!(bpb.logical_sectors_per_cluster, 1);
        assert_eq!(bpb.count_of_reserved_logical_sectors, 1);
        assert_eq!(bpb.number_of_fats, 2);
        assert_eq!(bpb.maximum_number_of_root_directory_entries, 224);
        assert_eq!(bpb.total_logical_sectors, 2880);
        assert_eq!(bpb.media_descriptor, 0xF0);
        assert_eq!(bpb.logical_sectors_per_fat, 9);
        assert_eq!(bpb.sectors_per_track, 18);
        assert_eq!(bpb.number_of_heads, 2);
    }

    #[test]
    fn boot_record_sanity_check_flags_bad_signature() {
        let mut header = ImageBuilder::new().boot_sector();
        header[510] = 0x00;
        header[511] = 0x00;
        header[21] = 0xBB;

        let (_, boot_record) = boot_record_parser(&header).unwrap();

        assert!(!boot_record.check());
    }

    #[test]
    fn too_many_clusters_fails_sanity_check() {
        let layout = LayoutDescriptor::new(512, 1, 1, 2, 12, 224, 8192).unwrap();

        assert!(!layout.check());
    }
}
