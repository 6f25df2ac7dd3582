//! In-memory FAT12 images for tests
use std::io::Cursor;

/// Builds a small FAT12 image byte by byte
#[derive(Clone, Debug)]
pub struct ImageBuilder {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_count: u8,
    sectors_per_fat: u16,
    root_entries: u16,
    total_sectors: u16,
    media_descriptor: u8,
    fat_entries: Vec<(u16, u16)>,
    slots: Vec<(usize, [u8; 32])>,
    clusters: Vec<(u16, Vec<u8>)>,
    image_len: Option<usize>,
}

impl ImageBuilder {
    /// A 64 sector volume: 1 reserved sector, two 1-sector FATs, a 16 entry
    /// root directory and 60 one-sector clusters
    pub fn new() -> Self {
        ImageBuilder {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_count: 2,
            sectors_per_fat: 1,
            root_entries: 16,
            total_sectors: 64,
            media_descriptor: 0xF0,
            fat_entries: Vec::new(),
            slots: Vec::new(),
            clusters: Vec::new(),
            image_len: None,
        }
    }

    pub fn bytes_per_sector(mut self, value: u16) -> Self {
        self.bytes_per_sector = value;
        self
    }

    pub fn sectors_per_cluster(mut self, value: u8) -> Self {
        self.sectors_per_cluster = value;
        self
    }

    pub fn reserved_sectors(mut self, value: u16) -> Self {
        self.reserved_sectors = value;
        self
    }

    pub fn fat_count(mut self, value: u8) -> Self {
        self.fat_count = value;
        self
    }

    pub fn sectors_per_fat(mut self, value: u16) -> Self {
        self.sectors_per_fat = value;
        self
    }

    pub fn root_entries(mut self, value: u16) -> Self {
        self.root_entries = value;
        self
    }

    pub fn total_sectors(mut self, value: u16) -> Self {
        self.total_sectors = value;
        self
    }

    /// Set the allocation table entry of `cluster` in every copy
    pub fn fat_entry(mut self, cluster: u16, value: u16) -> Self {
        self.fat_entries.push((cluster, value));
        self
    }

    /// Link `clusters` into one chain ending with an end-of-chain marker
    pub fn chain(mut self, clusters: &[u16]) -> Self {
        for pair in clusters.windows(2) {
            self.fat_entries.push((pair[0], pair[1]));
        }
        if let Some(last) = clusters.last() {
            self.fat_entries.push((*last, 0xFFF));
        }
        self
    }

    /// Place a raw 32 byte record in root directory slot `index`
    pub fn slot(mut self, index: usize, raw: [u8; 32]) -> Self {
        self.slots.push((index, raw));
        self
    }

    /// Fill the start of a data cluster
    pub fn cluster_data(mut self, cluster: u16, data: &[u8]) -> Self {
        self.clusters.push((cluster, data.to_vec()));
        self
    }

    /// Cut the image off after `len` bytes
    pub fn truncate_to(mut self, len: usize) -> Self {
        self.image_len = Some(len);
        self
    }

    pub fn table_offset(&self) -> usize {
        usize::from(self.reserved_sectors) * usize::from(self.bytes_per_sector)
    }

    pub fn root_offset(&self) -> usize {
        self.table_offset()
            + usize::from(self.fat_count)
                * usize::from(self.sectors_per_fat)
                * usize::from(self.bytes_per_sector)
    }

    pub fn data_offset(&self) -> usize {
        let root_bytes = usize::from(self.root_entries) * 32;
        let bps = usize::from(self.bytes_per_sector);
        self.root_offset() + root_bytes.div_ceil(bps) * bps
    }

    /// The 512 byte boot sector
    pub fn boot_sector(&self) -> Vec<u8> {
        let mut sector = vec![0_u8; 512];
        sector[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        sector[3..11].copy_from_slice(b"MSDOS5.0");
        sector[11..13].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        sector[13] = self.sectors_per_cluster;
        sector[14..16].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        sector[16] = self.fat_count;
        sector[17..19].copy_from_slice(&self.root_entries.to_le_bytes());
        sector[19..21].copy_from_slice(&self.total_sectors.to_le_bytes());
        sector[21] = self.media_descriptor;
        sector[22..24].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        sector[24..26].copy_from_slice(&18_u16.to_le_bytes());
        sector[26..28].copy_from_slice(&2_u16.to_le_bytes());
        sector[38] = 0x29;
        sector[39..43].copy_from_slice(&0x1234_5678_u32.to_le_bytes());
        sector[43..54].copy_from_slice(b"NO NAME    ");
        sector[54..62].copy_from_slice(b"FAT12   ");
        sector[510] = 0x55;
        sector[511] = 0xAA;
        sector
    }

    /// One allocation table copy
    pub fn table(&self) -> Vec<u8> {
        let mut table =
            vec![0_u8; usize::from(self.sectors_per_fat) * usize::from(self.bytes_per_sector)];
        if table.len() >= 3 {
            set_fat12(&mut table, 0, 0xF00 | u16::from(self.media_descriptor));
            set_fat12(&mut table, 1, 0xFFF);
        }
        for (cluster, value) in &self.fat_entries {
            set_fat12(&mut table, *cluster, *value);
        }
        table
    }

    pub fn build(&self) -> Vec<u8> {
        let len = usize::from(self.total_sectors) * usize::from(self.bytes_per_sector);
        let mut image = vec![0_u8; len.max(512)];
        image[0..512].copy_from_slice(&self.boot_sector());

        let table = self.table();
        for copy in 0..usize::from(self.fat_count) {
            let start = self.table_offset() + copy * table.len();
            image[start..start + table.len()].copy_from_slice(&table);
        }

        for (index, raw) in &self.slots {
            let start = self.root_offset() + index * 32;
            image[start..start + 32].copy_from_slice(raw);
        }

        let cluster_size =
            usize::from(self.bytes_per_sector) * usize::from(self.sectors_per_cluster);
        for (cluster, data) in &self.clusters {
            let start = self.data_offset() + usize::from(*cluster - 2) * cluster_size;
            image[start..start + data.len()].copy_from_slice(data);
        }

        if let Some(len) = self.image_len {
            image.truncate(len);
        }
        image
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }
}

/// Store a 12-bit value for cluster `n` in a packed table
pub fn set_fat12(table: &mut [u8], n: u16, value: u16) {
    let index = usize::from(n) + usize::from(n) / 2;
    let value = value & 0xFFF;
    if n % 2 == 0 {
        table[index] = (value & 0xFF) as u8;
        table[index + 1] = (table[index + 1] & 0xF0) | (value >> 8) as u8;
    } else {
        table[index] = (table[index] & 0x0F) | ((value & 0x0F) << 4) as u8;
        table[index + 1] = (value >> 4) as u8;
    }
}

/// A standard 8.3 directory entry
pub fn standard_slot(short_name: &[u8; 11], attributes: u8, cluster: u16, size: u32) -> [u8; 32] {
    let mut slot = [0_u8; 32];
    slot[0..11].copy_from_slice(short_name);
    slot[11] = attributes;
    // 2024-03-15 12:30:10
    slot[14..16].copy_from_slice(&0x63C5_u16.to_le_bytes());
    slot[16..18].copy_from_slice(&0x586F_u16.to_le_bytes());
    slot[18..20].copy_from_slice(&0x586F_u16.to_le_bytes());
    slot[22..24].copy_from_slice(&0x63C5_u16.to_le_bytes());
    slot[24..26].copy_from_slice(&0x586F_u16.to_le_bytes());
    slot[26..28].copy_from_slice(&cluster.to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

/// A long name continuation entry holding up to 13 characters of `text`
///
/// Unused character positions get a 0x0000 terminator followed by 0xFFFF
/// padding, the way DOS and Windows write them.
pub fn continuation_slot(sequence: u8, text: &str, checksum: u8) -> [u8; 32] {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    assert!(units.len() <= 13, "a fragment holds at most 13 characters");
    if units.len() < 13 {
        units.push(0x0000);
    }
    units.resize(13, 0xFFFF);

    let mut slot = [0_u8; 32];
    slot[0] = sequence;
    slot[11] = 0x0F;
    slot[13] = checksum;
    let positions = (1..11)
        .step_by(2)
        .chain((14..26).step_by(2))
        .chain((28..32).step_by(2));
    for (position, unit) in positions.zip(units) {
        slot[position..position + 2].copy_from_slice(&unit.to_le_bytes());
    }
    slot
}
