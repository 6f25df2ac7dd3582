//! A read session over one FAT12 image
//!
//! The session owns the image, the geometry decoded from its boot sector and
//! the allocation table.  The table is only read from the image the first
//! time a file chain needs it.
use log::{debug, info, warn};

use std::fmt::{Display, Formatter, Result};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::cluster::AllocationTable;
use crate::directory_table::{
    deleted_entry, DirectoryClassifier, DirectorySlot, SlotCounts, SlotKind, StandardEntry,
    SLOT_SIZE,
};
use crate::error::FAT12Error;
use crate::file::{read_chain, ContentReport, ContentStatus};
use crate::layout::{parse_layout, BootRecord, LayoutDescriptor, BOOT_SECTOR_SIZE};
use crate::long_name::AssembledName;
use crate::sanity_check::SanityCheck;
use crate::settings::Settings;
use crate::store::ImageStore;

/// A standard entry found in the root directory
#[derive(Debug)]
pub struct EntryReport {
    /// Slot index in the root directory
    pub index: usize,
    /// The decoded 8.3 entry
    pub entry: StandardEntry,
    /// Long name reassembled from the slots before it
    pub long_name: Option<AssembledName>,
    /// Content of a regular file, `None` for directories and volume labels
    pub content: Option<ContentReport>,
}

impl EntryReport {
    /// The long name if there is one, otherwise the 8.3 name
    pub fn name(&self) -> String {
        match &self.long_name {
            Some(long_name) => long_name.name.clone(),
            None => self.entry.full_filename(),
        }
    }

    /// Returns true if `name` matches the long or the 8.3 name, ignoring case
    pub fn matches(&self, name: &str) -> bool {
        let long = self
            .long_name
            .as_ref()
            .map(|long_name| long_name.name.to_lowercase() == name.to_lowercase())
            .unwrap_or(false);
        long || self.entry.full_filename().eq_ignore_ascii_case(name)
    }
}

impl Display for EntryReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{:>3} {}", self.index, self.entry)?;
        if let Some(long_name) = &self.long_name {
            write!(f, "\n      long name: {}", long_name.name)?;
            for defect in &long_name.defects {
                write!(f, "\n      long name defect: {}", defect)?;
            }
        }
        if let Some(content) = &self.content {
            write!(f, "\n      content: {}", content)?;
        }
        Ok(())
    }
}

/// A deleted entry recovered from an unused slot
#[derive(Debug)]
pub struct DeletedEntry {
    /// Slot index in the root directory
    pub index: usize,
    /// The entry, first character replaced with '_'
    pub entry: StandardEntry,
}

/// Everything found in one pass over the root directory
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Standard entries in slot order
    pub entries: Vec<EntryReport>,
    /// Deleted entries in slot order
    pub deleted: Vec<DeletedEntry>,
    /// Long name fragments that never met their 8.3 entry
    pub orphan_fragments: usize,
    /// Slot totals by kind
    pub counts: SlotCounts,
    /// Root directory slots cut off by the end of the image
    pub missing_slots: usize,
}

impl ScanReport {
    /// Find a regular file by its long or 8.3 name, ignoring case
    pub fn find(&self, name: &str) -> Option<&EntryReport> {
        self.entries
            .iter()
            .find(|report| report.entry.is_regular_file() && report.matches(name))
    }
}

impl Display for ScanReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "entries:")?;
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        if !self.deleted.is_empty() {
            writeln!(f, "deleted entries:")?;
            for deleted in &self.deleted {
                writeln!(f, "{:>3} {}", deleted.index, deleted.entry)?;
            }
        }
        if self.orphan_fragments > 0 {
            writeln!(f, "orphan long name fragments: {}", self.orphan_fragments)?;
        }
        if self.missing_slots > 0 {
            writeln!(
                f,
                "root directory truncated: {} slots past the end of the image",
                self.missing_slots
            )?;
        }
        writeln!(f, "counts: {}", self.counts)
    }
}

/// A read-only session over one image
pub struct Session<R> {
    store: ImageStore<R>,
    boot_record: BootRecord,
    layout: LayoutDescriptor,
    table: Option<AllocationTable>,
    max_chain_length: u32,
}

impl Session<File> {
    /// Open the image at `path` and decode its geometry.
    ///
    /// # Errors
    ///
    /// `FAT12Error::StoreOpenFailure` if the image can't be opened, and
    /// everything `Session::new` returns.
    pub fn open(path: &Path, settings: &Settings) -> std::result::Result<Self, FAT12Error> {
        let store = ImageStore::open(path)?;
        Session::new(store, settings)
    }
}

impl<R: Read + Seek> Session<R> {
    /// Start a session on an already opened reader
    pub fn from_reader(reader: R, settings: &Settings) -> std::result::Result<Self, FAT12Error> {
        Session::new(ImageStore::new(reader), settings)
    }

    /// Decode the boot sector and run the sanity checks on it.
    ///
    /// # Errors
    ///
    /// `FAT12Error::MalformedLayout` if the image is shorter than a boot
    /// sector or the boot sector describes an impossible geometry.
    pub fn new(
        mut store: ImageStore<R>,
        settings: &Settings,
    ) -> std::result::Result<Self, FAT12Error> {
        let header = store.read_at(0, BOOT_SECTOR_SIZE).map_err(|e| match e {
            FAT12Error::TruncatedRead { actual, .. } => FAT12Error::MalformedLayout(format!(
                "image holds {} bytes, a boot sector needs {}",
                actual, BOOT_SECTOR_SIZE
            )),
            e => e,
        })?;

        let (boot_record, layout) = parse_layout(&header)?;
        boot_record.check();
        layout.check();

        let max_chain_length = settings
            .max_chain_length
            .unwrap_or_else(|| layout.cluster_count());
        debug!("Maximum chain length: {}", max_chain_length);

        Ok(Session {
            store,
            boot_record,
            layout,
            table: None,
            max_chain_length,
        })
    }

    /// The decoded boot sector
    pub fn boot_record(&self) -> &BootRecord {
        &self.boot_record
    }

    /// Geometry of the volume
    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// Longest chain followed before a file is given up on
    pub fn max_chain_length(&self) -> u32 {
        self.max_chain_length
    }

    /// The allocation table, read from the image on first use
    pub fn allocation_table(&mut self) -> std::result::Result<&AllocationTable, FAT12Error> {
        let media = self.boot_record.bios_parameter_block.media_descriptor;
        load_table(&mut self.table, &mut self.store, &self.layout, media)
    }

    /// Classify every slot of the root directory and walk the chain of
    /// every regular file.
    ///
    /// The whole root directory is drained, empty slots included, so the
    /// counts cover its full capacity.  If the image ends inside the root
    /// directory, the slots that are fully present are classified and the
    /// rest are reported as `missing_slots`.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation table can't be read, or on any
    /// error fatal to the session.  Problems with a single file only show
    /// up in that file's `ContentReport`.
    pub fn scan_root_directory(&mut self) -> std::result::Result<ScanReport, FAT12Error> {
        let mut classifier = DirectoryClassifier::new();
        let mut report = ScanReport::default();

        let capacity = usize::from(self.layout.root_entry_capacity());
        let root_offset = self.layout.root_directory_offset();
        let root = match self.store.read_at(root_offset, capacity * SLOT_SIZE) {
            Ok(root) => root,
            Err(FAT12Error::TruncatedRead { actual, .. }) => {
                let present = actual / SLOT_SIZE;
                report.missing_slots = capacity - present;
                warn!(
                    "Image ends inside the root directory, {} of {} slots are missing",
                    report.missing_slots, capacity
                );
                self.store.read_at(root_offset, present * SLOT_SIZE)?
            }
            Err(e) => return Err(e),
        };

        for (index, chunk) in root.chunks_exact(SLOT_SIZE).enumerate() {
            let mut raw = [0_u8; SLOT_SIZE];
            raw.copy_from_slice(chunk);

            let classified = match classifier.classify(&raw) {
                Ok(classified) => classified,
                Err(e) => {
                    warn!("Slot {}: {}", index, e);
                    continue;
                }
            };
            debug!("Slot {}: {}", index, classified.kind);

            match classified.slot {
                DirectorySlot::Standard(entry) => {
                    if let Some(long_name) = &classified.long_name {
                        for defect in &long_name.defects {
                            warn!("Slot {} long name {}: {}", index, long_name.name, defect);
                        }
                    }
                    let content = if entry.is_regular_file() {
                        Some(self.content(&entry, None)?)
                    } else {
                        None
                    };
                    report.entries.push(EntryReport {
                        index,
                        entry,
                        long_name: classified.long_name,
                        content,
                    });
                }
                DirectorySlot::Unclassified(raw) if classified.kind == SlotKind::Unused => {
                    if let Some(entry) = deleted_entry(&raw) {
                        report.deleted.push(DeletedEntry { index, entry });
                    }
                }
                _ => {}
            }
        }

        report.orphan_fragments = classifier.finish();
        if report.orphan_fragments > 0 {
            warn!(
                "Discarding {} long name fragments with no entry after them",
                report.orphan_fragments
            );
        }
        report.counts = classifier.counts();
        info!("Root directory slots: {}", report.counts);

        Ok(report)
    }

    /// Read the content of a regular file, cut to its recorded size.
    ///
    /// A truncated file gives back the clusters that could be read.
    ///
    /// # Errors
    ///
    /// Returns the error that made the file unreadable.
    pub fn read_file(
        &mut self,
        entry: &StandardEntry,
    ) -> std::result::Result<Vec<u8>, FAT12Error> {
        let mut data = Vec::new();
        let report = self.content(entry, Some(&mut data))?;

        match report.status {
            ContentStatus::Unreadable(e) => return Err(e),
            ContentStatus::Truncated(_) => warn!(
                "{} is truncated: {}",
                entry.full_filename(),
                report.status
            ),
            ContentStatus::Complete => {}
        }

        let size = usize::try_from(entry.file_size).unwrap_or(usize::MAX);
        data.truncate(size);
        Ok(data)
    }

    /// Scan the root directory and read the regular file called `name`.
    ///
    /// # Errors
    ///
    /// `FAT12Error::FileNotFound` if no regular file in the root directory
    /// has that long or 8.3 name.
    pub fn read_named_file(&mut self, name: &str) -> std::result::Result<Vec<u8>, FAT12Error> {
        let report = self.scan_root_directory()?;
        let entry = match report.find(name) {
            Some(found) => found.entry.clone(),
            None => return Err(FAT12Error::FileNotFound(name.to_string())),
        };
        self.read_file(&entry)
    }

    fn content(
        &mut self,
        entry: &StandardEntry,
        data: Option<&mut Vec<u8>>,
    ) -> std::result::Result<ContentReport, FAT12Error> {
        let media = self.boot_record.bios_parameter_block.media_descriptor;
        let table = load_table(&mut self.table, &mut self.store, &self.layout, media)?;
        read_chain(
            &mut self.store,
            &self.layout,
            table,
            entry,
            self.max_chain_length,
            data,
        )
    }
}

fn load_table<'t, R: Read + Seek>(
    slot: &'t mut Option<AllocationTable>,
    store: &mut ImageStore<R>,
    layout: &LayoutDescriptor,
    media_descriptor: u8,
) -> std::result::Result<&'t AllocationTable, FAT12Error> {
    let table = match slot.take() {
        Some(table) => table,
        None => {
            let table = AllocationTable::load(store, layout, media_descriptor)?;
            table.check();
            table
        }
    };
    Ok(slot.insert(table))
}
