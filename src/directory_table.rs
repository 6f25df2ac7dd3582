//! Parse the 32-byte slots of a FAT directory table
//!
//! Every slot is one of four kinds.  The classification only looks at the
//! first byte and the attribute byte, so the decoders below never have to
//! guess what a slot is.
use log::debug;
use nom::multi::count;
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::IResult;
use time::{Date, Month, Time};

use std::fmt::{Display, Formatter, Result};

use crate::error::FAT12Error;
use crate::long_name::{AssembledName, LongNameAssembler, LAST_FRAGMENT_FLAG, SEQUENCE_MASK};
use crate::parse::{describe_error, fixed_bytes};

/// Size of one directory slot in bytes
pub const SLOT_SIZE: usize = 32;

/// First byte of a slot that has never been used
pub const SLOT_EMPTY: u8 = 0x00;

/// First byte of a slot whose entry was deleted
pub const SLOT_UNUSED: u8 = 0xE5;

/// Read-only attribute bit
pub const ATTR_READ_ONLY: u8 = 0x01;
/// Hidden attribute bit
pub const ATTR_HIDDEN: u8 = 0x02;
/// System attribute bit
pub const ATTR_SYSTEM: u8 = 0x04;
/// Volume label attribute bit
pub const ATTR_VOLUME_ID: u8 = 0x08;
/// Subdirectory attribute bit
pub const ATTR_DIRECTORY: u8 = 0x10;
/// Archive attribute bit
pub const ATTR_ARCHIVE: u8 = 0x20;

/// Attribute value marking a long name continuation entry
pub const ATTR_LONG_NAME: u8 = 0x0F;

/// The kind of a directory slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// Never used, first byte 0x00
    Empty,
    /// Deleted entry, first byte 0xE5
    Unused,
    /// Long name fragment, attribute byte 0x0F
    Continuation,
    /// A regular 8.3 entry
    Standard,
}

impl Display for SlotKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            SlotKind::Empty => write!(f, "empty"),
            SlotKind::Unused => write!(f, "unused"),
            SlotKind::Continuation => write!(f, "continuation"),
            SlotKind::Standard => write!(f, "standard"),
        }
    }
}

/// Classify a slot from its raw bytes.
///
/// The checks go in a fixed order: a zero first byte wins over everything,
/// then the deleted marker, then the long name attribute.
///
/// # Examples
///
/// ```
/// use fat12_image_reader::directory_table::{classify_slot, SlotKind};
///
/// let mut raw = [0_u8; 32];
/// assert_eq!(classify_slot(&raw), SlotKind::Empty);
///
/// raw[0] = b'A';
/// raw[11] = 0x0F;
/// assert_eq!(classify_slot(&raw), SlotKind::Continuation);
///
/// raw[0] = 0xE5;
/// assert_eq!(classify_slot(&raw), SlotKind::Unused);
/// ```
pub fn classify_slot(raw: &[u8; SLOT_SIZE]) -> SlotKind {
    match (raw[0], raw[11]) {
        (SLOT_EMPTY, _) => SlotKind::Empty,
        (SLOT_UNUSED, _) => SlotKind::Unused,
        (_, ATTR_LONG_NAME) => SlotKind::Continuation,
        _ => SlotKind::Standard,
    }
}

/// Running totals of slots by kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCounts {
    /// Empty slots
    pub empty: u32,
    /// Deleted slots
    pub unused: u32,
    /// Long name continuation slots
    pub continuation: u32,
    /// Standard 8.3 slots
    pub standard: u32,
}

impl SlotCounts {
    /// Number of slots classified so far
    pub fn total(&self) -> u32 {
        self.empty + self.unused + self.continuation + self.standard
    }

    fn record(&mut self, kind: SlotKind) {
        match kind {
            SlotKind::Empty => self.empty += 1,
            SlotKind::Unused => self.unused += 1,
            SlotKind::Continuation => self.continuation += 1,
            SlotKind::Standard => self.standard += 1,
        }
    }
}

impl Display for SlotCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "empty: {}, ", self.empty)?;
        write!(f, "unused: {}, ", self.unused)?;
        write!(f, "continuation: {}, ", self.continuation)?;
        write!(f, "standard: {}, ", self.standard)?;
        write!(f, "total: {}", self.total())
    }
}

/// A StandardEntry is a single 8.3 directory entry, for example a
/// file, a subdirectory or the volume label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardEntry {
    /// offset 0
    /// Raw 8.3 name, space padded, exactly as stored
    pub short_name: [u8; 11],
    /// Filename without the padding
    pub filename: String,
    /// Extension without the padding
    pub file_extension: String,
    /// offset 11
    pub file_attributes: u8,
    /// offset 12
    /// Reserved, Windows NT keeps case flags here
    pub user_attributes: u8,
    /// offset 13
    /// Creation time in 10ms units
    pub create_time_fine: u8,
    /// offset 14
    pub create_time: Option<Time>,
    /// offset 16
    pub create_date: Option<Date>,
    /// offset 18
    pub last_access_date: Option<Date>,
    /// offset 20
    /// High word of the first cluster on FAT32, zero on FAT12
    pub extended_attributes: u16,
    /// offset 22
    pub last_modified_time: Option<Time>,
    /// offset 24
    pub last_modified_date: Option<Date>,
    /// offset 26
    /// First cluster of the file, zero for an empty file
    pub start_of_file: u16,
    /// offset 28
    /// File size in bytes
    /// Entries with Volume Label or Subdirectory flag should be zero
    pub file_size: u32,
}

impl StandardEntry {
    /// Filename and extension joined with a dot, "README.TXT"
    pub fn full_filename(&self) -> String {
        if self.file_extension.is_empty() {
            self.filename.clone()
        } else {
            format!("{}.{}", self.filename, self.file_extension)
        }
    }

    /// Returns true if the entry is a subdirectory
    pub fn is_directory(&self) -> bool {
        self.file_attributes & ATTR_DIRECTORY != 0
    }

    /// Returns true if the entry is the volume label
    pub fn is_volume_label(&self) -> bool {
        self.file_attributes & ATTR_VOLUME_ID != 0
    }

    /// Returns true if the entry names a regular file with data clusters
    pub fn is_regular_file(&self) -> bool {
        self.file_attributes & (ATTR_DIRECTORY | ATTR_VOLUME_ID) == 0
    }

    /// Attributes as letters, "RHSVDA" with '-' for bits that aren't set
    pub fn attribute_flags(&self) -> String {
        [
            (ATTR_READ_ONLY, 'R'),
            (ATTR_HIDDEN, 'H'),
            (ATTR_SYSTEM, 'S'),
            (ATTR_VOLUME_ID, 'V'),
            (ATTR_DIRECTORY, 'D'),
            (ATTR_ARCHIVE, 'A'),
        ]
        .iter()
        .map(|(bit, letter)| {
            if self.file_attributes & bit != 0 {
                *letter
            } else {
                '-'
            }
        })
        .collect()
    }
}

/// Display an attribute that may be a reserved option.
/// In this case, draw a time that may be reserved.
pub fn reserved_time_display(option: Option<Time>) -> String {
    match option {
        Some(s) => format!("{}", s),
        None => "reserved".to_string(),
    }
}

/// Display an attribute that may be a reserved option.
/// In this case, draw a date that may be reserved.
pub fn reserved_date_display(option: Option<Date>) -> String {
    match option {
        Some(s) => format!("{}", s),
        None => "reserved".to_string(),
    }
}

/// A formatter for displaying FAT directory entries
impl Display for StandardEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{:<13}", self.full_filename())?;
        write!(f, "{} ", self.attribute_flags())?;
        write!(f, "{:>10} ", self.file_size)?;
        write!(f, "start_of_file: 0x{:<4X}, ", self.start_of_file)?;
        write!(f, "{} ", reserved_date_display(self.last_modified_date))?;
        write!(f, "{}", reserved_time_display(self.last_modified_time))
    }
}

/// A long name continuation entry, one fragment of a VFAT name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuationEntry {
    /// offset 0
    /// Sequence number in the low bits, 0x40 on the last fragment
    pub sequence_byte: u8,
    /// offsets 1, 14 and 28
    /// The 13 UTF-16 code units of this fragment, in name order
    pub name_units: [u16; 13],
    /// offset 11
    /// Always 0x0F
    pub file_attributes: u8,
    /// offset 12
    pub entry_type: u8,
    /// offset 13
    /// Checksum of the 8.3 name the fragment belongs to
    pub checksum: u8,
    /// offset 26
    /// Always zero
    pub start_of_file: u16,
}

impl ContinuationEntry {
    /// The sequence number, counting from 1
    pub fn sequence(&self) -> u8 {
        self.sequence_byte & SEQUENCE_MASK
    }

    /// Returns true if this is the fragment that ends the name
    pub fn is_last(&self) -> bool {
        self.sequence_byte & LAST_FRAGMENT_FLAG != 0
    }
}

/// Parse a FAT directory entry
///
/// # Examples
///
/// ```
/// use fat12_image_reader::directory_table::standard_entry_parser;
///
/// let mut raw = [0_u8; 32];
/// raw[..11].copy_from_slice(b"HELLO   CO ");
///
/// let (rest, entry) = standard_entry_parser(&raw).unwrap();
///
/// assert!(rest.is_empty());
/// assert_eq!(entry.full_filename(), "HELLO.CO");
/// ```
pub fn standard_entry_parser(i: &[u8]) -> IResult<&[u8], StandardEntry> {
    let (i, short_name) = fixed_bytes::<11>(i)?;

    // Names are in an OEM code page, anything outside ASCII is replaced
    let filename = String::from_utf8_lossy(&short_name[..8])
        .trim_end_matches(' ')
        .to_string();
    let file_extension = String::from_utf8_lossy(&short_name[8..])
        .trim_end_matches(' ')
        .to_string();
    debug!("Read filename: {}", filename);

    let (i, file_attributes) = le_u8(i)?;
    let (i, user_attributes) = le_u8(i)?;
    let (i, create_time_fine) = le_u8(i)?;
    let (i, create_time) = le_u16(i)?;
    let create_time = parse_dos_time(create_time);
    let (i, create_date) = le_u16(i)?;
    let create_date = parse_dos_date(create_date);
    let (i, last_access_date) = le_u16(i)?;
    let last_access_date = parse_dos_date(last_access_date);
    let (i, extended_attributes) = le_u16(i)?;
    let (i, last_modified_time) = le_u16(i)?;
    let last_modified_time = parse_dos_time(last_modified_time);
    let (i, last_modified_date) = le_u16(i)?;
    let last_modified_date = parse_dos_date(last_modified_date);
    let (i, start_of_file) = le_u16(i)?;
    let (i, file_size) = le_u32(i)?;

    Ok((
        i,
        StandardEntry {
            short_name,
            filename,
            file_extension,
            file_attributes,
            user_attributes,
            create_time_fine,
            create_time,
            create_date,
            last_access_date,
            extended_attributes,
            last_modified_time,
            last_modified_date,
            start_of_file,
            file_size,
        },
    ))
}

/// Parse a long name continuation entry
///
/// The name units are split over three runs: 5 at offset 1, 6 at offset 14
/// and 2 at offset 28.
pub fn continuation_entry_parser(i: &[u8]) -> IResult<&[u8], ContinuationEntry> {
    let (i, sequence_byte) = le_u8(i)?;
    let (i, first_units) = count(le_u16, 5)(i)?;
    let (i, file_attributes) = le_u8(i)?;
    let (i, entry_type) = le_u8(i)?;
    let (i, checksum) = le_u8(i)?;
    let (i, middle_units) = count(le_u16, 6)(i)?;
    let (i, start_of_file) = le_u16(i)?;
    let (i, last_units) = count(le_u16, 2)(i)?;

    let mut name_units = [0_u16; 13];
    for (slot, unit) in name_units
        .iter_mut()
        .zip(first_units.into_iter().chain(middle_units).chain(last_units))
    {
        *slot = unit;
    }

    Ok((
        i,
        ContinuationEntry {
            sequence_byte,
            name_units,
            file_attributes,
            entry_type,
            checksum,
            start_of_file,
        },
    ))
}

/// A decoded directory slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectorySlot {
    /// Empty and deleted slots are kept as raw bytes
    Unclassified([u8; SLOT_SIZE]),
    /// An 8.3 entry
    Standard(StandardEntry),
    /// A long name fragment
    Continuation(ContinuationEntry),
}

impl DirectorySlot {
    /// Decode a slot according to its kind
    pub fn decode(kind: SlotKind, raw: &[u8; SLOT_SIZE]) -> std::result::Result<Self, FAT12Error> {
        let malformed = |e| FAT12Error::MalformedRecord(describe_error(raw, e));
        match kind {
            SlotKind::Empty | SlotKind::Unused => Ok(DirectorySlot::Unclassified(*raw)),
            SlotKind::Standard => standard_entry_parser(raw)
                .map(|(_, entry)| DirectorySlot::Standard(entry))
                .map_err(malformed),
            SlotKind::Continuation => continuation_entry_parser(raw)
                .map(|(_, entry)| DirectorySlot::Continuation(entry))
                .map_err(malformed),
        }
    }
}

/// Decode what's left of a deleted 8.3 entry.
///
/// The first character of a deleted name is lost, it's shown as '_'.
/// Returns `None` for anything that isn't a deleted 8.3 entry.
pub fn deleted_entry(raw: &[u8; SLOT_SIZE]) -> Option<StandardEntry> {
    if raw[0] != SLOT_UNUSED || raw[11] == ATTR_LONG_NAME {
        return None;
    }

    let mut recovered = *raw;
    recovered[0] = b'_';
    let (_, entry) = standard_entry_parser(&recovered).ok()?;
    Some(entry)
}

/// The result of classifying one slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedSlot {
    /// What kind of slot it is
    pub kind: SlotKind,
    /// The decoded slot
    pub slot: DirectorySlot,
    /// The long name of a standard entry, if fragments preceded it
    pub long_name: Option<AssembledName>,
}

/// Classifies slots in order, keeping counts and reassembling long names
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryClassifier {
    counts: SlotCounts,
    long_name: LongNameAssembler,
}

impl DirectoryClassifier {
    /// A classifier with zero counts and no pending fragments
    pub fn new() -> Self {
        DirectoryClassifier::default()
    }

    /// Classify the next slot.
    ///
    /// The slot is counted before it's decoded, so a slot that fails to
    /// decode still shows up in the counts.
    ///
    /// # Errors
    ///
    /// Returns `FAT12Error::MalformedRecord` if the slot can't be decoded.
    pub fn classify(
        &mut self,
        raw: &[u8; SLOT_SIZE],
    ) -> std::result::Result<ClassifiedSlot, FAT12Error> {
        let kind = classify_slot(raw);
        self.counts.record(kind);

        let slot = DirectorySlot::decode(kind, raw)?;
        let long_name = match &slot {
            DirectorySlot::Continuation(fragment) => {
                self.long_name.push(fragment);
                None
            }
            DirectorySlot::Standard(entry) => self.long_name.flush(&entry.short_name),
            DirectorySlot::Unclassified(_) => None,
        };

        Ok(ClassifiedSlot {
            kind,
            slot,
            long_name,
        })
    }

    /// Counts of the slots classified so far
    pub fn counts(&self) -> SlotCounts {
        self.counts
    }

    /// Returns true if long name fragments are waiting for their entry
    pub fn has_pending_long_name(&self) -> bool {
        !self.long_name.is_empty()
    }

    /// End of the directory.  Drops fragments that never met an 8.3 entry
    /// and returns how many there were.
    pub fn finish(&mut self) -> usize {
        let orphans = self.long_name.len();
        self.long_name = LongNameAssembler::new();
        orphans
    }
}

/// Parse a FAT DOS time
/// Return None if the time is invalid
///
/// From FAT: General Overview of On-Disk Format \
/// MS-DOS epoch is 01/01/1980 \
/// Bits 0-4: 2-second count, valid value range 0-29 inclusive (0 - 58 seconds). \
/// Bits 5-10: Minutes, valid value range 0-59 inclusive. \
/// Bits 11-15: Hours, valid value range 0-23 inclusive. \
///
/// # Examples
///
/// ```
/// use fat12_image_reader::directory_table::parse_dos_time;
///
/// let time = parse_dos_time(0xbf7d);
///
/// assert!(time.is_some());
/// assert_eq!(time.unwrap().hour(), 23);
/// assert_eq!(time.unwrap().minute(), 59);
/// assert_eq!(time.unwrap().second(), 58);
/// ```
pub fn parse_dos_time(dos_time: u16) -> Option<Time> {
    let hours = ((dos_time >> 11) as u8) & 0x1F;
    if hours > 23 {
        return None;
    }
    let minutes = ((dos_time >> 5) as u8) & 0x3F;
    if minutes > 59 {
        return None;
    }
    let seconds = (dos_time & 0x1F) as u8;
    if seconds > 29 {
        return None;
    }

    Time::from_hms(hours, minutes, seconds * 2).ok()
}

/// Parse a FAT DOS date
/// If a date is invalid, a value of None is returned.
/// A value of zero is taken to mean the field was never written.
///
/// From FAT: General Overview of On-Disk Format \
/// Bits 0-4: Day of month, valid value range 1-31 inclusive. \
/// Bits 5-8: Month of year, 1 = January, valid value range 1-12 inclusive. \
/// Bits 9-15: Count of years from 1980, valid value range 0-127 inclusive (1980-2107). \
///
/// # Examples
///
/// ```
/// use fat12_image_reader::directory_table::parse_dos_date;
/// use time::Month;
///
/// let date = parse_dos_date(0xff9f);
///
/// assert!(date.is_some());
/// assert_eq!(date.unwrap().year(), 2107);
/// assert_eq!(date.unwrap().month(), Month::December);
/// assert_eq!(date.unwrap().day(), 31);
///
/// ```
pub fn parse_dos_date(dos_date: u16) -> Option<Date> {
    if dos_date == 0 {
        return None;
    }

    let year = i32::from((dos_date >> 9) & 0x7F) + 1980;

    let month = Month::try_from(((dos_date >> 5) & 0x0F) as u8).ok()?;

    let day = (dos_date & 0x1F) as u8;
    if day < 1 {
        return None;
    }

    // Rejects days past the end of the month, February 30th and so on
    Date::from_calendar_date(year, month, day).ok()
}
