//! VFAT long file name reassembly
//!
//! A long name is stored as a run of continuation entries right before the
//! 8.3 entry it belongs to, highest sequence number first.  Each fragment
//! carries 13 UTF-16 code units.  Fragments are placed by their sequence
//! number, not by the order they're read in.
use log::{debug, warn};

use std::fmt::{Display, Formatter, Result};

use crate::directory_table::ContinuationEntry;

/// UTF-16 code units held by one continuation entry
pub const FRAGMENT_UNITS: usize = 13;

/// Set in the sequence byte of the fragment that ends the name
pub const LAST_FRAGMENT_FLAG: u8 = 0x40;

/// Bits of the sequence byte that hold the sequence number
pub const SEQUENCE_MASK: u8 = 0x3F;

/// Compute the checksum of an 8.3 name that continuation entries carry
///
/// # Examples
///
/// ```
/// use fat12_image_reader::long_name::short_name_checksum;
///
/// assert_eq!(short_name_checksum(b"README  TXT"), 0x73);
/// ```
pub fn short_name_checksum(short_name: &[u8; 11]) -> u8 {
    short_name
        .iter()
        .fold(0_u8, |sum, byte| sum.rotate_right(1).wrapping_add(*byte))
}

/// Something wrong with a reassembled long name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LongNameDefect {
    /// Sequence numbers below the highest one never showed up
    MissingFragments(Vec<u8>),
    /// The last-fragment flag is absent or not on the highest fragment
    MisplacedLastFlag {
        /// Sequence number carrying the flag, if any did
        flagged: Option<u8>,
        /// Highest sequence number seen
        highest: u8,
    },
    /// The same sequence number was seen more than once
    DuplicateFragment(u8),
    /// A fragment checksum doesn't match the short name
    ChecksumMismatch {
        /// Checksum of the short name
        expected: u8,
        /// Checksum stored in the fragment
        found: u8,
    },
}

impl Display for LongNameDefect {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            LongNameDefect::MissingFragments(missing) => {
                write!(f, "missing fragments {:?}", missing)
            }
            LongNameDefect::MisplacedLastFlag {
                flagged: Some(flagged),
                highest,
            } => write!(
                f,
                "last fragment flag on {} but highest fragment is {}",
                flagged, highest
            ),
            LongNameDefect::MisplacedLastFlag {
                flagged: None,
                highest,
            } => write!(f, "no last fragment flag, highest fragment is {}", highest),
            LongNameDefect::DuplicateFragment(sequence) => {
                write!(f, "fragment {} seen more than once", sequence)
            }
            LongNameDefect::ChecksumMismatch { expected, found } => write!(
                f,
                "checksum 0x{:02X} doesn't match short name checksum 0x{:02X}",
                found, expected
            ),
        }
    }
}

/// A long name taken out of the reassembly buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledName {
    /// The decoded name
    pub name: String,
    /// Problems found with the fragment run, empty for a well-formed name
    pub defects: Vec<LongNameDefect>,
}

/// Accumulates continuation fragments until the next standard entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LongNameAssembler {
    units: Vec<u16>,
    // bit n set when sequence number n + 1 has been stored
    present: u64,
    duplicates: Vec<u8>,
    flagged: Vec<u8>,
    checksums: Vec<u8>,
}

impl LongNameAssembler {
    /// An empty buffer
    pub fn new() -> Self {
        LongNameAssembler::default()
    }

    /// Returns true if no fragment is waiting
    pub fn is_empty(&self) -> bool {
        self.present == 0
    }

    /// Number of distinct fragments waiting
    pub fn len(&self) -> usize {
        self.present.count_ones() as usize
    }

    /// Store one fragment at the position its sequence number gives it.
    /// Returns false if the fragment had sequence number zero and was dropped.
    pub fn push(&mut self, entry: &ContinuationEntry) -> bool {
        let sequence = entry.sequence();
        if sequence == 0 {
            warn!("Ignoring long name fragment with sequence number 0");
            return false;
        }

        let bit = 1_u64 << (sequence - 1);
        if self.present & bit != 0 {
            self.duplicates.push(sequence);
        }
        self.present |= bit;
        if entry.is_last() {
            self.flagged.push(sequence);
        }
        self.checksums.push(entry.checksum);

        let start = usize::from(sequence - 1) * FRAGMENT_UNITS;
        if self.units.len() < start + FRAGMENT_UNITS {
            self.units.resize(start + FRAGMENT_UNITS, 0xFFFF);
        }
        self.units[start..start + FRAGMENT_UNITS].copy_from_slice(&entry.name_units);
        debug!("Stored long name fragment {}", sequence);

        true
    }

    /// Take the accumulated name for the standard entry with `short_name`.
    ///
    /// The buffer is empty afterwards, whatever it held.  Returns `None` if
    /// no fragment was waiting or the fragments held only padding.
    pub fn flush(&mut self, short_name: &[u8; 11]) -> Option<AssembledName> {
        let pending = std::mem::take(self);
        if pending.is_empty() {
            return None;
        }

        let defects = pending.defects(short_name);

        // The name ends at the first terminator, wherever it lands
        let end = pending
            .units
            .iter()
            .position(|unit| *unit == 0x0000)
            .unwrap_or(pending.units.len());
        // Gaps left by missing fragments are still padding
        let units: Vec<u16> = pending.units[..end]
            .iter()
            .copied()
            .filter(|unit| *unit != 0xFFFF)
            .collect();
        let name = String::from_utf16_lossy(&units);

        if name.is_empty() {
            debug!("Long name fragments held no characters");
            return None;
        }

        Some(AssembledName { name, defects })
    }

    fn highest(&self) -> u8 {
        (64 - self.present.leading_zeros()) as u8
    }

    fn defects(&self, short_name: &[u8; 11]) -> Vec<LongNameDefect> {
        let mut defects = Vec::new();
        let highest = self.highest();

        let missing: Vec<u8> = (1..highest)
            .filter(|sequence| self.present & (1_u64 << (sequence - 1)) == 0)
            .collect();
        if !missing.is_empty() {
            defects.push(LongNameDefect::MissingFragments(missing));
        }

        if self.flagged.as_slice() != [highest] {
            defects.push(LongNameDefect::MisplacedLastFlag {
                flagged: self.flagged.first().copied(),
                highest,
            });
        }

        for sequence in &self.duplicates {
            defects.push(LongNameDefect::DuplicateFragment(*sequence));
        }

        let expected = short_name_checksum(short_name);
        let mut found: Vec<u8> = self
            .checksums
            .iter()
            .copied()
            .filter(|checksum| *checksum != expected)
            .collect();
        found.dedup();
        for found in found {
            defects.push(LongNameDefect::ChecksumMismatch { expected, found });
        }

        defects
    }
}
