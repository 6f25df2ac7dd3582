/// Non-fatal consistency checks on decoded image structures
///
/// A forensic reader keeps going on images that a driver would refuse, so
/// these checks only log what looks wrong.
pub trait SanityCheck {
    /// Log every anomaly found in the structure
    /// Returns true if nothing looked wrong
    fn check(&self) -> bool;
}
