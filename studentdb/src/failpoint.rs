//! Failure injection for testing durability
//!
//! A [`Registry`](crate::Registry) can arm one named point inside its
//! persistence path. When the write reaches that point it fails with an
//! injected I/O error instead of continuing. Whatever recovery the registry
//! runs for a real I/O error at that point runs for the injected one too.
//!
//! Points are armed per registry handle, never process-wide, so tests that
//! run in parallel do not interfere with each other.

use std::fmt;
use std::io;

/// Named locations in the append/resync path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The record line is on disk, the counter has not been rewritten.
    /// Nothing is rolled back, as if the process had died here.
    AfterRecordAppend,
    /// The replacement file is written but not yet renamed into place.
    /// Append treats this like a failed rename and removes its record line.
    BeforeCounterPersist,
}

impl FailPoint {
    pub fn name(&self) -> &'static str {
        match self {
            FailPoint::AfterRecordAppend => "after_record_append",
            FailPoint::BeforeCounterPersist => "before_counter_persist",
        }
    }
}

impl fmt::Display for FailPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fail with an injected error if `armed` is `point`. No-op otherwise.
#[inline]
pub(crate) fn check(armed: Option<FailPoint>, point: FailPoint) -> io::Result<()> {
    if armed == Some(point) {
        log::warn!("Injected failure at {point}");
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("injected failure at {point}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disarmed_is_noop() {
        assert!(check(None, FailPoint::AfterRecordAppend).is_ok());
    }

    #[test]
    fn test_other_point_is_noop() {
        assert!(check(
            Some(FailPoint::BeforeCounterPersist),
            FailPoint::AfterRecordAppend
        )
        .is_ok());
    }

    #[test]
    fn test_armed_point_fails() {
        let err = check(
            Some(FailPoint::AfterRecordAppend),
            FailPoint::AfterRecordAppend,
        )
        .unwrap_err();
        assert!(err.to_string().contains("after_record_append"));
    }
}
