//! Creation/update bookkeeping for persisted records.
//!
//! Every record carries a [`Timestamps`] pair. Repositories call
//! [`Timestamped::stamp`] on each record right before writing it, so the
//! rules live in one place:
//!
//! - `date_create` is set on the first save and never changed afterwards
//! - `date_update` is refreshed on every save

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last-update instants of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    /// When the record was first saved.
    pub date_create: Option<DateTime<Utc>>,
    /// When the record was last saved.
    pub date_update: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Timestamps of a record loaded from storage.
    #[must_use]
    pub const fn loaded(date_create: DateTime<Utc>, date_update: DateTime<Utc>) -> Self {
        Self {
            date_create: Some(date_create),
            date_update: Some(date_update),
        }
    }

    /// Apply the stamping policy for a save happening at `now`.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        if self.date_create.is_none() {
            self.date_create = Some(now);
        }
        self.date_update = Some(now);
    }

    /// Whether the record has never been saved.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.date_create.is_none()
    }

    /// Creation instant, falling back to `now` for unsaved records.
    #[must_use]
    pub fn created_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.date_create.unwrap_or(now)
    }

    /// Update instant, falling back to `now` for unsaved records.
    #[must_use]
    pub fn updated_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.date_update.unwrap_or(now)
    }
}

/// A record whose timestamps are managed by the persistence layer.
pub trait Timestamped {
    /// Read access to the record's timestamps.
    fn timestamps(&self) -> &Timestamps;

    /// Write access to the record's timestamps.
    fn timestamps_mut(&mut self) -> &mut Timestamps;

    /// Apply the stamping policy to this record.
    fn stamp(&mut self, now: DateTime<Utc>) {
        self.timestamps_mut().stamp(now);
    }

    /// Whether the record has never been saved.
    fn is_new(&self) -> bool {
        self.timestamps().is_new()
    }
}

impl Timestamped for Timestamps {
    fn timestamps(&self) -> &Timestamps {
        self
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        self
    }
}

/// Stamp every record of a collection with the same instant.
pub fn stamp_all<'a, T, I>(records: I, now: DateTime<Utc>)
where
    T: Timestamped + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    for record in records {
        record.stamp(now);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn test_first_stamp_sets_both_dates() {
        let mut ts = Timestamps::default();
        assert!(ts.is_new());

        ts.stamp(at(10));

        assert_eq!(ts.date_create, Some(at(10)));
        assert_eq!(ts.date_update, Some(at(10)));
        assert!(!ts.is_new());
    }

    #[test]
    fn test_second_stamp_keeps_creation_date() {
        let mut ts = Timestamps::default();
        ts.stamp(at(10));
        ts.stamp(at(20));

        assert_eq!(ts.date_create, Some(at(10)));
        assert_eq!(ts.date_update, Some(at(20)));
    }

    #[test]
    fn test_loaded_record_is_not_new() {
        let mut ts = Timestamps::loaded(at(1), at(2));
        assert!(!ts.is_new());

        ts.stamp(at(3));
        assert_eq!(ts.date_create, Some(at(1)));
        assert_eq!(ts.date_update, Some(at(3)));
    }

    #[test]
    fn test_stamp_all() {
        let mut records = vec![Timestamps::default(), Timestamps::loaded(at(1), at(1))];
        stamp_all(records.iter_mut(), at(5));

        assert!(records.iter().all(|r| r.date_update == Some(at(5))));
        assert_eq!(records.first().and_then(|r| r.date_create), Some(at(5)));
        assert_eq!(records.get(1).and_then(|r| r.date_create), Some(at(1)));
    }

    #[test]
    fn test_fallbacks() {
        let ts = Timestamps::default();
        assert_eq!(ts.created_or(at(9)), at(9));
        assert_eq!(ts.updated_or(at(9)), at(9));
    }
}
