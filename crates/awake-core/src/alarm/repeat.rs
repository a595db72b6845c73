//! Recurrence of an alarm.
//!
//! On the wire a recurrence is an optional `days` array of weekday indices
//! (0 = Sunday .. 6 = Saturday). An absent, `null` or empty array means the
//! alarm rings once and then disables itself.

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Set of weekdays stored as a 7-bit mask, bit 0 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: Self = Self(0);
    pub const EVERY_DAY: Self = Self(0b0111_1111);

    /// Build from day indices, 0 = Sunday.
    pub fn from_indices<I>(indices: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut mask = 0u8;
        for index in indices {
            if index > 6 {
                return Err(ValidationError::OutOfRange {
                    field: "days",
                    value: index as u32,
                    min: 0,
                    max: 6,
                });
            }
            mask |= 1 << index;
        }
        Ok(Self(mask))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Day indices in ascending order, 0 = Sunday.
    pub fn indices(self) -> Vec<u8> {
        (0..7).filter(|i| self.0 & (1 << i) != 0).collect()
    }

    /// Short English names in Sunday-first order, e.g. `["Mon", "Wed"]`.
    pub fn short_names(self) -> Vec<&'static str> {
        const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        self.indices().into_iter().map(|i| NAMES[i as usize]).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

/// Whether an alarm rings once or on a fixed set of weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    #[default]
    OneTime,
    Weekly(WeekdaySet),
}

impl Repeat {
    /// Collapses an empty set to `OneTime` so there is a single encoding of
    /// "does not repeat".
    pub fn weekly(days: WeekdaySet) -> Self {
        if days.is_empty() {
            Repeat::OneTime
        } else {
            Repeat::Weekly(days)
        }
    }

    pub fn from_indices<I>(indices: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = u8>,
    {
        WeekdaySet::from_indices(indices).map(Self::weekly)
    }

    pub fn is_one_time(&self) -> bool {
        matches!(self, Repeat::OneTime)
    }

    pub fn days(&self) -> WeekdaySet {
        match self {
            Repeat::OneTime => WeekdaySet::EMPTY,
            Repeat::Weekly(days) => *days,
        }
    }
}

/// serde adapter for the `days` field.
pub(crate) mod days_field {
    use super::*;

    pub fn serialize<S: Serializer>(repeat: &Repeat, serializer: S) -> Result<S::Ok, S::Error> {
        repeat.days().indices().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Repeat, D::Error> {
        let days: Option<Vec<u8>> = Option::deserialize(deserializer)?;
        Repeat::from_indices(days.unwrap_or_default()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_collapses_to_one_time() {
        assert_eq!(Repeat::weekly(WeekdaySet::EMPTY), Repeat::OneTime);
        assert_eq!(Repeat::from_indices(Vec::<u8>::new()).unwrap(), Repeat::OneTime);
    }

    #[test]
    fn indices_are_sunday_based() {
        let set = WeekdaySet::from_indices([0, 1, 6]).unwrap();
        assert!(set.contains(Weekday::Sun));
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Sat));
        assert!(!set.contains(Weekday::Wed));
        assert_eq!(set.indices(), vec![0, 1, 6]);
        assert_eq!(set.short_names(), vec!["Sun", "Mon", "Sat"]);
    }

    #[test]
    fn rejects_day_index_seven() {
        let err = WeekdaySet::from_indices([7]).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "days", .. }));
    }

    #[test]
    fn collects_from_weekdays() {
        let set: WeekdaySet = [Weekday::Tue, Weekday::Thu].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.indices(), vec![2, 4]);
    }
}
