//! Next-occurrence resolution for yearly reminders.

use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::reminder::{MonthDay, TimeOfDay};

/// The reminder's month-day does not exist in the target year, i.e. Feb 29
/// outside leap years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{month_day} does not exist in {year}")]
pub struct InvalidDate {
	/// The reminder's month and day.
	pub month_day: MonthDay,
	/// The year the occurrence would have fallen into.
	pub year: i32,
}

/// Resolve the next instant a yearly reminder fires, strictly after `now`.
///
/// The candidate is built in `now`'s year at `now`'s offset. If that instant
/// has already passed (a candidate exactly at `now` counts as passed), the
/// occurrence rolls over to the following year.
pub fn next_occurrence(
	date: MonthDay,
	time: TimeOfDay,
	now: OffsetDateTime,
) -> Result<OffsetDateTime, InvalidDate> {
	let candidate = occurrence_in_year(now.year(), date, time, now.offset())?;
	if candidate <= now {
		occurrence_in_year(now.year() + 1, date, time, now.offset())
	} else {
		Ok(candidate)
	}
}

/// Place the month-day and time of day in a concrete year.
fn occurrence_in_year(
	year: i32,
	date: MonthDay,
	time: TimeOfDay,
	offset: UtcOffset,
) -> Result<OffsetDateTime, InvalidDate> {
	let day = Date::from_calendar_date(year, date.month(), date.day())
		.map_err(|_| InvalidDate { month_day: date, year })?;
	Ok(PrimitiveDateTime::new(day, time.as_time()).assume_offset(offset))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn date(s: &str) -> MonthDay {
		s.parse().unwrap()
	}

	fn time(s: &str) -> TimeOfDay {
		s.parse().unwrap()
	}

	#[test]
	fn occurrence_still_ahead_this_year() {
		let now = datetime!(2024-02-01 09:00 +9);
		let at = next_occurrence(date("02-17"), time("10:00"), now).unwrap();
		assert_eq!(at, datetime!(2024-02-17 10:00 +9));
	}

	#[test]
	fn occurrence_already_passed_rolls_to_next_year() {
		let now = datetime!(2024-03-01 09:00 +9);
		let at = next_occurrence(date("02-17"), time("10:00"), now).unwrap();
		assert_eq!(at, datetime!(2025-02-17 10:00 +9));
	}

	#[test]
	fn occurrence_exactly_at_now_counts_as_passed() {
		let now = datetime!(2024-02-17 10:00 +9);
		let at = next_occurrence(date("02-17"), time("10:00"), now).unwrap();
		assert_eq!(at, datetime!(2025-02-17 10:00 +9));
	}

	#[test]
	fn february_29_resolves_in_leap_years_only() {
		let at = next_occurrence(date("02-29"), time("10:00"), datetime!(2024-01-15 09:00 +9));
		assert_eq!(at, Ok(datetime!(2024-02-29 10:00 +9)));

		let err = next_occurrence(date("02-29"), time("10:00"), datetime!(2025-01-15 09:00 +9));
		assert_eq!(err, Err(InvalidDate { month_day: date("02-29"), year: 2025 }));

		// Passed in a leap year, and the following year is not one.
		let err = next_occurrence(date("02-29"), time("10:00"), datetime!(2024-03-01 09:00 +9));
		assert_eq!(err, Err(InvalidDate { month_day: date("02-29"), year: 2025 }));
	}

	#[test]
	fn occurrence_is_always_strictly_in_the_future() {
		let now = datetime!(2024-06-15 12:00 +9);
		for month in 1..=12 {
			let date = MonthDay::new(month, 15).unwrap();
			let at = next_occurrence(date, time("08:30"), now).unwrap();
			assert!(at > now);
			assert!(at.year() == now.year() || at.year() == now.year() + 1);
		}
	}
}
