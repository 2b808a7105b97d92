//! Reminder data model.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Month, Time};

/// Opaque, stable identifier of a user at the chat platform.
#[derive(
	Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
	/// Wrap a platform user identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The raw identifier.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Opaque identifier of the channel a reminder is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
	/// Wrap a platform channel identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The raw identifier.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Errors for user-supplied date/time values. Raised at the command boundary,
/// so invalid values are never stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	/// The date string is not of the form `MM-DD`.
	#[error("`{0}` is not a valid date, expected e.g. `02-17`")]
	DateFormat(String),
	/// The month number is outside 1-12.
	#[error("`{0}` is not a valid month")]
	Month(u8),
	/// The day does not exist in the given month.
	#[error("day `{day}` does not exist in month `{month}`")]
	Day {
		/// Month number.
		month: u8,
		/// Day of month.
		day: u8,
	},
	/// The time string is not of the form `HH:MM`.
	#[error("`{0}` is not a valid time, expected e.g. `10:00`")]
	TimeFormat(String),
	/// The hour is outside 0-23.
	#[error("hour must be between 0 and 23, got `{0}`")]
	Hour(u8),
	/// The minute is outside 0-59.
	#[error("minute must be between 0 and 59, got `{0}`")]
	Minute(u8),
}

/// A yearly calendar date: month and day without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
	/// Calendar month.
	month: Month,
	/// Day of month.
	day: u8,
}

impl MonthDay {
	/// Validate month and day numbers. The day is checked against a leap
	/// year, so Feb 29 is accepted; non-leap target years are handled at
	/// schedule time.
	pub fn new(month: u8, day: u8) -> Result<Self, ValidationError> {
		let month = Month::try_from(month).map_err(|_| ValidationError::Month(month))?;
		Date::from_calendar_date(2000, month, day)
			.map_err(|_| ValidationError::Day { month: u8::from(month), day })?;
		Ok(Self { month, day })
	}

	/// Calendar month.
	pub fn month(&self) -> Month {
		self.month
	}

	/// Day of month.
	pub fn day(&self) -> u8 {
		self.day
	}
}

impl FromStr for MonthDay {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (month, day) =
			s.split_once('-').ok_or_else(|| ValidationError::DateFormat(s.to_owned()))?;
		let month = month.parse().map_err(|_| ValidationError::DateFormat(s.to_owned()))?;
		let day = day.parse().map_err(|_| ValidationError::DateFormat(s.to_owned()))?;
		Self::new(month, day)
	}
}

impl fmt::Display for MonthDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}-{:02}", u8::from(self.month), self.day)
	}
}

impl TryFrom<String> for MonthDay {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<MonthDay> for String {
	fn from(value: MonthDay) -> Self {
		value.to_string()
	}
}

/// A wall-clock time of day with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(Time);

impl TimeOfDay {
	/// Validate hour and minute numbers.
	pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
		let time = Time::from_hms(hour, minute, 0).map_err(|err| match err.name() {
			"minute" => ValidationError::Minute(minute),
			_ => ValidationError::Hour(hour),
		})?;
		Ok(Self(time))
	}

	/// The contained wall-clock time.
	pub fn as_time(&self) -> Time {
		self.0
	}
}

impl FromStr for TimeOfDay {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (hour, minute) =
			s.split_once(':').ok_or_else(|| ValidationError::TimeFormat(s.to_owned()))?;
		let hour = hour.parse().map_err(|_| ValidationError::TimeFormat(s.to_owned()))?;
		let minute = minute.parse().map_err(|_| ValidationError::TimeFormat(s.to_owned()))?;
		Self::new(hour, minute)
	}
}

impl fmt::Display for TimeOfDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
	}
}

impl TryFrom<String> for TimeOfDay {
	type Error = ValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<TimeOfDay> for String {
	fn from(value: TimeOfDay) -> Self {
		value.to_string()
	}
}

/// One user's reminder registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEntry {
	/// Date the reminder fires on, every year.
	pub date: MonthDay,
	/// Time of day the reminder fires at.
	pub time: TimeOfDay,
	/// Message text. `{user}` is replaced with a mention of the user at
	/// delivery time.
	pub message: String,
	/// Channel the message is delivered to, captured at registration.
	pub channel: ChannelId,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn month_day_parsing() {
		let date: MonthDay = "02-17".parse().unwrap();
		assert_eq!(date.month(), Month::February);
		assert_eq!(date.day(), 17);
		assert_eq!(date.to_string(), "02-17");

		// Unpadded values are accepted.
		let date: MonthDay = "2-7".parse().unwrap();
		assert_eq!(date.to_string(), "02-07");

		assert_eq!("13-01".parse::<MonthDay>(), Err(ValidationError::Month(13)));
		assert_eq!("02-30".parse::<MonthDay>(), Err(ValidationError::Day { month: 2, day: 30 }));
		assert_eq!(
			"0217".parse::<MonthDay>(),
			Err(ValidationError::DateFormat(String::from("0217")))
		);
	}

	#[test]
	fn february_29_is_registrable() {
		assert!(MonthDay::new(2, 29).is_ok());
		assert_eq!(MonthDay::new(2, 30), Err(ValidationError::Day { month: 2, day: 30 }));
	}

	#[test]
	fn time_of_day_parsing() {
		let time: TimeOfDay = "10:00".parse().unwrap();
		assert_eq!(time.to_string(), "10:00");

		let time: TimeOfDay = "9:5".parse().unwrap();
		assert_eq!(time.to_string(), "09:05");

		assert_eq!("24:00".parse::<TimeOfDay>(), Err(ValidationError::Hour(24)));
		assert_eq!("10:60".parse::<TimeOfDay>(), Err(ValidationError::Minute(60)));
		assert_eq!(
			"10".parse::<TimeOfDay>(),
			Err(ValidationError::TimeFormat(String::from("10")))
		);
	}

	#[test]
	fn entry_json_shape() {
		let entry = ReminderEntry {
			date: "02-17".parse().unwrap(),
			time: "10:00".parse().unwrap(),
			message: String::from("happy birthday {user}!"),
			channel: ChannelId::new("123456"),
		};
		let json = serde_json::to_value(&entry).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"date": "02-17",
				"time": "10:00",
				"message": "happy birthday {user}!",
				"channel": "123456",
			})
		);
		let back: ReminderEntry = serde_json::from_value(json).unwrap();
		assert_eq!(back, entry);
	}
}
