//! Configuration module

use std::{path::PathBuf, str::FromStr};

use config::{ConfigError, Environment, File};
use serde::{de::Error, Deserialize, Deserializer};
use time::UtcOffset;
use tracing::Level;
use url::Url;

/// This app's configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	/// Logging level
	#[serde(deserialize_with = "deserialize_log_level")]
	pub log_level: Level,
	/// Reference timezone as a fixed UTC offset, e.g. `+09:00`. All reminder
	/// dates and times are interpreted in this offset.
	#[serde(deserialize_with = "deserialize_utc_offset")]
	pub timezone: UtcOffset,
	/// Reminder store settings.
	pub store: StoreSettings,
	/// Chat gateway settings.
	pub gateway: GatewaySettings,
}

/// Settings for the reminder store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
	/// Path of the reminder file.
	pub file: PathBuf,
}

/// Settings for the chat gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
	/// Webhook endpoint messages are delivered to.
	pub endpoint: Url,
}

impl Settings {
	/// Read configuration from `config.yaml` by default. Calls `read_from`.
	#[inline]
	pub fn read() -> Result<Self, ConfigError> {
		Self::read_from("config.yaml")
	}

	/// Read configuration from specified file and merge in environment variable
	/// configuration.
	pub fn read_from(cfg_path: &str) -> Result<Self, ConfigError> {
		let config = ::config::Config::builder()
			.add_source(File::with_name(cfg_path).required(false))
			.add_source(Environment::with_prefix("APP").separator("__"))
			.build()?
			.try_deserialize()?;
		Ok(config)
	}
}

/// Deserializes `String` into `tracing::Level`
pub fn deserialize_log_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
	D: Deserializer<'de>,
{
	let string = String::deserialize(deserializer)?;
	let level: Level =
		tracing::Level::from_str(&string).map_err(|error| D::Error::custom(error.to_string()))?;

	Ok(level)
}

/// Deserializes `String` into a fixed `UtcOffset`
pub fn deserialize_utc_offset<'de, D>(deserializer: D) -> Result<UtcOffset, D::Error>
where
	D: Deserializer<'de>,
{
	let string = String::deserialize(deserializer)?;
	parse_utc_offset(&string).map_err(D::Error::custom)
}

/// Parse a `+HH:MM` style offset string.
fn parse_utc_offset(s: &str) -> Result<UtcOffset, String> {
	let (sign, rest) = if let Some(rest) = s.strip_prefix('-') {
		(-1, rest)
	} else {
		(1, s.strip_prefix('+').unwrap_or(s))
	};
	let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
	let hours: i8 = hours.parse().map_err(|_| format!("`{s}` is not a valid UTC offset"))?;
	let minutes: i8 = minutes.parse().map_err(|_| format!("`{s}` is not a valid UTC offset"))?;
	UtcOffset::from_hms(sign * hours, sign * minutes, 0)
		.map_err(|error| format!("`{s}` is not a valid UTC offset: {error}"))
}
