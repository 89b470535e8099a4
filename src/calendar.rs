//! Calendar features of an observation date.
//!
//! Week numbers decide weekly aggregation groups, so every record of a run is
//! binned with the same [`WeekConvention`]. The default, [`WeekConvention::YearDay`],
//! counts complete seven-day blocks from January 1st: days 1-7 are week 1,
//! days 8-14 week 2, and days 365/366 fall into week 53.
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use super::error::{Error, Result};
use super::model::{CalendarFeatures, CaseObservation, DatedObservation};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekConvention {
	/// `(day_of_year - 1) / 7 + 1`, weeks anchored at January 1st.
	YearDay,
	/// ISO 8601 week number; weeks start on Monday and the first days of
	/// January may belong to week 52 or 53.
	Iso,
}

impl Default for WeekConvention {
	fn default() -> Self {
		Self::YearDay
	}
}

impl WeekConvention {
	pub fn week_of(&self, date: NaiveDate) -> u32 {
		match self {
			Self::YearDay => (date.ordinal() - 1) / 7 + 1,
			Self::Iso => date.iso_week().week(),
		}
	}
}

impl fmt::Display for WeekConvention {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::YearDay => f.write_str("yearday"),
			Self::Iso => f.write_str("iso"),
		}
	}
}

impl FromStr for WeekConvention {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"yearday" | "year-day" | "default" => Ok(Self::YearDay),
			"iso" | "iso8601" => Ok(Self::Iso),
			other => Err(format!("unknown week convention {:?}, expected yearday or iso", other)),
		}
	}
}


/// Parses a numeric year-month-day label, either `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_date_label(s: &str) -> Option<NaiveDate> {
	let s = s.trim();
	match s.len() {
		8 if s.bytes().all(|b| b.is_ascii_digit()) => NaiveDate::parse_from_str(s, "%Y%m%d").ok(),
		10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
		_ => None,
	}
}

/// Parses the label of a date column of the wide table.
pub fn parse_date_column(column: &str) -> Result<NaiveDate> {
	parse_date_label(column).ok_or_else(|| Error::MalformedDateColumn{column: column.into()})
}

pub fn features(date: NaiveDate, convention: WeekConvention) -> CalendarFeatures {
	CalendarFeatures{
		day_of_year: date.ordinal(),
		week_of_year: convention.week_of(date),
		month: date.month(),
	}
}

pub fn derive_calendar(observations: Vec<CaseObservation>, convention: WeekConvention) -> Result<Vec<DatedObservation>> {
	let mut result = Vec::with_capacity(observations.len());
	for obs in observations {
		let date = match parse_date_label(&obs.date_label) {
			Some(d) => d,
			None => return Err(Error::UnparsableDate{value: obs.date_label.to_string()}),
		};
		result.push(DatedObservation{
			geoid: obs.geoid,
			state_name: obs.state_name,
			population: obs.population,
			date,
			calendar: features(date, convention),
			cumulative_cases: obs.cumulative_cases,
		});
	}
	Ok(result)
}
