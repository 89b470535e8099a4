use std::sync::Arc;

use serde::Serialize;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use geo::MultiPolygon;

use super::geometry::Crs;


pub type Geoid = SmartString;

/// A per-100k rate; `None` where the population is zero or missing.
pub type Rate = Option<f64>;

pub static RATE_SCALE: f64 = 100_000.0;


pub fn rate_per_100k(count: f64, population: Option<f64>) -> Rate {
	match population {
		Some(p) if p > 0.0 && p.is_finite() => Some(count / p * RATE_SCALE),
		_ => None,
	}
}


/// One cell of the wide table: an entity's cumulative count under one date
/// column. The date is still the raw column label at this point.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseObservation {
	pub geoid: Geoid,
	pub state_name: SmartString,
	pub population: Option<f64>,
	pub date_label: SmartString,
	pub cumulative_cases: u64,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CalendarFeatures {
	pub day_of_year: u32,
	pub week_of_year: u32,
	pub month: u32,
}


#[derive(Debug, Clone, PartialEq)]
pub struct DatedObservation {
	pub geoid: Geoid,
	pub state_name: SmartString,
	pub population: Option<f64>,
	pub date: NaiveDate,
	pub calendar: CalendarFeatures,
	pub cumulative_cases: u64,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongCaseRecord {
	#[serde(rename = "GEOID")]
	pub geoid: Geoid,
	pub state_name: SmartString,
	pub population: Option<f64>,
	pub date: NaiveDate,
	pub cumulative_cases: u64,
	pub day_of_year: u32,
	pub week_of_year: u32,
	pub month: u32,
	pub daily_new_cases: i64,
	pub daily_new_cases_clamped: u64,
	pub daily_rate_per_100k: Rate,
	pub cumulative_rate_per_100k: Rate,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregateRecord {
	#[serde(rename = "GEOID")]
	pub geoid: Geoid,
	pub state_name: SmartString,
	pub week_of_year: u32,
	pub population: f64,
	pub weekly_new_cases: u64,
	pub weekly_rate_per_100k: f64,
}


#[derive(Debug, Clone, PartialEq)]
pub struct GeoEntity {
	pub state_name: SmartString,
	pub geometry: Arc<MultiPolygon<f64>>,
	pub crs: Crs,
}


/// A weekly record with the boundary of its entity attached, if one with the
/// exact same name was available.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedWeeklyRecord {
	pub weekly: WeeklyAggregateRecord,
	pub geometry: Option<Arc<MultiPolygon<f64>>>,
	pub crs: Option<Crs>,
}

impl JoinedWeeklyRecord {
	pub fn state_name(&self) -> &str {
		&self.weekly.state_name
	}

	pub fn has_geometry(&self) -> bool {
		self.geometry.is_some()
	}
}
