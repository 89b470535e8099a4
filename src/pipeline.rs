use log::info;

use super::calendar::{derive_calendar, WeekConvention};
use super::error::Result;
use super::fetch::DatasetFetcher;
use super::geometry::{to_map_crs, GeometryFetcher};
use super::join::{join_geometry, EXCLUDED_STATES};
use super::model::{JoinedWeeklyRecord, LongCaseRecord, WeeklyAggregateRecord};
use super::progress::ProgressSink;
use super::rates::derive_rates;
use super::reshape::{reshape_long, IdentifierColumns, WideTable};
use super::weekly::aggregate_weekly;


#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
	pub long: Vec<LongCaseRecord>,
	pub weekly: Vec<WeeklyAggregateRecord>,
	pub joined: Vec<JoinedWeeklyRecord>,
}


/// fetch -> reshape -> calendar -> rates -> weekly -> join, in one pass.
#[derive(Debug, Clone)]
pub struct Pipeline {
	pub columns: IdentifierColumns,
	pub week_convention: WeekConvention,
	pub excluded: Vec<String>,
}

impl Default for Pipeline {
	fn default() -> Self {
		Self{
			columns: IdentifierColumns::default(),
			week_convention: WeekConvention::default(),
			excluded: EXCLUDED_STATES.iter().map(|s| s.to_string()).collect(),
		}
	}
}

impl Pipeline {
	pub fn new(columns: IdentifierColumns, week_convention: WeekConvention) -> Self {
		Self{
			columns,
			week_convention,
			..Self::default()
		}
	}

	/// Everything up to the weekly aggregate; needs no geometry.
	pub fn prepare<S: ProgressSink + ?Sized>(&self, raw: &[u8], progress: &mut S) -> Result<(Vec<LongCaseRecord>, Vec<WeeklyAggregateRecord>)> {
		let table = WideTable::from_bytes(raw)?;
		let observations = reshape_long(&table, &self.columns, progress)?;
		let dated = derive_calendar(observations, self.week_convention)?;
		let long = derive_rates(dated);
		let weekly = aggregate_weekly(&long);
		info!("{} daily rows, {} weekly rows (weeks binned by {})", long.len(), weekly.len(), self.week_convention);
		Ok((long, weekly))
	}

	pub fn run<D, G, S>(
		&self,
		fetcher: &D,
		geometry: &G,
		dataset: &str,
		file: &str,
		progress: &mut S,
	) -> Result<PipelineOutput>
		where D: DatasetFetcher + ?Sized, G: GeometryFetcher + ?Sized, S: ProgressSink + ?Sized
	{
		let raw = fetcher.fetch(dataset, file)?;
		let (long, weekly) = self.prepare(&raw, progress)?;
		let boundaries = to_map_crs(geometry.fetch_boundaries()?)?;
		let excluded: Vec<&str> = self.excluded.iter().map(|s| s.as_str()).collect();
		let joined = join_geometry(weekly.clone(), &boundaries, &excluded);
		Ok(PipelineOutput{long, weekly, joined})
	}
}
