use std::collections::BTreeMap;

use log::info;

use smartstring::alias::{String as SmartString};

use super::model::{Geoid, LongCaseRecord, WeeklyAggregateRecord};


pub type WeekKey = (Geoid, SmartString, u32);


#[derive(Debug, Clone, Default)]
struct WeekAccumulator {
	days: usize,
	population_sum: f64,
	new_cases: u64,
	rate_sum: f64,
	// a single undefined population or rate poisons the whole group
	undefined: bool,
}

impl WeekAccumulator {
	fn submit(&mut self, rec: &LongCaseRecord) {
		self.days += 1;
		self.new_cases += rec.daily_new_cases_clamped;
		match (rec.population, rec.daily_rate_per_100k) {
			(Some(p), Some(r)) => {
				self.population_sum += p;
				self.rate_sum += r;
			},
			_ => self.undefined = true,
		}
	}

	fn finish(self, key: WeekKey) -> Option<WeeklyAggregateRecord> {
		if self.undefined || self.days == 0 {
			return None
		}
		let (geoid, state_name, week_of_year) = key;
		Some(WeeklyAggregateRecord{
			geoid,
			state_name,
			week_of_year,
			population: self.population_sum / (self.days as f64),
			weekly_new_cases: self.new_cases,
			weekly_rate_per_100k: self.rate_sum,
		})
	}
}


/// Rolls daily records up to one record per (GEOID, state_name, week_of_year).
///
/// The weekly rate is the sum of the daily rates, not the weekly count
/// divided by population. Groups with any undefined rate are dropped.
pub fn aggregate_weekly(records: &[LongCaseRecord]) -> Vec<WeeklyAggregateRecord> {
	let mut groups: BTreeMap<WeekKey, WeekAccumulator> = BTreeMap::new();
	for rec in records.iter() {
		let key = (rec.geoid.clone(), rec.state_name.clone(), rec.week_of_year);
		groups.entry(key).or_default().submit(rec);
	}

	let ngroups = groups.len();
	let result: Vec<WeeklyAggregateRecord> = groups.into_iter()
		.filter_map(|(k, acc)| acc.finish(k))
		.collect();
	if result.len() < ngroups {
		info!("dropped {} of {} weekly groups with undefined rates", ngroups - result.len(), ngroups);
	}
	result
}
