use std::collections::BTreeMap;

use log::{debug, warn};

use smartstring::alias::{String as SmartString};

use super::model::{rate_per_100k, DatedObservation, Geoid, LongCaseRecord};


/// `v - p`, saturated to the range of `i64`.
fn saturating_sub_u64(v: u64, p: u64) -> i64 {
	let d = v as i128 - p as i128;
	if d > i64::MAX as i128 {
		i64::MAX
	} else if d < i64::MIN as i128 {
		i64::MIN
	} else {
		d as i64
	}
}

/// First difference of a cumulative series. The first value has no
/// predecessor and its difference is 0.
pub fn first_difference(cumulative: &[u64]) -> Vec<i64> {
	let mut result = Vec::with_capacity(cumulative.len());
	let mut prev: Option<u64> = None;
	for v in cumulative.iter() {
		let d = match prev {
			Some(p) => saturating_sub_u64(*v, p),
			None => 0,
		};
		result.push(d);
		prev = Some(*v);
	}
	result
}

pub fn clamp_incidence(diff: i64) -> u64 {
	if diff < 0 {
		0
	} else {
		diff as u64
	}
}


/// Computes incidence and per-100k rates for every entity. Rows are grouped by
/// (GEOID, state name) and sorted by date within each entity; output is
/// ordered by GEOID, state name, then date.
pub fn derive_rates(observations: Vec<DatedObservation>) -> Vec<LongCaseRecord> {
	let mut by_entity: BTreeMap<(Geoid, SmartString), Vec<DatedObservation>> = BTreeMap::new();
	for obs in observations {
		by_entity.entry((obs.geoid.clone(), obs.state_name.clone())).or_insert_with(Vec::new).push(obs);
	}

	let mut result = Vec::new();
	let mut undefined = 0usize;
	let mut corrections = 0usize;
	for ((geoid, _), mut rows) in by_entity {
		rows.sort_by_key(|r| r.date);
		let cumulative: Vec<u64> = rows.iter().map(|r| r.cumulative_cases).collect();
		let diffs = first_difference(&cumulative);

		for (row, daily_new_cases) in rows.into_iter().zip(diffs.into_iter()) {
			if daily_new_cases < 0 {
				corrections += 1;
			}
			let daily_new_cases_clamped = clamp_incidence(daily_new_cases);
			let daily_rate_per_100k = rate_per_100k(daily_new_cases_clamped as f64, row.population);
			let cumulative_rate_per_100k = rate_per_100k(row.cumulative_cases as f64, row.population);
			if daily_rate_per_100k.is_none() {
				undefined += 1;
			}
			result.push(LongCaseRecord{
				geoid: geoid.clone(),
				state_name: row.state_name,
				population: row.population,
				date: row.date,
				cumulative_cases: row.cumulative_cases,
				day_of_year: row.calendar.day_of_year,
				week_of_year: row.calendar.week_of_year,
				month: row.calendar.month,
				daily_new_cases,
				daily_new_cases_clamped,
				daily_rate_per_100k,
				cumulative_rate_per_100k,
			});
		}
	}

	if corrections > 0 {
		debug!("clamped {} negative daily differences to zero", corrections);
	}
	if undefined > 0 {
		warn!("{} rows have no usable population; their rates are undefined", undefined);
	}
	result
}


#[cfg(test)]
mod tests {
	use super::*;

	use chrono::NaiveDate;

	use crate::calendar::{features, WeekConvention};

	const EPS: f64 = 1e-9;

	fn obs(geoid: &str, population: Option<f64>, date: NaiveDate, cumulative_cases: u64) -> DatedObservation {
		DatedObservation{
			geoid: geoid.into(),
			state_name: format!("State {}", geoid).as_str().into(),
			population,
			date,
			calendar: features(date, WeekConvention::YearDay),
			cumulative_cases,
		}
	}

	fn day(n: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2020, 3, n).unwrap()
	}

	#[test]
	fn first_difference_starts_at_zero() {
		assert_eq!(first_difference(&[10, 10, 15, 12]), vec![0, 0, 5, -3]);
		assert_eq!(first_difference(&[]), Vec::<i64>::new());
	}

	#[test]
	fn differences_of_huge_counts_saturate() {
		assert_eq!(first_difference(&[0, u64::MAX]), vec![0, i64::MAX]);
		assert_eq!(first_difference(&[u64::MAX, 0]), vec![0, i64::MIN]);
		assert_eq!(first_difference(&[u64::MAX - 1, u64::MAX]), vec![0, 1]);
		assert_eq!(clamp_incidence(i64::MIN), 0);
	}

	#[test]
	fn entities_sharing_a_geoid_are_differenced_separately() {
		let mut rows = vec![
			obs("A", Some(1000.0), day(1), 10),
			obs("A", Some(1000.0), day(2), 12),
		];
		let mut other = obs("A", Some(1000.0), day(1), 100);
		other.state_name = "Other".into();
		rows.push(other);
		let rows = derive_rates(rows);
		let other: Vec<i64> = rows.iter().filter(|r| r.state_name.as_str() == "Other").map(|r| r.daily_new_cases).collect();
		assert_eq!(other, vec![0]);
		let a: Vec<i64> = rows.iter().filter(|r| r.state_name.as_str() == "State A").map(|r| r.daily_new_cases).collect();
		assert_eq!(a, vec![0, 2]);
	}

	#[test]
	fn reporting_corrections_are_clamped() {
		let rows = derive_rates(vec![
			obs("A", Some(100_000.0), day(1), 10),
			obs("A", Some(100_000.0), day(2), 10),
			obs("A", Some(100_000.0), day(3), 15),
			obs("A", Some(100_000.0), day(4), 12),
		]);
		let daily: Vec<i64> = rows.iter().map(|r| r.daily_new_cases).collect();
		let clamped: Vec<u64> = rows.iter().map(|r| r.daily_new_cases_clamped).collect();
		let rates: Vec<f64> = rows.iter().map(|r| r.daily_rate_per_100k.unwrap()).collect();
		assert_eq!(daily, vec![0, 0, 5, -3]);
		assert_eq!(clamped, vec![0, 0, 5, 0]);
		for (got, want) in rates.iter().zip([0.0, 0.0, 5.0, 0.0].iter()) {
			assert!((got - want).abs() < EPS, "{} != {}", got, want);
		}
		assert!((rows[3].cumulative_rate_per_100k.unwrap() - 12.0).abs() < EPS);
	}

	#[test]
	fn rows_are_sorted_per_entity_before_differencing() {
		let rows = derive_rates(vec![
			obs("A", Some(1000.0), day(3), 9),
			obs("B", Some(1000.0), day(1), 1),
			obs("A", Some(1000.0), day(1), 2),
			obs("A", Some(1000.0), day(2), 4),
		]);
		let a: Vec<(NaiveDate, i64)> = rows.iter().filter(|r| r.geoid.as_str() == "A").map(|r| (r.date, r.daily_new_cases)).collect();
		assert_eq!(a, vec![(day(1), 0), (day(2), 2), (day(3), 5)]);
		let b: Vec<i64> = rows.iter().filter(|r| r.geoid.as_str() == "B").map(|r| r.daily_new_cases).collect();
		assert_eq!(b, vec![0]);
	}

	#[test]
	fn single_date_entity_has_zero_incidence() {
		let rows = derive_rates(vec![obs("A", Some(500.0), day(1), 42)]);
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].daily_new_cases, 0);
		assert_eq!(rows[0].daily_new_cases_clamped, 0);
	}

	#[test]
	fn zero_population_yields_undefined_rates_without_aborting() {
		let rows = derive_rates(vec![
			obs("A", Some(0.0), day(1), 1),
			obs("A", Some(0.0), day(2), 3),
			obs("B", None, day(1), 1),
			obs("C", Some(200.0), day(1), 1),
			obs("C", Some(200.0), day(2), 3),
		]);
		assert_eq!(rows.len(), 5);
		for r in rows.iter().filter(|r| r.geoid.as_str() != "C") {
			assert_eq!(r.daily_rate_per_100k, None);
			assert_eq!(r.cumulative_rate_per_100k, None);
		}
		let c = rows.iter().filter(|r| r.geoid.as_str() == "C").last().unwrap();
		assert_eq!(c.daily_new_cases, 2);
		assert!((c.daily_rate_per_100k.unwrap() - 1000.0).abs() < EPS);
	}

	#[test]
	fn daily_rate_matches_its_definition() {
		let counts = [3u64, 8, 8, 20, 19, 33];
		let population = 123_456.0;
		let input = counts.iter().enumerate().map(|(i, c)| obs("A", Some(population), day(i as u32 + 1), *c)).collect();
		for r in derive_rates(input) {
			let expected = r.daily_new_cases_clamped as f64 / population * 100_000.0;
			assert!((r.daily_rate_per_100k.unwrap() - expected).abs() < EPS);
		}
	}
}
