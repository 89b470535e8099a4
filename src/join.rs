use std::collections::{BTreeSet, HashMap};

use log::{debug, info};

use super::model::{GeoEntity, JoinedWeeklyRecord, WeeklyAggregateRecord};


/// Entities outside the contiguous area covered by the map projection.
pub static EXCLUDED_STATES: [&'static str; 2] = ["Alaska", "Hawaii"];


/// Left-joins boundaries onto weekly records by exact `state_name`, then
/// removes excluded entities.
///
/// Names are compared as-is: no case folding, trimming or abbreviation
/// matching. Records without a matching boundary are kept with no geometry.
pub fn join_geometry(
	weekly: Vec<WeeklyAggregateRecord>,
	boundaries: &[GeoEntity],
	excluded: &[&str],
) -> Vec<JoinedWeeklyRecord> {
	let mut by_name: HashMap<&str, &GeoEntity> = HashMap::with_capacity(boundaries.len());
	for entity in boundaries.iter() {
		// first boundary wins on duplicate names
		by_name.entry(entity.state_name.as_str()).or_insert(entity);
	}

	let mut unmatched: BTreeSet<String> = BTreeSet::new();
	let mut nexcluded = 0usize;
	let mut result = Vec::with_capacity(weekly.len());
	for rec in weekly {
		let entity = by_name.get(rec.state_name.as_str()).copied();
		if entity.is_none() {
			unmatched.insert(rec.state_name.to_string());
		}
		let joined = JoinedWeeklyRecord{
			geometry: entity.map(|e| e.geometry.clone()),
			crs: entity.map(|e| e.crs),
			weekly: rec,
		};
		if excluded.contains(&joined.state_name()) {
			nexcluded += 1;
			continue
		}
		result.push(joined);
	}

	for name in excluded.iter() {
		unmatched.remove(*name);
	}
	if !unmatched.is_empty() {
		info!("{} entities have no boundary: {:?}", unmatched.len(), unmatched);
	}
	debug!("excluded {} weekly rows of {:?}", nexcluded, excluded);
	result
}
