use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use pretty_assertions::assert_eq;

use geo::{LineString, MultiPolygon, Polygon};

use incidence::geometry::Crs;
use incidence::{
	DatasetFetcher, Error, GeoEntity, GeometryFetcher, IdentifierColumns, NullMeter, Pipeline, WeekConvention, MAP_CRS,
};


struct MemoryFetcher {
	files: HashMap<(String, String), Bytes>,
}

impl MemoryFetcher {
	fn with(dataset: &str, file: &str, content: &str) -> Self {
		let mut files = HashMap::new();
		files.insert((dataset.to_string(), file.to_string()), Bytes::from(content.to_string()));
		Self{files}
	}
}

impl DatasetFetcher for MemoryFetcher {
	fn fetch(&self, dataset: &str, file: &str) -> incidence::Result<Bytes> {
		self.files.get(&(dataset.to_string(), file.to_string()))
			.cloned()
			.ok_or_else(|| Error::fetch(dataset, file, "no such file"))
	}
}


struct MemoryBoundaries {
	names: Vec<&'static str>,
}

impl GeometryFetcher for MemoryBoundaries {
	fn fetch_boundaries(&self) -> incidence::Result<Vec<GeoEntity>> {
		Ok(self.names.iter().enumerate().map(|(i, name)| {
			let x = -100.0 + i as f64;
			let ring = LineString::from(vec![(x, 35.0), (x + 1.0, 35.0), (x + 1.0, 36.0), (x, 35.0)]);
			GeoEntity{
				state_name: (*name).into(),
				geometry: Arc::new(MultiPolygon(vec![Polygon::new(ring, vec![])])),
				crs: Crs{epsg: 4326},
			}
		}).collect())
	}
}


static DATASET: &str = "doi:10.0000/TEST";
static FILE: &str = "cases.csv";

// four consecutive days: entity A (pop 100000) has a reporting correction on
// the last day, Alaska is excluded later, Ghost has no population.
static WIDE: &str = "\
fips,name,population,20200101,20200102,20200103,20200104
01,A,100000,10,10,15,12
02,Alaska,731545,1,2,3,4
03,Ghost,0,1,1,1,1
04,Nowhere,50000,0,5,5,6
";

fn run(boundaries: Vec<&'static str>) -> incidence::Result<incidence::PipelineOutput> {
	let fetcher = MemoryFetcher::with(DATASET, FILE, WIDE);
	let geometry = MemoryBoundaries{names: boundaries};
	Pipeline::new(IdentifierColumns::default(), WeekConvention::YearDay)
		.run(&fetcher, &geometry, DATASET, FILE, &mut NullMeter)
}


#[test]
fn long_table_has_one_row_per_entity_and_date() {
	let out = run(vec!["A", "Alaska", "Ghost"]).unwrap();
	assert_eq!(out.long.len(), 4 * 4);
}

#[test]
fn worked_example_for_entity_a() {
	let out = run(vec!["A"]).unwrap();
	let a: Vec<_> = out.long.iter().filter(|r| r.state_name.as_str() == "A").collect();
	assert_eq!(a.iter().map(|r| r.daily_new_cases).collect::<Vec<_>>(), vec![0, 0, 5, -3]);
	assert_eq!(a.iter().map(|r| r.daily_new_cases_clamped).collect::<Vec<_>>(), vec![0, 0, 5, 0]);
	let rates: Vec<f64> = a.iter().map(|r| r.daily_rate_per_100k.unwrap()).collect();
	for (got, want) in rates.iter().zip([0.0, 0.0, 5.0, 0.0].iter()) {
		assert!((got - want).abs() < 1e-9);
	}
	assert!(out.long.iter().all(|r| r.day_of_year == r.date.format("%j").to_string().parse::<u32>().unwrap()));
}

#[test]
fn clamped_incidence_is_never_negative() {
	let out = run(vec![]).unwrap();
	assert!(out.long.iter().all(|r| r.daily_new_cases_clamped == r.daily_new_cases.max(0) as u64));
}

#[test]
fn undefined_rates_drop_weekly_groups_only() {
	let out = run(vec![]).unwrap();
	let ghost: Vec<_> = out.long.iter().filter(|r| r.state_name.as_str() == "Ghost").collect();
	assert_eq!(ghost.len(), 4);
	assert!(ghost.iter().all(|r| r.daily_rate_per_100k.is_none()));
	assert!(out.weekly.iter().all(|w| w.state_name.as_str() != "Ghost"));
	assert_eq!(out.weekly.len(), 3);
}

#[test]
fn weekly_rows_aggregate_the_week() {
	let out = run(vec![]).unwrap();
	let a = out.weekly.iter().find(|w| w.state_name.as_str() == "A").unwrap();
	assert_eq!(a.week_of_year, 1);
	assert_eq!(a.weekly_new_cases, 5);
	assert!((a.population - 100_000.0).abs() < 1e-9);
	assert!((a.weekly_rate_per_100k - 5.0).abs() < 1e-9);
}

#[test]
fn alaska_never_reaches_the_joined_output() {
	for boundaries in vec![vec![], vec!["Alaska"], vec!["A", "Alaska", "Nowhere"]] {
		let out = run(boundaries).unwrap();
		assert!(out.weekly.iter().any(|w| w.state_name.as_str() == "Alaska"));
		assert!(out.joined.iter().all(|j| j.state_name() != "Alaska"));
	}
}

#[test]
fn unmatched_names_keep_their_rows_without_geometry() {
	let out = run(vec!["A"]).unwrap();
	let names: Vec<(&str, bool)> = out.joined.iter().map(|j| (j.state_name(), j.has_geometry())).collect();
	assert_eq!(names, vec![("A", true), ("Nowhere", false)]);
	assert_eq!(out.joined[0].crs, Some(MAP_CRS));
}

#[test]
fn missing_file_is_a_fetch_failure() {
	let fetcher = MemoryFetcher::with(DATASET, "other.csv", WIDE);
	let geometry = MemoryBoundaries{names: vec![]};
	let result = Pipeline::default().run(&fetcher, &geometry, DATASET, FILE, &mut NullMeter);
	match result {
		Err(e @ Error::FetchFailure{..}) => assert!(e.is_retryable()),
		other => panic!("unexpected result: {:?}", other.map(|o| o.long.len())),
	}
}

#[test]
fn malformed_date_column_aborts_the_run() {
	let fetcher = MemoryFetcher::with(DATASET, FILE, "fips,name,population,20200101,2020xx\n01,A,1,1,1\n");
	let geometry = MemoryBoundaries{names: vec![]};
	let result = Pipeline::default().run(&fetcher, &geometry, DATASET, FILE, &mut NullMeter);
	match result {
		Err(Error::MalformedDateColumn{column}) => assert_eq!(column, "2020xx"),
		other => panic!("unexpected result: {:?}", other.map(|o| o.long.len())),
	}
}
