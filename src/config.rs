use std::env;
use std::path::PathBuf;

use super::calendar::WeekConvention;
use super::geometry::BoundarySource;
use super::reshape::IdentifierColumns;


static DEFAULT_DATAVERSE_URL: &'static str = "https://dataverse.harvard.edu";
static DEFAULT_DATASET: &'static str = "doi:10.7910/DVN/HIDLTK";
static DEFAULT_FILE: &'static str = "us_state_confirmed_case.tab";
static DEFAULT_BOUNDARIES: &'static str = "https://raw.githubusercontent.com/PublicaMundi/MappingAPI/master/data/geojson/us-states.json";


#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	pub dataverse_url: String,
	pub dataset: String,
	pub file: String,
	/// Read dataset files from here instead of the repository.
	pub data_dir: Option<PathBuf>,
	pub boundaries: BoundarySource,
	pub boundary_name_field: String,
	pub columns: IdentifierColumns,
	pub week_convention: WeekConvention,
	pub output_dir: PathBuf,
}

impl Default for Config {
	fn default() -> Self {
		Self{
			dataverse_url: DEFAULT_DATAVERSE_URL.into(),
			dataset: DEFAULT_DATASET.into(),
			file: DEFAULT_FILE.into(),
			data_dir: None,
			boundaries: BoundarySource::parse(DEFAULT_BOUNDARIES),
			boundary_name_field: "name".into(),
			columns: IdentifierColumns::default(),
			week_convention: WeekConvention::default(),
			output_dir: "out".into(),
		}
	}
}

impl Config {
	pub fn from_env() -> Result<Self, String> {
		Self::from_lookup(|k| env::var(k).ok())
	}

	/// Builds the configuration from a variable lookup; unset variables keep
	/// their defaults.
	pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, String> {
		let mut cfg = Self::default();
		let set = |target: &mut String, key: &str| {
			if let Some(v) = lookup(key) {
				*target = v;
			}
		};
		set(&mut cfg.dataverse_url, "INCIDENCE_DATAVERSE_URL");
		set(&mut cfg.dataset, "INCIDENCE_DATASET");
		set(&mut cfg.file, "INCIDENCE_FILE");
		set(&mut cfg.boundary_name_field, "INCIDENCE_BOUNDARY_NAME_FIELD");
		set(&mut cfg.columns.geoid, "INCIDENCE_COL_GEOID");
		set(&mut cfg.columns.state_name, "INCIDENCE_COL_NAME");
		set(&mut cfg.columns.population, "INCIDENCE_COL_POPULATION");

		cfg.data_dir = lookup("INCIDENCE_DATA_DIR").map(PathBuf::from);
		if let Some(b) = lookup("INCIDENCE_BOUNDARIES") {
			cfg.boundaries = BoundarySource::parse(&b);
		}
		if let Some(w) = lookup("INCIDENCE_WEEK_CONVENTION") {
			cfg.week_convention = w.parse()?;
		}
		if let Some(o) = lookup("INCIDENCE_OUTPUT_DIR") {
			cfg.output_dir = o.into();
		}
		Ok(cfg)
	}
}
