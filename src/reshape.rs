use log::{debug, info};

use smartstring::alias::{String as SmartString};

use super::calendar::parse_date_column;
use super::error::{Error, Result};
use super::model::CaseObservation;
use super::progress::ProgressSink;


/// Names of the identifier columns in the raw wide table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierColumns {
	pub geoid: String,
	pub state_name: String,
	pub population: String,
}

impl Default for IdentifierColumns {
	fn default() -> Self {
		Self{
			geoid: "fips".into(),
			state_name: "name".into(),
			population: "population".into(),
		}
	}
}


/// The raw table as fetched: one row per entity, one column per date.
#[derive(Debug, Clone)]
pub struct WideTable {
	headers: csv::StringRecord,
	rows: Vec<csv::StringRecord>,
}

/// Guesses the delimiter from the header line: tab if it contains any tab,
/// comma otherwise.
pub fn sniff_delimiter(data: &[u8]) -> u8 {
	let header = data.split(|b| *b == b'\n').next().unwrap_or(&[]);
	if header.contains(&b'\t') {
		b'\t'
	} else {
		b','
	}
}

impl WideTable {
	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		let mut r = csv::ReaderBuilder::new()
			.delimiter(sniff_delimiter(data))
			.trim(csv::Trim::Headers)
			.from_reader(data);
		let headers = r.headers()?.clone();
		let mut rows = Vec::new();
		for row in r.records() {
			rows.push(row?);
		}
		debug!("parsed wide table with {} columns and {} rows", headers.len(), rows.len());
		Ok(Self{headers, rows})
	}

	pub fn headers(&self) -> &csv::StringRecord {
		&self.headers
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	fn column(&self, name: &str) -> Result<usize> {
		self.headers.iter().position(|h| h == name).ok_or_else(|| Error::MissingColumn{column: name.into()})
	}

	/// Indices and labels of every column whose name begins with a digit.
	/// Each of them must be a valid date label.
	pub fn date_columns(&self) -> Result<Vec<(usize, SmartString)>> {
		let mut result = Vec::new();
		for (i, h) in self.headers.iter().enumerate() {
			if !h.starts_with(|c: char| c.is_ascii_digit()) {
				continue
			}
			parse_date_column(h)?;
			result.push((i, h.into()));
		}
		Ok(result)
	}
}


fn is_null(s: &str) -> bool {
	s.is_empty() || s == "NA" || s == "." || s.eq_ignore_ascii_case("null")
}

fn parse_population(s: &str, column: &str, row: usize) -> Result<Option<f64>> {
	let s = s.trim();
	if is_null(s) {
		return Ok(None)
	}
	match s.parse::<f64>() {
		Ok(v) => Ok(Some(v)),
		Err(_) => Err(Error::MalformedValue{column: column.into(), row, value: s.into()}),
	}
}

/// Parses a cumulative count cell. Integral floats are accepted, negative
/// counts are floored at zero.
fn parse_count(s: &str, column: &str, row: usize) -> Result<Option<u64>> {
	let s = s.trim();
	if is_null(s) {
		return Ok(None)
	}
	if let Ok(v) = s.parse::<u64>() {
		return Ok(Some(v))
	}
	let v = match s.parse::<f64>() {
		Ok(v) if v.is_finite() && v.fract() == 0.0 => v,
		_ => return Err(Error::MalformedValue{column: column.into(), row, value: s.into()}),
	};
	if v < 0.0 {
		debug!("flooring negative cumulative count {} in column {} at row {}", v, column, row);
		return Ok(Some(0))
	}
	Ok(Some(v as u64))
}


/// Turns the wide table into one observation per (entity, date column).
/// Null cells produce no observation.
pub fn reshape_long<S: ProgressSink + ?Sized>(
	table: &WideTable,
	ids: &IdentifierColumns,
	progress: &mut S,
) -> Result<Vec<CaseObservation>> {
	let geoid_col = table.column(&ids.geoid)?;
	let name_col = table.column(&ids.state_name)?;
	let pop_col = table.column(&ids.population)?;
	let date_cols = table.date_columns()?;

	let mut result = Vec::with_capacity(table.len() * date_cols.len());
	let mut nulls = 0usize;
	for (i, rec) in table.rows.iter().enumerate() {
		let row = i + 1;
		let geoid: SmartString = rec.get(geoid_col).unwrap_or("").trim().into();
		let state_name: SmartString = rec.get(name_col).unwrap_or("").trim().into();
		let population = parse_population(rec.get(pop_col).unwrap_or(""), &ids.population, row)?;

		for (col, label) in date_cols.iter() {
			let cumulative_cases = match parse_count(rec.get(*col).unwrap_or(""), label, row)? {
				Some(v) => v,
				None => {
					nulls += 1;
					continue
				},
			};
			result.push(CaseObservation{
				geoid: geoid.clone(),
				state_name: state_name.clone(),
				population,
				date_label: label.clone(),
				cumulative_cases,
			});
		}

		if i % 10 == 9 {
			progress.update(i + 1);
		}
	}
	progress.finish(table.len());

	info!(
		"reshaped {} entities x {} dates into {} long rows ({} null cells skipped)",
		table.len(), date_cols.len(), result.len(), nulls,
	);
	Ok(result)
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::progress::NullMeter;

	fn reshape(data: &str) -> Result<Vec<CaseObservation>> {
		let table = WideTable::from_bytes(data.as_bytes())?;
		reshape_long(&table, &IdentifierColumns::default(), &mut NullMeter)
	}

	#[test]
	fn produces_one_row_per_entity_and_date() {
		let rows = reshape("\
fips,name,population,20200301,20200302,20200303
01,Alabama,4903185,0,1,3
02,Alaska,731545,0,0,2
").unwrap();
		assert_eq!(rows.len(), 3 * 2);
		assert_eq!(rows[0].geoid.as_str(), "01");
		assert_eq!(rows[0].state_name.as_str(), "Alabama");
		assert_eq!(rows[0].population, Some(4903185.0));
		assert_eq!(rows[2].date_label.as_str(), "20200303");
		assert_eq!(rows[2].cumulative_cases, 3);
		assert_eq!(rows[5].state_name.as_str(), "Alaska");
		assert_eq!(rows[5].cumulative_cases, 2);
	}

	#[test]
	fn non_date_columns_are_ignored() {
		let rows = reshape("\
fips,name,population,region,2020-03-01
01,Alabama,100,South,4
").unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].date_label.as_str(), "2020-03-01");
	}

	#[test]
	fn tab_delimited_input_is_detected() {
		let rows = reshape("fips\tname\tpopulation\t20200301\n01\tAlabama\t100\t7\n").unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].cumulative_cases, 7);
	}

	#[test]
	fn digit_column_that_is_no_date_is_rejected() {
		match reshape("fips,name,population,2020abc\n01,Alabama,100,1\n") {
			Err(Error::MalformedDateColumn{column}) => assert_eq!(column, "2020abc"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn missing_identifier_column_is_reported() {
		match reshape("fips,state,population,20200301\n01,Alabama,100,1\n") {
			Err(Error::MissingColumn{column}) => assert_eq!(column, "name"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn null_cells_are_skipped() {
		let rows = reshape("\
fips,name,population,20200301,20200302
01,Alabama,100,NA,2
02,Alaska,,1,
").unwrap();
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[1].population, None);
	}

	#[test]
	fn integral_floats_and_negative_counts_are_accepted() {
		let rows = reshape("fips,name,population,20200301,20200302\n01,Alabama,100,12.0,-3\n").unwrap();
		assert_eq!(rows[0].cumulative_cases, 12);
		assert_eq!(rows[1].cumulative_cases, 0);
	}

	#[test]
	fn garbage_counts_are_malformed() {
		match reshape("fips,name,population,20200301\n01,Alabama,100,lots\n") {
			Err(Error::MalformedValue{column, row, value}) => {
				assert_eq!(column, "20200301");
				assert_eq!(row, 1);
				assert_eq!(value, "lots");
			},
			other => panic!("unexpected result: {:?}", other),
		}
	}
}
