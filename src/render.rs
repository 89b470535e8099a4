//! Declarative chart and map specifications for the renderer.
//!
//! Drawing is left to a Vega-Lite runtime; this module only assembles the
//! finalized data and the visual encoding into one JSON document per artifact.
use std::fs;
use std::path::PathBuf;

use log::info;

use serde_json::{json, Value};

use super::error::Result;
use super::model::{JoinedWeeklyRecord, LongCaseRecord};


static VEGA_LITE_SCHEMA: &'static str = "https://vega.github.io/schema/vega-lite/v5.json";
static FACET_COLUMNS: u32 = 8;


#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
	pub name: String,
	pub document: Value,
}


/// Consumer of finalized chart specifications.
pub trait Renderer {
	fn render(&mut self, spec: &ChartSpec) -> Result<()>;
}


/// Writes each specification as `<out_dir>/<name>.vl.json`.
pub struct VegaLiteWriter {
	out_dir: PathBuf,
	written: Vec<PathBuf>,
}

impl VegaLiteWriter {
	pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
		Self{
			out_dir: out_dir.into(),
			written: Vec::new(),
		}
	}

	pub fn written(&self) -> &[PathBuf] {
		&self.written
	}
}

impl Renderer for VegaLiteWriter {
	fn render(&mut self, spec: &ChartSpec) -> Result<()> {
		fs::create_dir_all(&self.out_dir)?;
		let path = self.out_dir.join(format!("{}.vl.json", spec.name));
		let f = fs::File::create(&path)?;
		serde_json::to_writer_pretty(f, &spec.document)?;
		info!("wrote {}", path.display());
		self.written.push(path);
		Ok(())
	}
}


fn faceted_line_chart(name: &str, title: &str, y_field: &str, y_title: &str, records: &[LongCaseRecord], defined: fn(&LongCaseRecord) -> bool) -> Result<ChartSpec> {
	let rows: Vec<&LongCaseRecord> = records.iter().filter(|r| defined(r)).collect();
	Ok(ChartSpec{
		name: name.into(),
		document: json!({
			"$schema": VEGA_LITE_SCHEMA,
			"title": {"text": title, "subtitle": "Cases per 100,000 residents"},
			"data": {"values": serde_json::to_value(&rows)?},
			"facet": {"field": "state_name", "type": "nominal", "columns": FACET_COLUMNS, "title": null},
			"spec": {
				"width": 120,
				"height": 80,
				"mark": {"type": "line", "strokeWidth": 1},
				"encoding": {
					"x": {"field": "date", "type": "temporal", "title": null},
					"y": {"field": y_field, "type": "quantitative", "title": y_title}
				}
			}
		}),
	})
}

pub fn daily_rate_chart(records: &[LongCaseRecord]) -> Result<ChartSpec> {
	faceted_line_chart(
		"daily_rate",
		"Daily new cases per 100k",
		"daily_rate_per_100k",
		"daily rate",
		records,
		|r| r.daily_rate_per_100k.is_some(),
	)
}

pub fn cumulative_rate_chart(records: &[LongCaseRecord]) -> Result<ChartSpec> {
	faceted_line_chart(
		"cumulative_rate",
		"Cumulative cases per 100k",
		"cumulative_rate_per_100k",
		"cumulative rate",
		records,
		|r| r.cumulative_rate_per_100k.is_some(),
	)
}


/// The most recent week present, which the map shows as its snapshot.
pub fn latest_week(joined: &[JoinedWeeklyRecord]) -> Option<u32> {
	joined.iter().map(|j| j.weekly.week_of_year).max()
}

/// Choropleth of the weekly rate for a single week. Rows without geometry
/// cannot be drawn and are left out.
pub fn weekly_rate_map(joined: &[JoinedWeeklyRecord], week: u32) -> Result<ChartSpec> {
	let mut features = Vec::new();
	let mut crs = None;
	for j in joined.iter().filter(|j| j.weekly.week_of_year == week) {
		let geometry = match &j.geometry {
			Some(g) => g,
			None => continue,
		};
		crs = crs.or(j.crs);
		features.push(json!({
			"type": "Feature",
			"properties": serde_json::to_value(&j.weekly)?,
			"geometry": serde_json::to_value(&geojson::Geometry::new(geojson::Value::from(&**geometry)))?
		}));
	}
	let crs_label = crs.map(|c| c.to_string()).unwrap_or_else(|| "unknown CRS".into());
	Ok(ChartSpec{
		name: format!("weekly_rate_map_week{:02}", week),
		document: json!({
			"$schema": VEGA_LITE_SCHEMA,
			"title": {
				"text": format!("Weekly cases per 100k, week {}", week),
				"subtitle": format!("Sum of daily rates; projected coordinates ({})", crs_label)
			},
			"width": 800,
			"height": 500,
			"data": {
				"values": {"type": "FeatureCollection", "features": features},
				"format": {"type": "json", "property": "features"}
			},
			"projection": {"type": "identity", "reflectY": true},
			"mark": {"type": "geoshape", "stroke": "white", "strokeWidth": 0.5},
			"encoding": {
				"color": {
					"field": "properties.weekly_rate_per_100k",
					"type": "quantitative",
					"scale": {"scheme": "reds"},
					"title": "rate per 100k"
				},
				"tooltip": [
					{"field": "properties.state_name", "type": "nominal", "title": "state"},
					{"field": "properties.weekly_new_cases", "type": "quantitative", "title": "new cases"},
					{"field": "properties.weekly_rate_per_100k", "type": "quantitative", "title": "rate per 100k", "format": ".1f"}
				]
			}
		}),
	})
}
