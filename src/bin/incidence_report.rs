use std::fs;
use std::io;
use std::path::Path;

use log::warn;

use serde::Serialize;

use incidence::{
	render, Config, DatasetFetcher, DataverseClient, GeoJsonBoundaries, LocalFetcher, Pipeline, Renderer, VegaLiteWriter,
};


fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> io::Result<()> {
	let mut w = csv::Writer::from_path(path)?;
	for row in rows {
		w.serialize(row)?;
	}
	w.flush()?;
	Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	pretty_env_logger::init();

	let mut cfg = Config::from_env()?;
	if let Some(out) = std::env::args().nth(1) {
		cfg.output_dir = out.into();
	}

	let fetcher: Box<dyn DatasetFetcher> = match &cfg.data_dir {
		Some(dir) => Box::new(LocalFetcher::new(dir.clone())),
		None => Box::new(DataverseClient::new(cfg.dataverse_url.clone())),
	};
	let boundaries = GeoJsonBoundaries::new(cfg.boundaries.clone(), cfg.boundary_name_field.clone());
	let pipeline = Pipeline::new(cfg.columns.clone(), cfg.week_convention);

	println!("preparing {} from {} ...", cfg.file, cfg.dataset);
	let mut progress = incidence::default_output("reshape", None);
	let output = pipeline.run(&*fetcher, &boundaries, &cfg.dataset, &cfg.file, &mut *progress)?;

	println!("writing tables to {} ...", cfg.output_dir.display());
	fs::create_dir_all(&cfg.output_dir)?;
	write_csv(cfg.output_dir.join("long.csv"), &output.long)?;
	write_csv(cfg.output_dir.join("weekly.csv"), &output.weekly)?;

	println!("writing chart specifications ...");
	let mut renderer = VegaLiteWriter::new(cfg.output_dir.join("charts"));
	renderer.render(&render::daily_rate_chart(&output.long)?)?;
	renderer.render(&render::cumulative_rate_chart(&output.long)?)?;
	match render::latest_week(&output.joined) {
		Some(week) => renderer.render(&render::weekly_rate_map(&output.joined, week)?)?,
		None => warn!("no weekly rows survived the join; skipping the map"),
	}
	Ok(())
}
