//! State boundaries: GeoJSON decoding, CRS tagging and the projection into
//! the map CRS.
use std::convert::TryFrom;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};

use geo::{Coord, MapCoords, MultiPolygon};
use geojson::GeoJson;

use smartstring::alias::{String as SmartString};

use super::error::{Error, Result};
use super::fetch::read_maybe_gzip;
use super::model::GeoEntity;


/// NAD83 / Conus Albers, used for the choropleth.
pub static MAP_CRS: Crs = Crs{epsg: 5070};
/// Default CRS of GeoJSON documents without a `crs` member.
pub static WGS84: Crs = Crs{epsg: 4326};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
	pub epsg: u32,
}

impl Crs {
	/// Parses the legacy GeoJSON `crs.properties.name` forms, e.g.
	/// `EPSG:5070`, `urn:ogc:def:crs:EPSG::5070` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
	pub fn from_name(name: &str) -> Option<Self> {
		if name.ends_with("CRS84") {
			return Some(WGS84)
		}
		let code = name.rsplit(':').next()?;
		Some(Self{epsg: code.parse().ok()?})
	}
}

impl fmt::Display for Crs {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "EPSG:{}", self.epsg)
	}
}


/// Reads the legacy `crs.properties.name` member of a FeatureCollection;
/// documents without one are WGS84.
fn declared_crs(fc: &geojson::FeatureCollection) -> Result<Crs> {
	let name = fc.foreign_members.as_ref()
		.and_then(|m| m.get("crs"))
		.and_then(|c| c.get("properties"))
		.and_then(|p| p.get("name"))
		.and_then(|n| n.as_str());
	match name {
		Some(n) => Crs::from_name(n).ok_or_else(|| Error::Geometry(format!("unrecognized CRS name {:?}", n))),
		None => Ok(WGS84),
	}
}

/// Polygons are widened to a single-member MultiPolygon; every other geometry
/// type yields `None`.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
	match geo::Geometry::<f64>::try_from(geometry).ok()? {
		geo::Geometry::MultiPolygon(mp) => Some(mp),
		geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
		_ => None,
	}
}

/// Decodes a GeoJSON FeatureCollection into named boundaries. Features
/// without a string `name_field` property or without an areal geometry are
/// skipped.
pub fn parse_feature_collection(data: &[u8], name_field: &str) -> Result<Vec<GeoEntity>> {
	let text = std::str::from_utf8(data).map_err(|e| Error::Geometry(e.to_string()))?;
	let fc = match text.parse::<GeoJson>().map_err(|e| Error::Geometry(e.to_string()))? {
		GeoJson::FeatureCollection(fc) => fc,
		_ => return Err(Error::Geometry("boundaries are not a FeatureCollection".into())),
	};
	let crs = declared_crs(&fc)?;

	let nfeatures = fc.features.len();
	let mut result = Vec::with_capacity(nfeatures);
	for feature in fc.features {
		let name = match feature.property(name_field).and_then(|v| v.as_str()) {
			Some(n) => SmartString::from(n),
			None => continue,
		};
		let geometry = match feature.geometry {
			Some(g) => g,
			None => continue,
		};
		let polygons = match to_multipolygon(geometry) {
			Some(mp) => mp,
			None => {
				warn!("skipping boundary of {}: geometry is not a polygon", name);
				continue
			},
		};
		result.push(GeoEntity{
			state_name: name,
			geometry: Arc::new(polygons),
			crs,
		});
	}
	debug!("decoded {} of {} features as {}", result.len(), nfeatures, crs);
	Ok(result)
}


// GRS80, which NAD83 uses
const GRS80_A: f64 = 6_378_137.0;
const GRS80_E2: f64 = 0.006_694_380_022_90;

/// Ellipsoidal Albers equal-area conic projection.
#[derive(Debug, Clone, Copy)]
pub struct AlbersEqualArea {
	lon0: f64,
	n: f64,
	c: f64,
	rho0: f64,
	false_easting: f64,
	false_northing: f64,
}

fn albers_q(e: f64, sin_phi: f64) -> f64 {
	let e2 = e * e;
	(1.0 - e2) * (
		sin_phi / (1.0 - e2 * sin_phi * sin_phi)
		- (1.0 / (2.0 * e)) * ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).ln()
	)
}

fn albers_m(e2: f64, phi: f64) -> f64 {
	phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt()
}

impl AlbersEqualArea {
	/// Angles in degrees.
	pub fn new(lat0: f64, lon0: f64, lat1: f64, lat2: f64, false_easting: f64, false_northing: f64) -> Self {
		let e = GRS80_E2.sqrt();
		let (phi0, phi1, phi2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());
		let m1 = albers_m(GRS80_E2, phi1);
		let m2 = albers_m(GRS80_E2, phi2);
		let q0 = albers_q(e, phi0.sin());
		let q1 = albers_q(e, phi1.sin());
		let q2 = albers_q(e, phi2.sin());
		let n = (m1 * m1 - m2 * m2) / (q2 - q1);
		let c = m1 * m1 + n * q1;
		let rho0 = GRS80_A * (c - n * q0).sqrt() / n;
		Self{
			lon0: lon0.to_radians(),
			n,
			c,
			rho0,
			false_easting,
			false_northing,
		}
	}

	/// EPSG:5070 parameters.
	pub fn conus() -> Self {
		Self::new(23.0, -96.0, 29.5, 45.5, 0.0, 0.0)
	}

	/// Projects a lon/lat coordinate (degrees) to metres.
	pub fn project(&self, p: Coord<f64>) -> Coord<f64> {
		let e = GRS80_E2.sqrt();
		let q = albers_q(e, p.y.to_radians().sin());
		let rho = GRS80_A * (self.c - self.n * q).sqrt() / self.n;
		let theta = self.n * (p.x.to_radians() - self.lon0);
		Coord{
			x: self.false_easting + rho * theta.sin(),
			y: self.false_northing + self.rho0 - rho * theta.cos(),
		}
	}
}


/// Brings boundaries into the map CRS. Boundaries already in EPSG:5070 are
/// kept as they are; geographic boundaries (EPSG:4326 or NAD83 EPSG:4269) are
/// projected.
pub fn to_map_crs(entities: Vec<GeoEntity>) -> Result<Vec<GeoEntity>> {
	let albers = AlbersEqualArea::conus();
	let mut result = Vec::with_capacity(entities.len());
	for entity in entities {
		let projected = match entity.crs.epsg {
			5070 => entity,
			4326 | 4269 => GeoEntity{
				geometry: Arc::new(entity.geometry.map_coords(|c| albers.project(c))),
				crs: MAP_CRS,
				state_name: entity.state_name,
			},
			other => return Err(Error::Geometry(format!(
				"cannot project {} from EPSG:{} into {}", entity.state_name, other, MAP_CRS,
			))),
		};
		result.push(projected);
	}
	Ok(result)
}


/// Source of entity boundaries at the state level.
pub trait GeometryFetcher {
	fn fetch_boundaries(&self) -> Result<Vec<GeoEntity>>;
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundarySource {
	Url(String),
	Path(PathBuf),
}

impl BoundarySource {
	pub fn parse(s: &str) -> Self {
		if s.starts_with("http://") || s.starts_with("https://") {
			Self::Url(s.into())
		} else {
			Self::Path(s.into())
		}
	}
}

impl fmt::Display for BoundarySource {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Url(u) => f.write_str(u),
			Self::Path(p) => write!(f, "{}", p.display()),
		}
	}
}


/// Boundaries from a GeoJSON FeatureCollection, by URL or local path.
pub struct GeoJsonBoundaries {
	source: BoundarySource,
	name_field: String,
}

impl GeoJsonBoundaries {
	pub fn new(source: BoundarySource, name_field: String) -> Self {
		Self{source, name_field}
	}

	fn load(&self) -> Result<bytes::Bytes> {
		let label = self.source.to_string();
		match &self.source {
			BoundarySource::Url(url) => {
				let resp = reqwest::blocking::get(url.as_str())
					.and_then(|r| r.error_for_status())
					.map_err(|e| Error::fetch("boundaries", label.as_str(), e))?;
				resp.bytes().map_err(|e| Error::fetch("boundaries", label.as_str(), e))
			},
			BoundarySource::Path(path) => read_maybe_gzip(path).map_err(|e| Error::fetch("boundaries", label.as_str(), e)),
		}
	}
}

impl GeometryFetcher for GeoJsonBoundaries {
	fn fetch_boundaries(&self) -> Result<Vec<GeoEntity>> {
		let data = self.load()?;
		let entities = parse_feature_collection(&data, &self.name_field)?;
		info!("loaded {} boundaries from {}", entities.len(), self.source);
		Ok(entities)
	}
}
