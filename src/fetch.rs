use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use bytes::Bytes;

use serde::Deserialize;

use super::error::{Error, Result};


/// Source of raw tabular bytes for a (dataset, file) pair.
pub trait DatasetFetcher {
	fn fetch(&self, dataset: &str, file: &str) -> Result<Bytes>;
}


/// Opens a local file, transparently decompressing it if it ends in `.gz`.
pub fn open_maybe_gzip<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	let f = fs::File::open(path)?;
	match path.extension() {
		Some(x) if x == "gz" => Ok(Box::new(flate2::read::GzDecoder::new(f))),
		_ => Ok(Box::new(f)),
	}
}

pub fn read_maybe_gzip<P: AsRef<Path>>(path: P) -> io::Result<Bytes> {
	let mut r = open_maybe_gzip(path)?;
	let mut buf = Vec::new();
	r.read_to_end(&mut buf)?;
	Ok(buf.into())
}


/// Reads dataset files from a directory laid out as `<root>/<file>`; a
/// gzipped `<file>.gz` is used if the plain file does not exist. The dataset
/// identifier is only used for error reporting.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
	root: PathBuf,
}

impl LocalFetcher {
	pub fn new<P: Into<PathBuf>>(root: P) -> Self {
		Self{root: root.into()}
	}

	fn resolve(&self, file: &str) -> Option<PathBuf> {
		let plain = self.root.join(file);
		if plain.is_file() {
			return Some(plain)
		}
		let gz = self.root.join(format!("{}.gz", file));
		if gz.is_file() {
			return Some(gz)
		}
		None
	}
}

impl DatasetFetcher for LocalFetcher {
	fn fetch(&self, dataset: &str, file: &str) -> Result<Bytes> {
		let path = match self.resolve(file) {
			Some(p) => p,
			None => return Err(Error::fetch(dataset, file, format!("not found in {}", self.root.display()))),
		};
		debug!("reading {} from {}", file, path.display());
		read_maybe_gzip(&path).map_err(|e| Error::fetch(dataset, file, e))
	}
}


#[derive(Debug, Clone, Deserialize)]
struct DataverseEnvelope<T> {
	status: String,
	#[serde(default)]
	message: Option<String>,
	data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct DataverseFileEntry {
	label: String,
	#[serde(rename = "dataFile")]
	data_file: DataverseDataFile,
}

#[derive(Debug, Clone, Deserialize)]
struct DataverseDataFile {
	id: u64,
}


/// Client for the native API of a Dataverse repository.
pub struct DataverseClient {
	client: reqwest::blocking::Client,
	server_url: String,
}

impl DataverseClient {
	pub fn new(server_url: String) -> Self {
		Self{
			client: reqwest::blocking::Client::new(),
			server_url: server_url.trim_end_matches('/').to_string(),
		}
	}

	fn get(&self, dataset: &str, file: &str, url: &str, query: &[(&str, &str)]) -> Result<reqwest::blocking::Response> {
		trace!("GET {} {:?}", url, query);
		let resp = self.client.get(url).query(query).send().map_err(|e| Error::fetch(dataset, file, e))?;
		let status = resp.status();
		if status.is_success() {
			return Ok(resp)
		}
		match status {
			reqwest::StatusCode::NOT_FOUND => Err(Error::fetch(dataset, file, "not found in repository")),
			reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::UNAUTHORIZED => Err(Error::fetch(dataset, file, "permission denied")),
			_ => Err(Error::fetch(dataset, file, format!("unexpected HTTP status {}", status))),
		}
	}

	/// Resolves a file label within the latest published version of a
	/// dataset to its numeric file id.
	pub fn file_id(&self, dataset: &str, file: &str) -> Result<u64> {
		let url = format!("{}/api/datasets/:persistentId/versions/:latest-published/files", self.server_url);
		let resp = self.get(dataset, file, &url, &[("persistentId", dataset)])?;
		let envelope: DataverseEnvelope<Vec<DataverseFileEntry>> = resp.json().map_err(|e| Error::fetch(dataset, file, e))?;
		if envelope.status != "OK" {
			return Err(Error::fetch(dataset, file, envelope.message.unwrap_or(envelope.status)))
		}
		let entries = envelope.data.unwrap_or_default();
		debug!("dataset {} lists {} files", dataset, entries.len());
		find_file_id(&entries, file).ok_or_else(|| Error::fetch(dataset, file, "no such file in dataset"))
	}
}

fn find_file_id(entries: &[DataverseFileEntry], file: &str) -> Option<u64> {
	entries.iter().find(|e| e.label == file).map(|e| e.data_file.id)
}

impl DatasetFetcher for DataverseClient {
	fn fetch(&self, dataset: &str, file: &str) -> Result<Bytes> {
		let id = self.file_id(dataset, file)?;
		let url = format!("{}/api/access/datafile/{}", self.server_url, id);
		let resp = self.get(dataset, file, &url, &[])?;
		let body = resp.bytes().map_err(|e| Error::fetch(dataset, file, e))?;
		debug!("fetched {} bytes for {} (file id {})", body.len(), file, id);
		Ok(body)
	}
}
