use std::io;

use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;


/// Failure kinds of a pipeline run.
///
/// Undefined rates and unmatched join keys are not errors; they surface as
/// `None` on the affected row.
#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to fetch {file:?} from dataset {dataset:?}: {reason}")]
	FetchFailure {
		dataset: String,
		file: String,
		reason: String,
	},
	#[error("date column {column:?} is not a year-month-day label")]
	MalformedDateColumn {
		column: String,
	},
	#[error("unparsable date {value:?}")]
	UnparsableDate {
		value: String,
	},
	#[error("required column {column:?} is missing from the table header")]
	MissingColumn {
		column: String,
	},
	#[error("malformed value {value:?} in column {column:?} at row {row}")]
	MalformedValue {
		column: String,
		row: usize,
		value: String,
	},
	#[error("geometry error: {0}")]
	Geometry(String),
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error(transparent)]
	Csv(#[from] csv::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn fetch<D: Into<String>, F: Into<String>, R: ToString>(dataset: D, file: F, reason: R) -> Self {
		Self::FetchFailure{
			dataset: dataset.into(),
			file: file.into(),
			reason: reason.to_string(),
		}
	}

	/// Only fetch failures are worth retrying; everything else is a property
	/// of the data and will fail the same way again.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::FetchFailure{..} => true,
			Self::Io(e) => matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::ConnectionReset),
			_ => false,
		}
	}

	pub fn is_data_error(&self) -> bool {
		matches!(
			self,
			Self::MalformedDateColumn{..} | Self::UnparsableDate{..} | Self::MissingColumn{..} | Self::MalformedValue{..} | Self::Geometry(_)
		)
	}
}
