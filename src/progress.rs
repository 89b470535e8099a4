use std::io;
use std::io::Write;
use std::time;

use log::debug;


pub trait ProgressSink {
	fn update(&mut self, inow: usize);
	fn finish(&mut self, inow: usize);
}


/// Carriage-return meter on stderr, for interactive runs.
pub struct ProgressMeter {
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
	n: Option<usize>,
}

impl ProgressMeter {
	pub fn start(n: Option<usize>) -> Self {
		let now = time::Instant::now();
		let mut meter = Self{
			t0: now,
			tprev: now,
			iprev: 0,
			n,
		};
		meter.print(0, 0.0, "\r");
		meter
	}

	fn print(&mut self, inow: usize, rate: f64, end: &str) {
		let mut err = io::stderr();
		let _ = match self.n {
			Some(n) if n > 0 => write!(err, "{:6.0}% [{:8.2}/s]{}", (inow as f64) / (n as f64) * 100.0, rate, end),
			_ => write!(err, "{:12} [{:8.2}/s]{}", inow, rate, end),
		};
		let _ = err.flush();
	}
}

impl ProgressSink for ProgressMeter {
	fn update(&mut self, inow: usize) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64().max(1e-9);
		let rate = inow.saturating_sub(self.iprev) as f64 / dt;
		self.print(inow, rate, "\r");
		self.iprev = inow;
		self.tprev = now;
	}

	fn finish(&mut self, inow: usize) {
		let dt = (time::Instant::now() - self.t0).as_secs_f64().max(1e-9);
		let rate = inow as f64 / dt;
		self.print(inow, rate, "\n");
	}
}


/// Meter for non-interactive runs: reports through the logger instead of
/// redrawing a terminal line.
pub struct LogMeter {
	label: &'static str,
	t0: time::Instant,
}

impl LogMeter {
	pub fn new(label: &'static str) -> Self {
		Self{
			label,
			t0: time::Instant::now(),
		}
	}
}

impl ProgressSink for LogMeter {
	fn update(&mut self, inow: usize) {
		debug!("{}: {} done", self.label, inow);
	}

	fn finish(&mut self, inow: usize) {
		debug!("{}: {} done in {:.2}s", self.label, inow, self.t0.elapsed().as_secs_f64());
	}
}


/// Discards all progress; used by tests and library callers that do not care.
pub struct NullMeter;

impl ProgressSink for NullMeter {
	fn update(&mut self, _inow: usize) {}
	fn finish(&mut self, _inow: usize) {}
}


pub fn default_output(label: &'static str, n: Option<usize>) -> Box<dyn ProgressSink> {
	if isatty::stderr_isatty() {
		Box::new(ProgressMeter::start(n))
	} else {
		Box::new(LogMeter::new(label))
	}
}
