//! Rendering of collected manifests to stdout.

use std::io::{self, ErrorKind, Write};

use anyhow::{Context, Result};
use manifest_collector::DecodedManifest;

/// Output format for the collected manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
	/// A single pretty-printed JSON array
	#[default]
	Json,
	/// A multi-document YAML stream, one document per manifest
	Yaml,
}

/// Write `manifests` to `writer` in the given format.
pub fn write_manifests<W: Write>(
	mut writer: W,
	manifests: &[DecodedManifest],
	format: OutputFormat,
) -> Result<()> {
	match format {
		OutputFormat::Json => {
			serde_json::to_writer_pretty(&mut writer, manifests)
				.context("serializing manifests to JSON")?;
			writeln!(writer)?;
		}
		OutputFormat::Yaml => {
			for manifest in manifests {
				let doc = serde_yaml::to_string(manifest).context("serializing manifest to YAML")?;
				write!(writer, "---\n{doc}")?;
			}
		}
	}
	writer.flush()?;
	Ok(())
}

/// A writer wrapper that silently handles broken pipe errors.
///
/// Lets the command exit cleanly when its output is piped into a process that
/// stops reading early (e.g., `collect-manifests | head -20`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}
