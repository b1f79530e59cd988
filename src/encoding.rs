//! UTF-16LE to UTF-8 normalization of downloaded tree dumps

use std::path::Path;

use crate::error::SyncError;
use crate::logging::*;

const BOM: char = '\u{FEFF}';

/// Decode UTF-16LE bytes, dropping anything that is not a valid code point
///
/// Unpaired surrogates and a trailing odd byte are discarded; a leading
/// byte-order mark is removed.
pub fn decode_utf16le(bytes: &[u8]) -> String {
	let units = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
	let mut text: String = char::decode_utf16(units).filter_map(Result::ok).collect();
	if text.starts_with(BOM) {
		text.drain(..BOM.len_utf8());
	}
	text
}

/// Merge normalized sources into one canonical document
///
/// Exactly one line break is inserted after every source but the last.
pub fn concat_sources<S: AsRef<str>>(sources: &[S]) -> String {
	let mut document = String::with_capacity(sources.iter().map(|s| s.as_ref().len() + 1).sum());
	for (i, text) in sources.iter().enumerate() {
		document.push_str(text.as_ref());
		if i + 1 < sources.len() {
			document.push('\n');
		}
	}
	document
}

/// Convert raw UTF-16LE dumps into the canonical UTF-8 tree document
///
/// Returns the number of bytes written. A missing input file means the fetch
/// step lied about its result, so it is reported as an encoding failure.
pub fn normalize_files(inputs: &[&Path], output: &Path) -> Result<u64, SyncError> {
	if inputs.is_empty() {
		return Err(SyncError::encoding("no downloaded tree dump to convert"));
	}

	let mut texts = Vec::with_capacity(inputs.len());
	for input in inputs {
		let raw = std::fs::read(input).map_err(|e| {
			SyncError::encoding(format!("cannot read {}: {}", input.display(), e))
		})?;
		let text = decode_utf16le(&raw);
		debug!("Decoded {} ({} bytes -> {} bytes)", input.display(), raw.len(), text.len());
		texts.push(text);
	}

	let document = concat_sources(&texts);
	if let Some(parent) = output.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(output, document.as_bytes()).map_err(|e| {
		SyncError::encoding(format!("cannot write {}: {}", output.display(), e))
	})?;
	Ok(document.len() as u64)
}


// vim: ts=4
