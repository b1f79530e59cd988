//! Tree document parsing
//!
//! A tree dump is a plain listing where every line is one entry and the number
//! of `|` markers gives its depth:
//!
//! ```text
//! |Movies
//! ||Show
//! |||episode1.mp4
//! ```
//!
//! [`MediaPathScanner`] walks such a document top to bottom, keeps the open
//! ancestry in a [`PathStack`] and yields the relative path of every entry whose
//! extension is accepted.

use std::collections::BTreeSet;
use std::io::{self, BufRead};

/// Indentation marker counted to obtain a line's depth
pub const DEPTH_MARKER: char = '|';

/// Lines between two progress reports while scanning
pub const PROGRESS_LINES: usize = 3000;

/// Case-insensitive set of accepted file extensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
	extensions: BTreeSet<String>,
}

impl ExtensionSet {
	/// Parse a comma separated list; both `,` and the full-width `，` separate entries
	pub fn parse(list: &str) -> Self {
		let extensions = list
			.split([',', '，'])
			.map(|e| e.trim().trim_start_matches('.').to_lowercase())
			.filter(|e| !e.is_empty())
			.collect();
		ExtensionSet { extensions }
	}

	pub fn len(&self) -> usize {
		self.extensions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.extensions.is_empty()
	}

	/// Does `name` end in an accepted extension?
	pub fn matches(&self, name: &str) -> bool {
		match name.rsplit_once('.') {
			Some((_, ext)) => self.extensions.contains(&ext.to_lowercase()),
			None => false,
		}
	}
}

/// One line of the tree document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
	pub depth: usize,
	pub name: String,
}

impl TreeLine {
	/// Split a raw line into depth and cleaned name
	///
	/// Returns `None` for lines whose name is empty after cleaning.
	pub fn parse(raw: &str) -> Option<TreeLine> {
		let depth = raw.matches(DEPTH_MARKER).count();
		let name = raw
			.trim_start_matches(|c: char| c == DEPTH_MARKER || c == '-' || c == '—' || c.is_whitespace())
			.trim();
		if name.is_empty() {
			return None;
		}
		Some(TreeLine { depth, name: name.to_string() })
	}
}

/// Currently open ancestry, indexed by depth
#[derive(Debug, Default)]
pub struct PathStack {
	levels: Vec<Option<String>>,
}

impl PathStack {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record `name` at `depth`, forgetting everything below it
	///
	/// Entries deeper than `depth` belong to a closed subtree; keeping them
	/// would let a malformed depth jump pick up a sibling's ancestors.
	pub fn push(&mut self, depth: usize, name: String) {
		if self.levels.len() <= depth {
			self.levels.resize(depth + 1, None);
		}
		self.levels[depth] = Some(name);
		self.levels.truncate(depth + 1);
	}

	/// Names recorded for depths `0..=depth`, skipping unset levels
	pub fn ancestry(&self, depth: usize) -> Vec<&str> {
		self.levels.iter().take(depth + 1).filter_map(|n| n.as_deref()).collect()
	}
}

/// Build a relative media path from an ancestry chain
///
/// The first `exclude_levels` names are dropped; `None` when nothing remains.
pub fn relative_path(ancestry: &[&str], exclude_levels: usize) -> Option<String> {
	if ancestry.len() <= exclude_levels {
		return None;
	}
	Some(ancestry[exclude_levels..].join("/"))
}

/// Count lines in a document, for progress reporting
pub fn count_lines<R: BufRead>(mut reader: R) -> io::Result<usize> {
	let mut count = 0;
	let mut buf = Vec::new();
	loop {
		buf.clear();
		if reader.read_until(b'\n', &mut buf)? == 0 {
			break;
		}
		count += 1;
	}
	Ok(count)
}

/// Lazy scanner yielding accepted relative media paths in document order
///
/// Duplicates are yielded as often as they occur. Invalid UTF-8 is replaced
/// rather than reported.
pub struct MediaPathScanner<'a, R> {
	reader: R,
	extensions: &'a ExtensionSet,
	exclude_levels: usize,
	stack: PathStack,
	lines_read: usize,
	buf: Vec<u8>,
	line_hook: Option<(usize, LineHook<'a>)>,
}

/// Callback receiving the number of lines consumed so far
pub type LineHook<'a> = Box<dyn FnMut(usize) + Send + 'a>;

impl<'a, R: BufRead> MediaPathScanner<'a, R> {
	pub fn new(reader: R, extensions: &'a ExtensionSet, exclude_levels: usize) -> Self {
		MediaPathScanner {
			reader,
			extensions,
			exclude_levels,
			stack: PathStack::new(),
			lines_read: 0,
			buf: Vec::new(),
			line_hook: None,
		}
	}

	/// Call `hook` after every `every` consumed lines, media or not
	pub fn on_lines(mut self, every: usize, hook: impl FnMut(usize) + Send + 'a) -> Self {
		self.line_hook = Some((every.max(1), Box::new(hook)));
		self
	}

	/// Number of lines consumed so far
	pub fn lines_read(&self) -> usize {
		self.lines_read
	}

	fn process_line(&mut self) -> Option<String> {
		let raw = String::from_utf8_lossy(&self.buf);
		let line = TreeLine::parse(&raw)?;
		let is_media = line.name.contains('.') && self.extensions.matches(&line.name);
		let depth = line.depth;
		self.stack.push(depth, line.name);
		if !is_media {
			return None;
		}
		relative_path(&self.stack.ancestry(depth), self.exclude_levels)
	}
}

impl<R: BufRead> Iterator for MediaPathScanner<'_, R> {
	type Item = io::Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			self.buf.clear();
			match self.reader.read_until(b'\n', &mut self.buf) {
				Ok(0) => return None,
				Ok(_) => {}
				Err(e) => return Some(Err(e)),
			}
			self.lines_read += 1;
			if let Some((every, hook)) = &mut self.line_hook {
				if self.lines_read % *every == 0 {
					hook(self.lines_read);
				}
			}
			if let Some(path) = self.process_line() {
				return Some(Ok(path));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	fn scan(doc: &str, exts: &str, exclude: usize) -> Vec<String> {
		let set = ExtensionSet::parse(exts);
		MediaPathScanner::new(Cursor::new(doc.as_bytes()), &set, exclude)
			.collect::<io::Result<Vec<_>>>()
			.unwrap()
	}

	#[test]
	fn test_extension_set_parse_mixed_commas() {
		let set = ExtensionSet::parse("MP4, mkv，.srt,,  ");
		assert_eq!(set.len(), 3);
		assert!(set.matches("a.mp4"));
		assert!(set.matches("B.MKV"));
		assert!(set.matches("sub.zh.srt"));
		assert!(!set.matches("poster.jpg"));
		assert!(!set.matches("mp4"));
	}

	#[test]
	fn test_tree_line_parse() {
		assert_eq!(
			TreeLine::parse("|||episode1.mp4\r\n"),
			Some(TreeLine { depth: 3, name: "episode1.mp4".to_string() })
		);
		assert_eq!(
			TreeLine::parse("| |— - Season 1 "),
			Some(TreeLine { depth: 2, name: "Season 1".to_string() })
		);
		assert_eq!(TreeLine::parse("|||   \n"), None);
		assert_eq!(TreeLine::parse(""), None);
	}

	#[test]
	fn test_tree_line_keeps_inner_dashes() {
		let line = TreeLine::parse("||-Spider-Man - Homecoming.mkv").unwrap();
		assert_eq!(line.name, "Spider-Man - Homecoming.mkv");
	}

	#[test]
	fn test_end_to_end_example() {
		let doc = "|Movies\n||Show\n|||episode1.mp4\n|||episode1.nfo\n";
		assert_eq!(scan(doc, "mp4", 1), vec!["Show/episode1.mp4".to_string()]);
	}

	#[test]
	fn test_exclusion_depth_boundary() {
		// Ancestry [Root, a.mp4] has two entries: dropped at exclude=2, kept at exclude=1
		let doc = "|Root\n||a.mp4\n";
		assert_eq!(scan(doc, "mp4", 2), Vec::<String>::new());
		assert_eq!(scan(doc, "mp4", 3), Vec::<String>::new());
		assert_eq!(scan(doc, "mp4", 1), vec!["a.mp4".to_string()]);
		assert_eq!(scan(doc, "mp4", 0), vec!["Root/a.mp4".to_string()]);

		// One level deeper survives exclude=2 with only its last entry
		let doc = "|Root\n||Dir\n|||deep.mp4\n";
		assert_eq!(scan(doc, "mp4", 2), vec!["deep.mp4".to_string()]);
		assert_eq!(scan(doc, "mp4", 3), Vec::<String>::new());
	}

	#[test]
	fn test_sibling_subtrees_do_not_leak() {
		let doc = "|Lib\n||A\n|||Deep\n||||x.mp4\n||B\n||||y.mp4\n";
		// y.mp4 jumps from depth 2 to 4; the stale "Deep" must not be reused
		assert_eq!(
			scan(doc, "mp4", 0),
			vec!["Lib/A/Deep/x.mp4".to_string(), "Lib/B/y.mp4".to_string()]
		);
	}

	#[test]
	fn test_duplicates_are_kept() {
		let doc = "|R\n||a.mp4\n||a.mp4\n";
		assert_eq!(scan(doc, "mp4", 0), vec!["R/a.mp4".to_string(), "R/a.mp4".to_string()]);
	}

	#[test]
	fn test_every_emitted_path_has_accepted_extension() {
		let doc = "|R\n||x.MP4\n||y.mkv\n||z.txt\n||noext\n||dir.d\n|||w.Srt\n";
		let set = ExtensionSet::parse("mp4,srt");
		let paths = scan(doc, "mp4,srt", 0);
		assert_eq!(paths.len(), 2);
		for path in &paths {
			let last = path.rsplit('/').next().unwrap();
			assert!(set.matches(last), "unexpected path {}", path);
		}
	}

	#[test]
	fn test_invalid_utf8_is_tolerated() {
		let set = ExtensionSet::parse("mp4");
		let doc: &[u8] = b"|R\n||bad\xff.mp4\n";
		let paths: Vec<String> =
			MediaPathScanner::new(Cursor::new(doc), &set, 0).map(|p| p.unwrap()).collect();
		assert_eq!(paths.len(), 1);
		assert!(paths[0].starts_with("R/bad"));
	}

	#[test]
	fn test_lines_read_and_count_lines() {
		let doc = "|R\n\n||a.mp4\n||b.txt";
		assert_eq!(count_lines(Cursor::new(doc.as_bytes())).unwrap(), 4);

		let set = ExtensionSet::parse("mp4");
		let mut scanner = MediaPathScanner::new(Cursor::new(doc.as_bytes()), &set, 0);
		assert_eq!(scanner.next().unwrap().unwrap(), "R/a.mp4");
		assert_eq!(scanner.lines_read(), 3);
		assert!(scanner.next().is_none());
		assert_eq!(scanner.lines_read(), 4);
	}

	#[test]
	fn test_line_hook_fires_without_media() {
		let mut doc = String::from("|R\n||a.mp4\n");
		for i in 0..10_000 {
			doc.push_str(&format!("||dir{}\n", i));
		}
		let set = ExtensionSet::parse("mp4");
		let mut ticks = Vec::new();
		let paths: Vec<String> = MediaPathScanner::new(Cursor::new(doc.as_bytes()), &set, 0)
			.on_lines(PROGRESS_LINES, |lines| ticks.push(lines))
			.map(|p| p.unwrap())
			.collect();

		assert_eq!(paths, vec!["R/a.mp4".to_string()]);
		assert_eq!(ticks, vec![3000, 6000, 9000]);
	}
}

// vim: ts=4
