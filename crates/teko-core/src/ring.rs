//! The buffer ring.
//!
//! Buffers are ordered and addressed by 1-based position; each one has a
//! stable serial id so rub-out tokens can refer to a buffer across
//! close/reopen cycles. Loading and saving honors the automatic EOL
//! translation flag, and saves of existing files go through hidden
//! save-point files so they can be rolled back.

use std::path::{Path, PathBuf};

use crate::view::{DocumentId, EolMode};

/// Stable identity of a buffer, independent of its ring position.
pub type BufferId = u64;

#[derive(Debug)]
pub struct Buffer {
	pub id: BufferId,
	pub filename: Option<PathBuf>,
	pub doc: DocumentId,
	pub dot: usize,
	pub dirty: bool,
}

impl Buffer {
	/// Display name for messages and the info banner.
	pub fn name(&self) -> String {
		self.filename
			.as_ref()
			.map(|p| p.display().to_string())
			.unwrap_or_else(|| "(Unnamed)".into())
	}
}

#[derive(Debug, Default)]
pub struct Ring {
	buffers: Vec<Buffer>,
	next_id: BufferId,
	savepoint_serial: u32,
	pub current: Option<BufferId>,
}

impl Ring {
	pub fn new() -> Self {
		Ring::default()
	}

	pub fn len(&self) -> usize {
		self.buffers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buffers.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
		self.buffers.iter()
	}

	/// Appends a new buffer and returns its id.
	pub fn push(&mut self, filename: Option<PathBuf>, doc: DocumentId) -> BufferId {
		self.next_id += 1;
		let id = self.next_id;
		self.buffers.push(Buffer {
			id,
			filename,
			doc,
			dot: 0,
			dirty: false,
		});
		id
	}

	pub fn index_of(&self, id: BufferId) -> Option<usize> {
		self.buffers.iter().position(|b| b.id == id)
	}

	pub fn get(&self, id: BufferId) -> Option<&Buffer> {
		self.buffers.iter().find(|b| b.id == id)
	}

	pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
		self.buffers.iter_mut().find(|b| b.id == id)
	}

	/// 1-based ring position.
	pub fn position(&self, id: BufferId) -> Option<usize> {
		self.index_of(id).map(|i| i + 1)
	}

	pub fn by_position(&self, pos: usize) -> Option<&Buffer> {
		if pos == 0 {
			return None;
		}
		self.buffers.get(pos - 1)
	}

	pub fn find_by_path(&self, canonical: &Path) -> Option<BufferId> {
		self.buffers
			.iter()
			.find(|b| b.filename.as_deref() == Some(canonical))
			.map(|b| b.id)
	}

	pub fn current_buffer(&self) -> Option<&Buffer> {
		self.current.and_then(|id| self.get(id))
	}

	pub fn current_mut(&mut self) -> Option<&mut Buffer> {
		let id = self.current?;
		self.get_mut(id)
	}

	pub fn is_any_dirty(&self) -> bool {
		self.buffers.iter().any(|b| b.dirty)
	}

	/// Detaches a buffer, returning it with its former index.
	pub fn remove(&mut self, id: BufferId) -> Option<(Buffer, usize)> {
		let index = self.index_of(id)?;
		Some((self.buffers.remove(index), index))
	}

	/// Reattaches a buffer at its former location.
	pub fn insert_at(&mut self, index: usize, buffer: Buffer) {
		let index = index.min(self.buffers.len());
		self.buffers.insert(index, buffer);
	}

	/// The buffer to fall back to after removing `index`: the one now at
	/// that index, else the previous one.
	pub fn neighbor_after_removal(&self, index: usize) -> Option<BufferId> {
		self.buffers
			.get(index)
			.or_else(|| index.checked_sub(1).and_then(|i| self.buffers.get(i)))
			.map(|b| b.id)
	}

	pub fn next_savepoint_serial(&mut self) -> u32 {
		let serial = self.savepoint_serial;
		self.savepoint_serial += 1;
		serial
	}
}

/// Absolute, canonicalized-if-possible version of a path.
pub fn absolute_path(path: &Path) -> PathBuf {
	match std::fs::canonicalize(path) {
		Ok(p) => p,
		Err(_) => {
			if path.is_absolute() {
				path.to_path_buf()
			} else {
				std::env::current_dir()
					.map(|cwd| cwd.join(path))
					.unwrap_or_else(|_| path.to_path_buf())
			}
		}
	}
}

/// Hidden transactional save-point name alongside the original file.
pub fn savepoint_path(original: &Path, serial: u32) -> PathBuf {
	let basename = original
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default();
	let name = format!(".teco-{}-{}", basename, serial);
	match original.parent() {
		Some(dir) => dir.join(name),
		None => PathBuf::from(name),
	}
}

/// Detects the EOL convention of loaded bytes and normalizes them to LF.
pub fn translate_in(bytes: &[u8]) -> (String, Option<EolMode>) {
	let text = String::from_utf8_lossy(bytes);
	let mut detected = None;
	for (i, &b) in bytes.iter().enumerate() {
		match b {
			b'\r' => {
				detected = Some(if bytes.get(i + 1) == Some(&b'\n') {
					EolMode::CrLf
				} else {
					EolMode::Cr
				});
				break;
			}
			b'\n' => {
				detected = Some(EolMode::Lf);
				break;
			}
			_ => {}
		}
	}
	let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
	(normalized, detected)
}

/// Expands LF back into the document's EOL sequence for saving.
pub fn translate_out(text: &str, mode: EolMode) -> Vec<u8> {
	match mode {
		EolMode::Lf => text.as_bytes().to_vec(),
		EolMode::Cr => text.replace('\n', "\r").into_bytes(),
		EolMode::CrLf => text.replace('\n', "\r\n").into_bytes(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn positions_are_one_based() {
		let mut ring = Ring::new();
		let a = ring.push(None, 0);
		let b = ring.push(Some(PathBuf::from("/tmp/x")), 1);
		assert_eq!(ring.position(a), Some(1));
		assert_eq!(ring.position(b), Some(2));
		assert_eq!(ring.by_position(2).map(|buf| buf.id), Some(b));
		assert_eq!(ring.by_position(0).map(|buf| buf.id), None);
	}

	#[test]
	fn removal_falls_back_to_next_then_previous() {
		let mut ring = Ring::new();
		let a = ring.push(None, 0);
		let b = ring.push(None, 1);
		let c = ring.push(None, 2);

		let (_buf, idx) = ring.remove(b).unwrap();
		assert_eq!(ring.neighbor_after_removal(idx), Some(c));

		let (_buf, idx) = ring.remove(c).unwrap();
		assert_eq!(ring.neighbor_after_removal(idx), Some(a));

		let (_buf, idx) = ring.remove(a).unwrap();
		assert_eq!(ring.neighbor_after_removal(idx), None);
	}

	#[test]
	fn reinsert_restores_order() {
		let mut ring = Ring::new();
		let a = ring.push(None, 0);
		let b = ring.push(None, 1);
		let (buf, idx) = ring.remove(a).unwrap();
		ring.insert_at(idx, buf);
		assert_eq!(ring.position(a), Some(1));
		assert_eq!(ring.position(b), Some(2));
	}

	#[test]
	fn savepoint_names_are_hidden_siblings() {
		let p = savepoint_path(Path::new("/home/u/notes.txt"), 3);
		assert_eq!(p, PathBuf::from("/home/u/.teco-notes.txt-3"));
	}

	#[test]
	fn eol_translation_round_trips() {
		let (text, mode) = translate_in(b"a\r\nb\r\n");
		assert_eq!(text, "a\nb\n");
		assert_eq!(mode, Some(EolMode::CrLf));
		assert_eq!(translate_out(&text, EolMode::CrLf), b"a\r\nb\r\n");

		let (text, mode) = translate_in(b"a\rb");
		assert_eq!(text, "a\nb");
		assert_eq!(mode, Some(EolMode::Cr));

		let (text, mode) = translate_in(b"plain");
		assert_eq!(text, "plain");
		assert_eq!(mode, None);
	}
}
