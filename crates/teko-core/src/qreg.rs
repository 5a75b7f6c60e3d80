//! Q-Register cells, tables and the register stack.
//!
//! A register owns an integer, a saved dot and (lazily) a document in the
//! view arena. Two tables are live at any time: the process-wide globals
//! and the current frame's locals. Tables created for macro frames do not
//! journal undo; the top-level tables do.

use std::collections::HashMap;

use crate::error::TekoInt;
use crate::strings::QRegSpec;
use crate::view::DocumentId;

/// Register behavior variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegKind {
	#[default]
	Plain,
	/// `$`: reads the working directory on demand.
	WorkingDir,
}

/// One register cell.
#[derive(Debug, Clone, Default)]
pub struct QRegister {
	pub integer: TekoInt,
	pub doc: Option<DocumentId>,
	pub dot: usize,
	pub kind: RegKind,
	pub read_only: bool,
}

/// A keyed register table.
#[derive(Debug, Default)]
pub struct QRegisterTable {
	regs: HashMap<String, QRegister>,
	/// Whether mutations of this table's registers journal undo.
	pub must_undo: bool,
}

impl QRegisterTable {
	pub fn new(must_undo: bool) -> Self {
		QRegisterTable {
			regs: HashMap::new(),
			must_undo,
		}
	}

	/// Seeds the general-purpose cells `A`..`Z` and `0`..`9`.
	pub fn insert_defaults(&mut self) {
		for q in b'A'..=b'Z' {
			self.regs.entry((q as char).to_string()).or_default();
		}
		for q in b'0'..=b'9' {
			self.regs.entry((q as char).to_string()).or_default();
		}
	}

	pub fn insert(&mut self, name: impl Into<String>, reg: QRegister) {
		self.regs.insert(name.into(), reg);
	}

	pub fn get(&self, name: &str) -> Option<&QRegister> {
		self.regs.get(name)
	}

	pub fn get_mut(&mut self, name: &str) -> Option<&mut QRegister> {
		self.regs.get_mut(name)
	}

	/// Missing cells auto-create on first reference.
	pub fn get_or_create(&mut self, name: &str) -> &mut QRegister {
		self.regs.entry(name.to_string()).or_default()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.regs.contains_key(name)
	}

	/// Empties the table, yielding the documents that must be returned to
	/// the arena.
	pub fn drain_docs(&mut self) -> Vec<DocumentId> {
		self.regs
			.drain()
			.filter_map(|(_, reg)| reg.doc)
			.collect()
	}

	pub fn names(&self) -> impl Iterator<Item = &String> {
		self.regs.keys()
	}
}

/// A detached register snapshot on the register stack.
#[derive(Debug)]
pub struct RegStackEntry {
	pub integer: TekoInt,
	pub doc: Option<DocumentId>,
	pub dot: usize,
}

/// The escape register holding the editable command line.
pub fn cmdline_reg_spec() -> QRegSpec {
	QRegSpec::global("\x1b")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_cover_letters_and_digits() {
		let mut t = QRegisterTable::new(true);
		t.insert_defaults();
		assert!(t.contains("A"));
		assert!(t.contains("Z"));
		assert!(t.contains("0"));
		assert!(t.contains("9"));
		assert!(!t.contains("["));
	}

	#[test]
	fn lookup_auto_creates() {
		let mut t = QRegisterTable::new(true);
		assert!(!t.contains("long name"));
		t.get_or_create("long name").integer = 7;
		assert_eq!(t.get("long name").unwrap().integer, 7);
	}

	#[test]
	fn drain_collects_documents() {
		let mut t = QRegisterTable::new(false);
		t.get_or_create("A").doc = Some(3);
		t.get_or_create("B");
		let docs = t.drain_docs();
		assert_eq!(docs, vec![3]);
		assert!(!t.contains("A"));
	}
}
