//! The document host.
//!
//! An arena of rope-backed documents stands in for the opaque editor
//! component: buffers and Q-Registers hold [`DocumentId`] indices, and the
//! host exposes the message-style operations the command language needs,
//! always against the currently installed document. All positions are byte
//! offsets; offsets landing inside a multi-byte sequence are floored to the
//! previous character boundary.
//!
//! Destructive operations are grouped between [`ViewHost::begin_undo_action`]
//! and [`ViewHost::end_undo_action`]; [`ViewHost::undo`] rolls back one whole
//! group by restoring the rope snapshot taken when the group opened. Ropes
//! share structure, so a snapshot costs far less than a copy.

use ropey::Rope;

use crate::error::{TekoError, TekoInt};

/// Index of a document inside the host's arena.
pub type DocumentId = usize;

/// End-of-line modes, numbered like the `EL` command expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolMode {
	CrLf = 0,
	Cr = 1,
	Lf = 2,
}

impl EolMode {
	pub fn from_code(code: TekoInt) -> Option<Self> {
		match code {
			0 => Some(EolMode::CrLf),
			1 => Some(EolMode::Cr),
			2 => Some(EolMode::Lf),
			_ => None,
		}
	}

	pub fn bytes(self) -> &'static [u8] {
		match self {
			EolMode::CrLf => b"\r\n",
			EolMode::Cr => b"\r",
			EolMode::Lf => b"\n",
		}
	}

	fn default_for_platform() -> Self {
		if cfg!(windows) {
			EolMode::CrLf
		} else {
			EolMode::Lf
		}
	}
}

#[derive(Clone)]
struct Snapshot {
	rope: Rope,
	caret: usize,
}

struct Document {
	rope: Rope,
	caret: usize,
	eol: EolMode,
	use_tabs: bool,
	tab_width: usize,
	undo_stack: Vec<Snapshot>,
	pending: Option<Snapshot>,
	group_depth: u32,
}

impl Document {
	fn new() -> Self {
		Document {
			rope: Rope::new(),
			caret: 0,
			eol: EolMode::default_for_platform(),
			use_tabs: true,
			tab_width: 8,
			undo_stack: Vec::new(),
			pending: None,
			group_depth: 0,
		}
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot {
			rope: self.rope.clone(),
			caret: self.caret,
		}
	}

	/// Called before any destructive edit; self-groups when no undo action
	/// is open.
	fn touch(&mut self) {
		if self.group_depth == 0 {
			let snap = self.snapshot();
			self.undo_stack.push(snap);
		}
	}
}

/// Replayable view operations for the rub-out log.
#[derive(Debug, Clone)]
pub enum ViewAction {
	/// Roll back one undo group of the current document.
	Undo,
	GotoPos(usize),
	SetDoc(DocumentId),
	SetEolMode(EolMode),
}

/// Deferred message parameter for symbolic dispatch.
pub enum Param<'a> {
	Int(TekoInt),
	Str(&'a str),
}

/// The arena plus the notion of a current document.
pub struct ViewHost {
	docs: Vec<Option<Document>>,
	free: Vec<DocumentId>,
	current: DocumentId,
}

impl Default for ViewHost {
	fn default() -> Self {
		Self::new()
	}
}

impl ViewHost {
	pub fn new() -> Self {
		let mut host = ViewHost {
			docs: Vec::new(),
			free: Vec::new(),
			current: 0,
		};
		host.current = host.create_doc();
		host
	}

	pub fn create_doc(&mut self) -> DocumentId {
		let doc = Document::new();
		match self.free.pop() {
			Some(id) => {
				self.docs[id] = Some(doc);
				id
			}
			None => {
				self.docs.push(Some(doc));
				self.docs.len() - 1
			}
		}
	}

	/// Clones a document's content into a fresh arena slot (register stack
	/// pushes).
	pub fn clone_doc(&mut self, id: DocumentId) -> DocumentId {
		let src = self.doc(id).snapshot();
		let new = self.create_doc();
		let doc = self.doc_mut(new);
		doc.rope = src.rope;
		doc.caret = 0;
		new
	}

	pub fn free_doc(&mut self, id: DocumentId) {
		debug_assert_ne!(id, self.current);
		if let Some(slot) = self.docs.get_mut(id) {
			if slot.take().is_some() {
				self.free.push(id);
			}
		}
	}

	fn doc(&self, id: DocumentId) -> &Document {
		self.docs[id].as_ref().expect("document slot is live")
	}

	fn doc_mut(&mut self, id: DocumentId) -> &mut Document {
		self.docs[id].as_mut().expect("document slot is live")
	}

	fn cur(&self) -> &Document {
		self.doc(self.current)
	}

	fn cur_mut(&mut self) -> &mut Document {
		let id = self.current;
		self.doc_mut(id)
	}

	pub fn current_doc(&self) -> DocumentId {
		self.current
	}

	/// Installs another backing document (`setDocPointer`).
	pub fn set_doc(&mut self, id: DocumentId) {
		debug_assert!(self.docs.get(id).map(|d| d.is_some()).unwrap_or(false));
		self.current = id;
	}

	fn floor_char(rope: &Rope, pos: usize) -> usize {
		let mut pos = pos.min(rope.len_bytes());
		loop {
			if let Ok(idx) = rope.try_byte_to_char(pos) {
				return idx;
			}
			pos -= 1;
		}
	}

	pub fn len(&self) -> usize {
		self.cur().rope.len_bytes()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn current_pos(&self) -> usize {
		self.cur().caret
	}

	/// The byte at `pos`, or 0 off-page.
	pub fn char_at(&self, pos: usize) -> u8 {
		let rope = &self.cur().rope;
		if pos < rope.len_bytes() {
			rope.byte(pos)
		} else {
			0
		}
	}

	pub fn goto_pos(&mut self, pos: usize) {
		let len = self.len();
		self.cur_mut().caret = pos.min(len);
	}

	pub fn goto_line(&mut self, line: usize) {
		let pos = self.position_from_line(line);
		self.cur_mut().caret = pos;
	}

	pub fn line_count(&self) -> usize {
		self.cur().rope.len_lines()
	}

	pub fn line_from_position(&self, pos: usize) -> usize {
		let rope = &self.cur().rope;
		rope.byte_to_line(pos.min(rope.len_bytes()))
	}

	pub fn position_from_line(&self, line: usize) -> usize {
		let rope = &self.cur().rope;
		if line >= rope.len_lines() {
			rope.len_bytes()
		} else {
			rope.line_to_byte(line)
		}
	}

	pub fn set_text(&mut self, text: &str) {
		let doc = self.cur_mut();
		doc.touch();
		doc.rope = Rope::from_str(text);
		doc.caret = 0;
	}

	pub fn clear_all(&mut self) {
		let doc = self.cur_mut();
		doc.touch();
		doc.rope = Rope::new();
		doc.caret = 0;
	}

	/// Inserts at the caret, advancing it (`addText`).
	pub fn add_text(&mut self, text: &str) {
		let doc = self.cur_mut();
		doc.touch();
		let at = Self::floor_char(&doc.rope, doc.caret);
		doc.rope.insert(at, text);
		doc.caret = doc.rope.char_to_byte(at) + text.len();
	}

	/// Appends at the end without moving the caret.
	pub fn append_text(&mut self, text: &str) {
		let doc = self.cur_mut();
		doc.touch();
		let at = doc.rope.len_chars();
		doc.rope.insert(at, text);
	}

	/// Inserts at an absolute position, keeping the caret on the same
	/// content.
	pub fn insert_text(&mut self, pos: usize, text: &str) {
		let doc = self.cur_mut();
		doc.touch();
		let at = Self::floor_char(&doc.rope, pos);
		let byte_at = doc.rope.char_to_byte(at);
		doc.rope.insert(at, text);
		if byte_at <= doc.caret {
			doc.caret += text.len();
		}
	}

	pub fn delete_range(&mut self, pos: usize, len: usize) {
		let doc = self.cur_mut();
		doc.touch();
		let start = Self::floor_char(&doc.rope, pos);
		let end = Self::floor_char(&doc.rope, pos + len);
		let start_byte = doc.rope.char_to_byte(start);
		let end_byte = doc.rope.char_to_byte(end);
		doc.rope.remove(start..end);
		if doc.caret >= end_byte {
			doc.caret -= end_byte - start_byte;
		} else if doc.caret > start_byte {
			doc.caret = start_byte;
		}
	}

	/// The whole document as a contiguous string (save path).
	pub fn text(&self) -> String {
		self.cur().rope.to_string()
	}

	pub fn doc_text(&self, id: DocumentId) -> String {
		self.doc(id).rope.to_string()
	}

	pub fn doc_len(&self, id: DocumentId) -> usize {
		self.doc(id).rope.len_bytes()
	}

	pub fn doc_eol(&self, id: DocumentId) -> EolMode {
		self.doc(id).eol
	}

	pub fn text_range(&self, from: usize, to: usize) -> String {
		let rope = &self.cur().rope;
		let a = Self::floor_char(rope, from);
		let b = Self::floor_char(rope, to.max(from));
		rope.slice(a..b).to_string()
	}

	fn is_word_byte(b: u8) -> bool {
		b.is_ascii_alphanumeric() || b == b'_'
	}

	/// End of the word at or after the caret.
	pub fn word_right_end(&self) -> usize {
		let rope = &self.cur().rope;
		let len = rope.len_bytes();
		let mut pos = self.cur().caret.min(len);
		while pos < len && !Self::is_word_byte(rope.byte(pos)) {
			pos += 1;
		}
		while pos < len && Self::is_word_byte(rope.byte(pos)) {
			pos += 1;
		}
		pos
	}

	/// End of the word before the caret.
	pub fn word_left_end(&self) -> usize {
		let rope = &self.cur().rope;
		let mut pos = self.cur().caret.min(rope.len_bytes());
		while pos > 0 && Self::is_word_byte(rope.byte(pos - 1)) {
			pos -= 1;
		}
		while pos > 0 && !Self::is_word_byte(rope.byte(pos - 1)) {
			pos -= 1;
		}
		pos
	}

	pub fn move_word_right_end(&mut self) {
		let pos = self.word_right_end();
		self.cur_mut().caret = pos;
	}

	pub fn move_word_left_end(&mut self) {
		let pos = self.word_left_end();
		self.cur_mut().caret = pos;
	}

	/// Deletes from the caret to the end of the word right of it.
	pub fn del_word_right_end(&mut self) {
		let pos = self.current_pos();
		let end = self.word_right_end();
		if end > pos {
			self.delete_range(pos, end - pos);
		}
	}

	pub fn begin_undo_action(&mut self) {
		let doc = self.cur_mut();
		if doc.group_depth == 0 {
			doc.pending = Some(doc.snapshot());
		}
		doc.group_depth += 1;
	}

	pub fn end_undo_action(&mut self) {
		let doc = self.cur_mut();
		if doc.group_depth == 0 {
			return;
		}
		doc.group_depth -= 1;
		if doc.group_depth == 0 {
			if let Some(snap) = doc.pending.take() {
				doc.undo_stack.push(snap);
			}
		}
	}

	/// Rolls back one undo group of the current document.
	pub fn undo(&mut self) {
		let doc = self.cur_mut();
		if let Some(snap) = doc.undo_stack.pop() {
			doc.rope = snap.rope;
			doc.caret = snap.caret;
		}
	}

	pub fn eol_mode(&self) -> EolMode {
		self.cur().eol
	}

	pub fn set_eol_mode(&mut self, mode: EolMode) {
		self.cur_mut().eol = mode;
	}

	pub fn use_tabs(&self) -> bool {
		self.cur().use_tabs
	}

	pub fn set_use_tabs(&mut self, on: bool) {
		self.cur_mut().use_tabs = on;
	}

	pub fn tab_width(&self) -> usize {
		self.cur().tab_width
	}

	pub fn set_tab_width(&mut self, width: usize) {
		self.cur_mut().tab_width = width.max(1);
	}

	/// Visual column of a position, expanding tabs.
	pub fn column(&self, pos: usize) -> usize {
		let doc = self.cur();
		let line_start = {
			let line = doc.rope.byte_to_line(pos.min(doc.rope.len_bytes()));
			doc.rope.line_to_byte(line)
		};
		let mut column = 0;
		for b in line_start..pos.min(doc.rope.len_bytes()) {
			if doc.rope.byte(b) == b'\t' {
				column += doc.tab_width - column % doc.tab_width;
			} else {
				column += 1;
			}
		}
		column
	}

	pub fn apply(&mut self, action: &ViewAction) {
		match action {
			ViewAction::Undo => self.undo(),
			ViewAction::GotoPos(pos) => self.goto_pos(*pos),
			ViewAction::SetDoc(id) => self.set_doc(*id),
			ViewAction::SetEolMode(mode) => self.set_eol_mode(*mode),
		}
	}

	/// Symbolic dispatch for the `ES` command. State changes made through
	/// here carry no rub-out coverage.
	pub fn dispatch(
		&mut self,
		symbol: &str,
		wparam: TekoInt,
		lparam: Param,
	) -> Result<TekoInt, TekoError> {
		let name = symbol.to_ascii_uppercase();
		let name = name.strip_prefix("VW_").unwrap_or(&name);
		let w = wparam.max(0) as usize;
		let lstr = match lparam {
			Param::Str(s) => s,
			Param::Int(_) => "",
		};
		let lint = match lparam {
			Param::Int(v) => v,
			Param::Str(_) => 0,
		};

		let r = match name {
			"GETLENGTH" => self.len() as TekoInt,
			"GETCURRENTPOS" => self.current_pos() as TekoInt,
			"GETCHARAT" => self.char_at(w) as TekoInt,
			"GOTOPOS" => {
				self.goto_pos(w);
				0
			}
			"GOTOLINE" => {
				self.goto_line(w);
				0
			}
			"LINEFROMPOSITION" => self.line_from_position(w) as TekoInt,
			"POSITIONFROMLINE" => self.position_from_line(w) as TekoInt,
			"GETLINECOUNT" => self.line_count() as TekoInt,
			"CLEARALL" => {
				self.clear_all();
				0
			}
			"SETTEXT" => {
				self.set_text(lstr);
				0
			}
			"ADDTEXT" => {
				self.add_text(lstr);
				0
			}
			"APPENDTEXT" => {
				self.append_text(lstr);
				0
			}
			"INSERTTEXT" => {
				self.insert_text(w, lstr);
				0
			}
			"DELETERANGE" => {
				self.delete_range(w, lint.max(0) as usize);
				0
			}
			"BEGINUNDOACTION" => {
				self.begin_undo_action();
				0
			}
			"ENDUNDOACTION" => {
				self.end_undo_action();
				0
			}
			"UNDO" => {
				self.undo();
				0
			}
			"SCROLLCARET" => 0,
			"GETEOLMODE" => self.eol_mode() as TekoInt,
			"SETEOLMODE" => match EolMode::from_code(wparam) {
				Some(mode) => {
					self.set_eol_mode(mode);
					0
				}
				None => {
					return Err(TekoError::command(format!(
						"invalid EOL mode {} for <SETEOLMODE>",
						wparam
					)))
				}
			},
			"GETUSETABS" => self.use_tabs() as TekoInt,
			"SETUSETABS" => {
				self.set_use_tabs(wparam != 0);
				0
			}
			"GETTABWIDTH" => self.tab_width() as TekoInt,
			"SETTABWIDTH" => {
				self.set_tab_width(w);
				0
			}
			"GETCOLUMN" => self.column(w) as TekoInt,
			"WORDRIGHTEND" => {
				self.move_word_right_end();
				self.current_pos() as TekoInt
			}
			"WORDLEFTEND" => {
				self.move_word_left_end();
				self.current_pos() as TekoInt
			}
			"DELWORDRIGHTEND" => {
				self.del_word_right_end();
				0
			}
			_ => {
				return Err(TekoError::command(format!(
					"unknown view message symbol \"{}\"",
					symbol
				)))
			}
		};
		Ok(r)
	}
}

#[cfg(test)]
mod tests;
