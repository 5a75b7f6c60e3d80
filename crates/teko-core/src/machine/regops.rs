//! Register operations with exact rub-out coverage.
//!
//! Mutating a register's document briefly installs it in the view, edits it
//! inside an undo group, and reinstalls the current target. The rub-out
//! tokens replay the same dance in reverse: install the register document,
//! roll back one view group, restore the register dot, reinstall the
//! current document.

use std::path::Path;

use crate::error::{ErrorKind, Exec, Result, TekoError, TekoInt, Unwind};
use crate::qreg::{QRegister, RegKind, RegStackEntry};
use crate::strings::QRegSpec;
use crate::undo::UndoToken;
use crate::view::{DocumentId, ViewAction};

use super::Interp;

impl Interp {
	pub fn reg_entry(&mut self, spec: &QRegSpec) -> &mut QRegister {
		let table = if spec.local {
			&mut self.locals
		} else {
			&mut self.globals
		};
		table.get_or_create(&spec.name)
	}

	pub fn reg_ensure_doc(&mut self, spec: &QRegSpec) -> DocumentId {
		if let Some(doc) = self.reg_entry(spec).doc {
			return doc;
		}
		let doc = self.view.create_doc();
		self.reg_entry(spec).doc = Some(doc);
		doc
	}

	fn reg_must_undo(&self, spec: &QRegSpec) -> bool {
		if spec.local {
			self.locals.must_undo
		} else {
			true
		}
	}

	fn reg_check_writable(&mut self, spec: &QRegSpec) -> Result<()> {
		if self.reg_entry(spec).read_only {
			return Err(TekoError::command(format!(
				"Q-Register \"{}\" is read-only",
				spec.display()
			)));
		}
		Ok(())
	}

	pub fn reg_get_integer(&mut self, spec: &QRegSpec) -> Result<TekoInt> {
		Ok(self.reg_entry(spec).integer)
	}

	pub fn reg_get_string(&mut self, spec: &QRegSpec) -> Result<String> {
		if self.reg_entry(spec).kind == RegKind::WorkingDir {
			let cwd = std::env::current_dir().map_err(|e| ErrorKind::File {
				path: ".".into(),
				source: e,
			})?;
			return Ok(cwd.display().to_string());
		}
		match self.reg_entry(spec).doc {
			Some(doc) => Ok(self.view.doc_text(doc)),
			None => Ok(String::new()),
		}
	}

	pub fn reg_set_integer(&mut self, spec: &QRegSpec, v: TekoInt) -> Result<()> {
		self.reg_check_writable(spec)?;
		if self.reg_must_undo(spec) {
			let old = self.reg_entry(spec).integer;
			self.undo.push(UndoToken::RegInteger {
				spec: spec.clone(),
				value: old,
			});
		}
		self.reg_entry(spec).integer = v;
		Ok(())
	}

	/// Journals the install/undo/reinstall sequence for a register
	/// document edit. `save_dot` additionally restores the register's dot.
	fn reg_doc_op_undo(&mut self, spec: &QRegSpec, doc: DocumentId, save_dot: bool) {
		if !self.reg_must_undo(spec) {
			return;
		}
		let cur_doc = self.view.current_doc();
		let cur_dot = self.view.current_pos();
		self.undo
			.push(UndoToken::View(ViewAction::GotoPos(cur_dot)));
		self.undo.push(UndoToken::View(ViewAction::SetDoc(cur_doc)));
		if save_dot {
			let dot = self.reg_entry(spec).dot;
			self.undo.push(UndoToken::RegDot {
				spec: spec.clone(),
				dot,
			});
		}
		self.undo.push(UndoToken::View(ViewAction::Undo));
		self.undo.push(UndoToken::View(ViewAction::SetDoc(doc)));
	}

	/// Reinstalls the current target's document and caret.
	fn current_edit_install(&mut self) {
		if let Some(buffer) = self.ring.current_buffer() {
			let (doc, dot) = (buffer.doc, buffer.dot);
			self.view.set_doc(doc);
			self.view.goto_pos(dot);
		} else if let Some(spec) = self.current_reg.clone() {
			let doc = self.reg_ensure_doc(&spec);
			let dot = self.reg_entry(&spec).dot;
			self.view.set_doc(doc);
			self.view.goto_pos(dot);
		}
	}

	pub fn reg_set_string(&mut self, spec: &QRegSpec, text: &str) -> Result<()> {
		self.reg_check_writable(spec)?;
		self.current_save_dot();
		let doc = self.reg_ensure_doc(spec);
		self.reg_doc_op_undo(spec, doc, true);

		self.view.set_doc(doc);
		self.view.begin_undo_action();
		self.view.set_text(text);
		self.view.end_undo_action();
		self.reg_entry(spec).dot = 0;

		self.current_edit_install();
		Ok(())
	}

	pub fn reg_append_string(&mut self, spec: &QRegSpec, text: &str) -> Result<()> {
		if text.is_empty() {
			return Ok(());
		}
		self.reg_check_writable(spec)?;
		self.current_save_dot();
		let doc = self.reg_ensure_doc(spec);
		self.reg_doc_op_undo(spec, doc, false);

		self.view.set_doc(doc);
		self.view.begin_undo_action();
		self.view.append_text(text);
		self.view.end_undo_action();

		self.current_edit_install();
		Ok(())
	}

	/// `EQq<file>$`: replace the register's document with file contents.
	pub fn reg_load(&mut self, spec: &QRegSpec, path: &Path) -> Result<()> {
		self.reg_check_writable(spec)?;
		let bytes = std::fs::read(path).map_err(|e| ErrorKind::File {
			path: path.to_path_buf(),
			source: e,
		})?;
		let text = String::from_utf8_lossy(&bytes).into_owned();

		self.current_save_dot();
		let doc = self.reg_ensure_doc(spec);
		self.reg_doc_op_undo(spec, doc, true);

		self.view.set_doc(doc);
		self.view.begin_undo_action();
		self.view.set_text(&text);
		self.view.end_undo_action();
		self.reg_entry(spec).dot = 0;

		self.current_edit_install();
		Ok(())
	}

	/// Installs the register as the edit target.
	pub fn reg_edit(&mut self, spec: &QRegSpec) -> Result<()> {
		self.current_save_dot();
		let target = self.current_target();
		self.undo.push(UndoToken::EditTarget(target));

		let doc = self.reg_ensure_doc(spec);
		let dot = self.reg_entry(spec).dot;
		self.ring.current = None;
		self.current_reg = Some(spec.clone());
		self.view.set_doc(doc);
		self.view.goto_pos(dot);
		self.info_update();
		Ok(())
	}

	/// Executes the register's string contents as a macro.
	pub fn reg_execute(&mut self, spec: &QRegSpec, locals: bool) -> Exec<()> {
		let text = self.reg_get_string(spec).map_err(Unwind::Error)?;
		self.execute_macro(text.as_bytes(), locals)
	}

	/// `[q`: push a snapshot of the register.
	pub fn reg_stack_push(&mut self, spec: &QRegSpec) -> Result<()> {
		let integer = self.reg_entry(spec).integer;
		let dot = self.reg_entry(spec).dot;
		let src = self.reg_entry(spec).doc;
		let doc = src.map(|d| self.view.clone_doc(d));
		self.reg_stack.push(RegStackEntry { integer, doc, dot });
		self.undo.push(UndoToken::RegStackDrop);
		Ok(())
	}

	/// `]q`: pop the topmost snapshot into the register, transferring
	/// document ownership.
	pub fn reg_stack_pop(&mut self, spec: &QRegSpec) -> Result<()> {
		self.reg_check_writable(spec)?;
		let entry = self
			.reg_stack
			.pop()
			.ok_or_else(|| TekoError::command("Q-Register stack is empty"))?;

		let reg = self.reg_entry(spec);
		let old = RegStackEntry {
			integer: reg.integer,
			doc: reg.doc,
			dot: reg.dot,
		};
		reg.integer = entry.integer;
		reg.doc = entry.doc;
		reg.dot = entry.dot;

		if self.undo.enabled {
			self.undo.push(UndoToken::RegStackUnpop {
				spec: spec.clone(),
				old,
			});
		} else if let Some(doc) = old.doc {
			self.free_doc_deferred(doc);
		}
		Ok(())
	}
}
