//! Replay and commit of rub-out tokens.
//!
//! Failures inside a token are logged as warnings and the token is
//! discarded, matching the save-point recovery policy.

use crate::frontend::Severity;
use crate::qreg::RegStackEntry;
use crate::undo::UndoToken;

use super::{Interp, Target};

impl Interp {
	/// Replays one token, newest-first order is the caller's concern.
	pub(crate) fn run_undo_token(&mut self, token: UndoToken) {
		match token {
			UndoToken::State(s) => self.state = s,
			UndoToken::Mode(m) => self.mode = m,
			UndoToken::Colon(v) => self.colon = v,
			UndoToken::At(v) => self.at = v,
			UndoToken::SkipElse(v) => self.skip_else = v,
			UndoToken::NestLevel(v) => self.nest_level = v,
			UndoToken::EscapeChar(c) => self.escape_char = c,
			UndoToken::StringNesting(n) => self.strarg.nesting = n,
			UndoToken::StringLen(n) => self.strarg.buf.truncate(n),
			UndoToken::StringArg(buf) => self.strarg.buf = buf,
			UndoToken::StringBuilder(machine) => self.strbuild = *machine,
			UndoToken::QSpec(machine) => self.qspec = *machine,
			UndoToken::EsMessage(msg) => self.es_msg = msg,
			UndoToken::SkipLabel(label) => self.skip_label = label,
			UndoToken::GotoEntry { label, prev } => match prev {
				Some(pc) => {
					self.goto_table.set(label, pc);
				}
				None => self.goto_table.remove(&label),
			},

			UndoToken::ExprPush(entry) => self.expr.raw_push(entry),
			UndoToken::ExprPop => self.expr.raw_pop(),
			UndoToken::NumSign(v) => self.expr.num_sign = v,
			UndoToken::Radix(v) => self.expr.radix = v,
			UndoToken::BraceLevel(v) => self.expr.brace_level = v,

			UndoToken::LoopPush(ctx) => self.loop_stack.push(ctx),
			UndoToken::LoopPop => {
				self.loop_stack.pop();
			}
			UndoToken::LoopCounter { index, counter } => {
				if let Some(ctx) = self.loop_stack.get_mut(index) {
					ctx.counter = counter;
				}
			}

			UndoToken::Flags(f) => self.flags = f,
			UndoToken::QuitRequested(v) => self.quit_requested = v,
			UndoToken::MemLimit(v) => self.memlimit.limit = v,

			UndoToken::View(action) => self.view.apply(&action),
			UndoToken::EditTarget(target) => self.target_edit(&target),
			UndoToken::InfoUpdate => self.info_update(),

			UndoToken::RegInteger { spec, value } => self.reg_entry(&spec).integer = value,
			UndoToken::RegDot { spec, dot } => self.reg_entry(&spec).dot = dot,
			UndoToken::RegDoc { spec, doc } => self.reg_entry(&spec).doc = doc,
			UndoToken::RegStackDrop => {
				if let Some(entry) = self.reg_stack.pop() {
					if let Some(doc) = entry.doc {
						self.free_doc_deferred(doc);
					}
				}
			}
			UndoToken::RegStackUnpop { spec, old } => {
				let reg = self.reg_entry(&spec);
				let entry = RegStackEntry {
					integer: reg.integer,
					doc: reg.doc,
					dot: reg.dot,
				};
				reg.integer = old.integer;
				reg.doc = old.doc;
				reg.dot = old.dot;
				self.reg_stack.push(entry);
			}

			UndoToken::BufferDirty { id, dirty } => {
				if let Some(buffer) = self.ring.get_mut(id) {
					buffer.dirty = dirty;
				}
			}
			UndoToken::BufferFilename { id, filename } => {
				if let Some(buffer) = self.ring.get_mut(id) {
					buffer.filename = filename;
				}
			}
			UndoToken::ReinsertBuffer { buffer, index } => {
				let id = buffer.id;
				self.ring.insert_at(index, *buffer);
				self.target_edit(&Target::Buffer(id));
			}
			UndoToken::CloseBuffer { id } => {
				// A later token reinstalls the previous target; only the
				// ring membership is unwound here.
				if let Some((buffer, _)) = self.ring.remove(id) {
					if self.ring.current == Some(id) {
						self.ring.current = None;
					}
					self.free_doc_deferred(buffer.doc);
				}
			}

			UndoToken::RemoveFile(path) => {
				let _ = std::fs::remove_file(&path);
			}
			UndoToken::RestoreSavepoint {
				savepoint,
				original,
			} => {
				if std::fs::rename(&savepoint, &original).is_err() {
					let text = format!(
						"Unable to restore save point file \"{}\"",
						savepoint.display()
					);
					self.msg(Severity::Warning, &text);
				}
			}
			UndoToken::ChangeDir(dir) => {
				// Changing back may fail; handled silently.
				let _ = std::env::set_current_dir(&dir);
			}
		}
	}

	/// Runs the commit side of a token when the command line is accepted.
	pub(crate) fn commit_undo_token(&mut self, token: UndoToken) {
		match token {
			UndoToken::RestoreSavepoint { savepoint, .. } => {
				let _ = std::fs::remove_file(&savepoint);
			}
			UndoToken::RegStackUnpop { old, .. } => {
				if let Some(doc) = old.doc {
					self.free_doc_deferred(doc);
				}
			}
			UndoToken::ReinsertBuffer { buffer, .. } => {
				self.free_doc_deferred(buffer.doc);
			}
			_ => {}
		}
	}

	/// Frees an arena document unless it is still installed; installed
	/// ones wait in `pending_free` until the view moves on.
	pub(crate) fn free_doc_deferred(&mut self, doc: crate::view::DocumentId) {
		if doc != self.view.current_doc() {
			self.view.free_doc(doc);
		} else {
			self.pending_free.push(doc);
		}
	}

	/// Releases deferred documents that are no longer installed.
	pub(crate) fn flush_doc_frees(&mut self) {
		let current = self.view.current_doc();
		let pending = std::mem::take(&mut self.pending_free);
		for doc in pending {
			if doc == current {
				self.pending_free.push(doc);
			} else {
				self.view.free_doc(doc);
			}
		}
	}
}
