//! String-argument handling.
//!
//! All commands that take a `text$` argument share one driver: it captures
//! custom terminators for `@`-modified commands, tracks `{...}` nesting,
//! feeds the string-building machine, and hands the finished string to the
//! per-command `done` handler. Insert commands additionally `process`
//! pending bytes after every step so interactive typing shows up
//! immediately.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, Exec, TekoError, Unwind};
use crate::undo::UndoToken;
use crate::view::ViewAction;

use super::{Interp, Mode, State, ESC};

pub(super) struct StringParams {
	/// Whether string-building escapes are interpreted.
	pub building: bool,
	/// Whether this is the command's final string argument.
	pub last: bool,
}

pub(super) fn string_params(state: State) -> Option<StringParams> {
	match state {
		State::Insert { building } => Some(StringParams {
			building,
			last: true,
		}),
		State::InsertIndent
		| State::EsLparam
		| State::SetQRegString
		| State::GotoCmd
		| State::EditFile
		| State::SaveFile
		| State::LoadQReg
		| State::MacroFile
		| State::ChangeDir => Some(StringParams {
			building: true,
			last: true,
		}),
		State::EsSymbols => Some(StringParams {
			building: true,
			last: false,
		}),
		_ => None,
	}
}

impl Interp {
	pub(super) fn expect_string_input(&mut self, state: State, chr: u8) -> Exec<State> {
		let params = string_params(state).expect("state takes a string argument");

		if chr == 0 {
			// Entry: reset the accumulator and the building machine.
			if !self.strarg.buf.is_empty() {
				let old = std::mem::take(&mut self.strarg.buf);
				self.undo.push(UndoToken::StringArg(old));
			}
			if self.strarg.nesting != 1 {
				self.undo
					.push(UndoToken::StringNesting(self.strarg.nesting));
				self.strarg.nesting = 1;
			}
			if params.building {
				self.undo
					.push(UndoToken::StringBuilder(Box::new(self.strbuild.clone())));
				self.strbuild.reset();
			}
			if self.mode == Mode::Normal {
				self.string_initial(state)?;
			}
			return Ok(state);
		}

		// An @-modified command adopts its first character as terminator.
		if self.at {
			if params.last {
				self.set_at(false);
			}
			if self.escape_char == ESC || self.escape_char == b'{' {
				self.set_escape_char(chr.to_ascii_uppercase());
				return Ok(state);
			}
		}

		if self.escape_char == b'{' {
			match chr {
				b'{' => {
					self.undo
						.push(UndoToken::StringNesting(self.strarg.nesting));
					self.strarg.nesting += 1;
				}
				b'}' => {
					self.undo
						.push(UndoToken::StringNesting(self.strarg.nesting));
					self.strarg.nesting -= 1;
				}
				_ => {}
			}
		} else if chr.to_ascii_uppercase() == self.escape_char {
			self.undo
				.push(UndoToken::StringNesting(self.strarg.nesting));
			self.strarg.nesting -= 1;
		}

		if self.strarg.nesting == 0 {
			let bytes = std::mem::take(&mut self.strarg.buf);
			self.undo.push(UndoToken::StringArg(bytes.clone()));
			if params.last {
				self.set_escape_char(ESC);
			}
			self.strarg.nesting = 1;

			// Only the insert states have a `process` step for text that
			// has not been flushed interactively yet.
			if self.strarg.insert_len > 0 {
				if matches!(state, State::Insert { .. } | State::InsertIndent) {
					let start = bytes.len().saturating_sub(self.strarg.insert_len);
					let text = String::from_utf8_lossy(&bytes[start..]).into_owned();
					self.insert_grouped(&text);
				}
				self.strarg.insert_len = 0;
			}
			let string = String::from_utf8_lossy(&bytes).into_owned();
			return self.string_done(state, &string);
		}

		if self.mode != Mode::Normal {
			return Ok(state);
		}

		if params.building {
			self.undo
				.push(UndoToken::StringBuilder(Box::new(self.strbuild.clone())));
			if let Some(bytes) = self.strbuild_input(chr)? {
				if !bytes.is_empty() {
					self.undo.push(UndoToken::StringLen(self.strarg.buf.len()));
					self.strarg.buf.extend_from_slice(&bytes);
					self.strarg.insert_len += bytes.len();
				}
			}
		} else {
			self.undo.push(UndoToken::StringLen(self.strarg.buf.len()));
			self.strarg.buf.push(chr);
			self.strarg.insert_len += 1;
		}
		Ok(state)
	}

	fn strbuild_input(&mut self, chr: u8) -> crate::error::Result<Option<Vec<u8>>> {
		let mut machine = std::mem::take(&mut self.strbuild);
		let result = machine.input(chr, self);
		self.strbuild = machine;
		result
	}

	fn string_initial(&mut self, state: State) -> Exec<()> {
		match state {
			State::Insert { .. } => self.insert_initial(false),
			State::InsertIndent => self.insert_initial(true),
			State::EditFile => self.eb_initial(),
			_ => Ok(()),
		}
	}

	fn string_done(&mut self, state: State, arg: &str) -> Exec<State> {
		match state {
			State::Insert { .. } | State::InsertIndent => Ok(State::Start),
			State::GotoCmd => self.goto_done(arg),
			State::EsSymbols => self.es_symbols_done(arg),
			State::EsLparam => self.es_lparam_done(arg),
			State::SetQRegString => self.ctlu_done(arg),
			State::EditFile => self.eb_done(arg),
			State::SaveFile => self.ew_done(arg),
			State::LoadQReg => self.eq_done(arg),
			State::MacroFile => self.em_done(arg),
			State::ChangeDir => self.fg_done(arg),
			_ => Err(TekoError::command("state takes no string argument").into()),
		}
	}

	// --- insertion ---

	/// Stacked arguments are inserted as character codes before the text.
	fn insert_initial(&mut self, indent: bool) -> Exec<()> {
		self.expr.eval(&mut self.undo)?;
		let args = self.expr.args();
		if args > 0 {
			self.view.begin_undo_action();
			for i in (0..args).rev() {
				let code = self.expr.peek_num(i).unwrap_or(0);
				let byte = [code as u8];
				let text = String::from_utf8_lossy(&byte).into_owned();
				self.view.add_text(&text);
			}
			for _ in 0..args {
				self.expr.pop_num_calc(&mut self.undo)?;
			}
			self.view.end_undo_action();
			self.dirtify();
			if self.current_doc_must_undo() {
				self.undo.push(UndoToken::View(ViewAction::Undo));
			}
		}

		if indent {
			self.view.begin_undo_action();
			if self.view.use_tabs() {
				self.view.add_text("\t");
			} else {
				let width = self.view.tab_width();
				let column = self.view.column(self.view.current_pos());
				let fill = width - column % width;
				self.view.add_text(&" ".repeat(fill));
			}
			self.view.end_undo_action();
			self.dirtify();
			if self.current_doc_must_undo() {
				self.undo.push(UndoToken::View(ViewAction::Undo));
			}
		}
		Ok(())
	}

	/// Flushes the newest `new_len` accumulated bytes into the document.
	pub(super) fn insert_process(&mut self, new_len: usize) {
		let start = self.strarg.buf.len().saturating_sub(new_len);
		let text = String::from_utf8_lossy(&self.strarg.buf[start..]).into_owned();
		self.insert_grouped(&text);
	}

	fn insert_grouped(&mut self, text: &str) {
		if text.is_empty() {
			return;
		}
		self.view.begin_undo_action();
		self.view.add_text(text);
		self.view.end_undo_action();
		self.dirtify();
		if self.current_doc_must_undo() {
			self.undo.push(UndoToken::View(ViewAction::Undo));
		}
	}

	// --- file-argument commands ---

	fn eb_initial(&mut self) -> Exec<()> {
		let id = self.expr.pop_num_calc_or(&mut self.undo, -1)?;
		self.eb_allow_filename = true;

		if id == 0 {
			let entries: Vec<(String, bool)> = self
				.ring
				.iter()
				.map(|b| (b.name(), Some(b.id) == self.ring.current))
				.collect();
			for (name, current) in entries {
				self.frontend.popup_add(&name, current);
			}
			self.frontend.popup_show();
		} else if id > 0 {
			self.eb_allow_filename = false;
			self.ring_edit_id(id)?;
		}
		Ok(())
	}

	fn eb_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		if !self.eb_allow_filename {
			if !arg.is_empty() {
				return Err(TekoError::command(
					"if a buffer is selected by id, the <EB> string argument must be empty",
				)
				.into());
			}
			return Ok(State::Start);
		}
		if arg.is_empty() {
			self.ring_edit_path(None)?;
		} else {
			let path = expand_path(arg);
			self.ring_edit_path(Some(&path))?;
		}
		Ok(State::Start)
	}

	fn ew_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let path = if arg.is_empty() {
			None
		} else {
			Some(expand_path(arg))
		};
		self.ring_save(path.as_deref())?;
		Ok(State::Start)
	}

	fn eq_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let spec = self
			.reg_arg
			.clone()
			.ok_or_else(|| TekoError::command("<EQ> register specification lost"))?;
		if arg.is_empty() {
			self.reg_edit(&spec)?;
		} else {
			let path = expand_path(arg);
			self.reg_load(&spec, &path)?;
		}
		Ok(State::Start)
	}

	fn em_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let locals = !self.eval_colon();
		let path = expand_path(arg);
		self.execute_file(&path, locals)?;
		Ok(State::Start)
	}

	fn fg_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let dir = if arg.is_empty() {
			PathBuf::from(self.reg_get_string(&crate::strings::QRegSpec::global("$HOME"))?)
		} else {
			expand_path(arg)
		};

		if let Ok(prev) = std::env::current_dir() {
			self.undo.push(UndoToken::ChangeDir(prev));
		}
		std::env::set_current_dir(&dir).map_err(|e| {
			Unwind::Error(TekoError::new(ErrorKind::File {
				path: dir.clone(),
				source: e,
			}))
		})?;
		Ok(State::Start)
	}
}

/// Tilde expansion for file arguments.
pub(super) fn expand_path(arg: &str) -> PathBuf {
	if arg == "~" {
		if let Ok(home) = std::env::var("HOME") {
			return PathBuf::from(home);
		}
	} else if let Some(rest) = arg.strip_prefix("~/") {
		if let Ok(home) = std::env::var("HOME") {
			return Path::new(&home).join(rest);
		}
	}
	PathBuf::from(arg)
}
