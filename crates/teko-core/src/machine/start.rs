//! The start state: single-character commands and arithmetic.

use crate::error::{
	is_failure, teko_bool, ErrorKind, Exec, TekoError, TekoInt, Unwind, FAILURE, SUCCESS,
};
use crate::expr::{Expressions, Op};
use crate::frontend::Severity;
use crate::qreg::cmdline_reg_spec;
use crate::strings::QRegSpec;
use crate::undo::UndoToken;
use crate::view::ViewAction;

use super::{Interp, LoopContext, Mode, State};

impl Interp {
	pub(super) fn valid_pos(&self, v: TekoInt) -> bool {
		v >= 0 && (v as usize) <= self.view.len()
	}

	pub(super) fn valid_line(&self, v: TekoInt) -> bool {
		v >= 0 && (v as usize) < self.view.line_count()
	}

	pub(super) fn start_custom(&mut self, chr: u8) -> Exec<State> {
		// Control characters are commands of the ^x table.
		if chr < 0x20 {
			return self.get_next_state(State::Control, chr | 0x40);
		}

		if chr.is_ascii_digit() {
			if self.mode != Mode::Normal {
				return Ok(State::Start);
			}
			self.expr.add_digit(&mut self.undo, chr);
			return Ok(State::Start);
		}

		match chr.to_ascii_uppercase() {
			b'/' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Div)?;
			}

			b'*' => {
				if self.cmdline_active && self.pc == 0 {
					// Special save-last-commandline command.
					return Ok(State::SaveCmdline);
				}
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Mul)?;
			}

			b'+' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Add)?;
			}

			b'-' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if self.expr.args() == 0 {
					let sign = -self.expr.num_sign;
					self.expr.set_num_sign(&mut self.undo, sign);
				} else {
					self.expr.push_calc(&mut self.undo, Op::Sub)?;
				}
			}

			b'&' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::And)?;
			}

			b'#' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Or)?;
			}

			b'(' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if self.expr.num_sign < 0 {
					// -(x) behaves like (-1)*(x).
					self.expr.set_num_sign(&mut self.undo, 1);
					self.expr.eval(&mut self.undo)?;
					self.expr.push(&mut self.undo, -1);
					self.expr.push_calc(&mut self.undo, Op::Mul)?;
				}
				self.expr.brace_open(&mut self.undo);
			}

			b')' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.brace_close(&mut self.undo)?;
			}

			b',' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_arg_sep(&mut self.undo)?;
			}

			b'.' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				let pos = self.view.current_pos() as TekoInt;
				self.expr.push(&mut self.undo, pos);
			}

			b'Z' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				let len = self.view.len() as TekoInt;
				self.expr.push(&mut self.undo, len);
			}

			b'H' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				let len = self.view.len() as TekoInt;
				self.expr.push(&mut self.undo, 0);
				self.expr.push(&mut self.undo, len);
			}

			b'\\' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				if self.expr.args() > 0 {
					let v = self.expr.pop_num_calc(&mut self.undo)?;
					self.insert_integer(v);
				} else {
					let v = self.read_integer();
					self.expr.push(&mut self.undo, v);
				}
			}

			b'<' => return self.loop_open(),
			b'>' => return self.loop_close(),
			b';' => return self.loop_break(),

			b'|' => {
				if self.mode == Mode::ParseOnlyCond {
					if !self.skip_else && self.nest_level == 0 {
						self.set_mode(Mode::Normal);
					}
					return Ok(State::Start);
				}
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				// Taken THEN branch: skip the ELSE part.
				self.set_mode(Mode::ParseOnlyCond);
			}

			b'\'' => {
				if self.mode != Mode::ParseOnlyCond {
					return Ok(State::Start);
				}
				if self.nest_level == 0 {
					self.set_mode(Mode::Normal);
					self.set_skip_else(false);
				} else {
					let n = self.nest_level;
					self.set_nest_level(n - 1);
				}
			}

			b'{' => return self.cmdline_edit(),
			b'}' => return self.cmdline_replace(),

			b'@' => {
				// Syntactically significant, set even in parse-only modes.
				self.set_at(true);
			}

			b':' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.set_colon(true);
			}

			b'J' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				let v = self.expr.pop_num_calc_or(&mut self.undo, 0)?;
				if self.valid_pos(v) {
					if self.current_doc_must_undo() {
						let pos = self.view.current_pos();
						self.undo.push(UndoToken::View(ViewAction::GotoPos(pos)));
					}
					self.view.goto_pos(v as usize);
					if self.eval_colon() {
						self.expr.push(&mut self.undo, SUCCESS);
					}
				} else if self.eval_colon() {
					self.expr.push(&mut self.undo, FAILURE);
				} else {
					return Err(ErrorKind::Move("J".into()).into());
				}
			}

			b'C' => return self.motion_chars(1, "C"),
			b'R' => return self.motion_chars(-1, "R"),
			b'L' => return self.motion_lines(1, "L"),
			b'B' => return self.motion_lines(-1, "B"),
			b'W' => return self.motion_words(),

			b'V' => return self.deletion_words(1, "V"),
			b'Y' => return self.deletion_words(-1, "Y"),

			b'=' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				if self.expr.args() == 0 {
					return Err(ErrorKind::ArgExpected("=".into()).into());
				}
				let v = self.expr.pop_num_calc(&mut self.undo)?;
				self.msg(Severity::User, &v.to_string());
			}

			b'K' => return self.deletion_range(b'K'),
			b'D' => return self.deletion_range(b'D'),

			b'A' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				let n = self.expr.pop_num_calc(&mut self.undo)?;
				let v = self.view.current_pos() as TekoInt + n;
				// The end of the buffer is not a valid position for <A>.
				if v < 0 || v >= self.view.len() as TekoInt {
					return Err(ErrorKind::Range("A".into()).into());
				}
				let code = self.view.char_at(v as usize) as TekoInt;
				self.expr.push(&mut self.undo, code);
			}

			_ => return Err(ErrorKind::Syntax(chr).into()),
		}

		Ok(State::Start)
	}

	fn motion_chars(&mut self, sign: TekoInt, name: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let n = self.expr.pop_num_calc(&mut self.undo)?;
		let rc = self.move_chars(sign * n);
		if self.eval_colon() {
			self.expr.push(&mut self.undo, rc);
		} else if is_failure(rc) {
			return Err(ErrorKind::Move(name.into()).into());
		}
		Ok(State::Start)
	}

	fn motion_lines(&mut self, sign: TekoInt, name: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let n = self.expr.pop_num_calc(&mut self.undo)?;
		let rc = self.move_lines(sign * n);
		if self.eval_colon() {
			self.expr.push(&mut self.undo, rc);
		} else if is_failure(rc) {
			return Err(ErrorKind::Move(name.into()).into());
		}
		Ok(State::Start)
	}

	fn motion_words(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let v = self.expr.pop_num_calc(&mut self.undo)?;
		let pos = self.view.current_pos();
		let leftward = v < 0;
		let mut remaining = v.unsigned_abs();
		while remaining > 0 {
			let before = self.view.current_pos();
			if leftward {
				self.view.move_word_left_end();
			} else {
				self.view.move_word_right_end();
			}
			if self.view.current_pos() == before {
				break;
			}
			remaining -= 1;
		}
		if remaining == 0 {
			if self.current_doc_must_undo() {
				self.undo.push(UndoToken::View(ViewAction::GotoPos(pos)));
			}
			if self.eval_colon() {
				self.expr.push(&mut self.undo, SUCCESS);
			}
		} else {
			self.view.goto_pos(pos);
			if self.eval_colon() {
				self.expr.push(&mut self.undo, FAILURE);
			} else {
				return Err(ErrorKind::Move("W".into()).into());
			}
		}
		Ok(State::Start)
	}

	fn deletion_words(&mut self, sign: TekoInt, name: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let n = self.expr.pop_num_calc(&mut self.undo)?;
		let rc = self.delete_words(sign * n);
		if self.eval_colon() {
			self.expr.push(&mut self.undo, rc);
		} else if is_failure(rc) {
			return Err(TekoError::command(format!(
				"not enough words to delete with <{}>",
				name
			))
			.into());
		}
		Ok(State::Start)
	}

	/// `D` and `K`: character- or line-oriented range deletion.
	fn deletion_range(&mut self, chr: u8) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		self.expr.eval(&mut self.undo)?;

		let (from, len, rc);
		if self.expr.args() <= 1 {
			let pos = self.view.current_pos() as TekoInt;
			let (f, l, ok) = if chr == b'D' {
				let n = self.expr.pop_num_calc(&mut self.undo)?;
				(pos, n, teko_bool(self.valid_pos(pos + n)))
			} else {
				let line = self.view.line_from_position(pos as usize) as TekoInt
					+ self.expr.pop_num_calc(&mut self.undo)?;
				if self.valid_line(line) {
					let target = self.view.position_from_line(line as usize) as TekoInt;
					(pos, target - pos, SUCCESS)
				} else {
					(pos, 0, FAILURE)
				}
			};
			if l < 0 {
				from = f + l;
				len = -l;
			} else {
				from = f;
				len = l;
			}
			rc = ok;
		} else {
			let to = self.expr.pop_num(&mut self.undo)?;
			let f = self.expr.pop_num(&mut self.undo)?;
			from = f;
			len = to - f;
			rc = teko_bool(len >= 0 && self.valid_pos(f) && self.valid_pos(to));
		}

		if self.eval_colon() {
			self.expr.push(&mut self.undo, rc);
		} else if is_failure(rc) {
			return Err(ErrorKind::Range((chr as char).to_string()).into());
		}
		if len == 0 || is_failure(rc) {
			return Ok(State::Start);
		}

		if self.current_doc_must_undo() {
			let pos = self.view.current_pos();
			self.undo.push(UndoToken::View(ViewAction::GotoPos(pos)));
			self.undo.push(UndoToken::View(ViewAction::Undo));
		}
		self.view.begin_undo_action();
		self.view.delete_range(from as usize, len as usize);
		self.view.end_undo_action();
		self.dirtify();
		Ok(State::Start)
	}

	pub(super) fn move_chars(&mut self, n: TekoInt) -> TekoInt {
		let pos = self.view.current_pos() as TekoInt;
		if !self.valid_pos(pos + n) {
			return FAILURE;
		}
		self.view.goto_pos((pos + n) as usize);
		if self.current_doc_must_undo() {
			self.undo
				.push(UndoToken::View(ViewAction::GotoPos(pos as usize)));
		}
		SUCCESS
	}

	pub(super) fn move_lines(&mut self, n: TekoInt) -> TekoInt {
		let pos = self.view.current_pos();
		let line = self.view.line_from_position(pos) as TekoInt + n;
		if !self.valid_line(line) {
			return FAILURE;
		}
		self.view.goto_line(line as usize);
		if self.current_doc_must_undo() {
			self.undo.push(UndoToken::View(ViewAction::GotoPos(pos)));
		}
		SUCCESS
	}

	fn delete_words(&mut self, n: TekoInt) -> TekoInt {
		if n == 0 {
			return SUCCESS;
		}
		let pos = self.view.current_pos();
		let size = self.view.len();
		let mut remaining = n.unsigned_abs();

		self.view.begin_undo_action();
		if n > 0 {
			while remaining > 0 {
				let before = self.view.len();
				self.view.del_word_right_end();
				if self.view.len() == before {
					break;
				}
				remaining -= 1;
			}
		} else {
			while remaining > 0 {
				let before = self.view.current_pos();
				self.view.move_word_left_end();
				if self.view.current_pos() == before {
					break;
				}
				self.view.del_word_right_end();
				remaining -= 1;
			}
		}
		self.view.end_undo_action();

		if remaining > 0 {
			if self.view.len() != size {
				self.view.undo();
			}
			self.view.goto_pos(pos);
			return FAILURE;
		}

		self.undo.push(UndoToken::View(ViewAction::GotoPos(pos)));
		if self.current_doc_must_undo() {
			self.undo.push(UndoToken::View(ViewAction::Undo));
		}
		self.dirtify();
		SUCCESS
	}

	/// `n\`: insert the radix-formatted integer at dot.
	fn insert_integer(&mut self, v: TekoInt) {
		let s = Expressions::format(v, self.expr.radix);
		self.view.begin_undo_action();
		self.view.add_text(&s);
		self.view.end_undo_action();
		self.dirtify();
		if self.current_doc_must_undo() {
			self.undo.push(UndoToken::View(ViewAction::Undo));
		}
	}

	/// `\`: read the integer at dot in the current radix; dot stays put.
	fn read_integer(&self) -> TekoInt {
		let radix = self.expr.radix;
		let mut pos = self.view.current_pos();
		let mut sign = 1;
		if self.view.char_at(pos) == b'-' {
			pos += 1;
			sign = -1;
		}
		let mut v: TekoInt = 0;
		loop {
			let c = self.view.char_at(pos).to_ascii_uppercase();
			let digit = match c {
				b'0'..=b'9' if ((c - b'0') as TekoInt) < radix.min(10) => (c - b'0') as TekoInt,
				b'A'..=b'Z' if ((c - b'A') as TekoInt) < radix - 10 => (c - b'A') as TekoInt + 10,
				_ => break,
			};
			v = v * radix + digit;
			pos += 1;
		}
		sign * v
	}

	// --- loops ---

	fn loop_open(&mut self) -> Exec<State> {
		if self.mode == Mode::ParseOnlyLoop {
			let n = self.nest_level;
			self.set_nest_level(n + 1);
			return Ok(State::Start);
		}
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		self.expr.eval(&mut self.undo)?;
		let pass_through = self.eval_colon();
		let counter = self.expr.pop_num_calc_or(&mut self.undo, -1)?;
		if counter != 0 {
			// Implicit braces hide outer arguments from the loop body
			// unless the start is colon-modified.
			if !pass_through {
				self.expr.brace_open(&mut self.undo);
			}
			self.loop_stack.push(LoopContext {
				pc: self.pc,
				counter,
				pass_through,
			});
			self.undo.push(UndoToken::LoopPop);
		} else {
			self.set_mode(Mode::ParseOnlyLoop);
		}
		Ok(State::Start)
	}

	fn loop_close(&mut self) -> Exec<State> {
		if self.mode == Mode::ParseOnlyLoop {
			if self.nest_level == 0 {
				self.set_mode(Mode::Normal);
			} else {
				let n = self.nest_level;
				self.set_nest_level(n - 1);
			}
			return Ok(State::Start);
		}
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		if self.loop_stack.len() <= self.loop_fp {
			return Err(TekoError::command(
				"loop end without corresponding loop start command",
			)
			.into());
		}
		let ctx = *self.loop_stack.last().expect("loop stack is non-empty");
		let colon = self.eval_colon();

		// A colon-modified end aggregates values on the stack; for
		// pass-through loops a plain ">" already does.
		if !ctx.pass_through {
			if colon {
				self.expr.push_arg_sep(&mut self.undo)?;
			} else {
				self.expr.discard_args(&mut self.undo);
			}
		}

		if ctx.counter == 1 {
			if !ctx.pass_through {
				self.expr.brace_close(&mut self.undo)?;
			}
			let ctx = self.loop_stack.pop().expect("loop stack is non-empty");
			self.undo.push(UndoToken::LoopPush(ctx));
		} else {
			self.pc = ctx.pc;
			if ctx.counter >= 0 {
				let index = self.loop_stack.len() - 1;
				self.undo.push(UndoToken::LoopCounter {
					index,
					counter: ctx.counter,
				});
				self.loop_stack[index].counter -= 1;
			}
		}
		Ok(State::Start)
	}

	fn loop_break(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		if self.loop_stack.len() <= self.loop_fp {
			return Err(TekoError::command("<;> only allowed in iterations").into());
		}

		// The last search/result register supplies the implied condition.
		let implied = self.reg_get_integer(&QRegSpec::global("_"))?;
		let mut rc = self.expr.pop_num_calc_or(&mut self.undo, implied)?;
		if self.eval_colon() {
			rc = !rc;
		}

		if is_failure(rc) {
			let ctx = self.loop_stack.pop().expect("loop stack is non-empty");
			self.expr.discard_args(&mut self.undo);
			if !ctx.pass_through {
				self.expr.brace_close(&mut self.undo)?;
			}
			self.undo.push(UndoToken::LoopPush(ctx));
			self.set_mode(Mode::ParseOnlyLoop);
		}
		Ok(State::Start)
	}

	// --- command-line editing ---

	fn cmdline_edit(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		if !self.undo.enabled {
			return Err(TekoError::command(
				"command-line editing only possible in interactive mode",
			)
			.into());
		}

		self.reg_edit(&cmdline_reg_spec())?;

		let typed = String::from_utf8_lossy(&self.cmdline.buf[..self.cmdline.pc]).into_owned();
		self.view.begin_undo_action();
		self.view.clear_all();
		self.view.add_text(&typed);
		self.view.end_undo_action();
		self.undo.push(UndoToken::View(ViewAction::Undo));
		Ok(State::Start)
	}

	fn cmdline_replace(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		if !self.undo.enabled {
			return Err(TekoError::command(
				"command-line editing only possible in interactive mode",
			)
			.into());
		}
		if self.current_reg.as_ref() != Some(&cmdline_reg_spec()) {
			return Err(TekoError::command(
				"command-line replacement only allowed when editing the replacement register",
			)
			.into());
		}
		let new = self.reg_get_string(&cmdline_reg_spec())?.into_bytes();
		Err(Unwind::Replace(new))
	}

	// --- labels and goto ---

	pub(super) fn label_custom(&mut self, chr: u8) -> Exec<State> {
		if chr != b'!' {
			self.undo.push(UndoToken::StringLen(self.strarg.buf.len()));
			self.strarg.buf.push(chr);
			return Ok(State::Label);
		}

		let bytes = std::mem::take(&mut self.strarg.buf);
		let label = String::from_utf8_lossy(&bytes).into_owned();
		self.undo.push(UndoToken::StringArg(bytes));

		// Labels are recorded in every mode so forward gotos can find
		// them while skipping.
		if self.goto_table.get(&label).is_none() {
			if self.goto_table.must_undo {
				self.undo.push(UndoToken::GotoEntry {
					label: label.clone(),
					prev: None,
				});
			}
			self.goto_table.set(label.clone(), self.pc);
		}

		if self.mode == Mode::ParseOnlyGoto && self.skip_label.as_deref() == Some(&label) {
			self.undo
				.push(UndoToken::SkipLabel(self.skip_label.take()));
			self.set_mode(Mode::Normal);
		}
		Ok(State::Start)
	}

	/// `Olabel$`, with computed goto over a comma-separated label list.
	pub(super) fn goto_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		let index = self.expr.pop_num_calc_or(&mut self.undo, 1)?;
		let labels: Vec<&str> = arg.split(',').collect();
		if index < 1 || index as usize > labels.len() {
			return Ok(State::Start);
		}
		let label = labels[index as usize - 1].trim();
		if label.is_empty() {
			return Ok(State::Start);
		}

		match self.goto_table.get(label) {
			Some(pc) => self.pc = pc,
			None => {
				self.undo
					.push(UndoToken::SkipLabel(self.skip_label.take()));
				self.skip_label = Some(label.to_string());
				self.set_mode(Mode::ParseOnlyGoto);
			}
		}
		Ok(State::Start)
	}
}
