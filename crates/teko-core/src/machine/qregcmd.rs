//! Commands taking a Q-Register specification.

use crate::error::{ErrorKind, Exec, TekoError, Unwind};
use crate::strings::{QRegSpec, QRegSpecMachine};
use crate::undo::UndoToken;
use crate::view::ViewAction;

use super::{Interp, Mode, State};

impl Interp {
	pub(super) fn expect_qreg_input(&mut self, state: State, chr: u8) -> Exec<State> {
		self.undo
			.push(UndoToken::QSpec(Box::new(self.qspec.clone())));
		if chr == 0 {
			self.qspec = QRegSpecMachine::new();
			return Ok(state);
		}
		match self.qspec.input(chr).map_err(Unwind::Error)? {
			None => Ok(state),
			Some(spec) => self.got_register(state, spec),
		}
	}

	fn got_register(&mut self, state: State, spec: QRegSpec) -> Exec<State> {
		// Two-phase commands forward to their string state even while
		// parsing only, so the argument is consumed either way.
		match state {
			State::EqCommand => {
				if self.mode == Mode::Normal {
					self.reg_arg = Some(spec);
				}
				return Ok(State::LoadQReg);
			}
			State::CtlUCommand => {
				if self.mode == Mode::Normal {
					self.reg_arg = Some(spec);
				}
				return Ok(State::SetQRegString);
			}
			_ => {}
		}

		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		match state {
			State::PushQReg => {
				self.reg_stack_push(&spec)?;
			}

			State::PopQReg => {
				self.reg_stack_pop(&spec)?;
			}

			// Gq: insert the register's string at dot.
			State::GetQRegString => {
				let text = self.reg_get_string(&spec)?;
				if !text.is_empty() {
					self.view.begin_undo_action();
					self.view.add_text(&text);
					self.view.end_undo_action();
					self.dirtify();
					if self.current_doc_must_undo() {
						self.undo.push(UndoToken::View(ViewAction::Undo));
					}
				}
			}

			// Qq: the register's integer.
			State::GetQRegInteger => {
				self.expr.eval(&mut self.undo)?;
				let v = self.reg_get_integer(&spec)?;
				self.expr.push(&mut self.undo, v);
			}

			// nUq: set the register's integer.
			State::SetQRegInteger => {
				let v = self.expr.pop_num_calc(&mut self.undo)?;
				self.reg_set_integer(&spec, v)?;
			}

			// n%q: add to the register's integer, returning the sum.
			State::IncreaseQReg => {
				let n = self.expr.pop_num_calc(&mut self.undo)?;
				let sum = self.reg_get_integer(&spec)?.wrapping_add(n);
				self.reg_set_integer(&spec, sum)?;
				self.expr.push(&mut self.undo, sum);
			}

			// Mq: execute the register as a macro; a colon call shares
			// the caller's local registers.
			State::MacroCall => {
				let locals = !self.eval_colon();
				self.reg_execute(&spec, locals)?;
			}

			State::CopyToQReg => return self.copy_to_qreg(spec),

			// *q: save the last command line.
			State::SaveCmdline => {
				let last = String::from_utf8_lossy(&self.cmdline.last).into_owned();
				self.reg_set_string(&spec, &last)?;
			}

			_ => {
				return Err(
					TekoError::command("state takes no register specification").into()
				)
			}
		}
		Ok(State::Start)
	}

	/// `^Uq[text]$` string handler.
	pub(super) fn ctlu_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		let spec = self
			.reg_arg
			.clone()
			.ok_or_else(|| TekoError::command("<^U> register specification lost"))?;
		self.reg_set_string(&spec, arg)?;
		Ok(State::Start)
	}

	/// `Xq`: copy lines or an absolute range into a register; colon
	/// appends instead of replacing.
	fn copy_to_qreg(&mut self, spec: QRegSpec) -> Exec<State> {
		self.expr.eval(&mut self.undo)?;

		let (from, len);
		if self.expr.args() <= 1 {
			let pos = self.view.current_pos() as i64;
			let line = self.view.line_from_position(pos as usize) as i64
				+ self.expr.pop_num_calc(&mut self.undo)?;
			if !self.valid_line(line) {
				return Err(ErrorKind::Range("X".into()).into());
			}
			let l = self.view.position_from_line(line as usize) as i64 - pos;
			if l < 0 {
				from = pos + l;
				len = -l;
			} else {
				from = pos;
				len = l;
			}
		} else {
			let to = self.expr.pop_num(&mut self.undo)?;
			let f = self.expr.pop_num(&mut self.undo)?;
			if !self.valid_pos(f) || !self.valid_pos(to) || to < f {
				return Err(ErrorKind::Range("X".into()).into());
			}
			from = f;
			len = to - f;
		}

		let text = self.view.text_range(from as usize, (from + len) as usize);
		if self.eval_colon() {
			self.reg_append_string(&spec, &text)?;
		} else {
			self.reg_set_string(&spec, &text)?;
		}
		Ok(State::Start)
	}
}
