//! The `^x` command table, `^^c`, and the deferred escape state.

use crate::error::{ErrorKind, Exec, TekoError, TekoInt, Unwind};
use crate::expr::Op;

use super::{Interp, Mode, State};

impl Interp {
	pub(super) fn control_custom(&mut self, chr: u8) -> Exec<State> {
		match chr.to_ascii_uppercase() {
			// Exit immediately; batch mode only, so the interactive
			// CTRL+C interrupt cannot trigger it by accident.
			b'C' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if self.undo.enabled {
					return Err(TekoError::command("<^C> not allowed in interactive mode").into());
				}
				self.quit_requested = true;
				Err(Unwind::Quit)
			}

			b'O' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.set_radix(&mut self.undo, 8)?;
				Ok(State::Start)
			}

			b'D' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.set_radix(&mut self.undo, 10)?;
				Ok(State::Start)
			}

			b'R' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				if self.expr.args() == 0 {
					let radix = self.expr.radix;
					self.expr.push(&mut self.undo, radix);
				} else {
					let radix = self.expr.pop_num_calc(&mut self.undo)?;
					self.expr.set_radix(&mut self.undo, radix)?;
				}
				Ok(State::Start)
			}

			b'_' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				let v = self.expr.pop_num_calc(&mut self.undo)?;
				self.expr.push(&mut self.undo, !v);
				Ok(State::Start)
			}

			b'*' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Pow)?;
				Ok(State::Start)
			}

			b'/' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Mod)?;
				Ok(State::Start)
			}

			b'#' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.push_calc(&mut self.undo, Op::Xor)?;
				Ok(State::Start)
			}

			_ => Err(TekoError::new(ErrorKind::Syntax(chr)).into()),
		}
	}

	/// `^^c`: the code of the next character.
	pub(super) fn ascii_custom(&mut self, chr: u8) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		self.expr.push(&mut self.undo, chr as TekoInt);
		Ok(State::Start)
	}

	/// The escape state defers `^[` so that `$$` can be distinguished:
	/// a second escape returns from the macro with the stacked arguments,
	/// anything else first discards all arguments.
	pub(super) fn escape_custom(&mut self, chr: u8) -> Exec<State> {
		if chr == super::ESC || chr == b'$' {
			if self.mode != Mode::Normal {
				return Ok(State::Start);
			}
			self.state = State::Start;
			self.expr.eval(&mut self.undo)?;
			return Err(Unwind::Return(self.expr.args()));
		}

		if self.mode == Mode::Normal {
			self.expr.discard_args(&mut self.undo);
		}
		self.get_next_state(State::Start, chr)
	}
}
