//! The `F` command group: loop and conditional flow control.

use crate::error::{ErrorKind, Exec, TekoError};
use crate::undo::UndoToken;

use super::{Interp, Mode, State};

impl Interp {
	pub(super) fn fcommand_custom(&mut self, chr: u8) -> Exec<State> {
		match chr {
			// Jump back to the loop start, or to the beginning of the
			// macro when outside of loops.
			b'<' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.discard_args(&mut self.undo);
				self.pc = if self.loop_stack.len() > self.loop_fp {
					self.loop_stack.last().expect("loop stack is non-empty").pc
				} else {
					usize::MAX
				};
				Ok(State::Start)
			}

			// Jump to the loop end, like ">" but parsing ahead when the
			// loop has run out of iterations.
			b'>' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if self.loop_stack.len() <= self.loop_fp {
					return Err(TekoError::command(
						"jump to loop end without corresponding loop start command",
					)
					.into());
				}
				let ctx = *self.loop_stack.last().expect("loop stack is non-empty");
				let colon = self.eval_colon();

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
					self.set_mode(Mode::ParseOnlyLoop);
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

			// Jump to the end of the conditional, skipping any ELSE part.
			b'\'' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.set_mode(Mode::ParseOnlyCond);
				self.set_skip_else(true);
				Ok(State::Start)
			}

			// Jump to the ELSE part (or end) of the conditional.
			b'|' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.set_mode(Mode::ParseOnlyCond);
				Ok(State::Start)
			}

			_ => Err(TekoError::new(ErrorKind::Syntax(chr)).into()),
		}
	}
}
