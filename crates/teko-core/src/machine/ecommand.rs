//! The `E` command group and symbolic view-message dispatch.

use crate::error::{is_failure, ErrorKind, Exec, TekoError, TekoInt};
use crate::undo::UndoToken;
use crate::view::{EolMode, Param, ViewAction};

use super::{EdFlags, EsMessage, Interp, Mode, State};

const EJ_USER_INTERFACE: TekoInt = 0;
const EJ_BUFFERS: TekoInt = 1;
const EJ_MEMORY_LIMIT: TekoInt = 2;
const EJ_INIT_COLOR: TekoInt = 3;

impl Interp {
	pub(super) fn ecommand_custom(&mut self, chr: u8) -> Exec<State> {
		match chr.to_ascii_uppercase() {
			// Remove the current buffer from the ring; a failure boolean
			// discards unsaved changes.
			b'F' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if let Some(spec) = &self.current_reg {
					return Err(ErrorKind::RegisterBeingEdited(spec.display()).into());
				}
				let force = self.expr.pop_num_calc(&mut self.undo)?;
				if is_failure(force) {
					if let Some(buffer) = self.ring.current_buffer() {
						if buffer.dirty {
							return Err(TekoError::command(format!(
								"buffer \"{}\" is dirty",
								buffer.name()
							))
							.into());
						}
					}
				}
				self.ring_close()?;
				Ok(State::Start)
			}

			b'D' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				self.expr.eval(&mut self.undo)?;
				if self.expr.args() == 0 {
					let bits = self.flags.bits() as TekoInt;
					self.expr.push(&mut self.undo, bits);
				} else {
					let on = self.expr.pop_num_calc(&mut self.undo)?;
					let off = self.expr.pop_num_calc_or(&mut self.undo, !0)?;
					self.undo.push(UndoToken::Flags(self.flags));
					let bits = (self.flags.bits() & !(off as u32)) | on as u32;
					self.flags = EdFlags::from_bits_truncate(bits);
				}
				Ok(State::Start)
			}

			b'J' => self.ej_properties(),
			b'L' => self.el_eol_mode(),

			// Request termination at the end of the top-level macro.
			b'X' => {
				if self.mode != Mode::Normal {
					return Ok(State::Start);
				}
				if self.eval_colon() {
					self.save_all_dirty()?;
				} else {
					let force = self.expr.pop_num_calc(&mut self.undo)?;
					if is_failure(force) && self.ring.is_any_dirty() {
						return Err(TekoError::command("modified buffers exist").into());
					}
				}
				self.set_quit_requested(true);
				Ok(State::Start)
			}

			c => Err(TekoError::new(ErrorKind::Syntax(c)).into()),
		}
	}

	fn ej_properties(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		self.expr.eval(&mut self.undo)?;
		let property = self.expr.pop_num_calc(&mut self.undo)?;

		if self.expr.args() > 0 {
			let value = self.expr.pop_num_calc(&mut self.undo)?;
			match property {
				EJ_MEMORY_LIMIT => {
					self.undo.push(UndoToken::MemLimit(self.memlimit.limit));
					self.memlimit.set_limit(value.max(0) as usize)?;
				}
				EJ_INIT_COLOR => {
					if !(0..16).contains(&value) {
						return Err(TekoError::command(format!(
							"invalid color code {} specified for <EJ>",
							value
						))
						.into());
					}
					if self.expr.args() == 0 {
						return Err(ErrorKind::ArgExpected("EJ".into()).into());
					}
					let rgb = self.expr.pop_num_calc(&mut self.undo)?;
					self.frontend.init_color(value as u8, rgb as u32);
				}
				_ => {
					return Err(TekoError::command(format!(
						"cannot set property {} for <EJ>",
						property
					))
					.into())
				}
			}
			return Ok(State::Start);
		}

		let v = match property {
			EJ_USER_INTERFACE => self.frontend.ui_id(),
			EJ_BUFFERS => self.ring.len() as TekoInt,
			EJ_MEMORY_LIMIT => self.memlimit.limit as TekoInt,
			_ => {
				return Err(TekoError::command(format!(
					"invalid property {} for <EJ>",
					property
				))
				.into())
			}
		};
		self.expr.push(&mut self.undo, v);
		Ok(State::Start)
	}

	fn el_eol_mode(&mut self) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}
		self.expr.eval(&mut self.undo)?;

		if self.expr.args() > 0 {
			let mode = if self.eval_colon() {
				// Colon form: the EOL byte sequence is on the stack.
				match self.expr.pop_num_calc(&mut self.undo)? {
					13 => EolMode::Cr,
					10 => {
						if self.expr.args() == 0 {
							EolMode::Lf
						} else if self.expr.pop_num_calc(&mut self.undo)? == 13 {
							EolMode::CrLf
						} else {
							return Err(
								TekoError::command("invalid EOL sequence for <EL>").into()
							);
						}
					}
					_ => return Err(TekoError::command("invalid EOL sequence for <EL>").into()),
				}
			} else {
				let code = self.expr.pop_num_calc(&mut self.undo)?;
				EolMode::from_code(code).ok_or_else(|| {
					TekoError::command(format!("invalid EOL mode {} for <EL>", code))
				})?
			};

			self.undo
				.push(UndoToken::View(ViewAction::SetEolMode(self.view.eol_mode())));
			self.view.set_eol_mode(mode);
		} else if self.eval_colon() {
			for &b in self.view.eol_mode().bytes() {
				self.expr.push(&mut self.undo, b as TekoInt);
			}
		} else {
			let mode = self.view.eol_mode() as TekoInt;
			self.expr.push(&mut self.undo, mode);
		}
		Ok(State::Start)
	}

	/// First `ES` string: the symbolic message name; `wParam` may follow
	/// on the expression stack.
	pub(super) fn es_symbols_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::EsLparam);
		}

		self.undo.push(UndoToken::EsMessage(self.es_msg.clone()));

		let mut parts = arg.split(',');
		let symbol = parts.next().unwrap_or("").trim().to_string();
		if parts.any(|extra| !extra.trim().is_empty()) {
			return Err(TekoError::command(
				"symbolic <ES> parameters beyond the message name are not supported",
			)
			.into());
		}
		if symbol.is_empty() {
			return Err(TekoError::command("<ES> command requires a message symbol").into());
		}

		self.expr.eval(&mut self.undo)?;
		let wparam = self.expr.pop_num_calc_or(&mut self.undo, 0)?;
		self.es_msg = Some(EsMessage { symbol, wparam });
		Ok(State::EsLparam)
	}

	/// Second `ES` string: `lParam` as text, or popped from the stack if
	/// empty; dispatches and pushes the result. No rub-out coverage.
	pub(super) fn es_lparam_done(&mut self, arg: &str) -> Exec<State> {
		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		let msg = self
			.es_msg
			.clone()
			.ok_or_else(|| TekoError::command("<ES> message state lost"))?;

		let result = if arg.is_empty() {
			self.expr.eval(&mut self.undo)?;
			let lparam = self.expr.pop_num_calc_or(&mut self.undo, 0)?;
			self.view.dispatch(&msg.symbol, msg.wparam, Param::Int(lparam))?
		} else {
			self.view.dispatch(&msg.symbol, msg.wparam, Param::Str(arg))?
		};
		self.expr.push(&mut self.undo, result);

		self.undo.push(UndoToken::EsMessage(self.es_msg.take()));
		Ok(State::Start)
	}
}
