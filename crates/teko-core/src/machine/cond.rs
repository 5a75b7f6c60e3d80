//! Conditional commands (`"x ... | ... '`).

use crate::error::{is_failure, ErrorKind, Exec, TekoError, TekoInt};

use super::{Interp, Mode, State};

impl Interp {
	pub(super) fn cond_custom(&mut self, chr: u8) -> Exec<State> {
		let mut value: TekoInt = 0;

		match self.mode {
			Mode::ParseOnlyCond => {
				let n = self.nest_level;
				self.set_nest_level(n + 1);
			}
			Mode::Normal => {
				self.expr.eval(&mut self.undo)?;
				// ~ tests the absence of arguments and pops nothing.
				if chr != b'~' {
					if self.expr.args() == 0 {
						return Err(ErrorKind::ArgExpected("\"".into()).into());
					}
					value = self.expr.pop_num_calc(&mut self.undo)?;
				}
			}
			_ => {}
		}

		if self.mode != Mode::Normal {
			return Ok(State::Start);
		}

		let result = match chr.to_ascii_uppercase() {
			b'~' => self.expr.args() == 0,
			b'A' => (value as u8).is_ascii_alphabetic(),
			b'C' => {
				(value as u8).is_ascii_alphanumeric()
					|| value == '.' as TekoInt
					|| value == '$' as TekoInt
					|| value == '_' as TekoInt
			}
			b'D' => (value as u8).is_ascii_digit(),
			b'I' => value == '/' as TekoInt,
			b'S' | b'T' => !is_failure(value),
			b'F' | b'U' => is_failure(value),
			b'E' | b'=' => value == 0,
			b'G' | b'>' => value > 0,
			b'L' | b'<' => value < 0,
			b'N' => value != 0,
			b'R' => (value as u8).is_ascii_alphanumeric(),
			b'V' => (value as u8).is_ascii_lowercase(),
			b'W' => (value as u8).is_ascii_uppercase(),
			c => {
				return Err(TekoError::command(format!(
					"invalid conditional type \"{}\"",
					c as char
				))
				.into())
			}
		};

		if !result {
			// Skip to the ELSE part or the end of the conditional.
			self.set_mode(Mode::ParseOnlyCond);
		}
		Ok(State::Start)
	}
}
