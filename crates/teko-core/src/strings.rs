//! String building and Q-Register specifications.
//!
//! String arguments pass through a small machine that interprets the
//! control escapes (`^V`/`^W` case folding, `^Q`/`^R` quoting, the `^E`
//! family of register interpolations). The original expressed these as
//! goto-label micro states; here each is an explicit enum state stepped one
//! character at a time. Register contents are reached through [`RegFetch`]
//! so the machine itself stays independent of the interpreter.

use crate::error::{ErrorKind, Result, TekoInt};
use crate::expr::Expressions;

/// Control-key folding (`^X` -> byte 0x18 etc.).
#[inline]
pub const fn ctl_key(c: u8) -> u8 {
	c & 0x1f
}

const CTL_Q: u8 = ctl_key(b'Q');
const CTL_R: u8 = ctl_key(b'R');
const CTL_V: u8 = ctl_key(b'V');
const CTL_W: u8 = ctl_key(b'W');
const CTL_E: u8 = ctl_key(b'E');

/// A resolved register specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QRegSpec {
	/// Selects the frame-local table instead of the globals.
	pub local: bool,
	pub name: String,
}

impl QRegSpec {
	pub fn global(name: impl Into<String>) -> Self {
		QRegSpec {
			local: false,
			name: name.into(),
		}
	}

	pub fn local(name: impl Into<String>) -> Self {
		QRegSpec {
			local: true,
			name: name.into(),
		}
	}

	/// Display form, `.` prefixed for locals, brackets for long names.
	pub fn display(&self) -> String {
		let mut s = String::new();
		if self.local {
			s.push('.');
		}
		if self.name.len() == 1 {
			s.push_str(&self.name);
		} else {
			s.push('[');
			s.push_str(&self.name);
			s.push(']');
		}
		s
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum QSpecState {
	#[default]
	Start,
	Bracket,
}

/// Parses `q`, `.q`, `[name]` and `.[name]` specifications.
#[derive(Debug, Clone, Default)]
pub struct QRegSpecMachine {
	state: QSpecState,
	local: bool,
	name: String,
}

impl QRegSpecMachine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one character; yields the finished specification once the
	/// name is complete.
	pub fn input(&mut self, chr: u8) -> Result<Option<QRegSpec>> {
		match self.state {
			QSpecState::Start => match chr {
				b'.' if !self.local => {
					self.local = true;
					Ok(None)
				}
				b'[' => {
					self.state = QSpecState::Bracket;
					Ok(None)
				}
				c if c.is_ascii_graphic() || c == b' ' => Ok(Some(QRegSpec {
					local: self.local,
					name: (c.to_ascii_uppercase() as char).to_string(),
				})),
				c => Err(ErrorKind::InvalidQRegister(crate::error::key_name(c)).into()),
			},
			QSpecState::Bracket => match chr {
				b']' => Ok(Some(QRegSpec {
					local: self.local,
					name: std::mem::take(&mut self.name),
				})),
				c if c == b'\n' || c == b'\t' || !c.is_ascii_control() => {
					self.name.push(c as char);
					Ok(None)
				}
				c => Err(ErrorKind::InvalidQRegister(crate::error::key_name(c)).into()),
			},
		}
	}
}

/// Register access required while building strings.
pub trait RegFetch {
	fn reg_integer(&mut self, spec: &QRegSpec) -> Result<TekoInt>;
	fn reg_string(&mut self, spec: &QRegSpec) -> Result<String>;
	fn radix(&self) -> TekoInt;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum CaseMode {
	#[default]
	Normal,
	Upper,
	Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecKind {
	/// `^E\q`: the register's integer, formatted in the current radix.
	Num,
	/// `^EUq`: the character with the register's integer code.
	Chr,
	/// `^EQq`: the register's string contents.
	Str,
	/// `^E@q`: the register's string, shell-quoted.
	Quote,
	/// `^ENq`: the register's string with glob metacharacters escaped.
	Glob,
}

#[derive(Debug, Clone, Default)]
enum BuildState {
	#[default]
	Start,
	Escaped,
	Lower,
	Upper,
	CtlE,
	Spec(SpecKind, QRegSpecMachine),
}

/// The string-building machine proper.
#[derive(Debug, Clone, Default)]
pub struct StringBuilder {
	state: BuildState,
	mode: CaseMode,
	toctl: bool,
}

impl StringBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Feeds one character; returns the bytes to append to the string
	/// argument, if any.
	pub fn input(&mut self, chr: u8, regs: &mut dyn RegFetch) -> Result<Option<Vec<u8>>> {
		let mut chr = match self.mode {
			CaseMode::Upper => chr.to_ascii_uppercase(),
			CaseMode::Lower => chr.to_ascii_lowercase(),
			CaseMode::Normal => chr,
		};

		if self.toctl {
			if chr != b'^' {
				chr = ctl_key(chr.to_ascii_uppercase());
			}
			self.toctl = false;
		} else if chr == b'^' {
			self.toctl = true;
			return Ok(None);
		}

		match std::mem::take(&mut self.state) {
			BuildState::Start => match chr {
				CTL_Q | CTL_R => {
					self.state = BuildState::Escaped;
					Ok(None)
				}
				CTL_V => {
					self.state = BuildState::Lower;
					Ok(None)
				}
				CTL_W => {
					self.state = BuildState::Upper;
					Ok(None)
				}
				CTL_E => {
					self.state = BuildState::CtlE;
					Ok(None)
				}
				c => Ok(Some(vec![c])),
			},
			BuildState::Escaped => Ok(Some(vec![chr])),
			BuildState::Lower => {
				if chr == CTL_V {
					self.mode = CaseMode::Lower;
					Ok(None)
				} else {
					Ok(Some(vec![chr.to_ascii_lowercase()]))
				}
			}
			BuildState::Upper => {
				if chr == CTL_W {
					self.mode = CaseMode::Upper;
					Ok(None)
				} else {
					Ok(Some(vec![chr.to_ascii_uppercase()]))
				}
			}
			BuildState::CtlE => match chr.to_ascii_uppercase() {
				b'\\' => {
					self.state = BuildState::Spec(SpecKind::Num, QRegSpecMachine::new());
					Ok(None)
				}
				b'U' => {
					self.state = BuildState::Spec(SpecKind::Chr, QRegSpecMachine::new());
					Ok(None)
				}
				b'Q' => {
					self.state = BuildState::Spec(SpecKind::Str, QRegSpecMachine::new());
					Ok(None)
				}
				b'@' => {
					self.state = BuildState::Spec(SpecKind::Quote, QRegSpecMachine::new());
					Ok(None)
				}
				b'N' => {
					self.state = BuildState::Spec(SpecKind::Glob, QRegSpecMachine::new());
					Ok(None)
				}
				_ => Ok(Some(vec![CTL_E, chr])),
			},
			BuildState::Spec(kind, mut machine) => match machine.input(chr)? {
				None => {
					self.state = BuildState::Spec(kind, machine);
					Ok(None)
				}
				Some(spec) => {
					let out = match kind {
						SpecKind::Num => {
							let v = regs.reg_integer(&spec)?;
							Expressions::format(v, regs.radix()).into_bytes()
						}
						SpecKind::Chr => vec![regs.reg_integer(&spec)? as u8],
						SpecKind::Str => regs.reg_string(&spec)?.into_bytes(),
						SpecKind::Quote => shell_quote(&regs.reg_string(&spec)?).into_bytes(),
						SpecKind::Glob => glob_escape(&regs.reg_string(&spec)?).into_bytes(),
					};
					Ok(Some(out))
				}
			},
		}
	}
}

/// Single-quotes a string for POSIX shells.
pub fn shell_quote(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('\'');
	for c in s.chars() {
		if c == '\'' {
			out.push_str("'\\''");
		} else {
			out.push(c);
		}
	}
	out.push('\'');
	out
}

/// Backslash-escapes glob metacharacters.
pub fn glob_escape(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		if matches!(c, '*' | '?' | '[' | ']' | '\\') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

#[cfg(test)]
mod tests;
