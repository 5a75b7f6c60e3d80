//! Error taxonomy and unwinding control flow.
//!
//! Every failure that can reach the user is an [`ErrorKind`] wrapped in a
//! [`TekoError`], which accumulates a source coordinate (set once, at the
//! innermost execution step that observes the failure) and a chain of
//! macro/file frames as it bubbles out of nested invocations.
//!
//! Control transfers that are not failures (`$$` returns, `EX`/`^C`
//! termination, command-line replacement) travel the same unwinding path as
//! [`Unwind`] variants so that frame boundaries can intercept them without
//! ever using panics.

use std::path::PathBuf;

use thiserror::Error;

/// The integer type of the command language.
pub type TekoInt = i64;

/// Condition boolean: negative values signify success.
pub const SUCCESS: TekoInt = -1;
/// Condition boolean: non-negative values signify failure.
pub const FAILURE: TekoInt = 0;

/// Returns whether a condition boolean signifies failure.
#[inline]
pub fn is_failure(v: TekoInt) -> bool {
	v >= 0
}

/// Converts a predicate into a condition boolean.
#[inline]
pub fn teko_bool(b: bool) -> TekoInt {
	if b {
		SUCCESS
	} else {
		FAILURE
	}
}

/// Renders a command character for error messages (`^X` notation for
/// control bytes).
pub fn key_name(chr: u8) -> String {
	match chr {
		0x1b => "^[".into(),
		0x00..=0x1f => format!("^{}", (chr | 0x40) as char),
		0x7f => "^?".into(),
		_ => (chr as char).to_string(),
	}
}

/// User-facing error kinds.
#[derive(Debug, Error)]
pub enum ErrorKind {
	/// A character no state knows a successor for.
	#[error("syntax error, unexpected <{}>", key_name(*.0))]
	Syntax(u8),

	/// An operator or command found no value on the expression stack.
	#[error("argument expected for <{0}>")]
	ArgExpected(String),

	/// A motion command would move dot off-page.
	#[error("failed to move by <{0}>")]
	Move(String),

	/// A buffer range is invalid for the command.
	#[error("invalid range for <{0}>")]
	Range(String),

	/// Integer division by zero.
	#[error("division by zero")]
	DivisionByZero,

	/// Radix outside the supported 2..=36 window.
	#[error("invalid radix {0}")]
	InvalidRadix(TekoInt),

	/// A malformed or unacceptable Q-Register specification.
	#[error("invalid Q-Register \"{0}\"")]
	InvalidQRegister(String),

	/// The register is installed in the view and cannot be clobbered.
	#[error("Q-Register \"{0}\" is currently edited")]
	RegisterBeingEdited(String),

	/// An I/O failure, with the path it concerned.
	#[error("{}: {}", .path.display(), .source)]
	File {
		path: PathBuf,
		source: std::io::Error,
	},

	/// The resident-set probe tripped the configured limit.
	#[error("memory limit exceeded")]
	MemoryExceeded,

	/// The interrupt flag was raised between steps.
	#[error("interrupted")]
	Interrupted,

	/// A loop was still open when its frame ended.
	#[error("unterminated loop")]
	UnterminatedLoop,

	/// An arithmetic brace was still open when its frame ended.
	#[error("unterminated brace")]
	UnterminatedBrace,

	/// A goto label was never defined in its frame.
	#[error("label \"{0}\" not found")]
	LabelNotFound(String),

	/// Free-form command error (dirty buffers, empty register stack, ...).
	#[error("{0}")]
	Command(String),
}

/// One entry of the invocation chain attached to an error.
#[derive(Debug, Clone)]
pub enum ErrorFrame {
	Macro { line: usize, column: usize },
	File { path: PathBuf },
}

/// An [`ErrorKind`] plus the coordinates collected while unwinding.
#[derive(Debug)]
pub struct TekoError {
	pub kind: ErrorKind,
	/// 1-based line/column at the innermost failing step.
	pub coord: Option<(usize, usize)>,
	/// Invocation chain, innermost first.
	pub frames: Vec<ErrorFrame>,
}

impl TekoError {
	pub fn new(kind: ErrorKind) -> Self {
		TekoError {
			kind,
			coord: None,
			frames: Vec::new(),
		}
	}

	/// Free-form command error.
	pub fn command(msg: impl Into<String>) -> Self {
		TekoError::new(ErrorKind::Command(msg.into()))
	}

	/// Attaches the innermost coordinate; later calls are ignored so the
	/// first (deepest) step to observe the error wins.
	pub fn set_coord(&mut self, text: &[u8], pc: usize) {
		if self.coord.is_none() {
			self.coord = Some(line_column(text, pc));
		}
	}

	pub fn add_frame(&mut self, frame: ErrorFrame) {
		self.frames.push(frame);
	}
}

impl std::fmt::Display for TekoError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.kind)?;
		if let Some((line, column)) = self.coord {
			write!(f, " (at {}:{})", line, column)?;
		}
		for frame in &self.frames {
			match frame {
				ErrorFrame::Macro { line, column } => {
					write!(f, "\n\tin macro at {}:{}", line, column)?;
				}
				ErrorFrame::File { path } => {
					write!(f, "\n\tin file {}", path.display())?;
				}
			}
		}
		Ok(())
	}
}

impl std::error::Error for TekoError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.kind)
	}
}

impl From<ErrorKind> for TekoError {
	fn from(kind: ErrorKind) -> Self {
		TekoError::new(kind)
	}
}

/// Computes the 1-based line/column of a byte offset into macro text.
pub fn line_column(text: &[u8], pc: usize) -> (usize, usize) {
	let upto = pc.min(text.len());
	let mut line = 1;
	let mut column = 1;
	for &b in &text[..upto] {
		if b == b'\n' {
			line += 1;
			column = 1;
		} else {
			column += 1;
		}
	}
	(line, column)
}

/// Non-local control transfers shared with genuine errors.
#[derive(Debug)]
pub enum Unwind {
	Error(TekoError),
	/// `$$`: collapse to the owning frame keeping this many argument values.
	Return(usize),
	/// `EX`/`^C`: unwind to the driver and terminate.
	Quit,
	/// `}`: replace the interactive command line with these bytes.
	Replace(Vec<u8>),
}

impl From<TekoError> for Unwind {
	fn from(e: TekoError) -> Self {
		Unwind::Error(e)
	}
}

impl From<ErrorKind> for Unwind {
	fn from(kind: ErrorKind) -> Self {
		Unwind::Error(TekoError::new(kind))
	}
}

/// Result alias used throughout the executor.
pub type Exec<T> = std::result::Result<T, Unwind>;

/// Result alias for fallible operations outside the unwinding path.
pub type Result<T> = std::result::Result<T, TekoError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn coordinates_are_one_based_and_newline_aware() {
		assert_eq!(line_column(b"abc", 0), (1, 1));
		assert_eq!(line_column(b"abc", 2), (1, 3));
		assert_eq!(line_column(b"a\nbc", 3), (2, 2));
	}

	#[test]
	fn set_coord_keeps_the_innermost_position() {
		let mut e = TekoError::new(ErrorKind::Syntax(b'}'));
		e.set_coord(b"12}", 2);
		e.set_coord(b"longer outer macro", 10);
		assert_eq!(e.coord, Some((1, 3)));
	}

	#[test]
	fn condition_booleans() {
		assert!(is_failure(FAILURE));
		assert!(is_failure(1));
		assert!(!is_failure(SUCCESS));
		assert!(!is_failure(-42));
	}

	#[test]
	fn control_bytes_render_in_caret_notation() {
		assert_eq!(key_name(0x1b), "^[");
		assert_eq!(key_name(0x03), "^C");
		assert_eq!(key_name(b'J'), "J");
	}
}
