//! The interactive command line.
//!
//! One keystroke appends one byte and executes it through the ordinary
//! step path. A keystroke whose execution fails is rejected: the byte is
//! removed again and the rub-out log rewound to the keystroke boundary, so
//! the machine is exactly as it was before the key went down. `$$`
//! terminates the command line, committing the log; `}` replaces the whole
//! line with the contents of the escape register.

use crate::error::{TekoError, Unwind};
use crate::machine::{GotoTable, Interp, Mode, State, ESC};

/// The growing command line plus the last accepted one.
#[derive(Debug, Default)]
pub struct CmdLine {
	pub buf: Vec<u8>,
	pub last: Vec<u8>,
	/// Index of the character currently being executed.
	pub pc: usize,
}

/// What a keystroke did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
	Continue,
	/// `$$`: the command line was accepted and cleared.
	Accepted,
}

impl Interp {
	/// Feeds one interactive keystroke. On error the keystroke has
	/// already been rejected and the machine state restored.
	pub fn keypress(&mut self, chr: u8) -> Result<KeyOutcome, TekoError> {
		let pos = self.cmdline.buf.len();
		self.undo.set_pos(pos);
		self.cmdline.buf.push(chr);

		let outcome = match self.run_cmdline(pos) {
			Ok(()) => Ok(KeyOutcome::Continue),
			Err(Unwind::Return(_)) => {
				self.accept_cmdline();
				Ok(KeyOutcome::Accepted)
			}
			Err(Unwind::Quit) => {
				self.quit_requested = true;
				self.accept_cmdline();
				Ok(KeyOutcome::Accepted)
			}
			Err(Unwind::Replace(new)) => self.handle_replace(pos, new),
			Err(Unwind::Error(e)) => {
				self.reject_to(pos);
				Err(e)
			}
		};
		self.flush_doc_frees();
		outcome
	}

	/// Rubs out the last keystroke, replaying its tokens in reverse.
	pub fn rubout(&mut self) {
		if self.cmdline.buf.is_empty() {
			return;
		}
		let pos = self.cmdline.buf.len() - 1;
		self.reject_to(pos);
		self.flush_doc_frees();
	}

	fn run_cmdline(&mut self, from: usize) -> crate::error::Exec<()> {
		// The command line stays in place so `{` can copy it; execution
		// works on a snapshot.
		let buf = self.cmdline.buf.clone();
		self.pc = from;
		self.cmdline.pc = from;
		self.cmdline_active = true;
		let result = self.step(&buf, buf.len());
		self.cmdline_active = false;
		result
	}

	fn reject_to(&mut self, pos: usize) {
		let tokens = self.undo.take_from(pos);
		for token in tokens {
			self.run_undo_token(token);
		}
		self.cmdline.buf.truncate(pos);
		self.pc = pos;
		self.cmdline.pc = pos;
	}

	fn accept_cmdline(&mut self) {
		let tokens = self.undo.take_all();
		for token in tokens {
			self.commit_undo_token(token);
		}
		self.cmdline.last = std::mem::take(&mut self.cmdline.buf);
		self.pc = 0;
		self.cmdline.pc = 0;

		// A fresh command line starts with a clean expression stack;
		// the radix survives.
		self.expr.clear();
		self.loop_stack.clear();
		self.loop_fp = 0;
		self.state = State::Start;
		self.mode = Mode::Normal;
		self.skip_else = false;
		self.nest_level = 0;
		self.colon = false;
		self.at = false;
		self.escape_char = ESC;
		self.goto_table = GotoTable::new(true);
		self.skip_label = None;
	}

	/// `}`: swap in the edited command line; if the replacement fails, the
	/// original line is restored by the same algorithm, and if that fails
	/// too its tail stays dropped.
	fn handle_replace(&mut self, pos: usize, new: Vec<u8>) -> Result<KeyOutcome, TekoError> {
		self.reject_to(pos);
		let old = self.cmdline.buf.clone();
		match self.replay(&new) {
			Ok(outcome) => Ok(outcome),
			Err(e) => {
				let _ = self.replay(&old);
				Err(e)
			}
		}
	}

	fn replay(&mut self, target: &[u8]) -> Result<KeyOutcome, TekoError> {
		let common = self
			.cmdline
			.buf
			.iter()
			.zip(target.iter())
			.take_while(|(a, b)| a == b)
			.count();
		while self.cmdline.buf.len() > common {
			let pos = self.cmdline.buf.len() - 1;
			self.reject_to(pos);
		}
		for i in common..target.len() {
			if self.keypress(target[i])? == KeyOutcome::Accepted {
				return Ok(KeyOutcome::Accepted);
			}
		}
		Ok(KeyOutcome::Continue)
	}
}
