//! The rub-out log.
//!
//! Every side effect of executing a command-line character pushes one or
//! more tokens, each stamped with the command-line position it belongs to.
//! Rubbing a character out pops and replays all tokens at or beyond that
//! position, newest first; accepting the command line commits the whole
//! log, running only the commit side of tokens that own on-disk or arena
//! resources (save-point files, stashed documents, closed buffers).
//!
//! Tokens are plain data: an enum of restorable slots plus owned-object
//! stashes. They are replayed against the interpreter by
//! [`crate::machine::Interp::run_undo_token`].

use std::path::PathBuf;

use crate::error::TekoInt;
use crate::expr::Entry;
use crate::machine::{EdFlags, EsMessage, LoopContext, Mode, State, Target};
use crate::qreg::RegStackEntry;
use crate::ring::{Buffer, BufferId};
use crate::strings::{QRegSpec, QRegSpecMachine, StringBuilder};
use crate::view::{DocumentId, ViewAction};

/// One reversible step.
#[derive(Debug)]
pub enum UndoToken {
	// Parser slots.
	State(State),
	Mode(Mode),
	Colon(bool),
	At(bool),
	SkipElse(bool),
	NestLevel(u32),
	EscapeChar(u8),
	StringNesting(u32),
	/// Truncate the string-argument accumulator back to this length.
	StringLen(usize),
	/// Restore the whole string-argument accumulator.
	StringArg(Vec<u8>),
	StringBuilder(Box<StringBuilder>),
	QSpec(Box<QRegSpecMachine>),
	EsMessage(Option<EsMessage>),
	SkipLabel(Option<String>),
	GotoEntry {
		label: String,
		prev: Option<usize>,
	},

	// Expression engine slots.
	ExprPush(Entry),
	ExprPop,
	NumSign(TekoInt),
	Radix(TekoInt),
	BraceLevel(u32),

	// Control flow slots.
	LoopPush(LoopContext),
	LoopPop,
	LoopCounter {
		index: usize,
		counter: TekoInt,
	},

	// Global flags.
	Flags(EdFlags),
	QuitRequested(bool),
	MemLimit(usize),

	// Deferred view operations.
	View(ViewAction),
	/// Reinstall an edit target (current pointers, document, dot, banner).
	EditTarget(Target),
	InfoUpdate,

	// Register slots and stashes.
	RegInteger {
		spec: QRegSpec,
		value: TekoInt,
	},
	RegDot {
		spec: QRegSpec,
		dot: usize,
	},
	RegDoc {
		spec: QRegSpec,
		doc: Option<DocumentId>,
	},
	/// Undo of a stack push: pop the entry again and free its document.
	RegStackDrop,
	/// Undo of a stack pop: move the register's current snapshot back to
	/// the stack and restore `old` into the register. On commit the stale
	/// snapshot's document is freed.
	RegStackUnpop {
		spec: QRegSpec,
		old: RegStackEntry,
	},

	// Ring slots and stashes.
	BufferDirty {
		id: BufferId,
		dirty: bool,
	},
	BufferFilename {
		id: BufferId,
		filename: Option<PathBuf>,
	},
	/// Undo of a close: reattach the stashed buffer and edit it. On commit
	/// the buffer is gone for good and its document is freed.
	ReinsertBuffer {
		buffer: Box<Buffer>,
		index: usize,
	},
	/// Undo of opening a fresh buffer: close it again.
	CloseBuffer {
		id: BufferId,
	},

	// Filesystem actions.
	RemoveFile(PathBuf),
	/// Undo of a save over an existing file: rename the save point back.
	/// On commit the save point is unlinked.
	RestoreSavepoint {
		savepoint: PathBuf,
		original: PathBuf,
	},
	ChangeDir(PathBuf),
}

/// Position-stamped LIFO of [`UndoToken`]s.
#[derive(Debug, Default)]
pub struct UndoLog {
	stack: Vec<(usize, UndoToken)>,
	/// When false every push is a no-op (batch mode).
	pub enabled: bool,
	pos: usize,
}

impl UndoLog {
	pub fn new(enabled: bool) -> Self {
		UndoLog {
			stack: Vec::new(),
			enabled,
			pos: 0,
		}
	}

	/// Sets the command-line position subsequent tokens are stamped with.
	pub fn set_pos(&mut self, pos: usize) {
		self.pos = pos;
	}

	pub fn push(&mut self, token: UndoToken) {
		if self.enabled {
			self.stack.push((self.pos, token));
		}
	}

	pub fn len(&self) -> usize {
		self.stack.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stack.is_empty()
	}

	/// Pops every token stamped at or beyond `pos`, newest first.
	pub fn take_from(&mut self, pos: usize) -> Vec<UndoToken> {
		let mut tokens = Vec::new();
		while let Some((stamp, _)) = self.stack.last() {
			if *stamp < pos {
				break;
			}
			let (_, token) = self.stack.pop().expect("peeked entry exists");
			tokens.push(token);
		}
		tokens
	}

	/// Drains the whole log for commit, oldest first.
	pub fn take_all(&mut self) -> Vec<UndoToken> {
		self.pos = 0;
		self.stack.drain(..).map(|(_, token)| token).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn disabled_log_drops_pushes() {
		let mut log = UndoLog::new(false);
		log.push(UndoToken::Colon(true));
		assert!(log.is_empty());
	}

	#[test]
	fn take_from_respects_position_stamps() {
		let mut log = UndoLog::new(true);
		log.set_pos(0);
		log.push(UndoToken::Colon(false));
		log.set_pos(1);
		log.push(UndoToken::At(false));
		log.push(UndoToken::NestLevel(2));

		let tokens = log.take_from(1);
		assert_eq!(tokens.len(), 2);
		assert!(matches!(tokens[0], UndoToken::NestLevel(2)));
		assert!(matches!(tokens[1], UndoToken::At(false)));
		assert_eq!(log.len(), 1);
	}

	#[test]
	fn commit_drains_everything() {
		let mut log = UndoLog::new(true);
		log.push(UndoToken::Colon(false));
		log.push(UndoToken::At(true));
		let tokens = log.take_all();
		assert_eq!(tokens.len(), 2);
		assert!(matches!(tokens[0], UndoToken::Colon(false)));
		assert!(log.is_empty());
	}
}
