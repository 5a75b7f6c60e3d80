//! The hierarchical state machine and its executor.
//!
//! Each parse state consumes one input character and names its successor.
//! Purely syntactic successors live in [`transition`]; everything else goes
//! through the per-state `custom` handlers in the submodules. A state
//! change feeds the new state a NUL so it can run its entry side effects,
//! mirroring the way multi-character commands chain.
//!
//! All interpreter state that used to be scattered globals (current state,
//! mode, modifiers, loop stack, goto table, PC, ...) is consolidated in
//! [`Interp`] so that undo tokens can name the slot they restore.

mod buffers;
mod cond;
mod control;
mod ecommand;
mod estring;
mod fcommand;
mod qregcmd;
mod regops;
mod start;
mod undo_run;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use tracing::trace;

use crate::cmdline::CmdLine;
use crate::error::{line_column, ErrorFrame, ErrorKind, Exec, TekoError, TekoInt, Unwind};
use crate::expr::Expressions;
use crate::frontend::{Frontend, InfoView, NullFrontend, Severity};
use crate::memlimit::MemoryLimit;
use crate::qreg::{QRegister, QRegisterTable, RegKind, RegStackEntry};
use crate::ring::{BufferId, Ring};
use crate::strings::{QRegSpec, QRegSpecMachine, RegFetch, StringBuilder};
use crate::undo::{UndoLog, UndoToken};
use crate::view::ViewHost;

/// The escape character as typed (`^[`).
pub const ESC: u8 = 0x1b;

bitflags! {
	/// The ED flag bitmap.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct EdFlags: u32 {
		/// Fold the case of command letters during interactive input.
		const FOLD_CASE = 8;
		/// Translate EOL sequences to LF on load, restore on save.
		const EOL_TRANSLATE = 16;
		/// Run the editing hook macro (global register `0`).
		const HOOKS = 32;
		/// Enable function-key macros.
		const FNKEYS = 64;
		/// Strict POSIX sh emulation for spawned commands.
		const SHELL_EMU = 128;
		/// Enable the xterm clipboard bridge.
		const CLIPBOARD = 256;
	}
}

impl Default for EdFlags {
	fn default() -> Self {
		EdFlags::EOL_TRANSLATE
	}
}

/// Execution modes: normal or one of the parse-only skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
	#[default]
	Normal,
	ParseOnlyLoop,
	ParseOnlyCond,
	ParseOnlyGoto,
}

/// Parse states. State-specific mutable data lives in [`Interp`] fields
/// shared by the states that need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
	#[default]
	Start,
	Control,
	Ascii,
	Escape,
	FCommand,
	CondCommand,
	ECommand,
	Label,
	GotoCmd,
	Insert {
		building: bool,
	},
	InsertIndent,
	EsSymbols,
	EsLparam,
	EditFile,
	SaveFile,
	LoadQReg,
	MacroFile,
	ChangeDir,
	PushQReg,
	PopQReg,
	EqCommand,
	CtlUCommand,
	SetQRegString,
	GetQRegString,
	GetQRegInteger,
	SetQRegInteger,
	IncreaseQReg,
	MacroCall,
	CopyToQReg,
	SaveCmdline,
}

/// One open loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopContext {
	/// PC of the `<` command.
	pub pc: usize,
	/// Remaining iterations; -1 runs forever.
	pub counter: TekoInt,
	/// Colon-modified loops leave the stack visible to the body.
	pub pass_through: bool,
}

/// Per-frame goto label table.
#[derive(Debug, Default)]
pub struct GotoTable {
	map: std::collections::HashMap<String, usize>,
	/// Whether label insertions journal undo (top level only).
	pub must_undo: bool,
}

impl GotoTable {
	pub fn new(must_undo: bool) -> Self {
		GotoTable {
			map: std::collections::HashMap::new(),
			must_undo,
		}
	}

	pub fn get(&self, label: &str) -> Option<usize> {
		self.map.get(label).copied()
	}

	pub fn set(&mut self, label: String, pc: usize) -> Option<usize> {
		self.map.insert(label, pc)
	}

	pub fn remove(&mut self, label: &str) {
		self.map.remove(label);
	}
}

/// What the view is currently editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	Buffer(BufferId),
	Register(QRegSpec),
}

/// A pending `ES` dispatch between its two string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsMessage {
	pub symbol: String,
	pub wparam: TekoInt,
}

/// Accumulator for the string argument of the current command.
#[derive(Debug, Default)]
pub struct StringArg {
	pub buf: Vec<u8>,
	/// Brace/terminator nesting; the string ends when this reaches 0.
	pub nesting: u32,
	/// Bytes appended since the last interactive `process` call.
	pub insert_len: usize,
}

/// The consolidated interpreter.
pub struct Interp {
	pub view: ViewHost,
	pub expr: Expressions,
	pub undo: UndoLog,
	pub ring: Ring,
	pub globals: QRegisterTable,
	pub locals: QRegisterTable,
	pub reg_stack: Vec<RegStackEntry>,
	/// The register being edited, if the view shows one.
	pub current_reg: Option<QRegSpec>,

	pub loop_stack: Vec<LoopContext>,
	pub loop_fp: usize,
	pub goto_table: GotoTable,
	pub skip_label: Option<String>,

	pub state: State,
	pub mode: Mode,
	pub skip_else: bool,
	pub nest_level: u32,
	pub colon: bool,
	pub at: bool,
	pub pc: usize,

	pub strarg: StringArg,
	pub escape_char: u8,
	pub strbuild: StringBuilder,
	pub qspec: QRegSpecMachine,
	/// Register captured by two-phase commands (`EQ`, `^U`).
	pub reg_arg: Option<QRegSpec>,
	pub es_msg: Option<EsMessage>,
	/// Whether `EB` may take a filename argument.
	pub eb_allow_filename: bool,

	pub flags: EdFlags,
	pub memlimit: MemoryLimit,
	pub interrupt: Arc<AtomicBool>,
	pub quit_requested: bool,

	pub cmdline: CmdLine,
	/// True while stepping the interactive command line itself.
	pub cmdline_active: bool,

	/// Documents waiting to be freed once the view moves off them.
	pub(crate) pending_free: Vec<crate::view::DocumentId>,

	pub frontend: Box<dyn Frontend>,
}

impl Interp {
	/// Builds an interpreter with an unnamed buffer, the reserved global
	/// registers and one environment register per process variable. Undo
	/// journaling follows `interactive`.
	pub fn new(frontend: Box<dyn Frontend>, interactive: bool) -> Self {
		let mut view = ViewHost::new();
		let initial_doc = view.current_doc();

		let mut globals = QRegisterTable::new(true);
		globals.insert_defaults();
		globals.insert("_", QRegister::default());
		globals.insert("*", QRegister::default());
		globals.insert("\x1b", QRegister::default());
		globals.insert(
			"$",
			QRegister {
				kind: RegKind::WorkingDir,
				read_only: true,
				..QRegister::default()
			},
		);
		for (name, value) in std::env::vars() {
			let doc = view.create_doc();
			let prev = view.current_doc();
			view.set_doc(doc);
			view.set_text(&value);
			view.set_doc(prev);
			globals.insert(
				format!("${}", name),
				QRegister {
					doc: Some(doc),
					read_only: true,
					..QRegister::default()
				},
			);
		}

		let mut locals = QRegisterTable::new(true);
		locals.insert_defaults();

		let mut ring = Ring::new();
		let first = ring.push(None, initial_doc);
		ring.current = Some(first);

		Interp {
			view,
			expr: Expressions::new(),
			undo: UndoLog::new(interactive),
			ring,
			globals,
			locals,
			reg_stack: Vec::new(),
			current_reg: None,
			loop_stack: Vec::new(),
			loop_fp: 0,
			goto_table: GotoTable::new(true),
			skip_label: None,
			state: State::Start,
			mode: Mode::Normal,
			skip_else: false,
			nest_level: 0,
			colon: false,
			at: false,
			pc: 0,
			strarg: StringArg::default(),
			escape_char: ESC,
			strbuild: StringBuilder::new(),
			qspec: QRegSpecMachine::new(),
			reg_arg: None,
			es_msg: None,
			eb_allow_filename: true,
			flags: EdFlags::default(),
			memlimit: MemoryLimit::new(),
			interrupt: Arc::new(AtomicBool::new(false)),
			quit_requested: false,
			cmdline: CmdLine::default(),
			cmdline_active: false,
			pending_free: Vec::new(),
			frontend,
		}
	}

	/// Batch interpreter with the null frontend.
	pub fn batch() -> Self {
		Interp::new(Box::new(NullFrontend), false)
	}

	/// Interactive interpreter with the null frontend (tests).
	pub fn interactive() -> Self {
		Interp::new(Box::new(NullFrontend), true)
	}

	pub fn msg(&mut self, severity: Severity, text: &str) {
		match severity {
			Severity::Info => tracing::info!("{}", text),
			Severity::Warning => tracing::warn!("{}", text),
			Severity::Error => tracing::error!("{}", text),
			Severity::User => {}
		}
		self.frontend.message(severity, text);
	}

	// --- undo-aware slot mutators ---

	pub fn set_mode(&mut self, mode: Mode) {
		self.undo.push(UndoToken::Mode(self.mode));
		self.mode = mode;
	}

	pub fn set_skip_else(&mut self, v: bool) {
		self.undo.push(UndoToken::SkipElse(self.skip_else));
		self.skip_else = v;
	}

	pub fn set_nest_level(&mut self, v: u32) {
		self.undo.push(UndoToken::NestLevel(self.nest_level));
		self.nest_level = v;
	}

	pub fn set_colon(&mut self, v: bool) {
		self.undo.push(UndoToken::Colon(self.colon));
		self.colon = v;
	}

	pub fn set_at(&mut self, v: bool) {
		self.undo.push(UndoToken::At(self.at));
		self.at = v;
	}

	pub fn set_escape_char(&mut self, c: u8) {
		self.undo.push(UndoToken::EscapeChar(self.escape_char));
		self.escape_char = c;
	}

	pub fn set_quit_requested(&mut self, v: bool) {
		self.undo.push(UndoToken::QuitRequested(self.quit_requested));
		self.quit_requested = v;
	}

	/// Consumes a pending colon modifier.
	pub fn eval_colon(&mut self) -> bool {
		if !self.colon {
			return false;
		}
		self.set_colon(false);
		true
	}

	// --- current-target plumbing ---

	pub fn current_target(&self) -> Target {
		if let Some(id) = self.ring.current {
			Target::Buffer(id)
		} else if let Some(spec) = &self.current_reg {
			Target::Register(spec.clone())
		} else {
			Target::Buffer(0)
		}
	}

	/// Saves the view caret into the logical dot of the current target.
	/// Every state entry that switches documents goes through here first,
	/// keeping "caret == dot of current target" an enforced invariant.
	pub fn current_save_dot(&mut self) {
		let dot = self.view.current_pos();
		if let Some(buffer) = self.ring.current_mut() {
			buffer.dot = dot;
		} else if let Some(spec) = self.current_reg.clone() {
			let reg = self.reg_entry(&spec);
			reg.dot = dot;
		}
	}

	pub fn info_view(&self) -> InfoView {
		if let Some(buffer) = self.ring.current_buffer() {
			InfoView::Buffer {
				name: buffer.name(),
				dirty: buffer.dirty,
			}
		} else if let Some(spec) = &self.current_reg {
			InfoView::Register {
				name: spec.display(),
			}
		} else {
			InfoView::Buffer {
				name: "(Unnamed)".into(),
				dirty: false,
			}
		}
	}

	pub fn info_update(&mut self) {
		let info = self.info_view();
		self.frontend.info_update(&info);
	}

	/// Reinstalls an edit target: pointers, document, dot, banner.
	pub fn target_edit(&mut self, target: &Target) {
		match target {
			Target::Buffer(id) => {
				self.current_reg = None;
				self.ring.current = Some(*id);
				if let Some(buffer) = self.ring.get(*id) {
					let (doc, dot) = (buffer.doc, buffer.dot);
					self.view.set_doc(doc);
					self.view.goto_pos(dot);
				}
			}
			Target::Register(spec) => {
				self.ring.current = None;
				self.current_reg = Some(spec.clone());
				let doc = self.reg_ensure_doc(spec);
				let dot = self.reg_entry(spec).dot;
				self.view.set_doc(doc);
				self.view.goto_pos(dot);
			}
		}
		self.info_update();
	}

	/// Whether edits of the current document must journal undo. Buffers
	/// always do; registers follow their table.
	pub fn current_doc_must_undo(&self) -> bool {
		if self.ring.current.is_some() {
			return true;
		}
		match &self.current_reg {
			Some(spec) if spec.local => self.locals.must_undo,
			_ => true,
		}
	}

	// --- character dispatch ---

	/// Feeds one character, chaining state transitions with NUL
	/// initialization, and journals the resulting state change.
	pub fn input(&mut self, chr: u8) -> Exec<()> {
		let mut state = self.state;
		let mut chr = chr;
		loop {
			let next = self.get_next_state(state, chr)?;
			if next == state {
				break;
			}
			state = next;
			chr = 0;
		}
		if state != self.state {
			self.undo.push(UndoToken::State(self.state));
			self.state = state;
		}
		Ok(())
	}

	fn get_next_state(&mut self, state: State, chr: u8) -> Exec<State> {
		if let Some(next) = transition(state, chr) {
			return Ok(next);
		}
		self.custom(state, chr)
	}

	fn custom(&mut self, state: State, chr: u8) -> Exec<State> {
		match state {
			State::Start => self.start_custom(chr),
			State::Control => self.control_custom(chr),
			State::Ascii => self.ascii_custom(chr),
			State::Escape => self.escape_custom(chr),
			State::FCommand => self.fcommand_custom(chr),
			State::CondCommand => self.cond_custom(chr),
			State::ECommand => self.ecommand_custom(chr),
			State::Label => self.label_custom(chr),
			s if estring::string_params(s).is_some() => self.expect_string_input(s, chr),
			s => self.expect_qreg_input(s, chr),
		}
	}

	// --- the executor ---

	/// Runs until the PC reaches `stop`, polling the interrupt flag and
	/// the memory probe at every step.
	pub fn step(&mut self, text: &[u8], stop: usize) -> Exec<()> {
		let mut result = self.step_inner(text, stop);
		if let Err(Unwind::Error(e)) = &mut result {
			e.set_coord(text, self.pc.min(text.len()));
		}
		result
	}

	fn step_inner(&mut self, text: &[u8], stop: usize) -> Exec<()> {
		while self.pc < stop {
			if self.interrupt.swap(false, Ordering::Relaxed) {
				return Err(ErrorKind::Interrupted.into());
			}
			self.memlimit.check()?;

			let chr = text[self.pc];
			trace!(pc = self.pc, chr = chr, state = ?self.state, mode = ?self.mode, "exec");
			self.input(chr)?;
			self.pc = self.pc.wrapping_add(1);
		}
		self.state_refresh();
		Ok(())
	}

	/// Interactive feedback at the end of a step: flush pending string
	/// argument bytes into the document.
	fn state_refresh(&mut self) {
		if matches!(self.state, State::Insert { .. } | State::InsertIndent)
			&& self.strarg.insert_len > 0
		{
			let len = self.strarg.insert_len;
			self.insert_process(len);
			self.strarg.insert_len = 0;
		}
	}

	/// Runs a macro in a fresh invocation frame.
	pub fn execute_macro(&mut self, text: &[u8], locals: bool) -> Exec<()> {
		let parent_state = self.state;
		let parent_pc = self.pc;
		let parent_loop_fp = self.loop_fp;
		let parent_brace = self.expr.brace_level;
		let parent_goto = std::mem::replace(&mut self.goto_table, GotoTable::new(false));
		let parent_cmdline_active = std::mem::replace(&mut self.cmdline_active, false);
		let parent_locals = if locals {
			let mut fresh = QRegisterTable::new(false);
			fresh.insert_defaults();
			Some(std::mem::replace(&mut self.locals, fresh))
		} else {
			None
		};

		// The macro's own tokens rewind its state changes to Start; this
		// token then recovers the caller's state on rub-out.
		self.undo.push(UndoToken::State(self.state));
		self.state = State::Start;
		self.pc = 0;
		self.loop_fp = self.loop_stack.len();

		let mut result = self.run_macro_frame(text, parent_brace);

		if let Err(Unwind::Error(e)) = &mut result {
			let (line, column) = line_column(text, self.pc.min(text.len()));
			e.add_frame(ErrorFrame::Macro { line, column });
		}

		// Frame teardown, on success and on unwind alike.
		self.skip_label = None;
		if let Some(parent) = parent_locals {
			let dead = std::mem::replace(&mut self.locals, parent);
			self.free_local_table(dead);
		}
		self.goto_table = parent_goto;
		self.cmdline_active = parent_cmdline_active;
		self.loop_fp = parent_loop_fp;
		self.pc = parent_pc;
		self.state = parent_state;

		result
	}

	fn run_macro_frame(&mut self, text: &[u8], parent_brace: u32) -> Exec<()> {
		match self.step(text, text.len()) {
			Ok(()) => {}
			Err(Unwind::Return(args)) => {
				self.expr
					.brace_return(&mut self.undo, parent_brace, args)
					.map_err(Unwind::Error)?;
				self.loop_stack.truncate(self.loop_fp);
			}
			Err(e) => return Err(e),
		}

		if self.loop_stack.len() > self.loop_fp {
			let mut e = TekoError::new(ErrorKind::UnterminatedLoop);
			if let Some(ctx) = self.loop_stack.last() {
				e.set_coord(text, ctx.pc);
			}
			return Err(e.into());
		}

		let mut tail = (|| -> Exec<()> {
			if let Some(label) = self.skip_label.clone() {
				return Err(ErrorKind::LabelNotFound(label).into());
			}
			if self.expr.brace_level > parent_brace {
				return Err(ErrorKind::UnterminatedBrace.into());
			}
			self.end_of_macro()?;
			if !self.locals.must_undo {
				self.check_locals_clearable()?;
			}
			Ok(())
		})();
		if let Err(Unwind::Error(e)) = &mut tail {
			e.set_coord(text, self.pc.min(text.len()));
		}
		tail
	}

	/// States with lookahead are allowed at the end of a macro; everything
	/// else is truncated input.
	fn end_of_macro(&mut self) -> Exec<()> {
		match self.state {
			State::Start => Ok(()),
			State::Escape => {
				self.expr.discard_args(&mut self.undo);
				Ok(())
			}
			_ => Err(TekoError::command("unterminated command at end of macro").into()),
		}
	}

	fn check_locals_clearable(&self) -> Exec<()> {
		if let Some(spec) = &self.current_reg {
			if spec.local {
				return Err(ErrorKind::RegisterBeingEdited(spec.display()).into());
			}
		}
		Ok(())
	}

	fn free_local_table(&mut self, mut table: QRegisterTable) {
		for doc in table.drain_docs() {
			self.free_doc_deferred(doc);
		}
	}

	/// Loads and executes a macro file, skipping a leading hash-bang line.
	pub fn execute_file(&mut self, path: &Path, locals: bool) -> Exec<()> {
		let bytes = std::fs::read(path).map_err(|e| {
			Unwind::Error(TekoError::new(ErrorKind::File {
				path: path.to_path_buf(),
				source: e,
			}))
		})?;

		let (text, hashbang) = if bytes.first() == Some(&b'#') {
			match bytes.iter().position(|&b| b == b'\r' || b == b'\n') {
				Some(eol) => (&bytes[eol + 1..], true),
				None => return Ok(()),
			}
		} else {
			(&bytes[..], false)
		};

		let mut result = self.execute_macro(text, locals);
		if let Err(Unwind::Error(e)) = &mut result {
			if hashbang {
				if let Some((line, _)) = &mut e.coord {
					*line += 1;
				}
			}
			e.add_frame(ErrorFrame::File {
				path: path.to_path_buf(),
			});
		}
		result
	}

	/// Runs the editing hook macro (global register `0`) with the hook
	/// type on the expression stack, if ED bit 32 is set.
	pub fn run_hook(&mut self, hook: Hook) -> Exec<()> {
		if !self.flags.contains(EdFlags::HOOKS) {
			return Ok(());
		}
		self.expr.push(&mut self.undo, hook as TekoInt);
		self.reg_execute(&QRegSpec::global("0"), true)
	}
}

/// Hook types passed to the hook macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
	Add = 1,
	Edit = 2,
	Close = 3,
	Quit = 4,
}

impl RegFetch for Interp {
	fn reg_integer(&mut self, spec: &QRegSpec) -> crate::error::Result<TekoInt> {
		self.reg_get_integer(spec)
	}

	fn reg_string(&mut self, spec: &QRegSpec) -> crate::error::Result<String> {
		self.reg_get_string(spec)
	}

	fn radix(&self) -> TekoInt {
		self.expr.radix
	}
}

/// Static successor tables; `None` falls through to the state's custom
/// handler.
pub(crate) fn transition(state: State, chr: u8) -> Option<State> {
	use State::*;
	let chr = chr.to_ascii_uppercase();
	match state {
		Start => match chr {
			0 | b' ' | 0x0b | 0x0c | b'\r' | b'\n' => Some(Start),
			b'$' => Some(Escape),
			b'!' => Some(Label),
			b'O' => Some(GotoCmd),
			b'^' => Some(Control),
			b'F' => Some(FCommand),
			b'"' => Some(CondCommand),
			b'E' => Some(ECommand),
			b'I' => Some(Insert { building: true }),
			b'[' => Some(PushQReg),
			b']' => Some(PopQReg),
			b'G' => Some(GetQRegString),
			b'Q' => Some(GetQRegInteger),
			b'U' => Some(SetQRegInteger),
			b'%' => Some(IncreaseQReg),
			b'M' => Some(MacroCall),
			b'X' => Some(CopyToQReg),
			_ => None,
		},
		Control => match chr {
			0 => Some(Control),
			b'I' => Some(InsertIndent),
			b'U' => Some(CtlUCommand),
			b'^' => Some(Ascii),
			b'[' => Some(Escape),
			_ => None,
		},
		ECommand => match chr {
			0 => Some(ECommand),
			b'B' => Some(EditFile),
			b'I' => Some(Insert { building: false }),
			b'M' => Some(MacroFile),
			b'Q' => Some(EqCommand),
			b'S' => Some(EsSymbols),
			b'W' => Some(SaveFile),
			_ => None,
		},
		FCommand => match chr {
			0 => Some(FCommand),
			b'G' => Some(ChangeDir),
			_ => None,
		},
		Ascii | Escape | CondCommand | Label => {
			if chr == 0 {
				Some(state)
			} else {
				None
			}
		}
		_ => None,
	}
}
