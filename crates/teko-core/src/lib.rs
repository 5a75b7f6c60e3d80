//! An interactive TECO-dialect editor core.
//!
//! The user interface is itself a terminating programming language: every
//! keystroke is an edit command, a parse event and an executable token at
//! once, and every effect can be rubbed out character by character. The
//! crate fuses three subsystems:
//!
//! * a character-driven hierarchical state machine that parses and
//!   executes the command language incrementally ([`machine`]),
//! * an expression/stack engine with radix arithmetic, braces, loop
//!   contexts and conditionals woven into the same character stream
//!   ([`expr`]),
//! * a universal, invertible rub-out log that reverses every side effect,
//!   from buffer edits to mode flips and document switches ([`undo`]).
//!
//! Frontends feed characters through [`machine::Interp::keypress`] (or
//! run whole macro files via [`machine::Interp::execute_file`]) and render
//! whatever the [`frontend::Frontend`] seam hands them.

pub mod cmdline;
pub mod error;
pub mod expr;
pub mod frontend;
pub mod machine;
pub mod memlimit;
pub mod qreg;
pub mod ring;
pub mod strings;
pub mod undo;
pub mod view;

pub use cmdline::KeyOutcome;
pub use error::{ErrorKind, TekoError, TekoInt, Unwind};
pub use frontend::{Frontend, InfoView, NullFrontend, Severity};
pub use machine::{EdFlags, Hook, Interp, Mode, State};
