//! Frontend wiring for a plain terminal.

use std::cell::Cell;
use std::rc::Rc;

use teko_core::{Frontend, InfoView, Severity, TekoInt};

/// Prints messages and popups straight to the terminal. While the raw-mode
/// command line is active, lines are prefixed with `\r\n` so they do not
/// shear across the prompt; the flag is shared with the event loop.
#[derive(Debug, Default)]
pub struct TermFrontend {
	raw_mode: Rc<Cell<bool>>,
	popup: Vec<String>,
}

impl TermFrontend {
	pub fn new() -> (Self, Rc<Cell<bool>>) {
		let raw_mode = Rc::new(Cell::new(false));
		(
			TermFrontend {
				raw_mode: raw_mode.clone(),
				popup: Vec::new(),
			},
			raw_mode,
		)
	}

	fn line(&self, text: &str) {
		if self.raw_mode.get() {
			print!("\r\n{}\r\n", text);
		} else {
			println!("{}", text);
		}
	}
}

impl Frontend for TermFrontend {
	fn message(&mut self, severity: Severity, text: &str) {
		match severity {
			Severity::User | Severity::Info => self.line(text),
			Severity::Warning => self.line(&format!("Warning: {}", text)),
			Severity::Error => {
				if self.raw_mode.get() {
					eprint!("\r\nError: {}\r\n", text);
				} else {
					eprintln!("Error: {}", text);
				}
			}
		}
	}

	fn info_update(&mut self, _info: &InfoView) {}

	fn popup_add(&mut self, name: &str, highlight: bool) {
		let marker = if highlight { "*" } else { " " };
		self.popup.push(format!("{} {}", marker, name));
	}

	fn popup_show(&mut self) {
		for entry in std::mem::take(&mut self.popup) {
			self.line(&entry);
		}
	}

	fn ui_id(&self) -> TekoInt {
		1
	}
}
