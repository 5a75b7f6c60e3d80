//! The frontend seam.
//!
//! The core never talks to a screen directly: user messages, the info
//! banner, the buffer popup and palette requests all go through this
//! trait. The terminal binary implements it; tests and batch runs use
//! [`NullFrontend`].

use crate::error::TekoInt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Info,
	Warning,
	Error,
	/// Output the user explicitly asked for (the `=` command).
	User,
}

/// What the info banner currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoView {
	Buffer { name: String, dirty: bool },
	Register { name: String },
}

pub trait Frontend {
	fn message(&mut self, severity: Severity, text: &str);

	fn info_update(&mut self, info: &InfoView) {
		let _ = info;
	}

	fn popup_add(&mut self, name: &str, highlight: bool) {
		let _ = (name, highlight);
	}

	fn popup_show(&mut self) {}

	/// Palette redefinition request (`rgb,color,3EJ`); best effort, no
	/// feedback.
	fn init_color(&mut self, color: u8, rgb: u32) {
		let _ = (color, rgb);
	}

	/// 1 for terminal frontends, 2 for graphical ones (`0EJ`).
	fn ui_id(&self) -> TekoInt {
		1
	}
}

/// Discards everything; batch and test default.
#[derive(Debug, Default)]
pub struct NullFrontend;

impl Frontend for NullFrontend {
	fn message(&mut self, _severity: Severity, _text: &str) {}
}

/// Records messages for assertions.
#[derive(Debug, Default)]
pub struct RecordingFrontend {
	pub messages: Vec<(Severity, String)>,
	pub popups: Vec<String>,
}

impl Frontend for RecordingFrontend {
	fn message(&mut self, severity: Severity, text: &str) {
		self.messages.push((severity, text.to_string()));
	}

	fn popup_add(&mut self, name: &str, _highlight: bool) {
		self.popups.push(name.to_string());
	}
}
