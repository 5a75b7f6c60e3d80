//! The raw-mode interactive loop.
//!
//! One key event feeds one byte into the command line: printable keys and
//! Escape go straight through, Backspace rubs out, CTRL+C raises the
//! interrupt flag polled between execution steps.

use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use teko_core::machine::Interp;
use teko_core::{EdFlags, KeyOutcome};

pub fn run(interp: &mut Interp) -> io::Result<()> {
	terminal::enable_raw_mode()?;
	let result = event_loop(interp);
	terminal::disable_raw_mode()?;
	println!();
	result
}

fn event_loop(interp: &mut Interp) -> io::Result<()> {
	redraw(interp)?;
	loop {
		let Event::Key(key) = event::read()? else {
			continue;
		};
		if key.kind != KeyEventKind::Press {
			continue;
		}
		if let Some(outcome) = handle_key(interp, key) {
			match outcome {
				Ok(KeyOutcome::Accepted) if interp.quit_requested => return Ok(()),
				Ok(_) => {}
				Err(e) => {
					print!("\r\n{}\r\n", e);
					io::stdout().flush()?;
				}
			}
		}
		redraw(interp)?;
	}
}

fn handle_key(
	interp: &mut Interp,
	key: KeyEvent,
) -> Option<Result<KeyOutcome, teko_core::TekoError>> {
	match key.code {
		KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
			interp
				.interrupt
				.store(true, std::sync::atomic::Ordering::Relaxed);
			None
		}
		KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
			let b = (c as u8).to_ascii_uppercase() & 0x1f;
			Some(interp.keypress(b))
		}
		KeyCode::Char(c) if c.is_ascii() => {
			let mut b = c as u8;
			// ED bit 8: invert letter case during interactive input.
			if interp.flags.contains(EdFlags::FOLD_CASE) && b.is_ascii_alphabetic() {
				b ^= 0x20;
			}
			Some(interp.keypress(b))
		}
		KeyCode::Esc => Some(interp.keypress(0x1b)),
		KeyCode::Enter => Some(interp.keypress(b'\n')),
		KeyCode::Tab => Some(interp.keypress(b'\t')),
		KeyCode::Backspace => {
			interp.rubout();
			None
		}
		_ => None,
	}
}

fn redraw(interp: &Interp) -> io::Result<()> {
	let mut rendered = String::new();
	for &b in &interp.cmdline.buf {
		match b {
			0x1b => rendered.push('$'),
			0x00..=0x1f => {
				rendered.push('^');
				rendered.push((b | 0x40) as char);
			}
			_ => rendered.push(b as char),
		}
	}
	print!("\r\x1b[K*{}", rendered);
	io::stdout().flush()
}
