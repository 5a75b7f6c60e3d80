mod cli;
mod frontend;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::tty::IsTty;
use tracing_subscriber::EnvFilter;

use teko_core::machine::{Hook, Interp};
use teko_core::Unwind;

use cli::Cli;
use frontend::TermFrontend;

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_env("TEKO_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
		)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let (front, raw_mode) = TermFrontend::new();
	let mut interp = Interp::new(Box::new(front), false);

	if !cli.no_profile {
		if let Some(profile) = profile_path() {
			if profile.is_file() {
				if let Err(code) = check(interp.execute_file(&profile, true), &mut interp) {
					return code;
				}
			}
		}
	}

	let mut ran_batch = false;
	if let Some(text) = &cli.eval {
		ran_batch = true;
		if let Err(code) = check(interp.execute_macro(text.as_bytes(), true), &mut interp) {
			return code;
		}
	}
	if let Some(script) = cli.mung.as_ref().or(cli.script.as_ref()) {
		ran_batch = true;
		if let Err(code) = check(interp.execute_file(script, true), &mut interp) {
			return code;
		}
	}

	if let Some(output) = &cli.output_file {
		if let Err(code) = check(interp.ring_save(Some(output.as_path())), &mut interp) {
			return code;
		}
	}

	let interactive = !interp.quit_requested
		&& !ran_batch
		&& std::io::stdin().is_tty()
		&& std::io::stdout().is_tty();
	if interactive {
		interp.undo.enabled = true;
		raw_mode.set(true);
		if let Err(e) = terminal::run(&mut interp) {
			eprintln!("terminal error: {}", e);
			return ExitCode::FAILURE;
		}
		raw_mode.set(false);
	}

	let _ = interp.run_hook(Hook::Quit);
	ExitCode::SUCCESS
}

fn profile_path() -> Option<PathBuf> {
	std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".tekorc"))
}

/// Maps an unwind to process-exit semantics: `Quit` is a normal way out,
/// errors are rendered with their frame chain.
fn check(result: Result<(), Unwind>, interp: &mut Interp) -> Result<(), ExitCode> {
	match result {
		Ok(()) => Ok(()),
		Err(Unwind::Quit) => {
			interp.quit_requested = true;
			Ok(())
		}
		Err(Unwind::Error(e)) => {
			eprintln!("{}", e);
			Err(ExitCode::FAILURE)
		}
		Err(Unwind::Return(_)) | Err(Unwind::Replace(_)) => Ok(()),
	}
}
