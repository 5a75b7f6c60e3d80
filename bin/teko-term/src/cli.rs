use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "teko")]
#[command(about = "An interactive TECO-dialect text editor")]
#[command(version)]
pub struct Cli {
	/// Macro file to munge (batch execution)
	pub script: Option<PathBuf>,

	/// Macro file to munge (same as the positional argument)
	#[arg(long)]
	pub mung: Option<PathBuf>,

	/// Execute macro text before anything else
	#[arg(long = "eval", short = 'e')]
	pub eval: Option<String>,

	/// Skip the ~/.tekorc startup profile
	#[arg(long)]
	pub no_profile: bool,

	/// Write the current buffer to this path after batch execution
	#[arg(long)]
	pub output_file: Option<PathBuf>,
}
