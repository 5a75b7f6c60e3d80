//! End-to-end scenarios: interactive rub-out invertibility, command-line
//! replacement, the buffer ring against a real filesystem.

use teko_core::cmdline::KeyOutcome;
use teko_core::machine::Interp;
use teko_core::strings::QRegSpec;
use teko_core::TekoInt;

fn type_all(interp: &mut Interp, keys: &str) {
	for &c in keys.as_bytes() {
		interp
			.keypress(c)
			.unwrap_or_else(|e| panic!("keystroke {:?} rejected: {}", c as char, e));
	}
}

fn type_accept(interp: &mut Interp, keys: &str) {
	type_all(interp, keys);
	assert_eq!(interp.keypress(0x1b).unwrap(), KeyOutcome::Continue);
	assert_eq!(interp.keypress(0x1b).unwrap(), KeyOutcome::Accepted);
}

fn rubout_all(interp: &mut Interp) {
	while !interp.cmdline.buf.is_empty() {
		interp.rubout();
	}
}

fn reg_int(interp: &mut Interp, name: &str) -> TekoInt {
	interp.reg_get_integer(&QRegSpec::global(name)).unwrap()
}

fn reg_str(interp: &mut Interp, name: &str) -> String {
	interp.reg_get_string(&QRegSpec::global(name)).unwrap()
}

#[test]
fn insert_is_fully_invertible() {
	let mut interp = Interp::interactive();
	assert!(!interp.ring.current_buffer().unwrap().dirty);

	type_all(&mut interp, "I hi \x1b");
	assert_eq!(interp.view.text(), " hi ");
	assert!(interp.ring.current_buffer().unwrap().dirty);

	rubout_all(&mut interp);
	assert_eq!(interp.view.text(), "");
	assert!(!interp.ring.current_buffer().unwrap().dirty);
	assert!(interp.undo.is_empty());
	assert!(interp.expr.is_empty());
}

#[test]
fn motion_and_deletion_rub_out_exactly() {
	let mut interp = Interp::interactive();
	interp.view.set_text("hello world");

	type_all(&mut interp, "0J5C3D");
	assert_eq!(interp.view.text(), "hellorld");
	assert_eq!(interp.view.current_pos(), 5);

	rubout_all(&mut interp);
	assert_eq!(interp.view.text(), "hello world");
	assert_eq!(interp.view.current_pos(), 0);
	assert!(interp.expr.is_empty());
}

#[test]
fn sequential_composition() {
	let mut split = Interp::batch();
	split.view.set_text("hello world");
	split.execute_macro(b"0J5C", false).unwrap();
	split.execute_macro(b"3D", false).unwrap();

	let mut joined = Interp::batch();
	joined.view.set_text("hello world");
	joined.execute_macro(b"0J5C3D", false).unwrap();

	assert_eq!(split.view.text(), joined.view.text());
	assert_eq!(split.view.current_pos(), joined.view.current_pos());
}

#[test]
fn accepting_a_command_line_commits() {
	let mut interp = Interp::interactive();
	interp.view.set_text("payload");

	type_accept(&mut interp, "HXA");
	assert_eq!(reg_str(&mut interp, "A"), "payload");
	assert!(interp.expr.is_empty());
	assert!(interp.undo.is_empty());
	assert!(interp.cmdline.buf.is_empty());
	assert!(interp.cmdline.last.ends_with(b"\x1b\x1b"));
}

#[test]
fn rejected_keystrokes_leave_no_trace() {
	let mut interp = Interp::interactive();
	interp.view.set_text("abc");

	type_all(&mut interp, "1J");
	// Jumping past the end fails and the keystroke is rejected.
	type_all(&mut interp, "98");
	let err = interp.keypress(b'J');
	assert!(err.is_err());
	assert_eq!(interp.cmdline.buf, b"1J98");

	rubout_all(&mut interp);
	assert_eq!(interp.view.current_pos(), 0);
}

#[test]
fn register_push_pop_is_a_no_op() {
	let mut interp = Interp::interactive();
	type_accept(&mut interp, "65UA@^UA/x/");

	type_all(&mut interp, "[A1UA@^UA/y/]A");
	assert_eq!(reg_int(&mut interp, "A"), 65);
	assert_eq!(reg_str(&mut interp, "A"), "x");

	rubout_all(&mut interp);
	assert_eq!(reg_int(&mut interp, "A"), 65);
	assert_eq!(reg_str(&mut interp, "A"), "x");
}

#[test]
fn loop_rubs_out_iteration_by_iteration() {
	let mut interp = Interp::interactive();
	type_all(&mut interp, "5<%B>");
	assert_eq!(reg_int(&mut interp, "B"), 5);

	rubout_all(&mut interp);
	assert_eq!(reg_int(&mut interp, "B"), 0);
	assert!(interp.loop_stack.is_empty());
	assert!(interp.expr.is_empty());
}

#[test]
fn save_last_command_line() {
	let mut interp = Interp::interactive();
	type_accept(&mut interp, "1UA");

	type_all(&mut interp, "*B");
	let saved = reg_str(&mut interp, "B");
	assert!(saved.starts_with("1UA"));
	assert!(saved.ends_with("\x1b\x1b"));
}

#[test]
fn command_line_editing_replaces_the_line() {
	let mut interp = Interp::interactive();
	type_all(&mut interp, "1UA{");
	// The escape register now holds "1UA"; prepend a digit and update.
	type_all(&mut interp, "0JI2\x1b");
	type_all(&mut interp, "}");

	assert_eq!(interp.cmdline.buf, b"21UA");
	assert_eq!(reg_int(&mut interp, "A"), 21);
}

#[test]
fn replacement_register_guard() {
	let mut interp = Interp::interactive();
	let err = interp.keypress(b'}');
	assert!(err.is_err());
	assert!(interp.cmdline.buf.is_empty());
}

#[test]
fn string_building_sets_register_verbatim() {
	let mut interp = Interp::interactive();
	type_accept(&mut interp, "@^U[Y]/foo/");
	type_all(&mut interp, "@^U[X]/A^EQ[Y]B/");
	assert_eq!(reg_str(&mut interp, "X"), "AfooB");

	rubout_all(&mut interp);
	assert_eq!(reg_str(&mut interp, "X"), "");
}

#[test]
fn edit_save_and_close_files() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("note.txt");
	std::fs::write(&path, "old content").unwrap();
	let path_str = path.display().to_string();

	let mut interp = Interp::interactive();
	type_all(&mut interp, &format!("@EB|{}|", path_str));
	assert_eq!(interp.view.text(), "old content");
	assert_eq!(interp.ring.len(), 2);

	type_all(&mut interp, "Inew \x1b");
	assert_eq!(interp.view.text(), "new old content");
	assert!(interp.ring.current_buffer().unwrap().dirty);

	// Saving creates a hidden save point for the original file.
	type_all(&mut interp, "EW\x1b");
	assert_eq!(std::fs::read_to_string(&path).unwrap(), "new old content");
	assert!(!interp.ring.current_buffer().unwrap().dirty);
	let savepoint = dir.path().join(".teco-note.txt-0");
	assert_eq!(std::fs::read_to_string(&savepoint).unwrap(), "old content");

	// Rubbing the save out restores the original file on disk.
	interp.rubout();
	interp.rubout();
	interp.rubout();
	assert_eq!(std::fs::read_to_string(&path).unwrap(), "old content");
	assert!(!savepoint.exists());
	assert!(interp.ring.current_buffer().unwrap().dirty);

	// Save again and accept: the save point is cleaned up.
	type_accept(&mut interp, "EW\x1b");
	assert_eq!(std::fs::read_to_string(&path).unwrap(), "new old content");
	assert!(!savepoint.exists());
}

#[test]
fn closing_a_buffer_rubs_back_in() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("close-me.txt");
	std::fs::write(&path, "body").unwrap();
	let path_str = path.display().to_string();

	let mut interp = Interp::interactive();
	type_accept(&mut interp, &format!("@EB|{}|", path_str));
	type_all(&mut interp, "2J");
	assert_eq!(interp.ring.len(), 2);

	type_all(&mut interp, "EF");
	assert_eq!(interp.ring.len(), 1);
	assert!(interp.ring.current_buffer().unwrap().filename.is_none());

	rubout_all(&mut interp);
	assert_eq!(interp.ring.len(), 2);
	let buffer = interp.ring.current_buffer().unwrap();
	assert_eq!(
		buffer.filename.as_deref(),
		Some(teko_core::ring::absolute_path(&path).as_path())
	);
	assert_eq!(interp.view.text(), "body");
	// The 2J was rubbed out along with the close.
	assert_eq!(interp.view.current_pos(), 0);
}

#[test]
fn dirty_buffers_block_closing() {
	let mut interp = Interp::interactive();
	type_all(&mut interp, "Ix\x1b");
	let err = interp.keypress(b'E').and_then(|_| interp.keypress(b'F'));
	assert!(err.is_err());
	// The rejected EF leaves the dirty buffer in the ring.
	assert_eq!(interp.ring.len(), 1);
	assert!(interp.ring.current_buffer().unwrap().dirty);
}

#[test]
fn macro_files_skip_the_hash_bang() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("script.teko");
	std::fs::write(&path, "#!/usr/bin/env teko\n7UA").unwrap();

	let mut interp = Interp::batch();
	interp.execute_file(&path, true).unwrap();
	assert_eq!(reg_int(&mut interp, "A"), 7);
}

#[test]
fn macro_file_errors_name_the_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("bad.teko");
	std::fs::write(&path, "#!teko\n(").unwrap();

	let mut interp = Interp::batch();
	let err = interp.execute_file(&path, true).unwrap_err();
	let rendered = match err {
		teko_core::Unwind::Error(e) => e.to_string(),
		other => panic!("unexpected unwind: {:?}", other),
	};
	assert!(rendered.contains("bad.teko"), "got: {}", rendered);
}

#[test]
fn register_load_from_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("data.txt");
	std::fs::write(&path, "register payload").unwrap();

	let mut interp = Interp::batch();
	interp
		.execute_macro(format!("@EQA|{}|", path.display()).as_bytes(), false)
		.unwrap();
	assert_eq!(reg_str(&mut interp, "A"), "register payload");
}

#[test]
fn editing_a_register_in_the_view() {
	let mut interp = Interp::interactive();
	type_all(&mut interp, "@EQA||Iinside\x1b");
	assert_eq!(interp.view.text(), "inside");
	assert!(interp.ring.current.is_none());
	assert_eq!(reg_str(&mut interp, "A"), "inside");

	rubout_all(&mut interp);
	assert!(interp.ring.current.is_some());
	assert_eq!(reg_str(&mut interp, "A"), "");
}

#[test]
fn interrupt_flag_aborts_the_step() {
	let mut interp = Interp::batch();
	interp
		.interrupt
		.store(true, std::sync::atomic::Ordering::Relaxed);
	let err = interp.execute_macro(b"1UA", false).unwrap_err();
	assert!(matches!(
		err,
		teko_core::Unwind::Error(e)
			if matches!(e.kind, teko_core::ErrorKind::Interrupted)
	));
}

#[test]
fn memory_limit_rejects_impossible_values() {
	let mut interp = Interp::batch();
	let result = interp.execute_macro(b"1,2EJ", false);
	if cfg!(target_os = "linux") {
		assert!(result.is_err());
	}
}
