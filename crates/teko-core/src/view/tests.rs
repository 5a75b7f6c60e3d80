//! Behavior-lock tests for the document host.

use super::*;

#[test]
fn add_text_advances_the_caret() {
	let mut v = ViewHost::new();
	v.add_text("hello");
	assert_eq!(v.text(), "hello");
	assert_eq!(v.current_pos(), 5);
	v.goto_pos(0);
	v.add_text("> ");
	assert_eq!(v.text(), "> hello");
	assert_eq!(v.current_pos(), 2);
}

#[test]
fn append_leaves_the_caret_alone() {
	let mut v = ViewHost::new();
	v.add_text("ab");
	v.goto_pos(1);
	v.append_text("cd");
	assert_eq!(v.text(), "abcd");
	assert_eq!(v.current_pos(), 1);
}

#[test]
fn delete_range_adjusts_the_caret() {
	let mut v = ViewHost::new();
	v.set_text("hello world");
	v.goto_pos(11);
	v.delete_range(5, 3);
	assert_eq!(v.text(), "hellorld");
	assert_eq!(v.current_pos(), 8);

	v.goto_pos(6);
	v.delete_range(5, 3);
	assert_eq!(v.text(), "hello");
	assert_eq!(v.current_pos(), 5);
}

#[test]
fn line_conversions_are_byte_oriented() {
	let mut v = ViewHost::new();
	v.set_text("one\ntwo\nthree");
	assert_eq!(v.line_count(), 3);
	assert_eq!(v.line_from_position(0), 0);
	assert_eq!(v.line_from_position(4), 1);
	assert_eq!(v.position_from_line(1), 4);
	assert_eq!(v.position_from_line(2), 8);
	assert_eq!(v.position_from_line(99), 13);
}

#[test]
fn word_end_motions() {
	let mut v = ViewHost::new();
	v.set_text("foo  bar baz");
	v.goto_pos(0);
	assert_eq!(v.word_right_end(), 3);
	v.goto_pos(3);
	assert_eq!(v.word_right_end(), 8);
	v.goto_pos(12);
	assert_eq!(v.word_left_end(), 8);
	v.goto_pos(8);
	assert_eq!(v.word_left_end(), 3);
}

#[test]
fn del_word_right_end_stays_put() {
	let mut v = ViewHost::new();
	v.set_text("foo bar");
	v.goto_pos(3);
	v.del_word_right_end();
	assert_eq!(v.text(), "foo");
	assert_eq!(v.current_pos(), 3);
}

#[test]
fn undo_restores_one_whole_group() {
	let mut v = ViewHost::new();
	v.set_text("abc");
	v.goto_pos(3);
	v.begin_undo_action();
	v.add_text("X");
	v.add_text("Y");
	v.end_undo_action();
	assert_eq!(v.text(), "abcXY");
	v.undo();
	assert_eq!(v.text(), "abc");
	assert_eq!(v.current_pos(), 3);
}

#[test]
fn ungrouped_edits_self_group() {
	let mut v = ViewHost::new();
	v.set_text("abc");
	v.undo();
	assert_eq!(v.text(), "");
}

#[test]
fn documents_are_independent() {
	let mut v = ViewHost::new();
	let main = v.current_doc();
	v.add_text("main");
	let other = v.create_doc();
	v.set_doc(other);
	v.add_text("other");
	assert_eq!(v.text(), "other");
	v.set_doc(main);
	assert_eq!(v.text(), "main");

	let cloned = v.clone_doc(other);
	assert_eq!(v.doc_text(cloned), "other");
	v.free_doc(cloned);
	v.free_doc(other);
}

#[test]
fn column_expands_tabs() {
	let mut v = ViewHost::new();
	v.set_text("a\tb");
	assert_eq!(v.column(0), 0);
	assert_eq!(v.column(1), 1);
	assert_eq!(v.column(2), 8);
	assert_eq!(v.column(3), 9);
}

#[test]
fn symbolic_dispatch_round_trips() {
	let mut v = ViewHost::new();
	v.dispatch("SETTEXT", 0, Param::Str("hi")).unwrap();
	assert_eq!(v.dispatch("GETLENGTH", 0, Param::Int(0)).unwrap(), 2);
	assert_eq!(v.dispatch("getcharat", 1, Param::Int(0)).unwrap(), 'i' as TekoInt);
	assert_eq!(v.dispatch("VW_GETLINECOUNT", 0, Param::Int(0)).unwrap(), 1);
	assert!(v.dispatch("NOSUCH", 0, Param::Int(0)).is_err());
}
