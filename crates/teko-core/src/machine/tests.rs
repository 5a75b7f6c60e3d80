//! Behavior-lock tests for the state machine and executor.
//!
//! Scripts are executed the way a munged file is; `\x1b` stands for the
//! escape key.

use rstest::rstest;

use crate::error::{ErrorKind, TekoInt, Unwind};
use crate::frontend::Severity;
use crate::strings::QRegSpec;

use super::*;

fn run(interp: &mut Interp, script: &str) {
	interp
		.execute_macro(script.as_bytes(), false)
		.unwrap_or_else(|e| panic!("script {:?} failed: {:?}", script, e));
}

fn batch_with(text: &str, script: &str) -> Interp {
	let mut interp = Interp::batch();
	interp.view.set_text(text);
	run(&mut interp, script);
	interp
}

fn reg_int(interp: &mut Interp, name: &str) -> TekoInt {
	interp.reg_get_integer(&QRegSpec::global(name)).unwrap()
}

fn reg_str(interp: &mut Interp, name: &str) -> String {
	interp.reg_get_string(&QRegSpec::global(name)).unwrap()
}

#[test]
fn copy_whole_buffer_to_register() {
	let mut interp = batch_with("hello world", "HXA");
	assert_eq!(reg_str(&mut interp, "A"), "hello world");
	assert!(interp.expr.is_empty());
}

#[test]
fn motion_and_deletion() {
	let interp = batch_with("hello world", "0J5C3D");
	assert_eq!(interp.view.text(), "hellorld");
	assert_eq!(interp.view.current_pos(), 5);
}

#[test]
fn two_argument_deletion() {
	let interp = batch_with("hello world", "5,8D");
	assert_eq!(interp.view.text(), "hellorld");
}

#[test]
fn kill_lines() {
	let interp = batch_with("one\ntwo\nthree", "0J1K");
	assert_eq!(interp.view.text(), "two\nthree");
}

#[test]
fn loop_increments_register() {
	let mut interp = batch_with("", "5<%B>");
	assert_eq!(reg_int(&mut interp, "B"), 5);
	assert!(interp.expr.is_empty());
}

#[test]
fn zero_iteration_loop_is_skipped() {
	let mut interp = batch_with("", "0<%B>");
	assert_eq!(reg_int(&mut interp, "B"), 0);
}

#[test]
fn loop_break_on_failure() {
	// A non-negative boolean breaks out of the loop.
	let mut interp = batch_with("", "10<%B 0;>");
	assert_eq!(reg_int(&mut interp, "B"), 1);
	// A negative one lets it run to completion.
	let mut interp = batch_with("", "3<%B$-1;>");
	assert_eq!(reg_int(&mut interp, "B"), 3);
}

#[rstest]
#[case("5\"N 1 | 2 '", 1)]
#[case("0\"N 1 | 2 '", 2)]
#[case("5\"E 1 | 2 '", 2)]
#[case("0\"E 1 | 2 '", 1)]
#[case("\"~ 1 | 2 '", 1)]
fn conditionals_pick_the_right_branch(#[case] script: &str, #[case] expect: TekoInt) {
	let mut interp = Interp::batch();
	run(&mut interp, script);
	assert_eq!(
		interp.expr.pop_num_calc(&mut interp.undo).unwrap(),
		expect
	);
}

#[test]
fn nested_conditionals_skip_as_a_unit() {
	let mut interp = Interp::batch();
	run(&mut interp, "0\"N 5\"N 1UA ' 2UA | 3UA '");
	assert_eq!(reg_int(&mut interp, "A"), 3);
}

#[test]
fn integer_insert_and_read_round_trip() {
	let mut interp = batch_with("", "4711\\0J\\UA");
	assert_eq!(interp.view.text(), "4711");
	assert_eq!(reg_int(&mut interp, "A"), 4711);
}

#[test]
fn octal_radix_round_trip() {
	let mut interp = batch_with("", "^O17\\0J\\UA");
	assert_eq!(interp.view.text(), "17");
	assert_eq!(reg_int(&mut interp, "A"), 0o17);
}

#[test]
fn radix_is_readable() {
	let mut interp = batch_with("", "^O^RUA^D^RUB");
	assert_eq!(reg_int(&mut interp, "A"), 8);
	assert_eq!(reg_int(&mut interp, "B"), 10);
}

#[rstest]
#[case("2^*10UA", 1024)]
#[case("7^/2UA", 1)]
#[case("6^#3UA", 5)]
#[case("5^_UA", -6)]
#[case("2+3*4UA", 20)] // no precedence, left to right
#[case("-(5)UA", -5)]
#[case("^^AUA", 65)]
fn arithmetic_commands(#[case] script: &str, #[case] expect: TekoInt) {
	let mut interp = Interp::batch();
	run(&mut interp, script);
	assert_eq!(reg_int(&mut interp, "A"), expect);
}

#[test]
fn jump_boundaries() {
	let mut interp = Interp::batch();
	interp.view.set_text("hello");
	assert!(interp.execute_macro(b"0J", false).is_ok());
	assert!(interp.execute_macro(b"ZJ", false).is_ok());

	let err = interp.execute_macro(b"-1J", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::Move(_))
	));

	run(&mut interp, "Z+1:JUA");
	assert_eq!(reg_int(&mut interp, "A"), crate::error::FAILURE);
	run(&mut interp, "0:JUA");
	assert_eq!(reg_int(&mut interp, "A"), crate::error::SUCCESS);
}

#[test]
fn deleting_across_the_end_fails_non_destructively() {
	let mut interp = Interp::batch();
	interp.view.set_text("abc");
	let err = interp.execute_macro(b"0J99D", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::Range(_))
	));
	assert_eq!(interp.view.text(), "abc");
}

#[test]
fn line_motion_past_the_end_fails() {
	let mut interp = Interp::batch();
	interp.view.set_text("one\ntwo");
	let err = interp.execute_macro(b"0J5L", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::Move(_))
	));
}

#[test]
fn word_motion_and_deletion() {
	let mut interp = batch_with("foo bar", "0JW.UA");
	assert_eq!(reg_int(&mut interp, "A"), 3);

	let interp = batch_with("foo bar", "0JV");
	assert_eq!(interp.view.text(), " bar");

	let interp = batch_with("foo bar", "ZY");
	assert_eq!(interp.view.text(), "foo");
}

#[test]
fn char_code_at_dot() {
	let mut interp = batch_with("abc", "0J0AUA1AUB");
	assert_eq!(reg_int(&mut interp, "A"), 'a' as TekoInt);
	assert_eq!(reg_int(&mut interp, "B"), 'b' as TekoInt);

	let mut interp = Interp::batch();
	interp.view.set_text("abc");
	let err = interp.execute_macro(b"ZA", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::Range(_))
	));
}

#[test]
fn string_building_interpolates_registers() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^U[Y]/foo/@^U[X]/A^EQ[Y]B/");
	assert_eq!(reg_str(&mut interp, "X"), "AfooB");
}

#[test]
fn insert_without_string_building() {
	// EI leaves ^EQ untouched.
	let mut interp = Interp::batch();
	run(&mut interp, "@^U[Y]/foo/");
	run(&mut interp, "@EI/^EQ[Y]/");
	assert_eq!(interp.view.text(), "^EQ[Y]");
}

#[test]
fn insert_stacked_codes_before_text() {
	let interp = batch_with("", "65,66Icd\x1b");
	assert_eq!(interp.view.text(), "ABcd");
}

#[test]
fn brace_terminated_string_arguments_nest() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UA{a{b}c}");
	assert_eq!(reg_str(&mut interp, "A"), "a{b}c");
}

#[test]
fn register_stack_round_trips() {
	let mut interp = Interp::batch();
	run(&mut interp, "65UA@^UA/x/[A 1UA@^UA/y/]A");
	assert_eq!(reg_int(&mut interp, "A"), 65);
	assert_eq!(reg_str(&mut interp, "A"), "x");
}

#[test]
fn popping_an_empty_register_stack_fails() {
	let mut interp = Interp::batch();
	let err = interp.execute_macro(b"]A", false).unwrap_err();
	assert!(matches!(err, Unwind::Error(_)));
}

#[test]
fn get_register_string_inserts_at_dot() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UA/xy/GA");
	assert_eq!(interp.view.text(), "xy");
}

#[test]
fn copy_line_to_register_and_append() {
	let mut interp = batch_with("one\ntwo\n", "0J1XA");
	assert_eq!(reg_str(&mut interp, "A"), "one\n");
	run(&mut interp, "4J1:XA");
	assert_eq!(reg_str(&mut interp, "A"), "one\ntwo\n");
}

#[test]
fn macro_invocation_shares_the_expression_stack() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/1UA/MM");
	assert_eq!(reg_int(&mut interp, "A"), 1);
}

#[test]
fn macro_return_keeps_its_arguments() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/3\x1b\x1b/MMUA");
	assert_eq!(reg_int(&mut interp, "A"), 3);
}

#[test]
fn macro_locals_are_isolated() {
	let mut interp = Interp::batch();
	// The inner macro sees fresh locals; a colon call shares them.
	run(&mut interp, "7U.A @^UM/Q.AU.B Q.BUB/ MM");
	assert_eq!(reg_int(&mut interp, "B"), 0);
	run(&mut interp, "7U.A @^UM/Q.AUB/ :MM");
	assert_eq!(reg_int(&mut interp, "B"), 7);
}

#[test]
fn unterminated_loop_in_macro_fails() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/</");
	let err = interp.execute_macro(b"MM", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::UnterminatedLoop)
	));
}

#[test]
fn unterminated_brace_in_macro_fails() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/(/");
	let err = interp.execute_macro(b"MM", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::UnterminatedBrace)
	));
}

#[test]
fn return_collapses_open_braces() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/((42\x1b\x1b/MMUA");
	assert_eq!(reg_int(&mut interp, "A"), 42);
	assert_eq!(interp.expr.brace_level, 0);
}

#[test]
fn goto_skips_forward() {
	let mut interp = Interp::batch();
	run(&mut interp, "Ofoo\x1b2UA!foo!1UB");
	assert_eq!(reg_int(&mut interp, "A"), 0);
	assert_eq!(reg_int(&mut interp, "B"), 1);
}

#[test]
fn computed_goto_selects_by_index() {
	let mut interp = Interp::batch();
	run(&mut interp, "2Ol1,l2\x1b1UZ!l1!2UZ!l2!3UZ");
	assert_eq!(reg_int(&mut interp, "Z"), 3);
}

#[test]
fn missing_label_is_an_error() {
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM,Onope\x1b,");
	let err = interp.execute_macro(b"MM", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::LabelNotFound(_))
	));
}

#[test]
fn loop_restart_and_continue() {
	// F< jumps to the macro start outside of loops.
	let mut interp = Interp::batch();
	run(&mut interp, "@^UM/%A Q.A\"E 1U.A F< '/MM");
	assert_eq!(reg_int(&mut interp, "A"), 2);
}

#[test]
fn conditional_jump_to_end() {
	let mut interp = Interp::batch();
	run(&mut interp, "1\"N F' 1UA | 2UA ' 3UB");
	assert_eq!(reg_int(&mut interp, "A"), 0);
	assert_eq!(reg_int(&mut interp, "B"), 3);
}

#[test]
fn ed_flags_get_and_set() {
	let mut interp = Interp::batch();
	run(&mut interp, "EDUA");
	assert_eq!(reg_int(&mut interp, "A"), 16);
	run(&mut interp, "8ED EDUB");
	assert_eq!(reg_int(&mut interp, "B"), 8);
}

#[test]
fn ej_properties() {
	let mut interp = Interp::batch();
	run(&mut interp, "0EJUA 1EJUB 0,2EJ 2EJUC");
	assert_eq!(reg_int(&mut interp, "A"), 1);
	assert_eq!(reg_int(&mut interp, "B"), 1);
	assert_eq!(reg_int(&mut interp, "C"), 0);
}

#[test]
fn eol_mode_get_and_set() {
	let mut interp = Interp::batch();
	run(&mut interp, "0EL ELUA :ELUB");
	assert_eq!(reg_int(&mut interp, "A"), 0);
	// Colon form leaves 13,10 on the stack; UB consumed the 10.
	assert_eq!(reg_int(&mut interp, "B"), 10);
	assert_eq!(
		interp.expr.pop_num_calc(&mut interp.undo).unwrap(),
		13
	);
}

#[test]
fn symbolic_view_messages() {
	let mut interp = Interp::batch();
	run(&mut interp, "@ES/SETTEXT/hi/ ZUA");
	assert_eq!(reg_int(&mut interp, "A"), 2);
	run(&mut interp, "@ES/GETLENGTH// UB");
	assert_eq!(reg_int(&mut interp, "B"), 2);
}

#[test]
fn print_without_a_value_fails() {
	let mut interp = Interp::batch();
	let err = interp.execute_macro(b"=", false).unwrap_err();
	assert!(matches!(
		err,
		Unwind::Error(e) if matches!(e.kind, ErrorKind::ArgExpected(_))
	));
}

#[test]
fn exit_requires_clean_buffers() {
	let mut interp = Interp::batch();
	run(&mut interp, "Ix\x1b");
	let err = interp.execute_macro(b"EX", false).unwrap_err();
	assert!(matches!(err, Unwind::Error(_)));
	run(&mut interp, "-EX");
	assert!(interp.quit_requested);
}

#[test]
fn quit_command_is_batch_only() {
	let mut interp = Interp::batch();
	let err = interp.execute_macro(b"^C", false).unwrap_err();
	assert!(matches!(err, Unwind::Quit));
	assert!(interp.quit_requested);
}

#[test]
fn environment_registers_exist() {
	std::env::set_var("TEKO_TEST_VAR", "marker");
	let mut interp = Interp::batch();
	assert_eq!(reg_str(&mut interp, "$TEKO_TEST_VAR"), "marker");
}

#[test]
fn working_directory_register_reads_on_demand() {
	let mut interp = Interp::batch();
	let cwd = std::env::current_dir().unwrap();
	assert_eq!(reg_str(&mut interp, "$"), cwd.display().to_string());
}

#[test]
fn digits_beyond_the_radix_accumulate() {
	let mut interp = Interp::batch();
	run(&mut interp, "^O9UA");
	assert_eq!(reg_int(&mut interp, "A"), 9);
}

#[test]
fn hooks_run_when_enabled() {
	let mut interp = Interp::batch();
	// Hook records its type argument into register H.
	run(&mut interp, "@^U0/UH/ 48ED");
	run(&mut interp, "@EB//");
	assert_eq!(reg_int(&mut interp, "H"), Hook::Edit as TekoInt);
}

#[test]
fn severity_user_messages() {
	struct Capture(std::rc::Rc<std::cell::RefCell<Vec<String>>>);
	impl crate::frontend::Frontend for Capture {
		fn message(&mut self, severity: Severity, text: &str) {
			if severity == Severity::User {
				self.0.borrow_mut().push(text.to_string());
			}
		}
	}
	let sink = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
	let mut interp = Interp::new(Box::new(Capture(sink.clone())), false);
	run(&mut interp, "42=");
	assert_eq!(sink.borrow().as_slice(), ["42"]);
}
