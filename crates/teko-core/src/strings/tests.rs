//! Behavior-lock tests for string building.

use std::collections::HashMap;

use super::*;

struct MockRegs {
	integers: HashMap<String, TekoInt>,
	strings: HashMap<String, String>,
	radix: TekoInt,
}

impl MockRegs {
	fn new() -> Self {
		MockRegs {
			integers: HashMap::new(),
			strings: HashMap::new(),
			radix: 10,
		}
	}
}

impl RegFetch for MockRegs {
	fn reg_integer(&mut self, spec: &QRegSpec) -> Result<TekoInt> {
		Ok(self.integers.get(&spec.name).copied().unwrap_or(0))
	}

	fn reg_string(&mut self, spec: &QRegSpec) -> Result<String> {
		Ok(self.strings.get(&spec.name).cloned().unwrap_or_default())
	}

	fn radix(&self) -> TekoInt {
		self.radix
	}
}

fn build(input: &[u8], regs: &mut MockRegs) -> Vec<u8> {
	let mut machine = StringBuilder::new();
	let mut out = Vec::new();
	for &c in input {
		if let Some(bytes) = machine.input(c, regs).unwrap() {
			out.extend_from_slice(&bytes);
		}
	}
	out
}

#[test]
fn plain_characters_pass_through() {
	let mut regs = MockRegs::new();
	assert_eq!(build(b"hello", &mut regs), b"hello");
}

#[test]
fn caret_pairs_fold_to_control_keys() {
	let mut regs = MockRegs::new();
	// ^I is TAB; ^^ is a literal caret.
	assert_eq!(build(b"a^Ib", &mut regs), b"a\tb");
	assert_eq!(build(b"a^^b", &mut regs), b"a^b");
}

#[test]
fn single_shot_case_folding() {
	let mut regs = MockRegs::new();
	assert_eq!(build(b"^Wabc", &mut regs), b"Abc");
	assert_eq!(build(b"^VABC", &mut regs), b"aBC");
}

#[test]
fn sticky_case_folding() {
	let mut regs = MockRegs::new();
	assert_eq!(build(b"^W^Wabc", &mut regs), b"ABC");
	assert_eq!(build(b"^V^VABC", &mut regs), b"abc");
}

#[test]
fn quoting_escapes_the_next_character() {
	let mut regs = MockRegs::new();
	// ^Q^W inserts the ^W byte literally instead of case folding.
	assert_eq!(build(b"^Q^Wx", &mut regs), &[ctl_key(b'W'), b'x']);
}

#[test]
fn register_string_interpolation() {
	let mut regs = MockRegs::new();
	regs.strings.insert("Y".into(), "foo".into());
	assert_eq!(build(b"A^EQYB", &mut regs), b"AfooB");
	assert_eq!(build(b"A^EQ[Y]B", &mut regs), b"AfooB");
}

#[test]
fn register_integer_interpolation_respects_radix() {
	let mut regs = MockRegs::new();
	regs.integers.insert("N".into(), 255);
	assert_eq!(build(b"^E\\N", &mut regs), b"255");
	regs.radix = 16;
	assert_eq!(build(b"^E\\N", &mut regs), b"FF");
}

#[test]
fn register_character_interpolation() {
	let mut regs = MockRegs::new();
	regs.integers.insert("C".into(), 'Z' as TekoInt);
	assert_eq!(build(b"^EUC", &mut regs), b"Z");
}

#[test]
fn shell_quoting_and_glob_escaping() {
	let mut regs = MockRegs::new();
	regs.strings.insert("S".into(), "it's".into());
	assert_eq!(build(b"^E@S", &mut regs), b"'it'\\''s'");
	regs.strings.insert("G".into(), "a*b?".into());
	assert_eq!(build(b"^ENG", &mut regs), b"a\\*b\\?");
}

#[test]
fn unknown_ctl_e_sequences_stay_literal() {
	let mut regs = MockRegs::new();
	assert_eq!(build(b"^EZ", &mut regs), &[ctl_key(b'E'), b'Z']);
}

#[test]
fn qreg_spec_forms() {
	let mut m = QRegSpecMachine::new();
	assert_eq!(m.input(b'a').unwrap(), Some(QRegSpec::global("A")));

	let mut m = QRegSpecMachine::new();
	assert_eq!(m.input(b'.').unwrap(), None);
	assert_eq!(m.input(b'x').unwrap(), Some(QRegSpec::local("X")));

	let mut m = QRegSpecMachine::new();
	assert_eq!(m.input(b'[').unwrap(), None);
	for &c in b"long name" {
		assert_eq!(m.input(c).unwrap(), None);
	}
	assert_eq!(m.input(b']').unwrap(), Some(QRegSpec::global("long name")));
}

#[test]
fn bracketed_names_are_case_sensitive() {
	let mut m = QRegSpecMachine::new();
	m.input(b'[').unwrap();
	m.input(b'q').unwrap();
	assert_eq!(m.input(b']').unwrap(), Some(QRegSpec::global("q")));
}

#[test]
fn control_bytes_are_invalid_names() {
	let mut m = QRegSpecMachine::new();
	assert!(m.input(0x01).is_err());
}
