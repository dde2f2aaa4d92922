//! End-to-end tests: complete specifications through `generate_from_source`.

extern crate mugen;

use mugen::debug::active_signals;
use mugen::util::reverse_bits;
use mugen::writer::render_c_source;
use mugen::{generate_from_source, Error, Microcode, Options, Padding};

fn compile(source: &str) -> Microcode {
    compile_with(source, &Options::default())
}

fn compile_with(source: &str, options: &Options) -> Microcode {
    generate_from_source(source, "test.mu", options)
        .expect("expected the specification to compile")
}

fn compile_err(source: &str) -> Error {
    compile_err_with(source, &Options::default())
}

fn compile_err_with(source: &str, options: &Options) -> Error {
    generate_from_source(source, "test.mu", options)
        .err()
        .expect("expected the specification to be rejected")
}

const BASIC: &'static str = "
[rom] { 256 x 8 }

[address] {
    opcode: 4
    cycle: 4
}

[signals] {
    A
    B
    C
}

[opcodes] {
    OP = 0
}

[microcode] {
    OP:0: -> A, C
}
";

#[test]
fn zero_cycle_bits_are_rejected() {
    let err = compile_err(
        "
[rom] { 2 x 8 }
[address] {
    opcode: 1
    cycle: 0
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { catch -> A }
",
    );
    assert!(err.message.contains("number of bits must be a positive integer"));
}

#[test]
fn basic_rule_packs_signals_lsb_first() {
    let result = compile(BASIC);
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].len(), 256);
    assert_eq!(result.images[0][0], 0x05);
    assert!(result.images[0][1..].iter().all(|&byte| byte == 0));
}

#[test]
fn msb_first_reverses_the_stored_bytes() {
    let mut options = Options::default();
    options.lsb_first = false;
    let result = compile_with(BASIC, &options);
    assert_eq!(result.images[0][0], 0xA0);
}

#[test]
fn images_are_bytewise_bit_reversals_between_bit_orders() {
    let lsb = compile(BASIC);
    let mut options = Options::default();
    options.lsb_first = false;
    let msb = compile_with(BASIC, &options);

    for (lsb_image, msb_image) in lsb.images.iter().zip(&msb.images) {
        assert_eq!(lsb_image.len(), msb_image.len());
        for (&a, &b) in lsb_image.iter().zip(msb_image) {
            assert_eq!(reverse_bits(a), b);
        }
    }
}

#[test]
fn wildcard_cycle_claims_all_cycle_values() {
    let result = compile(
        "
[rom] { 256 x 8 }
[address] {
    cycle: 4
    opcode: 4
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { OP:x: -> A }
",
    );
    assert!(result.images[0][..16].iter().all(|&byte| byte == 0x01));
    assert!(result.images[0][16..].iter().all(|&byte| byte == 0x00));
}

#[test]
fn overlapping_rules_are_rejected() {
    let err = compile_err(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 4
    cycle: 4
}
[signals] {
    A
    B
}
[opcodes] { OP = 0 }
[microcode] {
    OP:0: -> A
    OP:0: -> B
}
",
    );
    assert!(err
        .message
        .contains("rule overlaps with rule previously defined on line"));
}

#[test]
fn catch_rule_fills_unclaimed_addresses() {
    let result = compile(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 4
    cycle: 4
}
[signals] {
    A
    B
}
[opcodes] { OP = 0 }
[microcode] {
    OP:0: -> A
    catch -> B
}
",
    );
    assert_eq!(result.images[0][0], 0x01);
    assert!(result.images[0][1..].iter().all(|&byte| byte == 0x02));
}

#[test]
fn segmented_packing_replicates_rules_per_segment() {
    let signals: Vec<String> = (0..16).map(|i| format!("S{}", i)).collect();
    let source = format!(
        "
[rom] {{ 256 x 8 x 1 }}
[address] {{
    opcode: 2
    cycle: 2
    segment: 1
}}
[signals] {{
{}
}}
[opcodes] {{ OP = 0 }}
[microcode] {{ OP:0: -> S8 }}
",
        signals.join("\n")
    );
    let result = compile(&source);
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].len(), 32);
    // S8 lives in the second chunk, which is segment 1 of the only chip.
    assert_eq!(result.images[0][0], 0x00);
    assert_eq!(result.images[0][16], 0x01);
}

#[test]
fn signals_spread_over_multiple_chips() {
    let signals: Vec<String> = (0..16).map(|i| format!("S{}", i)).collect();
    let source = format!(
        "
[rom] {{ 256 x 8 x 2 }}
[address] {{
    opcode: 4
    cycle: 4
}}
[signals] {{
{}
}}
[opcodes] {{ OP = 0 }}
[microcode] {{ OP:0: -> S0, S9 }}
",
        signals.join("\n")
    );
    let result = compile(&source);
    assert_eq!(result.images.len(), 2);
    assert_eq!(result.images[0][0], 0x01);
    assert_eq!(result.images[1][0], 0x02);
}

#[test]
fn value_padding_extends_images_to_the_word_count() {
    let mut options = Options::default();
    options.padding = Padding::Value(0xEA);
    let result = compile_with(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 2
    cycle: 2
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { OP:0: -> A }
",
        &options,
    );
    assert_eq!(result.images[0].len(), 256);
    assert_eq!(result.images[0][0], 0x01);
    assert!(result.images[0][1..16].iter().all(|&byte| byte == 0x00));
    assert!(result.images[0][16..].iter().all(|&byte| byte == 0xEA));
}

#[test]
fn catch_padding_fills_the_unmapped_address_space() {
    let mut options = Options::default();
    options.padding = Padding::Catch;
    let result = compile_with(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 2
    cycle: 2
}
[signals] {
    A
    B
}
[opcodes] { OP = 0 }
[microcode] {
    OP:0: -> A
    catch -> B
}
",
        &options,
    );
    // Only four address lines carry fields; the upper four stay wildcards
    // in every rule, so the explicit rule repeats every 16 words and the
    // catch rule owns the rest of the chip.
    assert_eq!(result.images[0].len(), 256);
    for (addr, &byte) in result.images[0].iter().enumerate() {
        if addr % 16 == 0 {
            assert_eq!(byte, 0x01, "address {}", addr);
        } else {
            assert_eq!(byte, 0x02, "address {}", addr);
        }
    }
}

#[test]
fn catch_padding_without_catch_rule_is_rejected() {
    let mut options = Options::default();
    options.padding = Padding::Catch;
    let err = compile_err_with(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 2
    cycle: 2
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { OP:0: -> A }
",
        &options,
    );
    assert!(err.message.contains("no catch rule defined"));
}

#[test]
fn all_wildcard_rule_counts_as_catch() {
    // x:x with an empty flag field leaves every address line open, which
    // makes the rule a catch rule and satisfies --pad catch.
    let mut options = Options::default();
    options.padding = Padding::Catch;
    let result = compile_with(
        "
[rom] { 16 x 8 }
[address] {
    opcode: 2
    cycle: 2
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { x:x: -> A }
",
        &options,
    );
    assert!(result.images[0].iter().all(|&byte| byte == 0x01));
}

#[test]
fn missing_sections_are_rejected() {
    let err = compile_err("[rom] { 256 x 8 }");
    assert!(err.message.contains("missing section"));
}

#[test]
fn unknown_signal_in_rule_is_rejected() {
    let err = compile_err(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 4
    cycle: 4
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { OP:0: -> Q }
",
    );
    assert!(err.message.contains("signal \"Q\" not declared"));
}

#[test]
fn unknown_opcode_in_rule_is_rejected() {
    let err = compile_err(
        "
[rom] { 256 x 8 }
[address] {
    opcode: 4
    cycle: 4
}
[signals] { A }
[opcodes] { OP = 0 }
[microcode] { NOP:0: -> A }
",
    );
    assert!(err.message.contains("opcode \"NOP\" not declared"));
}

#[test]
fn simulator_reports_the_signals_a_rule_prescribed() {
    let result = compile(BASIC);
    assert_eq!(
        active_signals(&result, "OP", &[], 0).unwrap(),
        vec!["A", "C"]
    );
    assert!(active_signals(&result, "OP", &[], 1).unwrap().is_empty());
    assert!(active_signals(&result, "NOP", &[], 0).is_none());
}

#[test]
fn simulator_honors_msb_first_storage() {
    let mut options = Options::default();
    options.lsb_first = false;
    let result = compile_with(BASIC, &options);
    assert_eq!(
        active_signals(&result, "OP", &[], 0).unwrap(),
        vec!["A", "C"]
    );
}

#[test]
fn simulator_selects_rules_by_flag_state() {
    let result = compile(
        "
[rom] { 256 x 8 }
[address] {
    cycle: 2
    opcode: 2
    flags: Z, C
}
[signals] {
    A
    B
}
[opcodes] { OP = 1 }
[microcode] {
    OP:x:1x -> A
    OP:x:0x -> B
}
",
    );
    // Flag state is indexed by flag bit; Z is the most significant flag.
    let z_set = [false, true];
    let z_clear = [true, false];
    assert_eq!(active_signals(&result, "OP", &z_set, 0).unwrap(), vec!["A"]);
    assert_eq!(active_signals(&result, "OP", &z_clear, 0).unwrap(), vec!["B"]);
}

#[test]
fn simulator_collects_signals_across_segments() {
    let signals: Vec<String> = (0..16).map(|i| format!("S{}", i)).collect();
    let source = format!(
        "
[rom] {{ 256 x 8 x 1 }}
[address] {{
    opcode: 2
    cycle: 2
    segment: 1
}}
[signals] {{
{}
}}
[opcodes] {{ OP = 0 }}
[microcode] {{ OP:0: -> S0, S8 }}
",
        signals.join("\n")
    );
    let result = compile(&source);
    assert_eq!(
        active_signals(&result, "OP", &[], 0).unwrap(),
        vec!["S0", "S8"]
    );
}

#[test]
fn c_source_rendering_contains_the_image_bytes() {
    let result = compile(BASIC);
    let source = render_c_source(&result);
    assert!(source.contains("unsigned char const mugen_rom_0[MUGEN_ROM_0_SIZE]"));
    assert!(source.contains("#define MUGEN_ROM_0_SIZE 256"));
    assert!(source.contains("0x05"));
}
