//! Interactive debug session on a compiled result.
//!
//! The debugger keeps a mutable flag state and lets the user inspect the
//! compiled artifacts and simulate opcodes against the images before
//! anything is written to disk. It reads commands from stdin until the
//! user decides whether the images should be written (`write`) or
//! discarded (`quit`, or end-of-input).

use std::io::{self, BufRead, Write};

use super::rules::insert_bits;
use super::spec::Opcode;
use super::util;
use super::Microcode;

/// What the session should do after a command has been handled.
enum Action {
    Continue,
    Quit { write: bool },
}

/// Command names (with aliases) and their one-line descriptions, in the
/// order the help text lists them.
const COMMANDS: &'static [(&'static str, &'static str)] = &[
    ("help|h", "Display this text."),
    ("info|i", "Display image information."),
    ("flags|f", "Display current flag-state."),
    ("set|s", "Set a flag to true."),
    ("reset|r", "Reset a flag to 0."),
    ("run|exec|x", "Run an opcode."),
    ("signals|S", "Display the list of signals."),
    ("opcodes|o", "Display the list of opcodes and their values."),
    ("layout|l", "Display the memory layout of the images."),
    ("write|w", "Write the results to disk."),
    ("exit|quit|q", "Exit without writing the results to disk."),
];

/// Run an interactive session on the compiled result. Returns whether the
/// user asked for the images to be written to disk.
pub fn debug(result: &Microcode, out_file: &str) -> bool {
    let prompt = format!("[{}]$ ", result.spec_file);
    let mut state = vec![false; result.address.flags.bits];

    println!("<Mugen Debug> Type \"help\" for a list of available commands.\n");

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("{}", prompt);
        let _ = io::stdout().flush();
        input.clear();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => return false,
            Ok(_) => (),
        }
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            continue;
        }

        match execute(&args, result, out_file, &mut state) {
            Action::Continue => (),
            Action::Quit { write } => return write,
        }
    }
}

fn execute(args: &[&str], result: &Microcode, out_file: &str, state: &mut Vec<bool>) -> Action {
    let cmd = args[0];
    match cmd {
        "help" | "h" => {
            if args.len() == 1 {
                print_help();
            } else if args.len() > 2 {
                usage_error(cmd, "command expects at most 1 argument.");
            } else {
                print_command_help(args[1]);
            }
        }
        "info" | "i" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                print_info(result, out_file);
            }
        }
        "flags" | "f" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                print_flags(state, result);
            }
        }
        "set" | "s" => {
            if args.len() < 2 {
                usage_error(cmd, "command expects at least 1 flag name, index or \"*\".");
            } else if set_or_reset(args, true, state, result) {
                print_flags(state, result);
            }
        }
        "reset" | "r" => {
            if args.len() < 2 {
                usage_error(cmd, "command expects at least 1 flag name, index or \"*\".");
            } else if set_or_reset(args, false, state, result) {
                print_flags(state, result);
            }
        }
        "run" | "exec" | "x" => run_command(args, result, state),
        "signals" | "S" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                for signal in &result.signals {
                    println!("  {}", signal);
                }
            }
        }
        "opcodes" | "o" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                print_opcodes(result);
            }
        }
        "layout" | "l" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                print!("{}", result.layout);
            }
        }
        "write" | "w" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                return Action::Quit { write: true };
            }
        }
        "exit" | "quit" | "q" => {
            if args.len() != 1 {
                usage_error(cmd, "command does not expect any arguments.");
            } else {
                return Action::Quit { write: false };
            }
        }
        _ => usage_error(cmd, "Unknown command."),
    }
    Action::Continue
}

fn usage_error(cmd: &str, message: &str) {
    println!("Invalid use of \"{}\": {}", cmd, message);
    println!("Type \"help\" for more information.");
}

fn is_command(cmd: &str) -> bool {
    COMMANDS
        .iter()
        .any(|&(names, _)| names.split('|').any(|name| name == cmd))
}

fn print_help() {
    let width = COMMANDS.iter().map(|&(names, _)| names.len()).max().unwrap_or(0);
    println!("\nAvailable commands:");
    for &(names, description) in COMMANDS {
        println!("{:>pad$} - {}", names, description, pad = width + 2);
    }
    println!("\nType \"help <command>\" for more information about a specific command.\n");
}

fn print_command_help(cmd: &str) {
    if !is_command(cmd) {
        usage_error(cmd, "Unknown command.");
        return;
    }
    match extended_help(cmd) {
        Some(help) => println!("\n{}", help),
        None => println!("No additional help available for command \"{}\".", cmd),
    }
}

fn extended_help(cmd: &str) -> Option<&'static str> {
    match cmd {
        "set" | "s" => Some(
            "  This command accepts one or more flags, separated by a space.
  The flags can be names (if the specification file uses named flags) or indices: (0 - #flag-bits).
  Alternatively, a '*' can be used to set all flags at once.

  Examples:
    set Z
    set Z C
    set 0 1 2
    set *
",
        ),
        "reset" | "r" => Some(
            "  This command resets the given flags to 0 in the same way \"set\" sets flags.
  See \"help set\" for more details.
",
        ),
        "run" | "exec" | "x" => Some(
            "  This command simulates running an opcode in the current state (see set/reset).
  The opcode is passed as its first argument: \"run ADD\".
  When no additional argument is passed, all available cycles (limited by the number of cycle bits)
  will be handled. Alternatively, a second argument can be provided to limit this number.
  For example, to simulate the ADD opcode for 2 cycles:
     run ADD 2
",
        ),
        _ => None,
    }
}

/// Render the flag state as a small table, most significant flag first.
fn print_flags(state: &[bool], result: &Microcode) {
    let flag_bits = result.address.flags.bits;
    let mut labels = String::from("  |");
    let mut values = String::from("  |");
    let mut delim = String::from("  +");

    for idx in 0..state.len() {
        let label = if result.address.flag_labels.is_empty() {
            format!(" FLAG {} ", flag_bits - idx - 1)
        } else {
            format!(" {} ", result.address.flag_labels[idx])
        };
        let mut value = " ".repeat(label.len());
        let digit = if state[flag_bits - idx - 1] { "1" } else { "0" };
        value.replace_range(label.len() / 2..label.len() / 2 + 1, digit);

        labels.push_str(&label);
        labels.push('|');
        values.push_str(&value);
        values.push('|');
        for _ in 0..label.len() {
            delim.push('-');
        }
        delim.push('+');
    }

    println!("{}", delim);
    println!("{}", labels);
    println!("{}", delim);
    println!("{}", values);
    println!("{}", delim);
}

/// Apply `value` to every flag named in `args[1..]`: a flag label, a bit
/// index, or `*` for all. Returns whether all arguments resolved.
fn set_or_reset(args: &[&str], value: bool, state: &mut Vec<bool>, result: &Microcode) -> bool {
    let flag_bits = result.address.flags.bits;
    for flag in &args[1..] {
        if *flag == "*" {
            for slot in state.iter_mut() {
                *slot = value;
            }
            return true;
        }

        let mut flag_bit = util::string_to_int(flag, 10)
            .and_then(|v| if v < 0 { None } else { Some(v as usize) });
        if flag_bit.is_none() {
            if result.address.flag_labels.is_empty() {
                usage_error(args[0], &format!(
                    "Specification file does not specify flag names, so flags must be \
                     given as bit indices (0 - {}) or \"*\".", flag_bits));
                return false;
            }
            for (idx, label) in result.address.flag_labels.iter().enumerate() {
                if label == flag {
                    flag_bit = Some(flag_bits - idx - 1);
                    break;
                }
            }
        }

        match flag_bit {
            Some(bit) if bit < flag_bits => state[bit] = value,
            _ => {
                usage_error(args[0], &format!("Invalid flag \"{}\".", flag));
                return false;
            }
        }
    }
    true
}

fn run_command(args: &[&str], result: &Microcode, state: &[bool]) {
    if args.len() < 2 {
        usage_error(args[0], "command expects at least one argument (run <opcode>).");
        return;
    }
    if args.len() > 3 {
        usage_error(args[0], "command expects at most two arguments (run <opcode> <cycles>).");
        return;
    }

    let max_cycles = 1usize << result.address.cycle.bits;
    let mut cycles = max_cycles;
    if args.len() == 3 {
        match util::string_to_int(args[2], 10) {
            Some(value) if value >= 0 && (value as usize) <= max_cycles => {
                cycles = value as usize;
            }
            Some(value) if value >= 0 => {
                usage_error(args[0], &format!(
                    "cycle number ({}) exceeds the maximum number of allowed cycles ({}).",
                    value, max_cycles));
                return;
            }
            _ => {
                usage_error(args[0], &format!(
                    "cycle number \"{}\" is not a number.", args[2]));
                return;
            }
        }
    }

    if !result.opcodes.iter().any(|oc| oc.ident == args[1]) {
        println!("Opcode \"{}\" not specified in specification file.", args[1]);
        return;
    }
    for cycle in 0..cycles {
        if let Some(signals) = active_signals(result, args[1], state, cycle) {
            println!("  {}: {}", cycle, signals.join(", "));
        }
    }
}

/// The signals active for `opcode` at `cycle` under the given flag state,
/// in declaration order and deduplicated across segments and chips.
/// Returns `None` for opcodes the specification does not declare.
pub fn active_signals(
    result: &Microcode,
    opcode: &str,
    state: &[bool],
    cycle: usize,
) -> Option<Vec<String>> {
    let opcode_value = result
        .opcodes
        .iter()
        .find(|oc| oc.ident == opcode)?
        .value;

    let address = &result.address;
    let mut pattern: Vec<u8> = vec![b'0'; address.total_bits];
    insert_bits(
        &mut pattern,
        &util::to_binary_string(opcode_value, address.opcode.bits),
        address.opcode.start,
    );
    if address.flags.bits > 0 {
        let mut flag_string = String::new();
        for idx in (0..address.flags.bits).rev() {
            flag_string.push(if state[idx] { '1' } else { '0' });
        }
        insert_bits(&mut pattern, &flag_string, address.flags.start);
    }
    insert_bits(
        &mut pattern,
        &util::to_binary_string(cycle, address.cycle.bits),
        address.cycle.start,
    );

    let mut indices: Vec<usize> = Vec::new();
    for segment in 0..result.segment_count() {
        let mut pattern = pattern.clone();
        if address.segment.bits > 0 {
            insert_bits(
                &mut pattern,
                &util::to_binary_string(segment, address.segment.bits),
                address.segment.start,
            );
        }
        let word_address = pattern_address(&pattern);

        for chip in 0..result.rom.rom_count {
            let word = result.images[chip][word_address];
            for bit in 0..8 {
                if word & (1 << bit) == 0 {
                    continue;
                }
                // Reading mirrors the storage order: under MSB-first the
                // bit index maps back through 7 - bit.
                let bit_index = if result.lsb_first { bit } else { 7 - bit };
                let index = (segment * result.rom.rom_count + chip) * 8 + bit_index;
                if index < result.signals.len() {
                    indices.push(index);
                }
            }
        }
    }

    indices.sort();
    indices.dedup();
    Some(indices.iter().map(|&idx| result.signals[idx].clone()).collect())
}

/// Numeric value of a fully substituted pattern.
fn pattern_address(pattern: &[u8]) -> usize {
    let mut address = 0;
    for &ch in pattern {
        address = (address << 1) | (ch == b'1') as usize;
    }
    address
}

fn print_opcodes(result: &Microcode) {
    let mut sorted: Vec<&Opcode> = result.opcodes.iter().collect();
    sorted.sort_by_key(|oc| oc.value);
    let width = sorted.iter().map(|oc| oc.ident.len()).max().unwrap_or(0);
    for oc in sorted {
        println!("{:>pad$} = 0x{:02x}", oc.ident, oc.value, pad = width + 2);
    }
}

fn print_info(result: &Microcode, out_file: &str) {
    let count = result.images.len();
    let mut names = String::new();
    for idx in 0..count {
        if count > 1 {
            names.push_str(&format!("{}.{}", out_file, idx));
            if idx != count - 1 {
                names.push_str(", ");
            }
        } else {
            names.push_str(out_file);
        }
    }
    println!("{:>15}: {} -> {}", "#images", count, names);

    let padded = result.images[0].len() > (1 << result.address.total_bits);
    println!("{:>15}: {} bytes ({})", "image size", result.images[0].len(),
             if padded { "padded" } else { "not padded" });

    if result.address.segment.bits > 0 {
        println!("{:>15}: yes, {} segments per image.", "segmented", result.segment_count());
    } else {
        println!("{:>15}: no", "segmented");
    }
    println!("{:>15}: {}", "#signals", result.signals.len());
    println!("{:>15}: {}", "#opcodes", result.opcodes.len());
}
