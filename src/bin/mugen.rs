//! The Mugen command line driver.
//!
//! Mugen compiles a microcode specification file into one binary image
//! per ROM chip. The specification declares the ROM geometry, the layout
//! of the address lines, the control signals, the opcodes and the
//! microcode rules; see the crate documentation for the full format.
//!
//! # Example usage
//!
//! ```bash
//! # compile a specification into microcode.bin
//! mugen myspec.mu microcode.bin
//! # same, but store signals MSB-first and print the layout report
//! mugen myspec.mu microcode.bin --msb-first --layout
//! # pad the images to the full ROM size with 0xEA
//! mugen myspec.mu microcode.bin --pad EA
//! # inspect the result interactively before writing
//! mugen myspec.mu microcode.bin --debug
//! ```
//!
//! The output format is chosen by the extension of the output file:
//! `.bin` and `.rom` produce raw binary images (as does any unknown
//! extension), while `.c`, `.cc`, `.cpp` and `.cxx` produce a C source
//! file declaring the images as byte arrays.

extern crate docopt;
extern crate mugen;
extern crate serde;

use std::process;

use docopt::Docopt;
use serde::Deserialize;

use mugen::{debug, writer, Options, Padding};

const USAGE: &'static str = "
Mugen microcode generator.

Compiles a microcode specification file (usually .mu) into images that can
be flashed onto the ROM chips of a homebuilt CPU.

Usage:
  mugen <spec> <output> [options]
  mugen --help

Options:
  -h --help              Show this screen.
  -l --layout            Print the ROM layout report after generation.
  -m --msb-first         Store signals starting from the most significant
                         bit of each word (default is LSB first).
  -p <value>, --pad <value>  Pad the images to the full ROM size with the
                             given byte value (hexadecimal, at most FF), or
                             fill all unclaimed addresses from the catch
                             rule when the value is 'catch'.
  -d --debug             Enter an interactive debug session after
                         generation, before anything is written to disk.

Example:
  mugen myspec.mu microcode.bin --msb-first --layout
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_spec: String,
    arg_output: String,
    flag_layout: bool,
    flag_msb_first: bool,
    flag_pad: Option<String>,
    flag_debug: bool,
}

/// Interpret the argument of `--pad`: either the literal `catch` or a
/// hexadecimal byte value.
fn parse_padding(value: &str) -> Option<Padding> {
    if value == "catch" {
        return Some(Padding::Catch);
    }
    let digits = if value.starts_with("0x") || value.starts_with("0X") {
        &value[2..]
    } else {
        value
    };
    u8::from_str_radix(digits, 16).ok().map(Padding::Value)
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let mut options = Options::default();
    options.print_layout = args.flag_layout;
    options.lsb_first = !args.flag_msb_first;
    options.debug = args.flag_debug;
    if let Some(ref value) = args.flag_pad {
        options.padding = parse_padding(value).unwrap_or_else(|| {
            eprintln!(
                "ERROR: invalid pad value \"{}\"; must be 'catch' or a hexadecimal \
                 byte (at most FF).", value);
            process::exit(1);
        });
    }

    let result = mugen::generate(&args.arg_spec, &options).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });

    if options.print_layout {
        println!("{}", result.layout);
    }

    if options.debug && !debug::debug(&result, &args.arg_output) {
        return;
    }

    match writer::writer_for(&args.arg_output).write(&result) {
        Ok(report) => print!("{}", report),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
