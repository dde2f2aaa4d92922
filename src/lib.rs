//! Library that contains the Mugen microcode compiler.
//!
//! Mugen turns a microcode specification file (usually carrying a `.mu`
//! extension) into one binary image per ROM chip, ready to be flashed onto
//! the EEPROMs of a homebuilt CPU. A specification declares the ROM
//! geometry, the layout of the address lines, the available control
//! signals, the opcodes and a list of microcode rules; the compiler
//! expands wildcards in those rules, packs the signals into bytes and
//! distributes the bytes over chips and time-segments.
//!
//! The modules follow the phases of the compiler:
//!
//! * `sections` carves the file into named sections,
//! * `spec` validates the individual sections,
//! * `layout` maps signals onto chips, segments and bits,
//! * `rules` expands the microcode rules into the images,
//! * `debug` provides an interactive session on the compiled result,
//! * `writer` turns the result into files on disk.

extern crate regex;
#[macro_use]
extern crate lazy_static;

use std::error;
use std::fmt::{self, Display, Formatter};
use std::fs;

/// Return early with a compile error when the condition holds.
macro_rules! error_if {
    ($cond:expr, $diag:expr, $($arg:tt)*) => {
        if $cond {
            return Err($diag.error(format!($($arg)*)));
        }
    }
}

/// Emit a warning when the condition holds. Warnings never abort.
macro_rules! warning_if {
    ($cond:expr, $diag:expr, $($arg:tt)*) => {
        if $cond {
            $diag.warning(&format!($($arg)*));
        }
    }
}

pub mod util;
pub mod sections;
pub mod spec;
pub mod layout;
pub mod rules;
pub mod debug;
pub mod writer;

use sections::Section;
use spec::{AddressMapping, Opcodes, RomSpecs, Signals};

/// A fatal compile error, carrying the location it was raised at.
///
/// Rendered as `FILE:LINE: ERROR: message`. Errors raised outside of any
/// source location (e.g. while writing the output files) leave `file`
/// empty and render as `ERROR: message`.
#[derive(Debug)]
pub struct Error {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        if self.file.is_empty() {
            write!(fmt, "ERROR: {}", self.message)
        } else {
            write!(fmt, "{}:{}: ERROR: {}", self.file, self.line, self.message)
        }
    }
}

impl error::Error for Error {}

/// Location context threaded through all parsers, so that every error and
/// warning can point at the offending file and line.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub file: String,
    pub line: usize,
}

impl Diagnostics {
    pub fn new(file: &str) -> Diagnostics {
        Diagnostics {
            file: file.into(),
            line: 0,
        }
    }

    /// Build an [`Error`] at the current location.
    pub fn error(&self, message: String) -> Error {
        Error {
            file: self.file.clone(),
            line: self.line,
            message: message,
        }
    }

    /// Print a warning at the current location on stderr.
    pub fn warning(&self, message: &str) {
        eprintln!("{}:{}: WARNING: {}", self.file, self.line, message);
    }
}

/// How the images should be brought up to the full ROM capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Leave the images at their natural size.
    None,
    /// Extend every image to the ROM word count with the given byte.
    Value(u8),
    /// Let the catch rule claim the unused address space.
    Catch,
}

/// Compilation options, usually filled in from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub print_layout: bool,
    pub lsb_first: bool,
    pub padding: Padding,
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            print_layout: false,
            lsb_first: true,
            padding: Padding::None,
            debug: false,
        }
    }
}

/// The compiled result: one image per ROM chip, plus everything needed to
/// interpret, report on and simulate those images.
#[derive(Debug, Clone)]
pub struct Microcode {
    /// One byte buffer per physical chip.
    pub images: Vec<Vec<u8>>,
    pub rom: RomSpecs,
    pub address: AddressMapping,
    pub signals: Signals,
    pub opcodes: Opcodes,
    /// Bit order the signal bytes were stored in.
    pub lsb_first: bool,
    /// Human readable description of the chip, segment and address layout.
    pub layout: String,
    /// Name of the specification file the images were generated from.
    pub spec_file: String,
}

impl Microcode {
    /// Number of time-segments per image.
    pub fn segment_count(&self) -> usize {
        1 << self.address.segment.bits
    }
}

/// Names of the sections every specification must define.
const REQUIRED_SECTIONS: [&'static str; 5] = ["rom", "address", "signals", "opcodes", "microcode"];

/// Compile the given specification file.
pub fn generate(filename: &str, opt: &Options) -> Result<Microcode, Error> {
    let source = match fs::read_to_string(filename) {
        Ok(text) => text,
        Err(e) => {
            return Err(Error {
                file: filename.into(),
                line: 0,
                message: format!("could not open file \"{}\": {}", filename, e),
            });
        }
    };
    generate_from_source(&source, filename, opt)
}

/// Compile a specification that has already been read into memory. The
/// filename is only used in diagnostics.
pub fn generate_from_source(source: &str, filename: &str, opt: &Options) -> Result<Microcode, Error> {
    let mut diag = Diagnostics::new(filename);
    let sections = sections::tokenize(source, &mut diag)?;

    for section in &sections {
        if !REQUIRED_SECTIONS.contains(&section.name.as_str()) {
            diag.line = section.line;
            diag.warning(&format!("ignoring unknown section \"{}\".", section.name));
        }
    }
    diag.line = 0;
    for name in REQUIRED_SECTIONS.iter() {
        error_if!(!sections.iter().any(|s| s.name == *name), diag,
                  "missing section: \"{}\".", name);
    }

    let rom = spec::parse_rom_specs(find_section(&sections, "rom"), &mut diag)?;
    let address = spec::parse_address_mapping(find_section(&sections, "address"), &rom, &mut diag)?;
    let signals = spec::parse_signals(find_section(&sections, "signals"), &rom, &address, &mut diag)?;
    let opcodes = spec::parse_opcodes(find_section(&sections, "opcodes"), &address, &mut diag)?;
    let layout = layout::layout_report(&rom, &address, &signals, opt.lsb_first);
    let images = rules::expand(
        find_section(&sections, "microcode"),
        &rom, &address, &signals, &opcodes, opt, &mut diag)?;

    let mut result = Microcode {
        images: images,
        rom: rom,
        address: address,
        signals: signals,
        opcodes: opcodes,
        lsb_first: opt.lsb_first,
        layout: layout,
        spec_file: filename.into(),
    };

    if let Padding::Value(value) = opt.padding {
        rules::pad_images(&mut result, value);
    }
    Ok(result)
}

/// Look up a required section; the required-section check in
/// [`generate_from_source`] guarantees it exists.
fn find_section<'a>(sections: &'a [Section], name: &str) -> &'a Section {
    sections.iter().find(|s| s.name == name).unwrap()
}
