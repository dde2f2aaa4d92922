//! Parsers for the `rom`, `address`, `signals` and `opcodes` sections.
//!
//! The sections are parsed in that fixed order: the ROM geometry yields
//! the number of address lines, which the address mapping must fit in;
//! the signal list is checked against the chip/segment capacity; opcode
//! values must fit inside the opcode field.

use regex::Regex;

use super::sections::Section;
use super::util::{self, split};
use super::{Diagnostics, Error};

/// Physical geometry of the ROM set.
#[derive(Debug, Clone)]
pub struct RomSpecs {
    pub word_count: usize,
    pub bits_per_word: usize,
    pub rom_count: usize,
    /// Number of address lines, derived from the word count.
    pub address_bits: usize,
}

/// A single field inside the address word.
#[derive(Debug, Clone, Copy, Default)]
pub struct Field {
    pub bits: usize,
    /// Least significant bit position of the field.
    pub start: usize,
}

/// Logical layout of the address lines. Fields occupy contiguous bit
/// ranges from bit 0 upward, in the order they appear in the source.
#[derive(Debug, Clone, Default)]
pub struct AddressMapping {
    pub opcode: Field,
    pub cycle: Field,
    pub flags: Field,
    pub segment: Field,
    /// Optional flag names, most significant flag first.
    pub flag_labels: Vec<String>,
    pub total_bits: usize,
}

/// Control signals in declaration order; a signal's index is its bit
/// position in the packed signal vector.
pub type Signals = Vec<String>;

/// A named opcode and its value.
#[derive(Debug, Clone)]
pub struct Opcode {
    pub ident: String,
    pub value: usize,
}

/// Opcodes in declaration order.
pub type Opcodes = Vec<Opcode>;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// True when `ident` is a legal identifier: a letter or underscore
/// followed by letters, digits or underscores, and not one of the
/// reserved wildcard characters `x` and `X`.
pub fn is_valid_identifier(ident: &str) -> bool {
    IDENTIFIER.is_match(ident) && ident != "x" && ident != "X"
}

/// Check `ident` against the identifier rules, reporting a compile error
/// at the current location when it fails.
pub fn validate_identifier(ident: &str, diag: &Diagnostics) -> Result<(), Error> {
    if !IDENTIFIER.is_match(ident) {
        return Err(diag.error(format!(
            "identifier \"{}\" is not valid; identifiers must start with a letter or \
             underscore and may only contain letters, digits and underscores.",
            ident
        )));
    }
    if ident == "x" || ident == "X" {
        return Err(diag.error("\"x\" and \"X\" may not be used as identifiers.".into()));
    }
    Ok(())
}

/// Parse the `rom` section: one line of the form
/// `<words> x <bits-per-word>`, optionally followed by `x <chips>`.
pub fn parse_rom_specs(section: &Section, diag: &mut Diagnostics) -> Result<RomSpecs, Error> {
    let mut result: Option<RomSpecs> = None;

    for (offset, raw) in section.body.lines().enumerate() {
        diag.line = section.line + offset;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        error_if!(result.is_some(), diag,
                  "rom specification can only contain at most 1 non-empty line.");

        let values = split(line, "x", false);
        error_if!(values.len() < 2 || values.len() > 3, diag,
                  "invalid format for rom specification, should be \
                   <NUMBER OF WORDS> x <BITS PER WORD> or \
                   <NUMBER OF WORDS> x <BITS PER WORD> x <NUMBER OF CHIPS>.");

        let word_count = util::string_to_int(&values[0], 10).ok_or_else(|| {
            diag.error(format!(
                "specified number of words ({}) is not a valid decimal number.", values[0]))
        })?;
        error_if!(word_count <= 0, diag,
                  "specified number of words ({}) must be a positive integer.", word_count);
        let word_count = word_count as usize;
        error_if!(!word_count.is_power_of_two(), diag,
                  "specified number of words ({}) must be a power of two.", word_count);

        let bits_per_word = util::string_to_int(&values[1], 10).ok_or_else(|| {
            diag.error(format!(
                "specified number of bits per word ({}) is not a valid decimal number.", values[1]))
        })?;
        error_if!(bits_per_word != 8, diag, "only 8 bit words are currently supported.");

        let rom_count = if values.len() == 3 {
            let count = util::string_to_int(&values[2], 10).ok_or_else(|| {
                diag.error(format!(
                    "specified number of rom chips ({}) is not a valid decimal number.", values[2]))
            })?;
            error_if!(count <= 0, diag,
                      "number of rom chips ({}) must be a positive integer.", count);
            count as usize
        } else {
            1
        };

        result = Some(RomSpecs {
            word_count: word_count,
            bits_per_word: bits_per_word as usize,
            rom_count: rom_count,
            address_bits: util::bits_needed(word_count),
        });
    }

    result.ok_or_else(|| diag.error("rom specification is missing.".into()))
}

/// Parse the `address` section: lines of the form `<field>: <rhs>`, where
/// the field is one of `cycle`, `opcode`, `flags` and `segment`. The
/// flags field alternatively accepts a comma separated list of flag
/// names.
pub fn parse_address_mapping(
    section: &Section,
    rom: &RomSpecs,
    diag: &mut Diagnostics,
) -> Result<AddressMapping, Error> {
    let mut address = AddressMapping::default();
    let mut count = 0;

    for (offset, raw) in section.body.lines().enumerate() {
        diag.line = section.line + offset;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let operands = split(line, ":", false);
        error_if!(operands.len() != 2, diag,
                  "invalid format for address specifier, should be \
                   <IDENTIFIER>: <NUMBER OF BITS>.");

        let ident = operands[0].as_str();
        let rhs = operands[1].as_str();

        error_if!(!["cycle", "opcode", "flags", "segment"].contains(&ident), diag,
                  "unknown address field \"{}\".", ident);
        let defined = match ident {
            "cycle" => address.cycle.bits,
            "opcode" => address.opcode.bits,
            "flags" => address.flags.bits,
            _ => address.segment.bits,
        };
        error_if!(defined > 0, diag, "multiple definitions of \"{}\" bits.", ident);

        let bits = match ident {
            "cycle" | "opcode" | "segment" => {
                let min = if ident == "segment" { 0 } else { 1 };
                let value = util::string_to_int(rhs, 10).ok_or_else(|| {
                    diag.error(format!(
                        "right hand side of \"{}\" ({}) is not a valid decimal number.",
                        ident, rhs))
                })?;
                error_if!(value < min, diag, "number of bits must be a positive integer.");
                value as usize
            }
            _ => match util::string_to_int(rhs, 10) {
                Some(value) => {
                    error_if!(value < 0, diag, "number of bits must be a positive integer.");
                    value as usize
                }
                None => {
                    // Not a number, so interpret it as a list of flag names.
                    let labels = split(rhs, ",", false);
                    let mut seen: Vec<&str> = Vec::new();
                    for label in &labels {
                        validate_identifier(label, diag)?;
                        warning_if!(seen.contains(&label.as_str()), diag,
                                    "duplicate flag \"{}\".", label);
                        seen.push(label);
                    }
                    address.flag_labels = labels.clone();
                    labels.len()
                }
            },
        };

        let field = match ident {
            "cycle" => &mut address.cycle,
            "opcode" => &mut address.opcode,
            "flags" => &mut address.flags,
            _ => &mut address.segment,
        };
        field.bits = bits;
        field.start = count;
        count += bits;
    }

    error_if!(count > rom.address_bits, diag,
              "total number of bits used in address specification ({}) exceeds number \
               of address lines of the ROM ({}).", count, rom.address_bits);
    error_if!(address.opcode.bits == 0, diag, "number of opcode bits must be specified.");
    error_if!(address.cycle.bits == 0, diag, "number of cycle bits must be specified.");

    address.total_bits = count;
    Ok(address)
}

/// Parse the `signals` section: one identifier per line, order
/// significant. Afterwards the signal count is checked against the
/// capacity of the configured chips and segments.
pub fn parse_signals(
    section: &Section,
    rom: &RomSpecs,
    address: &AddressMapping,
    diag: &mut Diagnostics,
) -> Result<Signals, Error> {
    let mut signals = Signals::new();

    for (offset, raw) in section.body.lines().enumerate() {
        diag.line = section.line + offset;
        let ident = raw.trim();
        if ident.is_empty() {
            continue;
        }

        validate_identifier(ident, diag)?;
        error_if!(signals.iter().any(|s| s == ident), diag,
                  "duplicate definition of signal \"{}\".", ident);
        signals.push(ident.to_string());
    }

    error_if!(signals.len() > 64, diag, "more than 64 signals declared.");

    let chunks = (signals.len() + 7) / 8;
    let segment_bits = address.segment.bits;
    let parts_available = rom.rom_count << segment_bits;

    warning_if!(chunks < rom.rom_count, diag,
                "for {} signals, only {} roms are necessary to store all of them.",
                signals.len(), chunks);
    let mut warned = false;
    if chunks == rom.rom_count && segment_bits > 0 {
        diag.warning(&format!(
            "for {} signals and {} rom chips, using segmented roms is not necessary.",
            signals.len(), rom.rom_count));
        warned = true;
    }
    let segment_bits_required =
        util::bits_needed((chunks + rom.rom_count - 1) / rom.rom_count);
    warning_if!(segment_bits_required < segment_bits && !warned, diag,
                "for {} signals, it is sufficient to use only {} segment bit(s) \
                 (when using {} ROM chip(s)).",
                signals.len(), segment_bits_required, rom.rom_count);

    error_if!(chunks > parts_available, diag,
              "too many signals declared ({}). In this configuration ({} rom chip(s), \
               {} segment bit(s)), a maximum of {} signals can be declared.",
              signals.len(), rom.rom_count, segment_bits, parts_available * 8);

    Ok(signals)
}

/// Parse the `opcodes` section: lines of the form `<NAME> = <HEX VALUE>`.
pub fn parse_opcodes(
    section: &Section,
    address: &AddressMapping,
    diag: &mut Diagnostics,
) -> Result<Opcodes, Error> {
    let mut opcodes = Opcodes::new();

    for (offset, raw) in section.body.lines().enumerate() {
        diag.line = section.line + offset;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let operands = split(line, "=", false);
        error_if!(operands.len() == 1, diag, "expected \"=\" in opcode definition.");
        error_if!(operands.len() != 2, diag,
                  "incorrect opcode format, should be of the form <OPCODE> = <HEX VALUE>.");

        let ident = operands[0].as_str();
        validate_identifier(ident, diag)?;
        let value = util::string_to_int(&operands[1], 16).ok_or_else(|| {
            diag.error(format!(
                "value assigned to opcode \"{}\" ({}) is not a valid hexadecimal number.",
                ident, operands[1]))
        })?;
        error_if!(value < 0, diag,
                  "value assigned to opcode \"{}\" ({}) may not be negative.", ident, value);
        let value = value as usize;
        error_if!(value >= (1 << address.opcode.bits), diag,
                  "value assigned to opcode \"{}\" ({}) does not fit inside {} bits.",
                  ident, value, address.opcode.bits);

        error_if!(opcodes.iter().any(|oc| oc.ident == ident), diag,
                  "duplicate definition of opcode \"{}\".", ident);
        for other in &opcodes {
            warning_if!(other.value == value, diag,
                        "opcodes \"{}\" and \"{}\" are defined with the same value ({}).",
                        ident, other.ident, value);
        }
        opcodes.push(Opcode {
            ident: ident.to_string(),
            value: value,
        });
    }

    Ok(opcodes)
}
