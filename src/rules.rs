//! Expansion of the microcode rules into the ROM images.
//!
//! Every rule maps an opcode/cycle/flags match specifier (with wildcards)
//! to a set of signals. The expander materializes each rule as an address
//! pattern, enumerates all matching addresses, and writes the packed
//! signal bytes into the image of every chip and segment. The first rule
//! to write an address owns it: a later explicit rule touching the same
//! address is an error, while the catch rule silently fills whatever is
//! left.

use super::sections::Section;
use super::spec::{AddressMapping, Opcodes, RomSpecs, Signals};
use super::util::{self, split};
use super::{Diagnostics, Error, Microcode, Options, Padding};

/// Overwrite the pattern positions of a field with a bit string. Pattern
/// and bit string both hold their most significant bit first; `start` is
/// the least significant address line of the field.
pub fn insert_bits(pattern: &mut [u8], bit_string: &str, start: usize) {
    let end = pattern.len() - start;
    let begin = end - bit_string.len();
    pattern[begin..end].copy_from_slice(bit_string.as_bytes());
}

/// Enumerate every address matching the pattern by expanding the
/// wildcard positions.
fn matching_addresses(pattern: &[u8]) -> Vec<usize> {
    let mut base = 0;
    let mut wildcards = Vec::new();
    let width = pattern.len();
    for (idx, &ch) in pattern.iter().enumerate() {
        let bit = width - idx - 1;
        match ch {
            b'1' => base |= 1 << bit,
            b'0' => (),
            _ => wildcards.push(bit),
        }
    }

    let mut result = Vec::with_capacity(1 << wildcards.len());
    for combination in 0..(1usize << wildcards.len()) {
        let mut address = base;
        for (pos, &bit) in wildcards.iter().enumerate() {
            if combination & (1 << pos) != 0 {
                address |= 1 << bit;
            }
        }
        result.push(address);
    }
    result
}

/// Expand every rule of the microcode section into one image per chip.
pub fn expand(
    section: &Section,
    rom: &RomSpecs,
    address: &AddressMapping,
    signals: &Signals,
    opcodes: &Opcodes,
    opt: &Options,
    diag: &mut Diagnostics,
) -> Result<Vec<Vec<u8>>, Error> {
    // When the catch rule doubles as padding, it must reach the full
    // address space of the chip, including lines no field is mapped to.
    let addr_width = if opt.padding == Padding::Catch {
        rom.address_bits
    } else {
        address.total_bits
    };
    let image_size = 1usize << addr_width;

    let mut images = vec![vec![0u8; image_size]; rom.rom_count];
    let mut visited = vec![0usize; image_size];
    let mut signal_used = vec![false; signals.len()];
    let mut opcode_used = vec![false; opcodes.len()];
    let mut catch_rule_defined = false;

    for (offset, raw) in section.body.lines().enumerate() {
        diag.line = section.line + offset;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let operands = split(line, "->", true);
        error_if!(operands.len() == 1, diag, "expected \"->\" in microcode rule.");
        error_if!(operands.len() != 2, diag,
                  "invalid format in microcode definition, should be \
                   (<OPCODE>:<CYCLE>:<FLAGS> | catch) -> <SIG1>, ...");

        let mut pattern: Vec<u8> = vec![b'x'; addr_width];
        let mut catch_all = operands[0] == "catch";

        if !catch_all {
            let mut lhs = split(&operands[0], ":", false);
            error_if!(lhs.len() < 2 || lhs.len() > 3, diag,
                      "expected ':' before '->' in rule definition.");
            if lhs.len() == 2 {
                lhs.push(String::new());
            }

            // Opcode bits
            let opcode_spec = lhs[0].as_str();
            if opcode_spec != "x" && opcode_spec != "X" {
                let mut opcode_str = String::new();
                for (idx, oc) in opcodes.iter().enumerate() {
                    if oc.ident == opcode_spec {
                        opcode_used[idx] = true;
                        opcode_str = util::to_binary_string(oc.value, address.opcode.bits);
                        break;
                    }
                }
                error_if!(opcode_str.is_empty(), diag,
                          "opcode \"{}\" not declared in opcode section.", opcode_spec);
                insert_bits(&mut pattern, &opcode_str, address.opcode.start);
            }

            // Cycle bits
            let cycle_spec = lhs[1].as_str();
            if cycle_spec != "x" && cycle_spec != "X" {
                let value = util::string_to_int(cycle_spec, 10).ok_or_else(|| {
                    diag.error(format!(
                        "cycle number ({}) is not a valid decimal number.", cycle_spec))
                })?;
                error_if!(value < 0, diag, "cycle number ({}) may not be negative.", value);
                let cycle_str = util::to_binary_string(value as usize, address.cycle.bits);
                error_if!(cycle_str.len() > address.cycle.bits, diag,
                          "cycle number ({}) does not fit inside {} bits.",
                          value, address.cycle.bits);
                insert_bits(&mut pattern, &cycle_str, address.cycle.start);
            }

            // Flag bits
            let flag_spec = lhs[2].as_str();
            error_if!(flag_spec.len() != address.flags.bits, diag,
                      "number of flag bits ({}) does not match number of flag bits \
                       defined in the address section ({}).",
                      flag_spec.len(), address.flags.bits);
            if !flag_spec.is_empty() {
                for ch in flag_spec.chars() {
                    error_if!(ch != '0' && ch != '1' && ch != 'x' && ch != 'X', diag,
                              "invalid flag bit '{}'; can only be 0, 1 or x (wildcard).", ch);
                }
                insert_bits(&mut pattern, flag_spec, address.flags.start);
            }

            // Normalize wildcards. A rule that leaves every position open
            // is a catch rule after all.
            for ch in pattern.iter_mut() {
                if *ch == b'X' {
                    *ch = b'x';
                }
            }
            catch_all = pattern.iter().all(|&ch| ch == b'x');
        }
        if catch_all {
            catch_rule_defined = true;
        }

        // Construct the control signal bitvector.
        let mut bitvector: u64 = 0;
        for signal in split(&operands[1], ",", false) {
            let index = signals.iter().position(|s| *s == signal).ok_or_else(|| {
                diag.error(format!(
                    "signal \"{}\" not declared in signal section.", signal))
            })?;
            bitvector |= 1 << index;
            signal_used[index] = true;
        }

        // Write the bitvector into every matching address; segmented
        // configurations replicate the action into every segment slot.
        let segments = 1usize << address.segment.bits;
        for segment in 0..segments {
            if address.segment.bits > 0 {
                let segment_str = util::to_binary_string(segment, address.segment.bits);
                insert_bits(&mut pattern, &segment_str, address.segment.start);
            }

            for addr in matching_addresses(&pattern) {
                if visited[addr] != 0 {
                    error_if!(!catch_all, diag,
                              "rule overlaps with rule previously defined on line {}.",
                              visited[addr]);
                    continue;
                }
                for chip in 0..rom.rom_count {
                    let chunk = segment * rom.rom_count + chip;
                    let byte = if chunk < 8 {
                        ((bitvector >> (8 * chunk)) & 0xff) as u8
                    } else {
                        0
                    };
                    images[chip][addr] = if opt.lsb_first {
                        byte
                    } else {
                        util::reverse_bits(byte)
                    };
                }
                visited[addr] = diag.line;
            }
        }
    }

    for (idx, oc) in opcodes.iter().enumerate() {
        warning_if!(!opcode_used[idx], diag, "unused opcode \"{}\".", oc.ident);
    }
    for (idx, signal) in signals.iter().enumerate() {
        warning_if!(!signal_used[idx], diag, "unused signal \"{}\".", signal);
    }
    error_if!(!catch_rule_defined && opt.padding == Padding::Catch, diag,
              "no catch rule defined. This is mandatory when using '--pad catch'.");

    Ok(images)
}

/// Extend every image to the full ROM capacity with the given byte.
pub fn pad_images(result: &mut Microcode, value: u8) {
    let target = result.rom.word_count;
    for image in result.images.iter_mut() {
        image.resize(target, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_bits_places_fields_from_the_right() {
        let mut pattern = b"xxxxxxxx".to_vec();
        insert_bits(&mut pattern, "101", 0);
        assert_eq!(&pattern, b"xxxxx101");
        insert_bits(&mut pattern, "11", 6);
        assert_eq!(&pattern, b"11xxx101");
    }

    #[test]
    fn matching_addresses_expands_wildcards() {
        let mut matches = matching_addresses(b"x0x1");
        matches.sort();
        assert_eq!(matches, vec![1, 3, 9, 11]);

        assert_eq!(matching_addresses(b"0110"), vec![6]);

        let all = matching_addresses(b"xxx");
        assert_eq!(all.len(), 8);
    }
}
