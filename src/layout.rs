//! Placement of signals onto chips, segments and bits, and the human
//! readable layout report.
//!
//! Signals are packed into bytes by declaration index. Consecutive bytes
//! go to consecutive chips; once every chip of the current segment holds
//! a byte, packing wraps into the next time-segment.

use super::spec::{AddressMapping, RomSpecs, Signals};

/// Location of a packed signal: which chip, which time-segment, and which
/// bit of the stored byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPosition {
    pub chip: usize,
    pub segment: usize,
    pub bit: usize,
}

/// Where signal `index` ends up, given the number of chips and the bit
/// order within each byte.
pub fn signal_position(index: usize, rom_count: usize, lsb_first: bool) -> SignalPosition {
    let chunk = index / 8;
    let bit = index % 8;
    SignalPosition {
        chip: chunk % rom_count,
        segment: chunk / rom_count,
        bit: if lsb_first { bit } else { 7 - bit },
    }
}

/// Render the layout report: for every chip and segment the signal
/// assigned to each bit, followed by the role of every address line.
pub fn layout_report(
    rom: &RomSpecs,
    address: &AddressMapping,
    signals: &Signals,
    lsb_first: bool,
) -> String {
    let mut report = String::new();
    let segments = 1usize << address.segment.bits;

    for chip in 0..rom.rom_count {
        for segment in 0..segments {
            let chunk = 8 * (segment * rom.rom_count + chip);
            report.push_str(&format!("[ROM {}, Segment {}] {{\n", chip, segment));
            for bit in 0..8 {
                let index = chunk + if lsb_first { bit } else { 7 - bit };
                let name = if index < signals.len() {
                    signals[index].as_str()
                } else {
                    "UNUSED"
                };
                report.push_str(&format!("  {}: {}\n", bit, name));
            }
            report.push_str("}\n\n");
        }
    }

    let mut roles: Vec<String> = vec![String::new(); rom.address_bits];
    for bit in 0..address.opcode.bits {
        roles[address.opcode.start + bit] = format!("OPCODE BIT {}", bit);
    }
    for bit in 0..address.cycle.bits {
        roles[address.cycle.start + bit] = format!("CYCLE BIT {}", bit);
    }
    for bit in 0..address.flags.bits {
        roles[address.flags.start + bit] = if address.flag_labels.is_empty() {
            format!("FLAG BIT {}", bit)
        } else {
            address.flag_labels[address.flag_labels.len() - bit - 1].clone()
        };
    }
    for bit in 0..address.segment.bits {
        roles[address.segment.start + bit] = format!("SEGMENT BIT {}", bit);
    }

    report.push_str("[Address Layout] {\n");
    for bit in 0..rom.address_bits {
        let role = if roles[bit].is_empty() {
            "UNUSED"
        } else {
            roles[bit].as_str()
        };
        report.push_str(&format!("  {}: {}\n", bit, role));
    }
    report.push_str("}\n");

    report
}
