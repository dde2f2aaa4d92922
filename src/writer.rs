//! Output writers, selected by the extension of the output file.
//!
//! Two writers are available: a binary writer producing one raw image
//! file per ROM chip, and a C source writer producing a single file that
//! declares the images as byte arrays.

use std::fs::File;
use std::io::{self, Write as IoWrite};
use std::path::Path;

use super::{Error, Microcode};

/// A sink that can turn a compiled result into one or more files.
///
/// Implementations list the filename extensions they feel responsible
/// for; [`writer_for`] picks the writer claiming the extension of the
/// requested output file.
pub trait Writer {
    /// Extensions (without the dot) this writer handles.
    fn extensions(&self) -> &[&str];

    /// Write the result, returning a human readable report.
    fn write(&self, result: &Microcode) -> Result<String, Error>;
}

/// Writer producing raw binary images, one file per ROM chip.
pub struct BinaryWriter {
    filename: String,
}

/// Writer producing a single C source file declaring the images as byte
/// arrays.
pub struct CSourceWriter {
    filename: String,
}

/// Find the writer responsible for the given output filename. Files with
/// an unknown or missing extension get the binary writer.
pub fn writer_for(filename: &str) -> Box<dyn Writer> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_string();

    let writers: Vec<Box<dyn Writer>> = vec![
        Box::new(BinaryWriter { filename: filename.to_string() }),
        Box::new(CSourceWriter { filename: filename.to_string() }),
    ];
    for writer in writers {
        if writer.extensions().contains(&extension.as_str()) {
            return writer;
        }
    }
    Box::new(BinaryWriter { filename: filename.to_string() })
}

/// Filenames the binary writer produces: the base name when there is a
/// single chip, `base.N` otherwise.
pub fn output_files(base: &str, count: usize) -> Vec<String> {
    if count == 1 {
        vec![base.to_string()]
    } else {
        (0..count).map(|idx| format!("{}.{}", base, idx)).collect()
    }
}

fn write_file(filename: &str, bytes: &[u8]) -> Result<(), Error> {
    let io_error = |e: io::Error| Error {
        file: String::new(),
        line: 0,
        message: format!("could not write output file \"{}\": {}", filename, e),
    };
    let mut file = File::create(filename).map_err(&io_error)?;
    file.write_all(bytes).map_err(&io_error)
}

fn report_header(result: &Microcode) -> String {
    format!(
        "Successfully generated {} image{} from {}:\n\n",
        result.images.len(),
        if result.images.len() == 1 { "" } else { "s" },
        result.spec_file
    )
}

impl Writer for BinaryWriter {
    fn extensions(&self) -> &[&str] {
        &["bin", "rom"]
    }

    fn write(&self, result: &Microcode) -> Result<String, Error> {
        let files = output_files(&self.filename, result.images.len());
        for (image, filename) in result.images.iter().zip(&files) {
            write_file(filename, image)?;
        }

        let mut report = report_header(result);
        for (idx, filename) in files.iter().enumerate() {
            report.push_str(&format!(
                "  ROM {}: {} ({} bytes)\n",
                idx, filename, result.images[idx].len()
            ));
        }
        Ok(report)
    }
}

impl Writer for CSourceWriter {
    fn extensions(&self) -> &[&str] {
        &["c", "cc", "cpp", "cxx"]
    }

    fn write(&self, result: &Microcode) -> Result<String, Error> {
        let source = render_c_source(result);
        write_file(&self.filename, source.as_bytes())?;

        let mut report = report_header(result);
        report.push_str(&format!(
            "  {} ({} bytes per image)\n",
            self.filename,
            result.images[0].len()
        ));
        Ok(report)
    }
}

/// Render all images as C byte-array definitions.
pub fn render_c_source(result: &Microcode) -> String {
    let mut source = format!("/* Generated by mugen from {} */\n\n", result.spec_file);
    for (idx, image) in result.images.iter().enumerate() {
        source.push_str(&format!("#define MUGEN_ROM_{}_SIZE {}\n", idx, image.len()));
        source.push_str(&format!(
            "unsigned char const mugen_rom_{}[MUGEN_ROM_{}_SIZE] = {{\n",
            idx, idx
        ));
        for chunk in image.chunks(12) {
            let bytes: Vec<String> = chunk.iter().map(|b| format!("0x{:02x}", b)).collect();
            source.push_str(&format!("  {},\n", bytes.join(", ")));
        }
        source.push_str("};\n\n");
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writers_are_selected_by_extension() {
        assert_eq!(writer_for("out.bin").extensions(), &["bin", "rom"]);
        assert_eq!(writer_for("out.rom").extensions(), &["bin", "rom"]);
        assert_eq!(writer_for("out.cpp").extensions(), &["c", "cc", "cpp", "cxx"]);
        // No extension falls back to binary output.
        assert_eq!(writer_for("out").extensions(), &["bin", "rom"]);
        assert_eq!(writer_for("out.xyz").extensions(), &["bin", "rom"]);
    }

    #[test]
    fn output_file_names() {
        assert_eq!(output_files("out.bin", 1), vec!["out.bin"]);
        assert_eq!(output_files("out.bin", 3), vec!["out.bin.0", "out.bin.1", "out.bin.2"]);
    }
}
