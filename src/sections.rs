//! The first stage of the compiler: carving the specification file into
//! named sections.
//!
//! A specification consists of any number of sections of the form
//! `[name] { body }`. Outside of a section only whitespace and `#`
//! comments are allowed. Comments are stripped here; a comment inside a
//! section body leaves its newline in place so that the line numbers
//! reported by later stages stay accurate.

use super::{Diagnostics, Error};

/// A single `[name] { ... }` section.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    /// Body text with comments stripped and outer whitespace trimmed.
    pub body: String,
    /// Source line of the first non-whitespace character of the body.
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TopLevel,
    SectionHeader,
    WaitingForBrace,
    SectionBody,
    Comment,
}

/// Split the source text into its sections, in document order.
pub fn tokenize(source: &str, diag: &mut Diagnostics) -> Result<Vec<Section>, Error> {
    let mut state = State::TopLevel;
    let mut before_comment = State::TopLevel;
    let mut sections: Vec<Section> = Vec::new();
    let mut name = String::new();
    let mut body = String::new();
    let mut body_line = 0;
    let mut first_of_body = false;

    diag.line = 1;
    for ch in source.chars() {
        if ch == '\n' {
            diag.line += 1;
        }

        match state {
            State::TopLevel => {
                if ch == '[' {
                    state = State::SectionHeader;
                } else if ch == '#' {
                    before_comment = state;
                    state = State::Comment;
                } else {
                    error_if!(!ch.is_whitespace(), diag,
                              "only comments (use #) may appear outside sections.");
                }
            }
            State::SectionHeader => {
                error_if!(ch == '{' || ch == '}', diag,
                          "expected ']' before '{}' in section header.", ch);
                error_if!(ch == '#', diag,
                          "cannot place comments inside a section header.");
                if ch == ']' {
                    state = State::WaitingForBrace;
                } else {
                    name.push(ch);
                }
            }
            State::WaitingForBrace => {
                if ch.is_whitespace() {
                    // keep looking
                } else if ch == '#' {
                    before_comment = state;
                    state = State::Comment;
                } else {
                    error_if!(ch != '{', diag,
                              "expected '{{' before '{}' in section definition.", ch);
                    state = State::SectionBody;
                    first_of_body = true;
                }
            }
            State::SectionBody => {
                error_if!(ch == '[', diag,
                          "expected '}}' before '[' in section definition.");
                if ch == '}' {
                    let section_name = name.trim().to_string();
                    error_if!(sections.iter().any(|s| s.name == section_name), diag,
                              "multiple definitions of section \"{}\".", section_name);
                    sections.push(Section {
                        name: section_name,
                        body: body.trim().to_string(),
                        line: body_line,
                    });
                    name.clear();
                    body.clear();
                    state = State::TopLevel;
                } else if ch == '#' {
                    before_comment = state;
                    state = State::Comment;
                } else {
                    if !ch.is_whitespace() && first_of_body {
                        body_line = diag.line;
                        first_of_body = false;
                    }
                    body.push(ch);
                }
            }
            State::Comment => {
                if ch == '\n' {
                    state = before_comment;
                    if state == State::SectionBody {
                        body.push('\n');
                    }
                }
            }
        }
    }

    // A comment running to end-of-file belongs to whatever state opened it.
    if state == State::Comment {
        state = before_comment;
    }

    error_if!(state == State::SectionHeader, diag,
              "expected closing bracket ']' in section header.");
    error_if!(state == State::WaitingForBrace, diag,
              "expected opening brace '{{' in section definition.");
    error_if!(state == State::SectionBody, diag,
              "expected closing brace '}}' in section definition.");

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Diagnostics;

    fn tokenize_str(source: &str) -> Result<Vec<Section>, ::Error> {
        let mut diag = Diagnostics::new("test.mu");
        tokenize(source, &mut diag)
    }

    #[test]
    fn carves_sections_in_document_order() {
        let sections = tokenize_str("[rom] { 256x8 }\n[signals] {\n  A\n  B\n}\n").unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "rom");
        assert_eq!(sections[0].body, "256x8");
        assert_eq!(sections[0].line, 1);
        assert_eq!(sections[1].name, "signals");
        assert_eq!(sections[1].body, "A\n  B");
        assert_eq!(sections[1].line, 3);
    }

    #[test]
    fn comments_are_stripped_but_keep_line_numbers() {
        let sections = tokenize_str("# header comment\n[rom] {\n  # inner\n  256x8\n}\n").unwrap();
        assert_eq!(sections[0].body, "256x8");
        assert_eq!(sections[0].line, 4);
    }

    #[test]
    fn duplicate_sections_are_rejected() {
        let err = tokenize_str("[rom] { 1 }\n[rom] { 2 }\n").unwrap_err();
        assert!(err.message.contains("multiple definitions of section \"rom\""));
    }

    #[test]
    fn stray_characters_outside_sections_are_rejected() {
        let err = tokenize_str("rom { }").unwrap_err();
        assert!(err.message.contains("only comments"));
    }

    #[test]
    fn unterminated_section_is_rejected() {
        let err = tokenize_str("[rom] { 256x8").unwrap_err();
        assert!(err.message.contains("expected closing brace"));

        let err = tokenize_str("[rom").unwrap_err();
        assert!(err.message.contains("expected closing bracket"));

        let err = tokenize_str("[rom]").unwrap_err();
        assert!(err.message.contains("expected opening brace"));
    }

    #[test]
    fn brackets_inside_bodies_are_rejected() {
        let err = tokenize_str("[rom] { [oops] }").unwrap_err();
        assert!(err.message.contains("expected '}'"));
    }

    #[test]
    fn comment_in_header_is_rejected() {
        let err = tokenize_str("[rom # nope] { }").unwrap_err();
        assert!(err.message.contains("section header"));
    }
}
