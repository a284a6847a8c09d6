//! Git conflict marker detection and side splitting
//!
//! Two views of the same markers:
//! - [`has_conflict_markers`]: loose substring check used to decide whether a
//!   merge result or a working file is still conflicted
//! - [`split_sides`]: column-0 anchored single-pass parser that rebuilds the
//!   full "ours" and "theirs" documents from a conflict-marked text
//!
//! Handles 2-way and diff3 (`|||||||` base) hunks and CRLF line endings.

use memchr::memmem;

use crate::core::error::{DriverError, DriverResult};

pub const OURS_MARKER: &str = "<<<<<<<";
pub const SEPARATOR_MARKER: &str = "=======";
pub const THEIRS_MARKER: &str = ">>>>>>>";

/// True iff all three marker tokens occur anywhere, in any order.
pub fn has_conflict_markers(content: impl AsRef<[u8]>) -> bool {
    let haystack = content.as_ref();
    [OURS_MARKER, SEPARATOR_MARKER, THEIRS_MARKER]
        .iter()
        .all(|marker| memmem::find(haystack, marker.as_bytes()).is_some())
}

/// Build a conflict-marked document from two whole-file versions
pub fn synthesize(ours: &str, theirs: &str) -> String {
    format!("{OURS_MARKER} ours\n{ours}\n{SEPARATOR_MARKER}\n{theirs}\n{THEIRS_MARKER} theirs\n")
}

/// Both sides of a conflict-marked document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSides {
    pub ours: String,
    pub theirs: String,
    /// Number of conflict hunks found
    pub hunks: usize,
}

/// State machine for walking conflict hunks
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParseState {
    Scanning, // Outside any hunk
    InOurs,   // Between <<<<<<< and ||||||| or =======
    InBase,   // diff3 base section, discarded
    InTheirs, // Between ======= and >>>>>>>
}

/// Split a conflict-marked text into its two complete sides.
///
/// Lines outside hunks go to both sides. Fails on markers out of sequence or
/// an unterminated hunk.
pub fn split_sides(content: &str) -> DriverResult<ConflictSides> {
    let mut sides = ConflictSides {
        ours: String::with_capacity(content.len()),
        theirs: String::with_capacity(content.len()),
        hunks: 0,
    };
    let mut state = ParseState::Scanning;
    let mut hunk_start = 0usize;

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let lb = line.as_bytes();

        match state {
            ParseState::Scanning => {
                if is_hdr_b(lb) {
                    state = ParseState::InOurs;
                    hunk_start = line_no;
                } else if is_sep_b(lb) || is_trl_b(lb) || is_base_b(lb) {
                    return Err(DriverError::MalformedConflict(format!(
                        "marker outside a conflict at line {line_no}"
                    )));
                } else {
                    sides.ours.push_str(line);
                    sides.theirs.push_str(line);
                }
            }

            ParseState::InOurs => {
                if is_base_b(lb) {
                    state = ParseState::InBase;
                } else if is_sep_b(lb) {
                    state = ParseState::InTheirs;
                } else if is_hdr_b(lb) || is_trl_b(lb) {
                    return Err(DriverError::MalformedConflict(format!(
                        "unexpected marker at line {line_no}"
                    )));
                } else {
                    sides.ours.push_str(line);
                }
            }

            ParseState::InBase => {
                if is_sep_b(lb) {
                    state = ParseState::InTheirs;
                } else if is_hdr_b(lb) || is_trl_b(lb) {
                    return Err(DriverError::MalformedConflict(format!(
                        "unexpected marker at line {line_no}"
                    )));
                }
            }

            ParseState::InTheirs => {
                if is_trl_b(lb) {
                    sides.hunks += 1;
                    state = ParseState::Scanning;
                } else if is_hdr_b(lb) || is_sep_b(lb) || is_base_b(lb) {
                    return Err(DriverError::MalformedConflict(format!(
                        "unexpected marker at line {line_no}"
                    )));
                } else {
                    sides.theirs.push_str(line);
                }
            }
        }
    }

    if state != ParseState::Scanning {
        return Err(DriverError::MalformedConflict(format!(
            "conflict starting at line {hunk_start} is never closed"
        )));
    }

    Ok(sides)
}

/// Returns true if line starts with ≥7 of the given byte (column-0 anchored)
fn starts_with_n(line: &[u8], ch: u8) -> bool {
    if line.len() < 7 {
        return false;
    }
    line.iter().take(7).all(|&b| b == ch)
}

/// Conflict start header: "<<<<<<<"
fn is_hdr_b(line: &[u8]) -> bool {
    starts_with_n(line, b'<')
}

/// Base section marker: "|||||||"
fn is_base_b(line: &[u8]) -> bool {
    starts_with_n(line, b'|')
}

/// Separator marker: "======="
fn is_sep_b(line: &[u8]) -> bool {
    starts_with_n(line, b'=')
}

/// Conflict end trailer: ">>>>>>>"
fn is_trl_b(line: &[u8]) -> bool {
    starts_with_n(line, b'>')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn detects_all_three_markers_in_any_order() {
        assert!(has_conflict_markers("<<<<<<<\n=======\n>>>>>>>\n"));
        assert!(has_conflict_markers(">>>>>>> x ======= y <<<<<<< z"));
        assert!(has_conflict_markers(b"a<<<<<<<b=======c>>>>>>>d".as_slice()));
    }

    #[test]
    fn missing_any_marker_is_clean() {
        assert!(!has_conflict_markers(""));
        assert!(!has_conflict_markers("<<<<<<< HEAD\n=======\n"));
        assert!(!has_conflict_markers("=======\n>>>>>>> b\n"));
        assert!(!has_conflict_markers("<<<<<<< a\n>>>>>>> b\n"));
        assert!(!has_conflict_markers("<<<<<< ====== >>>>>>"));
    }

    #[test]
    fn marker_checks_are_column_anchored() {
        assert!(is_hdr_b(b"<<<<<<<"));
        assert!(is_hdr_b(b"<<<<<<< HEAD"));
        assert!(!is_hdr_b(b"<<<<<< not enough"));
        assert!(!is_hdr_b(b" <<<<<<< indented"));
        assert!(is_base_b(b"||||||| base"));
        assert!(is_sep_b(b"=======\r\n"));
        assert!(is_trl_b(b">>>>>>> feature/x"));
    }

    #[test]
    fn splits_two_way_hunk_with_shared_context() {
        let input = "\
{
  \"name\": \"demo\",
<<<<<<< HEAD
  \"version\": \"1.0.0\"
=======
  \"version\": \"2.0.0\"
>>>>>>> feature/bump
}
";
        let sides = split_sides(input).unwrap();
        assert_eq!(sides.hunks, 1);
        assert_eq!(sides.ours, "{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}\n");
        assert_eq!(sides.theirs, "{\n  \"name\": \"demo\",\n  \"version\": \"2.0.0\"\n}\n");
    }

    #[test]
    fn drops_diff3_base_section() {
        let input = "\
<<<<<<< ours
a
||||||| base
b
=======
c
>>>>>>> theirs
";
        let sides = split_sides(input).unwrap();
        assert_eq!(sides.ours, "a\n");
        assert_eq!(sides.theirs, "c\n");
    }

    #[test]
    fn handles_multiple_hunks_and_crlf() {
        let input = "x\r\n<<<<<<< a\r\n1\r\n=======\r\n2\r\n>>>>>>> b\r\ny\r\n<<<<<<< a\r\n3\r\n=======\r\n4\r\n>>>>>>> b\r\n";
        let sides = split_sides(input).unwrap();
        assert_eq!(sides.hunks, 2);
        assert_eq!(sides.ours, "x\r\n1\r\ny\r\n3\r\n");
        assert_eq!(sides.theirs, "x\r\n2\r\ny\r\n4\r\n");
    }

    #[test]
    fn unterminated_hunk_is_an_error() {
        let err = split_sides("<<<<<<< a\n1\n=======\n2\n").unwrap_err();
        assert!(matches!(err, DriverError::MalformedConflict(_)));
    }

    #[test]
    fn stray_trailer_is_an_error() {
        assert!(split_sides("a\n>>>>>>> b\n").is_err());
        assert!(split_sides("<<<<<<< a\n<<<<<<< b\n").is_err());
    }

    #[test]
    fn synthesized_document_round_trips_through_split() {
        let doc = synthesize("{\"a\":1}\n", "{\"a\":2}\n");
        assert!(has_conflict_markers(&doc));
        let sides = split_sides(&doc).unwrap();
        assert_eq!(sides.hunks, 1);
        assert_eq!(sides.ours.trim(), "{\"a\":1}");
        assert_eq!(sides.theirs.trim(), "{\"a\":2}");
    }

    proptest! {
        #[test]
        fn detection_requires_every_token(
            text in "[a-z \n]*",
            include in proptest::collection::vec(any::<bool>(), 3),
        ) {
            let mut doc = text.clone();
            let tokens = [OURS_MARKER, SEPARATOR_MARKER, THEIRS_MARKER];
            for (token, keep) in tokens.iter().zip(&include) {
                if *keep {
                    doc.push_str(token);
                    doc.push_str(&text);
                }
            }
            prop_assert_eq!(has_conflict_markers(&doc), include.iter().all(|k| *k));
        }
    }
}
