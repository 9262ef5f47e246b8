//! Record reader: splits raw setup text into section-tagged records.
//!
//! Grammar mismatches are not detected here; anything that is not a comment
//! or a section marker becomes a record and is judged during
//! deserialization.

use super::records::Record;

/// Lines starting with this token are discarded.
pub const COMMENT: &str = "//";

/// Returns the section name if the line is a `[Identifier]` marker.
fn section_marker(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;

    let valid = !inner.is_empty()
        && inner
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    valid.then_some(inner)
}

/// Split text into ordered records. Records before any marker belong to the
/// default/root section.
pub fn parse_records(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut section: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with(COMMENT) {
            continue;
        }

        if let Some(name) = section_marker(line) {
            // Case is preserved here and matched case-insensitively downstream.
            section = Some(name.to_string());
            continue;
        }

        let fields = line.split(',').map(|field| field.trim().to_string()).collect();

        records.push(Record {
            section: section.clone(),
            fields,
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("\n  \n\t\n").is_empty());
        assert!(parse_records("// just a comment\n// another").is_empty());
    }

    #[test]
    fn records_before_marker_are_root() {
        let records = parse_records("version,4\n[SpringBones]\nHead,0.1");

        assert_eq!(records.len(), 2);
        assert!(records[0].is_root());
        assert_eq!(records[0].fields, ["version", "4"]);
        assert_eq!(records[1].section.as_deref(), Some("SpringBones"));
        assert_eq!(records[1].fields, ["Head", "0.1"]);
    }

    #[test]
    fn section_case_is_preserved() {
        let records = parse_records("[pIvOtS]\na,b,0,0,0");
        assert_eq!(records[0].section.as_deref(), Some("pIvOtS"));
    }

    #[test]
    fn comments_and_blanks_skipped_anywhere() {
        let text = "\
// header
[Colliders]
// column names
sp,C1,Hips,0,0,0,0,0,0,1,1,1,,0.1

cp,C2,Hips,0,0,0,0,0,0,1,1,1,,0.1,0.3";

        let records = parse_records(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields[1], "C1");
        assert_eq!(records[1].fields[1], "C2");
    }

    #[test]
    fn fields_are_trimmed() {
        let records = parse_records("a , b ,  0.5 ");
        assert_eq!(records[0].fields, ["a", "b", "0.5"]);
    }

    #[test]
    fn malformed_marker_is_a_record() {
        // Not a valid `[Identifier]` line; judged later as a record.
        let records = parse_records("[Spring Bones]\n[broken");

        assert_eq!(records.len(), 2);
        assert!(records[0].is_root());
    }

    #[test]
    fn empty_fields_survive() {
        let records = parse_records("Head,0.3,0,,");
        assert_eq!(records[0].fields, ["Head", "0.3", "0", "", ""]);
    }
}
