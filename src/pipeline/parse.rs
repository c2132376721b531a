//! Response parsing: raw model text → [`FineRecord`] or appeal body.
//!
//! Extraction output is treated strictly. The only repair applied is removing
//! one pair of code fences wrapping the whole answer (models add them even
//! when told not to); anything that is then not a JSON object with six string
//! fields is a [`AppealError::MalformedResponse`]. Nothing is guessed: a
//! value is either text copied from the fine or `""`, so placeholder filler
//! such as `"N/A"` or `"Not visible in the image"` is an
//! [`AppealError::InvalidField`].
//!
//! Generation output is free text and only gets deterministic cleanup.

use crate::error::AppealError;
use crate::model::FineRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Longest accepted value for a core fine field.
pub const MAX_FIELD_CHARS: usize = 500;

/// Longest accepted value for `additionalInfo`.
pub const MAX_ADDITIONAL_INFO_CHARS: usize = 2000;

const EXCERPT_CHARS: usize = 80;

// ── Extraction (JSON mode) ───────────────────────────────────────────────

/// Parse the extraction answer into a validated [`FineRecord`].
pub fn parse_fine_record(raw: &str) -> Result<FineRecord, AppealError> {
    let body = strip_code_fences(raw.trim());

    let value: Value = serde_json::from_str(body).map_err(|e| AppealError::MalformedResponse {
        detail: e.to_string(),
        excerpt: excerpt(raw),
    })?;

    let obj = value.as_object().ok_or_else(|| AppealError::MalformedResponse {
        detail: "expected a JSON object".into(),
        excerpt: excerpt(raw),
    })?;

    Ok(FineRecord {
        reference_number: required_field(obj, "referenceNumber")?,
        date: required_field(obj, "date")?,
        amount: required_field(obj, "amount")?,
        location: required_field(obj, "location")?,
        reason: required_field(obj, "reason")?,
        vehicle: required_field(obj, "vehicle")?,
        additional_info: optional_field(obj, "additionalInfo")?,
    })
}

fn required_field(obj: &Map<String, Value>, name: &str) -> Result<String, AppealError> {
    match obj.get(name) {
        Some(v) => field_value(name, v, MAX_FIELD_CHARS),
        None => Err(AppealError::MalformedResponse {
            detail: format!("missing field '{name}'"),
            excerpt: excerpt(&Value::Object(obj.clone()).to_string()),
        }),
    }
}

fn optional_field(obj: &Map<String, Value>, name: &str) -> Result<String, AppealError> {
    match obj.get(name) {
        Some(v) => field_value(name, v, MAX_ADDITIONAL_INFO_CHARS),
        None => Ok(String::new()),
    }
}

fn field_value(name: &str, value: &Value, max_chars: usize) -> Result<String, AppealError> {
    let s = value.as_str().ok_or_else(|| AppealError::InvalidField {
        field: name.to_string(),
        reason: format!("expected a string, got {}", json_type(value)),
    })?;
    let s = s.trim();
    if s.contains('\n') {
        return Err(AppealError::InvalidField {
            field: name.to_string(),
            reason: "value spans multiple lines".into(),
        });
    }
    if s.chars().count() > max_chars {
        return Err(AppealError::InvalidField {
            field: name.to_string(),
            reason: format!("value longer than {max_chars} characters"),
        });
    }
    if is_placeholder(s) {
        return Err(AppealError::InvalidField {
            field: name.to_string(),
            reason: format!("placeholder '{s}' instead of a value or \"\""),
        });
    }
    Ok(s.to_string())
}

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^(?:
            n/?a | none | null | nil | unknown | unspecified | tbd
          | illegible | unreadable | -+ | \?+
          | not\s+(?:available|applicable|visible|provided|specified|stated|found|shown
                    |legible|readable|present|given|listed|mentioned|known|clear)\b.*
          | (?:cannot|can't|could\s+not|unable\s+to)\s+(?:be\s+)?(?:read|determine|determined|find|found|see|seen|identify|identified)\b.*
        )\.?$",
    )
    .unwrap()
});

/// Filler a model writes instead of leaving a field empty.
fn is_placeholder(value: &str) -> bool {
    RE_PLACEHOLDER.is_match(value)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n(.*)\n```\s*$").unwrap());

/// Remove one pair of code fences wrapping the whole input.
fn strip_code_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => input,
    }
}

fn excerpt(raw: &str) -> String {
    raw.trim().chars().take(EXCERPT_CHARS).collect()
}

// ── Generation (text mode) ───────────────────────────────────────────────

/// Clean the generated appeal body.
///
/// Rules, in order: strip outer fences, normalise line endings, drop
/// invisible Unicode, trim trailing whitespace per line, collapse 3+ blank
/// lines, trim. An empty result means the model said nothing.
pub fn parse_appeal_text(raw: &str) -> Result<String, AppealError> {
    let s = strip_code_fences(raw.trim()).to_string();
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = s.trim();
    if s.is_empty() {
        return Err(AppealError::EmptyResponse);
    }
    Ok(s.to_string())
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"referenceNumber":"A1","date":"2024-01-01","amount":"50","location":"X","reason":"Y","vehicle":"Z"}"#;

    #[test]
    fn parses_exact_values_with_empty_additional_info() {
        let rec = parse_fine_record(VALID).unwrap();
        assert_eq!(
            rec,
            FineRecord {
                reference_number: "A1".into(),
                date: "2024-01-01".into(),
                amount: "50".into(),
                location: "X".into(),
                reason: "Y".into(),
                vehicle: "Z".into(),
                additional_info: String::new(),
            }
        );
    }

    #[test]
    fn prose_is_a_parse_error() {
        let err = parse_fine_record("Sorry, I can't help").unwrap_err();
        assert!(matches!(err, AppealError::MalformedResponse { .. }), "got {err:?}");
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = format!("```json\n{VALID}\n```");
        assert_eq!(parse_fine_record(&raw).unwrap().reference_number, "A1");
        let raw = format!("```\n{VALID}\n```\n");
        assert_eq!(parse_fine_record(&raw).unwrap().vehicle, "Z");
    }

    #[test]
    fn json_with_leading_prose_is_rejected() {
        let raw = format!("Here is the data:\n{VALID}");
        assert!(parse_fine_record(&raw).is_err());
    }

    #[test]
    fn missing_field_is_rejected() {
        let raw = r#"{"referenceNumber":"A1","date":"","amount":"","location":"","reason":""}"#;
        let err = parse_fine_record(raw).unwrap_err();
        assert!(err.to_string().contains("vehicle"), "got {err}");
    }

    #[test]
    fn null_and_number_values_are_rejected() {
        let raw = VALID.replace(r#""amount":"50""#, r#""amount":50"#);
        assert!(matches!(
            parse_fine_record(&raw),
            Err(AppealError::InvalidField { ref field, .. }) if field == "amount"
        ));
        let raw = VALID.replace(r#""vehicle":"Z""#, r#""vehicle":null"#);
        assert!(matches!(
            parse_fine_record(&raw),
            Err(AppealError::InvalidField { ref field, .. }) if field == "vehicle"
        ));
    }

    #[test]
    fn multiline_explanation_is_rejected() {
        let raw = VALID.replace(
            r#""reason":"Y""#,
            r#""reason":"I could not read this.\nIt may be parking.""#,
        );
        assert!(matches!(
            parse_fine_record(&raw),
            Err(AppealError::InvalidField { .. })
        ));
    }

    #[test]
    fn values_are_trimmed_and_additional_info_kept() {
        let raw = VALID
            .replace(r#""location":"X""#, r#""location":"  Main St  ""#)
            .replace('}', r#","additionalInfo":"Camera 4"}"#);
        let rec = parse_fine_record(&raw).unwrap();
        assert_eq!(rec.location, "Main St");
        assert_eq!(rec.additional_info, "Camera 4");
    }

    #[test]
    fn appeal_text_is_cleaned() {
        let raw = "```\nDear Sir,\r\n\r\n\r\n\r\nI **dispute** this.   \n\u{200B}\n```";
        let text = parse_appeal_text(raw).unwrap();
        assert_eq!(text, "Dear Sir,\n\nI **dispute** this.");
    }

    #[test]
    fn placeholder_values_are_rejected() {
        for (field, filler) in [
            ("referenceNumber", "N/A"),
            ("date", "unknown"),
            ("amount", "Not visible in the image"),
            ("location", "n/a"),
            ("reason", "Not provided."),
            ("vehicle", "Cannot be determined from the document"),
            ("vehicle", "-"),
        ] {
            let raw = VALID.replace(
                &format!(r#""{field}":"#),
                &format!(r#""{field}":"{filler}","_was":"#),
            );
            match parse_fine_record(&raw) {
                Err(AppealError::InvalidField { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{filler:?} in {field} gave {other:?}"),
            }
        }
    }

    #[test]
    fn placeholder_in_additional_info_is_rejected() {
        let raw = VALID.replace('}', r#","additionalInfo":"None"}"#);
        assert!(matches!(
            parse_fine_record(&raw),
            Err(AppealError::InvalidField { ref field, .. }) if field == "additionalInfo"
        ));
    }

    #[test]
    fn real_values_resembling_filler_are_kept() {
        let raw = VALID
            .replace(r#""reason":"Y""#, r#""reason":"Not displaying a valid permit""#)
            .replace(r#""location":"X""#, r#""location":"Nantwich Rd""#)
            .replace(r#""vehicle":"Z""#, r#""vehicle":"NA12 BCD""#);
        let rec = parse_fine_record(&raw).unwrap();
        assert_eq!(rec.reason, "Not displaying a valid permit");
        assert_eq!(rec.vehicle, "NA12 BCD");
    }

    #[test]
    fn invisible_only_lines_do_not_leave_extra_blank_lines() {
        let text = parse_appeal_text("A\n\n\u{200B}\n\n\nB").unwrap();
        assert_eq!(text, "A\n\nB");
    }

    #[test]
    fn blank_appeal_text_is_empty_response() {
        assert!(matches!(
            parse_appeal_text("  \n\n "),
            Err(AppealError::EmptyResponse)
        ));
    }

    #[test]
    fn strip_fences_passthrough() {
        assert_eq!(strip_code_fences("plain"), "plain");
    }
}
