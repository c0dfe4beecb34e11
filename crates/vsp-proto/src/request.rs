//! Command request parsing.

use crate::escape::unescape;

/// Separator between the fields of a request or reply.
pub const FIELD_DELIMITER: char = ',';

/// A command request split into its fields.
///
/// Field 0 holds the command code; the remaining fields are arguments, each
/// unescaped for [`FIELD_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    fields: Vec<String>,
}

impl Request {
    /// Split a packet payload into fields.
    pub fn parse(payload: &str) -> Self {
        let fields = payload.split(FIELD_DELIMITER).map(|f| unescape(f, FIELD_DELIMITER)).collect();
        Self { fields }
    }

    /// Single-letter command code, if field 0 is exactly one character.
    pub fn code(&self) -> Option<char> {
        let mut chars = self.fields.first()?.chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => Some(code),
            _ => None,
        }
    }

    /// Number of fields, including the command code field.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field at `index` (0 is the command code).
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// All fields from `index` onwards.
    pub fn fields_from(&self, index: usize) -> &[String] {
        self.fields.get(index..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::escape;

    #[test]
    fn parses_code_and_arguments() {
        let request = Request::parse("e,system.device,echo,a,b");
        assert_eq!(request.code(), Some('e'));
        assert_eq!(request.field_count(), 5);
        assert_eq!(request.field(1), Some("system.device"));
        assert_eq!(request.fields_from(3), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn bare_code_has_one_field() {
        let request = Request::parse("s");
        assert_eq!(request.code(), Some('s'));
        assert_eq!(request.field_count(), 1);
        assert_eq!(request.field(1), None);
        assert!(request.fields_from(1).is_empty());
    }

    #[test]
    fn empty_payload_has_no_code() {
        assert_eq!(Request::parse("").code(), None);
    }

    #[test]
    fn long_first_field_has_no_code() {
        assert_eq!(Request::parse("step,1").code(), None);
    }

    #[test]
    fn fields_are_unescaped() {
        let payload = format!("A,system.device.name,{}", escape("x,y", FIELD_DELIMITER));
        let request = Request::parse(&payload);
        assert_eq!(request.field_count(), 3);
        assert_eq!(request.field(2), Some("x,y"));
    }

    #[test]
    fn fields_from_past_end_is_empty() {
        assert!(Request::parse("n").fields_from(7).is_empty());
    }
}
