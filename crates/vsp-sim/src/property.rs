//! Attribute implementations for components.

use std::{cell::Cell, rc::Rc};

use vsp_core::{Attribute, AttributeError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Text(String),
    Unsigned { values: Vec<u64>, size: usize },
}

/// Typed, optionally writable attribute value.
///
/// Unsigned properties hold `num` elements of `size` bytes each; their text
/// form is the elements separated by single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    value: Value,
    writable: bool,
}

impl Property {
    /// Writable text property.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Value::Text(value.into()), writable: true }
    }

    /// Writable unsigned scalar of `size` bytes (1, 2, 4 or 8).
    pub fn unsigned(name: impl Into<String>, value: u64, size: usize) -> Self {
        Self::array(name, vec![value], size)
    }

    /// Writable unsigned array of `size`-byte elements.
    pub fn array(name: impl Into<String>, values: Vec<u64>, size: usize) -> Self {
        let size = match size {
            1 | 2 | 4 | 8 => size,
            _ => 8,
        };
        let values = values.into_iter().map(|v| v & mask(size)).collect();
        Self { name: name.into(), value: Value::Unsigned { values, size }, writable: true }
    }

    /// Reject all writes.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Unsigned elements, empty for text properties.
    pub fn elements(&self) -> &[u64] {
        match &self.value {
            Value::Unsigned { values, .. } => values,
            Value::Text(_) => &[],
        }
    }
}

const fn mask(size: usize) -> u64 {
    if size >= 8 { u64::MAX } else { (1 << (size * 8)) - 1 }
}

fn parse_unsigned(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl Attribute for Property {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        match &self.value {
            Value::Text(_) => "string",
            Value::Unsigned { size: 1, .. } => "u8",
            Value::Unsigned { size: 2, .. } => "u16",
            Value::Unsigned { size: 4, .. } => "u32",
            Value::Unsigned { .. } => "u64",
        }
    }

    fn value(&self) -> String {
        match &self.value {
            Value::Text(text) => text.clone(),
            Value::Unsigned { values, .. } => {
                values.iter().map(u64::to_string).collect::<Vec<_>>().join(" ")
            },
        }
    }

    fn size(&self) -> usize {
        match &self.value {
            Value::Text(text) => text.len(),
            Value::Unsigned { size, .. } => *size,
        }
    }

    fn num(&self) -> usize {
        match &self.value {
            Value::Text(_) => 1,
            Value::Unsigned { values, .. } => values.len(),
        }
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn set_value(&mut self, text: &str) -> Result<(), AttributeError> {
        if !self.writable {
            return Err(AttributeError::ReadOnly);
        }

        let invalid =
            |reason: String| AttributeError::InvalidValue { value: text.to_string(), reason };
        match &mut self.value {
            Value::Text(current) => {
                *current = text.to_string();
                Ok(())
            },
            Value::Unsigned { values, size } => {
                let parsed = text
                    .split_whitespace()
                    .map(|field| {
                        let value = parse_unsigned(field)
                            .ok_or_else(|| invalid(format!("'{field}' is not a number")))?;
                        if value > mask(*size) {
                            return Err(invalid(format!("{value} does not fit in {size} bytes")));
                        }
                        Ok(value)
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                if parsed.len() != values.len() {
                    return Err(invalid(format!(
                        "expected {} elements, got {}",
                        values.len(),
                        parsed.len()
                    )));
                }
                *values = parsed;
                Ok(())
            },
        }
    }
}

/// Read-only counter shared between a component and its processes.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    name: String,
    count: Rc<Cell<u64>>,
}

impl Counter {
    /// Counter starting at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), count: Rc::default() }
    }

    /// Current count.
    pub fn get(&self) -> u64 {
        self.count.get()
    }

    /// Add one.
    pub fn increment(&self) {
        self.count.set(self.count.get().saturating_add(1));
    }

    /// Back to zero.
    pub fn reset(&self) {
        self.count.set(0);
    }
}

impl Attribute for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        "u64"
    }

    fn kind(&self) -> &str {
        "counter"
    }

    fn value(&self) -> String {
        self.get().to_string()
    }

    fn size(&self) -> usize {
        8
    }

    fn num(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_reports_size_and_num() {
        let reg = Property::unsigned("reg0", 7, 4);
        assert_eq!(reg.value(), "7");
        assert_eq!(reg.type_name(), "u32");
        assert_eq!((reg.size(), reg.num()), (4, 1));
    }

    #[test]
    fn set_accepts_decimal_and_hex() {
        let mut reg = Property::unsigned("reg0", 0, 4);
        reg.set_value("0x10").unwrap();
        assert_eq!(reg.value(), "16");
        reg.set_value("42").unwrap();
        assert_eq!(reg.value(), "42");
    }

    #[test]
    fn set_rejects_overflow_and_keeps_value() {
        let mut reg = Property::unsigned("reg0", 7, 1);
        let err = reg.set_value("256").unwrap_err();
        assert!(matches!(err, AttributeError::InvalidValue { .. }));
        assert_eq!(reg.value(), "7");
    }

    #[test]
    fn array_needs_every_element() {
        let mut regs = Property::array("regs", vec![1, 2, 3], 2);
        assert_eq!(regs.value(), "1 2 3");
        assert_eq!(regs.num(), 3);
        assert!(regs.set_value("4 5").is_err());
        regs.set_value("4 5 6").unwrap();
        assert_eq!(regs.elements(), [4, 5, 6]);
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut status = Property::text("status", "idle").read_only();
        assert!(!status.is_writable());
        assert_eq!(status.set_value("busy"), Err(AttributeError::ReadOnly));
        assert_eq!(status.value(), "idle");
    }

    #[test]
    fn counter_clones_share_state() {
        let counter = Counter::new("ticks");
        let handle = counter.clone();
        handle.increment();
        handle.increment();
        assert_eq!(counter.value(), "2");
        counter.reset();
        assert_eq!(handle.get(), 0);
        assert!(!counter.is_writable());
    }
}
