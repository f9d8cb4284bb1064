//! Core data types for register values and the cells that reference them.
//!
//! Key types:
//! - [`Value`]: A typed register value (integer, float or text)
//! - [`Registers`]: Device-owned value store, shared behind one mutex
//! - [`Cell`]: Typed reference into [`Registers`] used by command and push tables

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Closed set of value kinds a register can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
}

/// Runtime register values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Parse a command argument according to `kind`
    ///
    /// - Integer: optional sign, decimal or `0x`-prefixed hexadecimal
    /// - Float: decimal number, must be finite
    /// - Text: copied verbatim
    pub fn parse(kind: ValueKind, text: &str) -> Result<Value> {
        match kind {
            ValueKind::Integer => parse_integer(text).map(Value::Integer),
            ValueKind::Float => parse_float(text).map(Value::Float),
            ValueKind::Text => Ok(Value::Text(text.to_string())),
        }
    }

    /// Integer payload, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload, if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Wire formatting: integers base-10, floats one decimal place, text verbatim
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.1}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Parse a finite decimal number
pub fn parse_float(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::InvalidArgument(format!(
            "'{}' is not a number",
            trimmed
        ))),
    }
}

/// Parse an integer with optional sign, decimal or `0x` hexadecimal
pub fn parse_integer(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let invalid = || Error::InvalidArgument(format!("'{}' is not an integer", trimmed));

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    // from_str_radix accepts its own sign; only one is allowed
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| invalid())?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Typed reference into [`Registers`]
///
/// A cell never owns its value; the device owns the register store and the
/// cell names the slot and the kind it must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub key: String,
    pub kind: ValueKind,
}

impl Cell {
    pub fn new(key: &str, kind: ValueKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
        }
    }

    pub fn integer(key: &str) -> Self {
        Self::new(key, ValueKind::Integer)
    }

    pub fn float(key: &str) -> Self {
        Self::new(key, ValueKind::Float)
    }

    pub fn text(key: &str) -> Self {
        Self::new(key, ValueKind::Text)
    }
}

/// Device-owned register store
#[derive(Debug, Clone, Default)]
pub struct Registers {
    values: HashMap<String, Value>,
}

/// Register store shared between the device and the transport threads
pub type SharedRegisters = Arc<Mutex<Registers>>;

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into the shared form handed to the transport
    pub fn into_shared(self) -> SharedRegisters {
        Arc::new(Mutex::new(self))
    }

    /// Create a register (or replace its value and kind)
    pub fn define(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Overwrite an existing register, keeping its kind
    #[inline]
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let slot = self
            .values
            .get_mut(key)
            .ok_or_else(|| Error::UnknownRegister(key.to_string()))?;
        if slot.kind() != value.kind() {
            return Err(Error::InvalidArgument(format!(
                "register '{}' holds {:?}, not {:?}",
                key,
                slot.kind(),
                value.kind()
            )));
        }
        *slot = value;
        Ok(())
    }

    /// Read the value a cell refers to, checking its kind
    pub fn read(&self, cell: &Cell) -> Result<&Value> {
        let value = self
            .values
            .get(&cell.key)
            .ok_or_else(|| Error::UnknownRegister(cell.key.clone()))?;
        if value.kind() != cell.kind {
            return Err(Error::InvalidArgument(format!(
                "register '{}' holds {:?}, cell expects {:?}",
                cell.key,
                value.kind(),
                cell.kind
            )));
        }
        Ok(value)
    }

    /// Parse `argument` for the cell's kind and store it
    pub fn write(&mut self, cell: &Cell, argument: &str) -> Result<()> {
        let value = Value::parse(cell.kind, argument)?;
        self.set(&cell.key, value)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_integer)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integer_parsing() {
        assert_eq!(Value::parse(ValueKind::Integer, "42").unwrap(), Value::Integer(42));
        assert_eq!(Value::parse(ValueKind::Integer, " -7 ").unwrap(), Value::Integer(-7));
        assert_eq!(Value::parse(ValueKind::Integer, "+3").unwrap(), Value::Integer(3));
        assert_eq!(Value::parse(ValueKind::Integer, "0x1F").unwrap(), Value::Integer(31));
        assert_eq!(Value::parse(ValueKind::Integer, "0XfF").unwrap(), Value::Integer(255));
        assert_eq!(Value::parse(ValueKind::Integer, "-0x10").unwrap(), Value::Integer(-16));
    }

    #[test]
    fn test_integer_parse_rejects_garbage() {
        for bad in ["", "abc", "12abc", "0x", "--5", "+-5", "1.5"] {
            assert!(
                matches!(
                    Value::parse(ValueKind::Integer, bad),
                    Err(Error::InvalidArgument(_))
                ),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_float_parsing() {
        let v = Value::parse(ValueKind::Float, "12.34").unwrap();
        assert_relative_eq!(v.as_float().unwrap(), 12.34);
        assert!(Value::parse(ValueKind::Float, "wet").is_err());
        assert!(Value::parse(ValueKind::Float, "inf").is_err());
        assert!(Value::parse(ValueKind::Float, "NaN").is_err());
    }

    #[test]
    fn test_text_is_verbatim() {
        let v = Value::parse(ValueKind::Text, " SOS now ").unwrap();
        assert_eq!(v.as_text(), Some(" SOS now "));
    }

    #[test]
    fn test_formatting_per_kind() {
        assert_eq!(Value::Integer(-12).to_string(), "-12");
        assert_eq!(Value::Float(71.26).to_string(), "71.3");
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Text("on".into()).to_string(), "on");
    }

    #[test]
    fn test_register_write_and_read_back() {
        let mut regs = Registers::new();
        regs.define("temp_alarm", Value::Integer(0));

        let cell = Cell::integer("temp_alarm");
        regs.write(&cell, "0x50").unwrap();
        assert_eq!(regs.read(&cell).unwrap(), &Value::Integer(80));
        assert_eq!(regs.integer("temp_alarm"), Some(80));
    }

    #[test]
    fn test_failed_write_keeps_old_value() {
        let mut regs = Registers::new();
        regs.define("distance_alarm", Value::Integer(6));

        let cell = Cell::integer("distance_alarm");
        assert!(regs.write(&cell, "high").is_err());
        assert_eq!(regs.integer("distance_alarm"), Some(6));
    }

    #[test]
    fn test_unknown_register() {
        let mut regs = Registers::new();
        let cell = Cell::float("missing");
        assert!(matches!(regs.read(&cell), Err(Error::UnknownRegister(_))));
        assert!(matches!(
            regs.write(&cell, "1.0"),
            Err(Error::UnknownRegister(_))
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut regs = Registers::new();
        regs.define("beeper", Value::Text("off".into()));

        assert!(regs.read(&Cell::integer("beeper")).is_err());
        assert!(regs.set("beeper", Value::Integer(1)).is_err());
        assert_eq!(regs.text("beeper"), Some("off"));
    }
}
