use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of an observed variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Bool,
    Int,
    /// Enumerated type; values are stored as the ordinal of the label.
    Enum(Vec<String>),
}

impl VarType {
    /// Zero value: `false`, `0`, or the first enumerator.
    pub fn default_value(&self) -> Value {
        match self {
            VarType::Bool => Value::Bool(false),
            VarType::Int | VarType::Enum(_) => Value::Int(0),
        }
    }

    /// Parse one textual sample value.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            VarType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            VarType::Int => raw.parse().ok().map(Value::Int),
            VarType::Enum(labels) => {
                if let Some(pos) = labels.iter().position(|l| l == raw) {
                    return Some(Value::Int(pos as i64));
                }
                let ordinal: usize = raw.parse().ok()?;
                (ordinal < labels.len()).then_some(Value::Int(ordinal as i64))
            }
        }
    }

    /// Whether `value` is a member of this type.
    pub fn admits(&self, value: Value) -> bool {
        match (self, value) {
            (VarType::Bool, Value::Bool(_)) => true,
            (VarType::Int, Value::Int(_)) => true,
            (VarType::Enum(labels), Value::Int(i)) => i >= 0 && (i as usize) < labels.len(),
            _ => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            VarType::Bool => "bool".to_string(),
            VarType::Int => "int".to_string(),
            VarType::Enum(labels) => format!("enum{{{}}}", labels.join(",")),
        }
    }
}

/// Role of a variable in the contract signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
    Internal,
    Clock,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Output => "output",
            Role::Internal => "internal",
            Role::Clock => "clock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub ty: VarType,
    pub role: Role,
}

fn default_type() -> VarType {
    VarType::Int
}

impl Variable {
    pub fn new(name: &str, ty: VarType, role: Role) -> Self {
        Self {
            name: name.to_string(),
            ty,
            role,
        }
    }

    pub fn input(name: &str, ty: VarType) -> Self {
        Self::new(name, ty, Role::Input)
    }

    pub fn output(name: &str, ty: VarType) -> Self {
        Self::new(name, ty, Role::Output)
    }

    pub fn internal(name: &str, ty: VarType) -> Self {
        Self::new(name, ty, Role::Internal)
    }

    pub fn clock(name: &str) -> Self {
        Self::new(name, VarType::Int, Role::Clock)
    }

    pub fn is_clock(&self) -> bool {
        self.role == Role::Clock
    }
}

/// Declared variables of a contract, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub variables: Vec<Variable>,
}

impl Signature {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn clocks(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.is_clock())
    }

    /// Inputs, outputs and internals: everything a sample must carry.
    pub fn observed(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| !v.is_clock())
    }

    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |v| v.role == role)
    }
}

/// A committed variable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    /// Numeric view: booleans read as 0/1.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Bool(b) => b as i64,
            Value::Int(i) => i,
        }
    }

    /// Truth view: integers read as "non-zero".
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> VarType {
        VarType::Enum(vec!["red".into(), "green".into(), "blue".into()])
    }

    #[test]
    fn test_parse_bool_forms() {
        for (raw, expected) in [("true", true), ("TRUE", true), ("1", true), ("0", false), (" false ", false)] {
            assert_eq!(VarType::Bool.parse(raw), Some(Value::Bool(expected)), "{raw}");
        }
        assert_eq!(VarType::Bool.parse("yes"), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(VarType::Int.parse("-17"), Some(Value::Int(-17)));
        assert_eq!(VarType::Int.parse("1.5"), None);
    }

    #[test]
    fn test_parse_enum_by_label_or_ordinal() {
        assert_eq!(colors().parse("green"), Some(Value::Int(1)));
        assert_eq!(colors().parse("2"), Some(Value::Int(2)));
        assert_eq!(colors().parse("3"), None);
        assert_eq!(colors().parse("purple"), None);
    }

    #[test]
    fn test_admits() {
        assert!(colors().admits(Value::Int(0)));
        assert!(!colors().admits(Value::Int(3)));
        assert!(!colors().admits(Value::Bool(true)));
        assert!(!VarType::Bool.admits(Value::Int(1)));
    }

    #[test]
    fn test_value_views() {
        assert_eq!(Value::Bool(true).as_int(), 1);
        assert!(Value::Int(-3).as_bool());
        assert!(!Value::Int(0).as_bool());
    }

    #[test]
    fn test_signature_partitions() {
        let sig = Signature::new(vec![
            Variable::input("x", VarType::Int),
            Variable::output("p", VarType::Bool),
            Variable::clock("c"),
        ]);
        assert_eq!(sig.clocks().count(), 1);
        assert_eq!(sig.observed().count(), 2);
        assert_eq!(sig.with_role(Role::Output).next().map(|v| v.name.as_str()), Some("p"));
    }

    #[test]
    fn test_type_serde_forms() {
        let v: Variable =
            serde_json::from_str(r#"{"name":"m","type":{"enum":["a","b"]},"role":"internal"}"#).unwrap();
        assert_eq!(v.ty, VarType::Enum(vec!["a".into(), "b".into()]));
        let c: Variable = serde_json::from_str(r#"{"name":"c","role":"clock"}"#).unwrap();
        assert!(c.is_clock());
    }
}
