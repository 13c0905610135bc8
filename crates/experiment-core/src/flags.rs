//! Flag registry
//!
//! Config sources declare typed flags into a [`FlagRegistry`], which then
//! parses `--name=value` tokens out of an argument list and hands back the
//! unrecognized remainder. The registry is an explicit value owned by the
//! caller; one registry holds one active experiment configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{FlagSet, FlagValue};

/// Prefix marking a command-line token as a flag
pub const FLAG_MARKER: &str = "--";

/// Value type of a declared flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Arbitrary JSON (arrays, objects)
    Json,
}

impl FlagKind {
    /// Infer the kind from a default value
    pub fn infer(value: &FlagValue) -> Self {
        match value {
            FlagValue::Bool(_) => FlagKind::Boolean,
            FlagValue::Number(n) if n.is_i64() || n.is_u64() => FlagKind::Integer,
            FlagValue::Number(_) => FlagKind::Float,
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Null | FlagValue::Array(_) | FlagValue::Object(_) => FlagKind::Json,
        }
    }

    /// Convert a raw command-line value into a typed flag value
    pub fn coerce(&self, name: &str, raw: &str) -> Result<FlagValue> {
        let invalid = |reason: &str| Error::parse(format!("--{}={}", name, raw), reason);

        match self {
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FlagValue::from)
                .map_err(|_| invalid("expected an integer")),
            FlagKind::Float => {
                let parsed = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid("expected a number"))?;
                serde_json::Number::from_f64(parsed)
                    .map(FlagValue::Number)
                    .ok_or_else(|| invalid("expected a finite number"))
            }
            FlagKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "t" | "y" => Ok(FlagValue::Bool(true)),
                "false" | "0" | "no" | "f" | "n" => Ok(FlagValue::Bool(false)),
                _ => Err(invalid("expected a boolean")),
            },
            FlagKind::Json => serde_json::from_str(raw).map_err(|_| invalid("expected JSON")),
        }
    }
}

/// Declaration of a single flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSpec {
    /// Flag name, without the leading `--`
    pub name: String,

    /// Value type
    pub kind: FlagKind,

    /// Value used until the flag is parsed or restored
    pub default: FlagValue,

    /// Help text
    pub help: String,
}

impl FlagSpec {
    pub fn new(
        name: impl Into<String>,
        kind: FlagKind,
        default: FlagValue,
        help: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            help: help.into(),
        }
    }

    pub fn string(name: impl Into<String>, default: &str, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::String, FlagValue::from(default), help)
    }

    pub fn integer(name: impl Into<String>, default: i64, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Integer, FlagValue::from(default), help)
    }

    pub fn float(name: impl Into<String>, default: f64, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Float, FlagValue::from(default), help)
    }

    pub fn boolean(name: impl Into<String>, default: bool, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Boolean, FlagValue::from(default), help)
    }

    pub fn json(name: impl Into<String>, default: FlagValue, help: impl Into<String>) -> Self {
        Self::new(name, FlagKind::Json, default, help)
    }
}

/// Store of declared flags and their active values
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    specs: BTreeMap<String, FlagSpec>,
    values: FlagSet,
    parsed: bool,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a flag. Redeclaring with the same kind is a no-op.
    pub fn declare(&mut self, spec: FlagSpec) -> Result<()> {
        if let Some(existing) = self.specs.get(&spec.name) {
            if existing.kind != spec.kind {
                return Err(Error::registry(format!(
                    "flag '{}' already declared as {:?}, cannot redeclare as {:?}",
                    spec.name, existing.kind, spec.kind
                )));
            }
            debug!(flag = %spec.name, "Flag already declared");
            return Ok(());
        }

        self.values
            .entry(spec.name.clone())
            .or_insert_with(|| spec.default.clone());
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Declare every flag in `specs`
    pub fn declare_all(&mut self, specs: impl IntoIterator<Item = FlagSpec>) -> Result<()> {
        for spec in specs {
            self.declare(spec)?;
        }
        Ok(())
    }

    /// Look up a flag declaration
    pub fn spec(&self, name: &str) -> Option<&FlagSpec> {
        self.specs.get(name)
    }

    /// Active value of a flag
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }

    /// Snapshot of all active values
    pub fn values(&self) -> FlagSet {
        self.values.clone()
    }

    /// True once `parse_args` or `restore` has run
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// Replace the active values wholesale and mark the registry as parsed
    pub fn restore(&mut self, flags: FlagSet) {
        debug!(count = flags.len(), "Restoring flags");
        self.values = flags;
        self.parsed = true;
    }

    /// Parse recognized flags out of `args`, returning the remainder.
    ///
    /// Accepts `--name=value`, `--name value`, and for booleans `--name` and
    /// `--noname`. A bare `--` ends flag parsing; everything after it is
    /// returned untouched.
    pub fn parse_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<Vec<String>> {
        let mut remainder = Vec::new();
        let mut tokens = args.iter().map(|a| a.as_ref());

        while let Some(token) = tokens.next() {
            if token == FLAG_MARKER {
                remainder.extend(tokens.by_ref().map(str::to_string));
                break;
            }

            let Some(body) = token.strip_prefix(FLAG_MARKER) else {
                remainder.push(token.to_string());
                continue;
            };

            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            if let Some(spec) = self.specs.get(name) {
                let value = match (inline, spec.kind) {
                    (Some(raw), kind) => kind.coerce(name, raw)?,
                    (None, FlagKind::Boolean) => FlagValue::Bool(true),
                    (None, kind) => {
                        let raw = tokens.next().ok_or_else(|| {
                            Error::registry(format!("flag '--{}' expects a value", name))
                        })?;
                        kind.coerce(name, raw)?
                    }
                };
                self.values.insert(name.to_string(), value);
                continue;
            }

            let negated = name
                .strip_prefix("no")
                .filter(|base| inline.is_none() && self.is_boolean(base));
            match negated {
                Some(base) => {
                    self.values.insert(base.to_string(), FlagValue::Bool(false));
                }
                None => remainder.push(token.to_string()),
            }
        }

        self.parsed = true;
        Ok(remainder)
    }

    fn is_boolean(&self, name: &str) -> bool {
        self.specs
            .get(name)
            .is_some_and(|spec| spec.kind == FlagKind::Boolean)
    }

    /// Sorted flag listing between `=` rulers
    pub fn format_flags(&self) -> String {
        let ruler = "=".repeat(60);
        let mut lines = vec!["Flags:".to_string(), ruler.clone()];
        lines.extend(
            self.values
                .iter()
                .map(|(name, value)| format!("\t{}: {}", name, render_value(value))),
        );
        lines.push(ruler);
        format!("{}\n", lines.join("\n"))
    }

    /// Log the active flags
    pub fn print_flags(&self) {
        info!("{}", self.format_flags());
    }
}

/// Overlay `restored` onto `parsed`; restored values win
pub fn merge_override(parsed: FlagSet, restored: FlagSet) -> FlagSet {
    let mut merged = parsed;
    merged.extend(restored);
    merged
}

/// Fail if any residual argument still looks like a flag
pub fn assert_all_flags_parsed<S: AsRef<str>>(remainder: &[S]) -> Result<()> {
    let not_parsed: Vec<String> = remainder
        .iter()
        .map(|a| a.as_ref())
        .filter(|a| a.starts_with(FLAG_MARKER))
        .map(str::to_string)
        .collect();

    if not_parsed.is_empty() {
        Ok(())
    } else {
        Err(Error::UnparsedFlags { flags: not_parsed })
    }
}

/// Render a flag value the way it is written on a command line
pub fn render_value(value: &FlagValue) -> String {
    match value {
        FlagValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append `--name=value` tokens to an argument list
pub fn set_flags(args: &mut Vec<String>, flags: &FlagSet) {
    for (name, value) in flags {
        args.push(format!("{}{}={}", FLAG_MARKER, name, render_value(value)));
    }
}

/// Append flags only when running inside an interactive notebook.
///
/// Returns true if any flags were appended.
pub fn set_flags_if_notebook(is_notebook: bool, args: &mut Vec<String>, flags: &FlagSet) -> bool {
    if !is_notebook || flags.is_empty() {
        return false;
    }

    let lines: Vec<String> = flags
        .iter()
        .map(|(name, value)| format!(" {}{}={}", FLAG_MARKER, name, render_value(value)))
        .collect();
    info!("Setting the following flags:\n{}", lines.join("\\\n"));

    set_flags(args, flags);
    true
}
