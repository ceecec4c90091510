//! Contract interface model and function lookup.
//!
//! The interface is operator-supplied JSON (a standard ABI array). Parsing
//! is lenient about fields the verdict pipeline never reads, and strict
//! about the shape it does read: a sequence of descriptor objects whose
//! parameters each carry a `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A single parameter of a contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Declared parameter name (may be empty)
    #[serde(default)]
    pub name: String,
    /// Solidity type string, e.g. `uint256`, `bool`, `string`, `address`
    #[serde(rename = "type")]
    pub ty: String,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn is_uint(&self) -> bool {
        self.ty.starts_with("uint")
    }

    pub fn is_bool(&self) -> bool {
        self.ty == "bool"
    }

    pub fn is_string(&self) -> bool {
        self.ty == "string"
    }

    pub fn is_address(&self) -> bool {
        self.ty == "address"
    }

    /// Case-insensitive substring match of the declared name against any token.
    pub fn name_contains_any(&self, tokens: &[&str]) -> bool {
        let lowered = self.name.to_lowercase();
        tokens.iter().any(|token| lowered.contains(token))
    }
}

/// One entry of a contract interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Entry kind (`function`, `event`, `error`, ...)
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// `pure`, `view`, `nonpayable` or `payable`
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
    /// Declared inputs; `None` when the entry has no `inputs` field at all
    #[serde(default)]
    pub inputs: Option<Vec<ParamDescriptor>>,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

impl FunctionDescriptor {
    /// Build a callable, state-changing function descriptor.
    pub fn function(name: impl Into<String>, inputs: Vec<ParamDescriptor>) -> Self {
        Self {
            kind: default_entry_kind(),
            name: name.into(),
            state_mutability: Some("nonpayable".to_string()),
            inputs: Some(inputs),
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == "function"
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.state_mutability.as_deref(), Some("view") | Some("pure"))
    }

    /// Declared parameters, empty when the entry has none.
    pub fn params(&self) -> &[ParamDescriptor] {
        self.inputs.as_deref().unwrap_or(&[])
    }
}

/// Parsed contract interface: an ordered list of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInterface {
    entries: Vec<FunctionDescriptor>,
}

impl ContractInterface {
    pub fn new(entries: Vec<FunctionDescriptor>) -> Self {
        Self { entries }
    }

    /// Parse an interface from its JSON text.
    ///
    /// Returns `None` when the text is not JSON, not an array, or contains an
    /// element that is not a descriptor object.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            if !item.is_object() {
                debug!("ABI element is not an object: {}", item);
                return None;
            }
            match serde_json::from_value::<FunctionDescriptor>(item.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    debug!("ABI element could not be read: {}", e);
                    return None;
                }
            }
        }
        Some(Self { entries })
    }

    pub fn entries(&self) -> &[FunctionDescriptor] {
        &self.entries
    }

    /// Locate a callable function by exact name.
    ///
    /// Only `function` entries that declare a non-empty `inputs` list are
    /// candidates. Among overloads, a state-changing entry is preferred over
    /// a `view`/`pure` one.
    pub fn find_function(&self, name: &str) -> Option<&FunctionDescriptor> {
        let mut candidates = self.entries.iter().filter(|entry| {
            entry.is_function()
                && entry.name == name
                && entry.inputs.as_ref().is_some_and(|inputs| !inputs.is_empty())
        });

        let first = candidates.next()?;
        if !first.is_read_only() {
            return Some(first);
        }
        candidates.find(|entry| !entry.is_read_only()).or(Some(first))
    }
}
