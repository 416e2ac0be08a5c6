//! Contract dispatch convention
//!
//! A contract exposes a default entry point plus named methods. Each method
//! is registered with a declarative [`MethodDescriptor`] carrying its name,
//! arity and mutation flag. The flag is advisory metadata for the host; the
//! core never blocks a read-only method from writing state.
//!
//! # Calling convention
//!
//! ```text
//! CallEntry ("transfer(\"a\", \"b\", 5)")
//!     ↓ resolve name (empty → default__), check arity
//! ContractInstance { contract, context }
//!     ↓ Contract::call(&mut context, method, args)
//! Invocation { descriptor, return_value }
//! ```

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::value::Value;
use crate::{Error, Result};

/// Name of the entry point used when the caller selects no method
pub const DEFAULT_ENTRY: &str = "default__";

// ── Method Descriptors ────────────────────────────────────

/// Declarative metadata registered alongside each contract method
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    /// `true` for methods classified as state-mutating ("write")
    pub mutates: bool,
    /// Exact number of positional arguments
    pub arity: usize,
}

impl MethodDescriptor {
    pub fn read(name: impl Into<String>, arity: usize) -> Self {
        MethodDescriptor {
            name: name.into(),
            mutates: false,
            arity,
        }
    }

    pub fn write(name: impl Into<String>, arity: usize) -> Self {
        MethodDescriptor {
            name: name.into(),
            mutates: true,
            arity,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_ENTRY
    }
}

// ── Contract Trait ────────────────────────────────────────

/// A unit of logic exposing named entry points over an execution context
pub trait Contract {
    /// Contract name used in errors and run outcomes
    fn name(&self) -> &str;

    /// Descriptors for every callable entry, default entry included
    fn methods(&self) -> Vec<MethodDescriptor>;

    /// Run `method` against `ctx`
    fn call(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>>;
}

/// Signature of a method registered in a [`MethodTable`]
pub type Handler<C> = fn(&mut C, &mut ExecutionContext<'_>, &[Value]) -> Result<Option<Value>>;

struct MethodEntry<C> {
    descriptor: MethodDescriptor,
    handler: Handler<C>,
}

/// Registry pairing each descriptor with its handler
///
/// Contracts build one of these and forward [`Contract::methods`] and
/// [`Contract::call`] to it.
pub struct MethodTable<C> {
    contract: String,
    entries: IndexMap<String, MethodEntry<C>>,
}

impl<C> MethodTable<C> {
    pub fn new(contract: impl Into<String>) -> Self {
        MethodTable {
            contract: contract.into(),
            entries: IndexMap::new(),
        }
    }

    /// Register the zero-argument default entry point
    pub fn default_entry(self, mutates: bool, handler: Handler<C>) -> Self {
        let descriptor = MethodDescriptor {
            name: DEFAULT_ENTRY.to_string(),
            mutates,
            arity: 0,
        };
        self.method(descriptor, handler)
    }

    /// Register a named method; a later registration replaces an earlier one
    pub fn method(mut self, descriptor: MethodDescriptor, handler: Handler<C>) -> Self {
        self.entries.insert(
            descriptor.name.clone(),
            MethodEntry {
                descriptor,
                handler,
            },
        );
        self
    }

    pub fn descriptors(&self) -> Vec<MethodDescriptor> {
        self.entries.values().map(|e| e.descriptor.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    /// Run the handler registered for `method`, checking arity first
    pub fn dispatch(
        &self,
        contract: &mut C,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let entry = self.entries.get(method).ok_or_else(|| Error::UnknownMethod {
            contract: self.contract.clone(),
            method: method.to_string(),
        })?;
        if entry.descriptor.arity != args.len() {
            return Err(Error::ArityMismatch {
                method: method.to_string(),
                expected: entry.descriptor.arity,
                found: args.len(),
            });
        }
        (entry.handler)(contract, ctx, args)
    }
}

// ── Call Entry ────────────────────────────────────────────

/// The host's selection of which method to invoke and with what arguments
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallEntry {
    /// `None` or empty selects the default entry point
    pub method: Option<String>,
    pub args: Vec<Value>,
}

impl CallEntry {
    pub fn default_entry() -> Self {
        CallEntry::default()
    }

    pub fn method(name: impl Into<String>, args: Vec<Value>) -> Self {
        CallEntry {
            method: Some(name.into()),
            args,
        }
    }

    /// Parse a call string of the form `name(arg, ...)`.
    ///
    /// Arguments are JSON literals. An empty string selects the default
    /// entry and a bare `name` is a call without arguments.
    pub fn parse(call: &str) -> Result<Self> {
        let trimmed = call.trim();
        if trimmed.is_empty() {
            return Ok(CallEntry::default_entry());
        }

        let invalid = |reason: &str| Error::InvalidCallString {
            call: call.to_string(),
            reason: reason.to_string(),
        };

        let (name, args) = match trimmed.find('(') {
            Some(open) => {
                let inner = trimmed[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing closing parenthesis"))?;
                (trimmed[..open].trim(), inner)
            }
            None => (trimmed, ""),
        };

        if !is_identifier(name) {
            return Err(invalid("method name must be an identifier"));
        }

        let parsed: serde_json::Value = serde_json::from_str(&format!("[{}]", args))
            .map_err(|e| invalid(&format!("arguments are not JSON literals: {}", e)))?;
        let args = match parsed {
            serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
            _ => return Err(invalid("arguments are not a list")),
        };

        Ok(CallEntry::method(name, args))
    }

    /// Name of the method this entry resolves to
    pub fn method_name(&self) -> &str {
        match self.method.as_deref() {
            None | Some("") => DEFAULT_ENTRY,
            Some(name) => name,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Contract Instance ─────────────────────────────────────

/// Result of invoking one entry point
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub descriptor: MethodDescriptor,
    pub return_value: Option<Value>,
}

/// A contract bound to the one execution context it will run against
pub struct ContractInstance<'c, 'p> {
    contract: &'c mut dyn Contract,
    context: ExecutionContext<'p>,
}

impl<'c, 'p> ContractInstance<'c, 'p> {
    pub fn new(contract: &'c mut dyn Contract, context: ExecutionContext<'p>) -> Self {
        ContractInstance { contract, context }
    }

    /// Resolve the descriptor `entry` selects, checking arity
    pub fn resolve(&self, entry: &CallEntry) -> Result<MethodDescriptor> {
        let name = entry.method_name();
        let descriptor = self
            .contract
            .methods()
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::UnknownMethod {
                contract: self.contract.name().to_string(),
                method: name.to_string(),
            })?;

        if descriptor.arity != entry.args.len() {
            return Err(Error::ArityMismatch {
                method: descriptor.name,
                expected: descriptor.arity,
                found: entry.args.len(),
            });
        }
        Ok(descriptor)
    }

    /// Invoke the selected entry point against the bound context
    pub fn invoke(&mut self, entry: &CallEntry) -> Result<Invocation> {
        let descriptor = self.resolve(entry)?;
        let return_value = self
            .contract
            .call(&mut self.context, &descriptor.name, &entry.args)?;
        Ok(Invocation {
            descriptor,
            return_value,
        })
    }

    pub fn contract_name(&self) -> &str {
        self.contract.name()
    }

    pub fn context(&self) -> &ExecutionContext<'p> {
        &self.context
    }

    pub fn into_context(self) -> ExecutionContext<'p> {
        self.context
    }
}

/// Contract-level assertion: fails with [`Error::ContractError`] when
/// `condition` is false
pub fn should(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::ContractError(message.into()))
    }
}
