//! Capability Registry
//!
//! Assembles a client from independently configured capability providers.
//! Each provider contributes one named capability (a set of wrapped
//! operations); composition fails fast on conflicts or missing
//! requirements instead of silently merging.

use std::collections::HashMap;

use thiserror::Error;

use crate::pipeline::WrappedOp;

// == Registry Error Enum ==
/// Composition-time and lookup errors. Library misuse, distinct from the
/// per-call `OpError`.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Two providers contributed the same capability name
    #[error("capability '{0}' provided twice")]
    DuplicateCapability(String),

    /// One provider contributed the same operation name twice
    #[error("operation '{capability}.{operation}' provided twice")]
    DuplicateOperation {
        capability: String,
        operation: String,
    },

    /// A required capability was never provided
    #[error("required capability '{0}' missing")]
    MissingCapability(String),

    /// Lookup of a capability that does not exist
    #[error("unknown capability '{0}'")]
    UnknownCapability(String),

    /// Lookup of an operation that does not exist
    #[error("unknown operation '{capability}.{operation}'")]
    UnknownOperation {
        capability: String,
        operation: String,
    },
}

// == Capability ==
/// A named set of wrapped operations contributed by one provider.
pub struct Capability {
    name: String,
    operations: HashMap<String, WrappedOp>,
}

impl Capability {
    /// Looks up one operation.
    pub fn operation(&self, name: &str) -> Result<&WrappedOp, RegistryError> {
        self.operations
            .get(name)
            .ok_or_else(|| RegistryError::UnknownOperation {
                capability: self.name.clone(),
                operation: name.to_string(),
            })
    }

    /// Names of the operations in this capability.
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }
}

// == Client ==
/// The composed client: capability name -> capability.
pub struct Client {
    capabilities: HashMap<String, Capability>,
}

impl Client {
    /// Starts building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Looks up one capability.
    pub fn capability(&self, name: &str) -> Result<&Capability, RegistryError> {
        self.capabilities
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))
    }

    /// Looks up one operation across capabilities.
    pub fn operation(&self, capability: &str, name: &str) -> Result<&WrappedOp, RegistryError> {
        self.capability(capability)?.operation(name)
    }
}

// == Client Builder ==
/// Collects capabilities and verifies the composition at build time.
#[derive(Default)]
pub struct ClientBuilder {
    capabilities: HashMap<String, Capability>,
    required: Vec<String>,
}

impl ClientBuilder {
    // == Provide ==
    /// Registers one provider's capability.
    ///
    /// Fails immediately if the capability name is already taken or the
    /// provider lists an operation name twice.
    pub fn provide(
        mut self,
        name: impl Into<String>,
        operations: Vec<(String, WrappedOp)>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        if self.capabilities.contains_key(&name) {
            return Err(RegistryError::DuplicateCapability(name));
        }

        let mut map = HashMap::with_capacity(operations.len());
        for (op_name, op) in operations {
            if map.contains_key(&op_name) {
                return Err(RegistryError::DuplicateOperation {
                    capability: name,
                    operation: op_name,
                });
            }
            map.insert(op_name, op);
        }

        self.capabilities.insert(
            name.clone(),
            Capability {
                name,
                operations: map,
            },
        );
        Ok(self)
    }

    /// Declares a capability that must be present at build time.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    // == Build ==
    /// Verifies requirements and produces the client.
    pub fn build(self) -> Result<Client, RegistryError> {
        for name in &self.required {
            if !self.capabilities.contains_key(name) {
                return Err(RegistryError::MissingCapability(name.clone()));
            }
        }
        Ok(Client {
            capabilities: self.capabilities,
        })
    }
}
