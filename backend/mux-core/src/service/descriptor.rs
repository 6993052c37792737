use crate::error::registration::RegistrationError;
use crate::service::handler::{Handler, Request};
use crate::stream::{CallSink, CallStream};

use common::ErrorLocation;
use models::{CallShape, RpcError};

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;

use serde_json::Value;

/// A declared method: its call shape and the handler serving it.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub shape: CallShape,
    pub handler: Handler,
}

/// A named service and its method table.
///
/// ```ignore
/// let echo = ServiceDescriptor::new("Echo")?
///     .unary("run", |request| async move { Ok(request.payload) })?;
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    methods: HashMap<String, MethodEntry>,
}

impl ServiceDescriptor {
    #[track_caller]
    pub fn new(name: impl Into<String>) -> Result<Self, RegistrationError> {
        let name = name.into();
        validate_name(&name, "service")?;

        Ok(Self {
            name,
            methods: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> impl Iterator<Item = (&str, &MethodEntry)> {
        self.methods.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn method_entry(&self, method: &str) -> Option<&MethodEntry> {
        self.methods.get(method)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Declare `method` with an explicit shape.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::InvalidName`] for an empty name or one containing `/`
    /// - [`RegistrationError::DuplicateMethod`] if `method` is already declared
    /// - [`RegistrationError::ShapeMismatch`] if `handler` serves a different shape
    #[track_caller]
    pub fn method(
        mut self,
        method: impl Into<String>,
        shape: CallShape,
        handler: Handler,
    ) -> Result<Self, RegistrationError> {
        let method = method.into();
        validate_name(&method, "method")?;

        if handler.shape() != shape {
            return Err(RegistrationError::ShapeMismatch {
                service: self.name.clone(),
                method,
                declared: shape,
                handler: handler.shape(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.methods.contains_key(&method) {
            return Err(RegistrationError::DuplicateMethod {
                service: self.name.clone(),
                method,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.methods.insert(method, MethodEntry { shape, handler });
        Ok(self)
    }

    #[track_caller]
    pub fn unary<F, Fut>(self, method: impl Into<String>, handler: F) -> Result<Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.method(method, CallShape::Unary, Handler::unary(handler))
    }

    #[track_caller]
    pub fn server_stream<F, Fut>(
        self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(Request, CallSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send + 'static,
    {
        self.method(method, CallShape::ServerStream, Handler::server_stream(handler))
    }

    #[track_caller]
    pub fn client_stream<F, Fut>(
        self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(CallStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.method(method, CallShape::ClientStream, Handler::client_stream(handler))
    }

    #[track_caller]
    pub fn duplex<F, Fut>(self, method: impl Into<String>, handler: F) -> Result<Self, RegistrationError>
    where
        F: Fn(CallStream, CallSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send + 'static,
    {
        self.method(method, CallShape::Duplex, Handler::duplex(handler))
    }
}

#[track_caller]
fn validate_name(name: &str, what: &str) -> Result<(), RegistrationError> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(RegistrationError::InvalidName {
            message: format!("{what} name '{name}' must be non-empty and contain no '/'"),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}
