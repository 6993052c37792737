use crate::error::registration::RegistrationError;
use crate::service::descriptor::{MethodEntry, ServiceDescriptor};

use common::ErrorLocation;
use models::{MethodPath, RpcError};

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use log::info;

/// Registered services, keyed by service name.
///
/// Cloning is cheap; descriptors are shared. Every connection accepted by a
/// server gets its own clone.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    services: HashMap<String, Arc<ServiceDescriptor>>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyService`] if it declares no methods
    /// - [`RegistrationError::DuplicateService`] if the name is taken
    #[track_caller]
    pub fn register_service(&mut self, descriptor: ServiceDescriptor) -> Result<(), RegistrationError> {
        if descriptor.is_empty() {
            return Err(RegistrationError::EmptyService {
                service: descriptor.name().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.services.contains_key(descriptor.name()) {
            return Err(RegistrationError::DuplicateService {
                service: descriptor.name().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(
            "Registered service {} ({} methods)",
            descriptor.name(),
            descriptor.methods().count()
        );
        self.services
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// Builder-style registration.
    #[track_caller]
    pub fn with_service(mut self, descriptor: ServiceDescriptor) -> Result<Self, RegistrationError> {
        self.register_service(descriptor)?;
        Ok(self)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Resolve a qualified `service/method` name.
    ///
    /// # Errors
    ///
    /// Returns a `NOT_FOUND` [`RpcError`] for a malformed name, an unknown
    /// service, or an unknown method.
    pub fn resolve(&self, qualified: &str) -> Result<MethodEntry, RpcError> {
        let path = MethodPath::parse(qualified)
            .map_err(|_| RpcError::not_found(format!("malformed method name '{qualified}'")))?;

        let service = self
            .services
            .get(&path.service)
            .ok_or_else(|| RpcError::not_found(format!("unknown service '{}'", path.service)))?;

        service
            .method_entry(&path.method)
            .cloned()
            .ok_or_else(|| RpcError::not_found(format!("unknown method '{path}'")))
    }
}
