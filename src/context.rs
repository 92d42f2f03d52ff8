use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::error::Result;
use crate::registry::{ModalConfig, ModalRegistry, SharedModals};

type Service = Arc<dyn Any + Send + Sync>;

/// Services handed down the UI tree by reference, one per type. Clones
/// share the same services.
#[derive(Clone, Default)]
pub struct ServiceContext {
    services: Arc<Mutex<HashMap<TypeId, Service>>>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("services", &self.lock().len())
            .finish()
    }
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Service>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `service`. A type can be provided once per context.
    pub fn provide<T>(&self, service: Arc<T>) -> Result<()>
    where
        T: Send + Sync + 'static,
    {
        let mut services = self.lock();
        if services.contains_key(&TypeId::of::<T>()) {
            return Err(ContextError::AlreadyProvided(type_name::<T>()).into());
        }
        services.insert(TypeId::of::<T>(), service);
        Ok(())
    }

    pub fn get<T>(&self) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lookup(&self.lock()).ok_or_else(|| ContextError::Missing(type_name::<T>()).into())
    }
}

fn lookup<T>(services: &HashMap<TypeId, Service>) -> Option<Arc<T>>
where
    T: Send + Sync + 'static,
{
    let service = services.get(&TypeId::of::<T>())?.clone();
    service.downcast::<T>().ok()
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("`{0}` is already provided")]
    AlreadyProvided(&'static str),
    #[error("no `{0}` in context")]
    Missing(&'static str),
}

/// The context's modal registry. A default one is installed on first use
/// unless the host provided its own.
pub fn ensure_modal_registry(ctx: &ServiceContext) -> SharedModals {
    let mut services = ctx.lock();
    if let Some(registry) = lookup::<ModalRegistry>(&services) {
        return registry;
    }
    let registry = ModalRegistry::new(ModalConfig::default()).shared();
    services.insert(TypeId::of::<ModalRegistry>(), registry.clone());
    registry
}
