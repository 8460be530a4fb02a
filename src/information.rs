//! Externally supplied facts, such as the acting user, looked up by type and
//! tags while dispatching.
use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::argument::{value, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InformationId {
    type_id: TypeId,
    type_name: &'static str,
    tags: BTreeSet<String>,
}

impl InformationId {
    pub fn new<T: Any>(tags: &[&str]) -> InformationId {
        InformationId {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether `self`, used as a request, is answered by information
    /// identified by `other`: same type, and every requested tag present.
    pub fn accepts(&self, other: &InformationId) -> bool {
        self.type_id == other.type_id && self.tags.is_subset(&other.tags)
    }
}

impl fmt::Display for InformationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, "[{}]", tags.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Information {
    pub id: InformationId,
    pub value: Value,
    pub description: Option<String>,
}

impl Information {
    pub fn new<T: Any + Send + Sync>(tags: &[&str], v: T) -> Information {
        Information {
            id: InformationId::new::<T>(tags),
            value: value(v),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Information {
        self.description = Some(description.to_owned());
        self
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Information")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}

/// Computes information on demand. Consulted after the static information
/// of an [`InformationProviders`].
pub trait InformationProvider: Send + Sync {
    fn provide(&self, id: &InformationId, providers: &InformationProviders) -> Option<Information>;
}

impl<F> InformationProvider for F
where
    F: Fn(&InformationId, &InformationProviders) -> Option<Information> + Send + Sync,
{
    fn provide(&self, id: &InformationId, providers: &InformationProviders) -> Option<Information> {
        self(id, providers)
    }
}

/// The information visible to one dispatch call.
#[derive(Clone, Default)]
pub struct InformationProviders {
    information: Vec<Information>,
    providers: Vec<Arc<dyn InformationProvider>>,
}

impl InformationProviders {
    pub fn new() -> InformationProviders {
        InformationProviders::default()
    }

    /// Returns false if information with the same id is already registered.
    pub fn register(&mut self, information: Information) -> bool {
        if self.information.iter().any(|i| i.id == information.id) {
            return false;
        }

        self.information.push(information);
        true
    }

    pub fn register_value<T: Any + Send + Sync>(&mut self, tags: &[&str], v: T) -> bool {
        self.register(Information::new(tags, v))
    }

    pub fn unregister(&mut self, id: &InformationId) -> bool {
        let before = self.information.len();
        self.information.retain(|i| i.id != *id);
        self.information.len() != before
    }

    pub fn register_provider(&mut self, provider: Arc<dyn InformationProvider>) -> bool {
        if self.providers.iter().any(|p| Arc::ptr_eq(p, &provider)) {
            return false;
        }

        self.providers.push(provider);
        true
    }

    pub fn unregister_provider(&mut self, provider: &Arc<dyn InformationProvider>) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| !Arc::ptr_eq(p, provider));
        self.providers.len() != before
    }

    pub fn information(&self) -> &[Information] {
        &self.information
    }

    /// Static information is searched first, in registration order. Then, if
    /// `use_providers` is set, each provider is asked and the first answer
    /// wins.
    pub fn find(&self, id: &InformationId, use_providers: bool) -> Option<Information> {
        if let Some(found) = self.information.iter().find(|i| id.accepts(&i.id)) {
            return Some(found.clone());
        }

        if !use_providers {
            return None;
        }

        self.providers.iter().find_map(|p| p.provide(id, self))
    }

    /// Looks up a value of type `T` carrying all of `tags`.
    pub fn get<T: Any + Clone>(&self, tags: &[&str]) -> Option<T> {
        let found = self.find(&InformationId::new::<T>(tags), true)?;
        found.value::<T>().cloned()
    }
}

impl fmt::Debug for InformationProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InformationProviders")
            .field("information", &self.information)
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// Information a command or argument needs before its handler may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredInformation {
    pub id: InformationId,
    /// If false, only the static information of the call is searched.
    pub use_providers: bool,
}

impl RequiredInformation {
    pub fn new<T: Any>(tags: &[&str]) -> RequiredInformation {
        RequiredInformation {
            id: InformationId::new::<T>(tags),
            use_providers: true,
        }
    }

    pub fn without_providers(mut self) -> RequiredInformation {
        self.use_providers = false;
        self
    }

    pub fn is_present(&self, providers: &InformationProviders) -> bool {
        providers.find(&self.id, self.use_providers).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct User(&'static str);

    #[test]
    fn static_lookup_by_type_and_tags() {
        let mut info = InformationProviders::new();
        assert!(info.register_value(&["player", "actor"], User("alice")));
        assert!(!info.register_value(&["actor", "player"], User("bob")));

        assert_eq!(info.get::<User>(&[]), Some(User("alice")));
        assert_eq!(info.get::<User>(&["actor"]), Some(User("alice")));
        assert_eq!(info.get::<User>(&["console"]), None);
        assert_eq!(info.get::<String>(&["actor"]), None);

        assert!(info.unregister(&InformationId::new::<User>(&["player", "actor"])));
        assert_eq!(info.get::<User>(&[]), None);
    }

    #[test]
    fn providers_come_after_static_information() {
        let mut info = InformationProviders::new();
        let provider: Arc<dyn InformationProvider> =
            Arc::new(|id: &InformationId, _: &InformationProviders| {
                if id.type_id() == TypeId::of::<User>() {
                    Some(Information::new(&["computed"], User("provided")))
                } else {
                    None
                }
            });
        assert!(info.register_provider(provider.clone()));
        assert!(!info.register_provider(provider.clone()));
        assert_eq!(info.get::<User>(&["anything"]), Some(User("provided")));

        info.register_value(&["actor"], User("static"));
        assert_eq!(info.get::<User>(&["actor"]), Some(User("static")));

        let required = RequiredInformation::new::<User>(&["other"]);
        assert!(required.is_present(&info));
        assert!(!required.clone().without_providers().is_present(&info));

        assert!(info.unregister_provider(&provider));
        assert!(!required.is_present(&info));
    }

    #[test]
    fn display() {
        assert_eq!(InformationId::new::<u32>(&["b", "a"]).to_string(), "u32[a, b]");
        assert_eq!(InformationId::new::<u32>(&[]).to_string(), "u32");
    }
}
