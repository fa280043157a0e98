use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use super::access::AccessReviewer;
use super::attributes::Attributes;
use super::err::{AdmissionError, AdmissionResult};
use super::interfaces::{MutationInterface, ValidationInterface};
use crate::client::Informers;

/// What a plugin factory gets to build its plugin from.
#[derive(Clone)]
pub struct PluginContext {
    pub informers: Informers,
    pub access_reviewer: Arc<dyn AccessReviewer>,
}

pub enum Plugin {
    Mutating(Arc<dyn MutationInterface>),
    Validating(Arc<dyn ValidationInterface>),
}

pub type Factory = Box<dyn Fn(&PluginContext) -> AdmissionResult<Plugin> + Send + Sync>;

/// Admission plugins by registered name.
#[derive(Default)]
pub struct Plugins {
    factories: BTreeMap<String, Factory>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, factory: Factory) -> AdmissionResult<()> {
        if self.factories.contains_key(name) {
            return Err(AdmissionError::DuplicatePlugin(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn registered(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Builds the chain of the named plugins, in the given order.
    pub fn new_chain(&self, names: &[String], ctx: &PluginContext) -> AdmissionResult<Chain> {
        let mut chain = Chain::default();
        for name in names {
            let factory = self
                .factories
                .get(name)
                .ok_or_else(|| AdmissionError::UnknownPlugin(name.clone()))?;
            match factory(ctx)? {
                Plugin::Mutating(plugin) => chain.mutating.push(plugin),
                Plugin::Validating(plugin) => chain.validating.push(plugin),
            }
        }
        info!(plugins = %names.iter().join(","), "admission chain built");
        Ok(chain)
    }
}

/// Runs mutating plugins on admit and validating plugins on validate, stopping at the
/// first denial.
#[derive(Default, Clone)]
pub struct Chain {
    mutating: Vec<Arc<dyn MutationInterface>>,
    validating: Vec<Arc<dyn ValidationInterface>>,
}

impl Chain {
    pub async fn admit(&self, attrs: &mut Attributes) -> AdmissionResult<()> {
        for plugin in &self.mutating {
            if plugin.handles(attrs.operation) {
                debug!(plugin = plugin.name(), object = %attrs.object_key(), "admit");
                plugin.admit(attrs).await?;
            }
        }
        Ok(())
    }

    pub async fn validate(&self, attrs: &Attributes) -> AdmissionResult<()> {
        for plugin in &self.validating {
            if plugin.handles(attrs.operation) {
                debug!(plugin = plugin.name(), object = %attrs.object_key(), "validate");
                plugin.validate(attrs).await?;
            }
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.mutating
            .iter()
            .map(|p| p.name())
            .chain(self.validating.iter().map(|p| p.name()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::admission::test_utils::{test_context, AttributesBuilder};
    use crate::admission::{Interface, Operation};

    struct Counting {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        deny: bool,
    }

    impl Interface for Counting {
        fn name(&self) -> &'static str {
            self.name
        }
        fn handles(&self, operation: Operation) -> bool {
            operation == Operation::Create
        }
    }

    #[async_trait]
    impl ValidationInterface for Counting {
        async fn validate(&self, _attrs: &Attributes) -> AdmissionResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                return Err(AdmissionError::Forbidden(format!("denied by {}", self.name)));
            }
            Ok(())
        }
    }

    fn counting(name: &'static str, calls: &Arc<AtomicUsize>, deny: bool) -> Factory {
        let calls = calls.clone();
        Box::new(move |_: &PluginContext| {
            Ok(Plugin::Validating(Arc::new(Counting {
                name,
                calls: calls.clone(),
                deny,
            })))
        })
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_denial() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugins = Plugins::new();
        plugins.register("Allow", counting("Allow", &calls, false)).unwrap();
        plugins.register("Deny", counting("Deny", &calls, true)).unwrap();
        plugins.register("Never", counting("Never", &calls, false)).unwrap();
        assert_eq!(plugins.registered(), vec!["Allow", "Deny", "Never"]);

        let names = ["Allow", "Deny", "Never"].map(String::from);
        let chain = plugins.new_chain(&names, &test_context()).unwrap();
        assert_eq!(chain.names(), vec!["Allow", "Deny", "Never"]);

        let err = chain
            .validate(&AttributesBuilder::create("servicebindings", "ns", "b").build())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "denied by Deny");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Plugins skip operations they do not handle.
        chain
            .validate(&AttributesBuilder::delete("servicebindings", "ns", "b").build())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_registration_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugins = Plugins::new();
        plugins.register("A", counting("A", &calls, false)).unwrap();
        assert!(matches!(
            plugins.register("A", counting("A", &calls, false)),
            Err(AdmissionError::DuplicatePlugin(_))
        ));
        assert!(matches!(
            plugins.new_chain(&["B".to_string()], &test_context()),
            Err(AdmissionError::UnknownPlugin(name)) if name == "B"
        ));
    }
}
