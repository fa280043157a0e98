//! The built-in admission plugins, registered by name.

use std::sync::Arc;

use super::{AdmissionResult, Plugin, PluginContext, Plugins, ReadyGate};
use crate::client::Informers;

pub mod broker_auth_sar_check;
pub mod default_service_plan;
pub mod service_bindings_lifecycle;

pub use broker_auth_sar_check::BrokerAuthSarCheck;
pub use default_service_plan::DefaultServicePlan;
pub use service_bindings_lifecycle::ServiceBindingsLifecycle;

/// Plugins enabled when none are configured.
pub fn default_plugins() -> Vec<String> {
    [
        default_service_plan::PLUGIN_NAME,
        broker_auth_sar_check::PLUGIN_NAME,
        service_bindings_lifecycle::PLUGIN_NAME,
    ]
    .map(String::from)
    .to_vec()
}

fn catalog_ready(informers: &Informers) -> ReadyGate {
    let informers = informers.clone();
    ReadyGate::new(move || informers.check_synced().is_ok())
}

fn instances_ready(informers: &Informers) -> ReadyGate {
    let instances = informers.service_instances.clone();
    ReadyGate::new(move || instances.has_synced())
}

pub fn register_all(plugins: &mut Plugins) -> AdmissionResult<()> {
    plugins.register(
        default_service_plan::PLUGIN_NAME,
        Box::new(|ctx: &PluginContext| {
            Ok(Plugin::Mutating(Arc::new(DefaultServicePlan::new(
                ctx.informers.clone(),
                catalog_ready(&ctx.informers),
            ))))
        }),
    )?;
    plugins.register(
        broker_auth_sar_check::PLUGIN_NAME,
        Box::new(|ctx: &PluginContext| {
            Ok(Plugin::Validating(Arc::new(BrokerAuthSarCheck::new(
                ctx.access_reviewer.clone(),
                catalog_ready(&ctx.informers),
            ))))
        }),
    )?;
    plugins.register(
        service_bindings_lifecycle::PLUGIN_NAME,
        Box::new(|ctx: &PluginContext| {
            Ok(Plugin::Validating(Arc::new(ServiceBindingsLifecycle::new(
                ctx.informers.service_instances.clone(),
                instances_ready(&ctx.informers),
            ))))
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::admission::test_utils::test_context;

    #[test]
    fn test_register_all() {
        let mut plugins = Plugins::new();
        register_all(&mut plugins).unwrap();
        assert_eq!(
            plugins.registered(),
            vec!["BrokerAuthSarCheck", "DefaultServicePlan", "ServiceBindingsLifecycle"]
        );

        let chain = plugins.new_chain(&default_plugins(), &test_context()).unwrap();
        assert_eq!(
            chain.names(),
            vec!["DefaultServicePlan", "BrokerAuthSarCheck", "ServiceBindingsLifecycle"]
        );
        assert!(register_all(&mut plugins).is_err());
    }
}
