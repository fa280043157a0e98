use crate::apis::{ServiceBinding, ServiceBindingStatus};
use crate::validation::{self, ErrorList};

use super::checksum::update_checksum;
use super::{
    prepare_meta_for_create, reset_object_meta_for_status, update_generation, RequestContext,
    RestStrategy,
};

pub struct BindingStrategy;

impl RestStrategy for BindingStrategy {
    type Object = ServiceBinding;

    fn prepare_for_create(&self, ctx: &RequestContext, binding: &mut ServiceBinding) {
        binding.status = Some(ServiceBindingStatus::default());
        prepare_meta_for_create(&mut binding.metadata, true);

        if binding.spec.external_id.is_empty() {
            binding.spec.external_id = uuid::Uuid::new_v4().to_string();
        }
        if binding.spec.secret_name.as_deref().unwrap_or_default().is_empty() {
            binding.spec.secret_name = binding.metadata.name.clone();
        }
        binding.spec.user_info = ctx.user.clone();
    }

    // The spec is immutable, so only metadata can move here.
    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut ServiceBinding, old: &ServiceBinding) {
        new.spec = old.spec.clone();
        new.status = old.status.clone();
        update_generation(&mut new.metadata, &old.metadata, false);
    }

    fn validate(&self, binding: &ServiceBinding) -> ErrorList {
        validation::validate_service_binding(binding)
    }

    fn validate_update(&self, new: &ServiceBinding, old: &ServiceBinding) -> ErrorList {
        validation::validate_service_binding_update(new, old)
    }
}

pub struct BindingStatusStrategy;

impl RestStrategy for BindingStatusStrategy {
    type Object = ServiceBinding;

    fn prepare_for_create(&self, ctx: &RequestContext, binding: &mut ServiceBinding) {
        BindingStrategy.prepare_for_create(ctx, binding)
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut ServiceBinding, old: &ServiceBinding) {
        new.spec = old.spec.clone();
        reset_object_meta_for_status(&mut new.metadata, &old.metadata);
        update_checksum(new, old);
    }

    fn validate(&self, binding: &ServiceBinding) -> ErrorList {
        validation::validate_service_binding(binding)
    }

    fn validate_update(&self, new: &ServiceBinding, old: &ServiceBinding) -> ErrorList {
        validation::validate_service_binding_status_update(new, old)
    }
}
