//! The admission webhook the apiserver calls for every write to a catalog resource.
//!
//! `/mutate` runs the mutating admission plugins and then the resource's REST strategy
//! `prepare_for_*`, answering with a JSON patch. `/validate` runs the strategy validation
//! and then the validating plugins.

mod err;

pub use err::*;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError};
use kube::core::DynamicObject;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::admission::{Attributes, Chain, Operation};
use crate::client::Informers;
use crate::registry::{Registry, RequestContext};
use crate::validation::aggregate;

#[derive(Clone)]
pub struct WebhookState {
    registry: Arc<Registry>,
    chain: Chain,
    informers: Option<Informers>,
}

impl WebhookState {
    /// `informers` backs `/readyz`; without them the webhook reports ready immediately.
    pub fn new(registry: Registry, chain: Chain, informers: Option<Informers>) -> Self {
        Self {
            registry: Arc::new(registry),
            chain,
            informers,
        }
    }

    /// Admits the request and returns the object as it should be persisted, if it changed.
    pub async fn mutate(&self, attrs: &mut Attributes) -> Result<Option<json_patch::Patch>, WebhookError> {
        let original = attrs.object.clone();
        self.chain.admit(attrs).await?;

        if let Some(strategy) = self.registry.get(&attrs.resource, &attrs.subresource) {
            let ctx = RequestContext::with_user(attrs.user.clone());
            let prepared = match attrs.operation {
                Operation::Create => Some(strategy.prepare_for_create(&ctx, require(attrs, Object)?)?),
                Operation::Update => Some(strategy.prepare_for_update(
                    &ctx,
                    require(attrs, Object)?,
                    require(attrs, OldObject)?,
                )?),
                Operation::Delete | Operation::Connect => None,
            };
            if let Some(prepared) = prepared {
                attrs.object = Some(prepared);
            }
        }

        let (Some(original), Some(mutated)) = (original, attrs.object.as_ref()) else {
            return Ok(None);
        };
        let patch = json_patch::diff(&original, mutated);
        Ok((!patch.0.is_empty()).then_some(patch))
    }

    /// Rejects invalid objects, then asks the validating plugins.
    pub async fn validate(&self, attrs: &Attributes) -> Result<(), WebhookError> {
        if let Some(strategy) = self.registry.get(&attrs.resource, &attrs.subresource) {
            let errs = match attrs.operation {
                Operation::Create => strategy.validate(require(attrs, Object)?)?,
                Operation::Update => {
                    strategy.validate_update(require(attrs, Object)?, require(attrs, OldObject)?)?
                }
                Operation::Delete | Operation::Connect => vec![],
            };
            if !errs.is_empty() {
                return Err(WebhookError::Invalid(format!(
                    "{} \"{}\" is invalid: {}",
                    attrs.kind,
                    attrs.name,
                    aggregate(&errs)
                )));
            }
        }
        self.chain.validate(attrs).await?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Field {
    Object,
    OldObject,
}
use Field::*;

fn require(attrs: &Attributes, field: Field) -> Result<&Value, WebhookError> {
    let (value, name) = match field {
        Object => (attrs.object.as_ref(), "object"),
        OldObject => (attrs.old_object.as_ref(), "oldObject"),
    };
    value.ok_or_else(|| WebhookError::MissingObject {
        operation: attrs.operation.to_string(),
        resource: attrs.resource.clone(),
        field: name,
    })
}

fn deny(res: AdmissionResponse, err: &WebhookError) -> AdmissionResponse {
    let mut res = res.deny(err.to_string());
    res.result.code = err.code();
    res
}

/// Converts a review into its request, or answers it straight away when it is malformed.
fn into_request(
    review: AdmissionReview<DynamicObject>,
) -> Result<(AdmissionRequest<DynamicObject>, Attributes), AdmissionResponse> {
    let req: AdmissionRequest<DynamicObject> = review.try_into().map_err(|e: ConvertAdmissionReviewError| {
        error!("invalid request: {e}");
        AdmissionResponse::invalid(e.to_string())
    })?;
    let attrs = Attributes::try_from(&req).map_err(|e| {
        error!("invalid request: {e}");
        AdmissionResponse::invalid(e.to_string())
    })?;
    Ok((req, attrs))
}

pub async fn review_mutate(state: &WebhookState, review: AdmissionReview<DynamicObject>) -> AdmissionResponse {
    let (req, mut attrs) = match into_request(review) {
        Ok(parts) => parts,
        Err(res) => return res,
    };
    let res = AdmissionResponse::from(&req);
    match state.mutate(&mut attrs).await {
        Ok(None) => {
            debug!(op = %attrs.operation, object = %attrs.object_key(), "admitted unchanged");
            res
        }
        Ok(Some(patch)) => {
            info!(op = %attrs.operation, object = %attrs.object_key(), ops = patch.0.len(), "admitted with patch");
            match res.clone().with_patch(patch) {
                Ok(res) => res,
                Err(e) => deny(res, &WebhookError::from(e)),
            }
        }
        Err(e) => {
            warn!(op = %attrs.operation, object = %attrs.object_key(), "denied: {e}");
            deny(res, &e)
        }
    }
}

pub async fn review_validate(state: &WebhookState, review: AdmissionReview<DynamicObject>) -> AdmissionResponse {
    let (req, attrs) = match into_request(review) {
        Ok(parts) => parts,
        Err(res) => return res,
    };
    let res = AdmissionResponse::from(&req);
    match state.validate(&attrs).await {
        Ok(()) => {
            debug!(op = %attrs.operation, object = %attrs.object_key(), "accepted");
            res
        }
        Err(e) => {
            warn!(op = %attrs.operation, object = %attrs.object_key(), "denied: {e}");
            deny(res, &e)
        }
    }
}

#[axum::debug_handler]
#[instrument(skip(state, review))]
async fn mutate_handler(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(review_mutate(&state, review).await.into_review())
}

#[axum::debug_handler]
#[instrument(skip(state, review))]
async fn validate_handler(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(review_validate(&state, review).await.into_review())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<WebhookState>) -> (StatusCode, String) {
    match state.informers.as_ref().map(Informers::check_synced) {
        Some(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        _ => (StatusCode::OK, "ok".to_string()),
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/mutate", post(mutate_handler))
        .route("/validate", post(validate_handler))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}
