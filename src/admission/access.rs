use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SubjectAccessReview, SubjectAccessReviewSpec, SubjectAccessReviewStatus,
};
use kube::api::{Api, PostParams};

use super::err::{AdmissionError, AdmissionResult};
use crate::apis::UserInfo;

/// Asks the apiserver whether a user may perform an action.
#[async_trait]
pub trait AccessReviewer: Send + Sync {
    async fn review(&self, review: SubjectAccessReview) -> AdmissionResult<SubjectAccessReviewStatus>;
}

/// A review of `user` getting the secret `namespace/name`.
pub fn secret_get_review(user: &UserInfo, namespace: &str, name: &str) -> SubjectAccessReview {
    SubjectAccessReview {
        spec: SubjectAccessReviewSpec {
            user: Some(user.username.clone()),
            uid: Some(user.uid.clone()).filter(|u| !u.is_empty()),
            groups: Some(user.groups.clone()),
            extra: Some(user.extra.clone()),
            resource_attributes: Some(ResourceAttributes {
                group: Some(String::new()),
                resource: Some("secrets".to_string()),
                verb: Some("get".to_string()),
                namespace: Some(namespace.to_string()),
                name: Some(name.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub struct KubeAccessReviewer {
    api: Api<SubjectAccessReview>,
}

impl KubeAccessReviewer {
    pub fn new(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl AccessReviewer for KubeAccessReviewer {
    async fn review(&self, review: SubjectAccessReview) -> AdmissionResult<SubjectAccessReviewStatus> {
        let created = self.api.create(&PostParams::default(), &review).await?;
        created
            .status
            .ok_or_else(|| AdmissionError::Internal("SubjectAccessReview returned no status".to_string()))
    }
}

/// Answers every review the same way and remembers what it was asked.
pub struct FakeAccessReviewer {
    answer: Result<SubjectAccessReviewStatus, String>,
    reviews: Mutex<Vec<SubjectAccessReview>>,
}

impl FakeAccessReviewer {
    pub fn allowing() -> Self {
        Self::answering(Ok(SubjectAccessReviewStatus {
            allowed: true,
            ..Default::default()
        }))
    }

    pub fn denying(reason: &str) -> Self {
        Self::answering(Ok(SubjectAccessReviewStatus {
            allowed: false,
            reason: Some(reason.to_string()),
            ..Default::default()
        }))
    }

    pub fn failing(message: &str) -> Self {
        Self::answering(Err(message.to_string()))
    }

    fn answering(answer: Result<SubjectAccessReviewStatus, String>) -> Self {
        Self {
            answer,
            reviews: Mutex::new(Vec::new()),
        }
    }

    pub fn reviews(&self) -> Vec<SubjectAccessReview> {
        self.reviews.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AccessReviewer for FakeAccessReviewer {
    async fn review(&self, review: SubjectAccessReview) -> AdmissionResult<SubjectAccessReviewStatus> {
        if let Ok(mut reviews) = self.reviews.lock() {
            reviews.push(review);
        }
        self.answer.clone().map_err(AdmissionError::Internal)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_secret_get_review() {
        let user = UserInfo {
            username: "alice".to_string(),
            groups: vec!["devs".to_string()],
            ..Default::default()
        };
        let review = secret_get_review(&user, "ns", "creds");
        assert_eq!(review.spec.user.as_deref(), Some("alice"));
        assert_eq!(review.spec.uid, None);
        let attrs = review.spec.resource_attributes.unwrap();
        assert_eq!(attrs.verb.as_deref(), Some("get"));
        assert_eq!(attrs.resource.as_deref(), Some("secrets"));
        assert_eq!(attrs.namespace.as_deref(), Some("ns"));
        assert_eq!(attrs.name.as_deref(), Some("creds"));
    }
}
