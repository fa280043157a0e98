//! Spec checksums recorded in status whenever a resource becomes Ready.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::apis::{CatalogResource, ServiceBindingStatus, ServiceBrokerStatus, ServiceInstanceStatus};

/// Statuses that carry a Ready condition and the checksum of the spec it applies to.
pub trait ChecksumStatus {
    fn is_ready(&self) -> bool;
    fn checksum(&self) -> Option<&str>;
    fn set_checksum(&mut self, checksum: Option<String>);
}

macro_rules! checksum_status {
    ($status:ty) => {
        impl ChecksumStatus for $status {
            fn is_ready(&self) -> bool {
                <$status>::is_ready(self)
            }
            fn checksum(&self) -> Option<&str> {
                self.checksum.as_deref()
            }
            fn set_checksum(&mut self, checksum: Option<String>) {
                self.checksum = checksum;
            }
        }
    };
}

checksum_status!(ServiceBrokerStatus);
checksum_status!(ServiceInstanceStatus);
checksum_status!(ServiceBindingStatus);

/// Hex encoded SHA-256 of the JSON encoding of `spec`.
pub fn spec_checksum<T: Serialize>(spec: &T) -> String {
    // Typed specs always serialize; an empty input still yields a well formed digest.
    let bytes = serde_json::to_vec(spec).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Recomputes the checksum when the Ready condition turns True, otherwise keeps the old one.
pub fn update_checksum<K>(new: &mut K, old: &K)
where
    K: CatalogResource,
    K::Status: ChecksumStatus,
{
    let was_ready = old.status().is_some_and(|s| s.is_ready());
    let old_checksum = old.status().and_then(|s| s.checksum()).map(String::from);
    let checksum = spec_checksum(new.spec());
    if let Some(status) = new.status_mut() {
        if status.is_ready() && !was_ready {
            status.set_checksum(Some(checksum));
        } else {
            status.set_checksum(old_checksum);
        }
    }
}
