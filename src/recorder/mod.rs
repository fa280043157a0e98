//! Records catalog objects into a Git working tree, one YAML file per object and one
//! commit per change, so the history of every resource can be inspected with plain git.

mod err;
mod watch;

pub use err::*;
pub use watch::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use git2::{Oid, Repository, Signature};
use kube::Resource;
use serde::Serialize;
use tracing::{debug, info};

pub const AUTHOR_NAME: &str = "service-catalog-recorder";
pub const AUTHOR_EMAIL: &str = "recorder@servicecatalog.k8s.io";

/// `{kind}.{version}.{group}-{name}.yaml`, with the namespace prefixed to the name for
/// namespaced objects. The core group renders as an empty segment.
pub fn file_name(kind: &str, api_version: &str, namespace: Option<&str>, name: &str) -> String {
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    let name = match namespace.filter(|ns| !ns.is_empty()) {
        Some(ns) => format!("{ns}-{name}"),
        None => name.to_string(),
    };
    format!("{}.{version}.{group}-{name}.yaml", kind.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Added,
    Modified,
    Deleted,
}

impl Change {
    fn verb(self) -> &'static str {
        match self {
            Change::Added => "added",
            Change::Modified => "modified",
            Change::Deleted => "deleted",
        }
    }
}

pub struct GitRecorder {
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl GitRecorder {
    /// Opens the repository at `path`, initializing it first when there is none.
    pub fn open(path: &Path) -> Result<Self, RecorderError> {
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(_) => {
                info!(path = %path.display(), "initializing recorder repository");
                Repository::init(path)?
            }
        };
        let workdir = repo
            .workdir()
            .ok_or_else(|| RecorderError::BareRepository(path.display().to_string()))?
            .to_path_buf();
        Ok(Self {
            repo: Mutex::new(repo),
            workdir,
        })
    }

    /// Writes the object and commits it. Returns the new commit, or `None` when the stored
    /// content was already identical.
    pub fn record<K>(&self, obj: &K) -> Result<Option<Oid>, RecorderError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let (file, description) = Self::locate(obj)?;
        let path = self.workdir.join(&file);
        let mut value = serde_yaml::to_value(obj).map_err(|source| RecorderError::Encode {
            kind: K::kind(&()).to_string(),
            source,
        })?;
        strip_managed_fields(&mut value);
        let content = serde_yaml::to_string(&value).map_err(|source| RecorderError::Encode {
            kind: K::kind(&()).to_string(),
            source,
        })?;

        let change = if path.exists() {
            Change::Modified
        } else {
            Change::Added
        };
        fs::write(&path, content)?;
        self.commit(&file, change, &description)
    }

    /// Removes the object's file and commits the removal.
    pub fn remove<K>(&self, obj: &K) -> Result<Option<Oid>, RecorderError>
    where
        K: Resource<DynamicType = ()>,
    {
        let (file, description) = Self::locate(obj)?;
        let path = self.workdir.join(&file);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.commit(&file, Change::Deleted, &description)
    }

    fn locate<K: Resource<DynamicType = ()>>(obj: &K) -> Result<(String, String), RecorderError> {
        let kind = K::kind(&());
        let meta = obj.meta();
        let name = meta
            .name
            .as_deref()
            .ok_or_else(|| RecorderError::MissingName(kind.to_string()))?;
        let namespace = meta.namespace.as_deref();
        let file = file_name(&kind, &K::api_version(&()), namespace, name);
        let description = match namespace {
            Some(ns) => format!("{kind} {ns}/{name}"),
            None => format!("{kind} {name}"),
        };
        Ok((file, description))
    }

    fn commit(&self, file: &str, change: Change, description: &str) -> Result<Option<Oid>, RecorderError> {
        let repo = self
            .repo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut index = repo.index()?;
        match change {
            Change::Added | Change::Modified => index.add_path(Path::new(file))?,
            Change::Deleted => {
                if index.get_path(Path::new(file), 0).is_some() {
                    index.remove_path(Path::new(file))?;
                }
            }
        }
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            debug!(file, "content unchanged, nothing to commit");
            return Ok(None);
        }

        let tree = repo.find_tree(tree_id)?;
        let author = Signature::now(AUTHOR_NAME, AUTHOR_EMAIL)?;
        let message = format!("{} {description}", change.verb());
        let parents: Vec<_> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &author, &author, &message, &tree, &parents)?;
        info!(%oid, %message, "recorded change");
        Ok(Some(oid))
    }
}

fn strip_managed_fields(value: &mut serde_yaml::Value) {
    if let Some(meta) = value.get_mut("metadata").and_then(|m| m.as_mapping_mut()) {
        meta.remove("managedFields");
    }
}

#[cfg(test)]
mod test {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ManagedFieldsEntry;

    use super::*;
    use crate::apis::{
        ClusterServiceBroker, ClusterServiceBrokerSpec, CommonServiceBrokerSpec, ServiceBinding,
        ServiceBindingSpec,
    };

    fn broker(url: &str) -> ClusterServiceBroker {
        ClusterServiceBroker::new(
            "test-broker",
            ClusterServiceBrokerSpec {
                common: CommonServiceBrokerSpec {
                    url: url.to_string(),
                    ..Default::default()
                },
                auth_info: None,
            },
        )
    }

    fn history(dir: &Path) -> Vec<(String, String)> {
        let repo = Repository::open(dir).unwrap();
        let mut walk = repo.revwalk().unwrap();
        walk.push_head().unwrap();
        walk.map(|oid| {
            let commit = repo.find_commit(oid.unwrap()).unwrap();
            let entry = (
                commit.message().unwrap().to_string(),
                commit.author().email().unwrap().to_string(),
            );
            entry
        })
        .collect()
    }

    #[test]
    fn test_file_name() {
        let cases = vec![
            (
                ("ClusterServiceBroker", "servicecatalog.k8s.io/v1beta1", None, "b"),
                "clusterservicebroker.v1beta1.servicecatalog.k8s.io-b.yaml",
            ),
            (
                ("ServiceInstance", "servicecatalog.k8s.io/v1beta1", Some("ns"), "db"),
                "serviceinstance.v1beta1.servicecatalog.k8s.io-ns-db.yaml",
            ),
            (("Secret", "v1", Some("ns"), "creds"), "secret.v1.-ns-creds.yaml"),
        ];
        for ((kind, api_version, namespace, name), want) in cases {
            assert_eq!(file_name(kind, api_version, namespace, name), want);
        }
    }

    #[test]
    fn test_record_modify_delete() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = GitRecorder::open(dir.path()).unwrap();

        assert!(recorder.record(&broker("https://one.example.com")).unwrap().is_some());
        // Identical content, and content differing only in managed fields, make no commit.
        assert!(recorder.record(&broker("https://one.example.com")).unwrap().is_none());
        let mut managed = broker("https://one.example.com");
        managed.metadata.managed_fields = Some(vec![ManagedFieldsEntry {
            manager: Some("kubectl".to_string()),
            ..Default::default()
        }]);
        assert!(recorder.record(&managed).unwrap().is_none());

        assert!(recorder.record(&broker("https://two.example.com")).unwrap().is_some());
        let file = dir
            .path()
            .join("clusterservicebroker.v1beta1.servicecatalog.k8s.io-test-broker.yaml");
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("url: https://two.example.com"), "{content}");

        assert!(recorder.remove(&broker("https://two.example.com")).unwrap().is_some());
        assert!(!file.exists());
        assert!(recorder.remove(&broker("https://two.example.com")).unwrap().is_none());

        let history = history(dir.path());
        let messages: Vec<_> = history.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "deleted ClusterServiceBroker test-broker",
                "modified ClusterServiceBroker test-broker",
                "added ClusterServiceBroker test-broker",
            ]
        );
        assert!(history.iter().all(|(_, email)| email == AUTHOR_EMAIL));
    }

    #[test]
    fn test_namespaced_objects_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut binding = ServiceBinding::new("creds", ServiceBindingSpec::default());
        binding.metadata.namespace = Some("test-ns".to_string());
        {
            let recorder = GitRecorder::open(dir.path()).unwrap();
            recorder.record(&binding).unwrap().unwrap();
        }
        assert!(dir
            .path()
            .join("servicebinding.v1beta1.servicecatalog.k8s.io-test-ns-creds.yaml")
            .exists());

        let recorder = GitRecorder::open(dir.path()).unwrap();
        assert!(recorder.record(&binding).unwrap().is_none());
        assert_eq!(history(dir.path())[0].0, "added ServiceBinding test-ns/creds");
    }

    #[test]
    fn test_missing_name() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = GitRecorder::open(dir.path()).unwrap();
        let mut nameless = broker("https://example.com");
        nameless.metadata.name = None;
        let err = recorder.record(&nameless).unwrap_err();
        assert_eq!(err.to_string(), "ClusterServiceBroker has no name");
    }
}
