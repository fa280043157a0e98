use std::fmt::Debug;
use std::sync::Arc;

use futures_util::StreamExt;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{GitRecorder, RecorderError};

/// Feeds every change to objects of one kind into the recorder until `token` is cancelled.
///
/// The initial list replays all existing objects; those whose stored content is unchanged
/// produce no commit.
pub async fn record_changes<K>(api: Api<K>, recorder: Arc<GitRecorder>, token: CancellationToken)
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    let kind = K::kind(&()).to_string();
    info!(%kind, "recording changes");
    let mut events = watcher(api, watcher::Config::default())
        .default_backoff()
        .take_until(token.cancelled())
        .boxed();

    while let Some(event) = events.next().await {
        let result = match event {
            Ok(watcher::Event::Apply(obj) | watcher::Event::InitApply(obj)) => {
                apply(recorder.clone(), obj, false).await
            }
            Ok(watcher::Event::Delete(obj)) => apply(recorder.clone(), obj, true).await,
            Ok(watcher::Event::Init | watcher::Event::InitDone) => Ok(()),
            Err(e) => {
                warn!(%kind, "watch failed: {e}");
                Ok(())
            }
        };
        if let Err(e) = result {
            error!(%kind, "failed to record change: {e}");
        }
    }
    info!(%kind, "stopped recording changes");
}

/// Git operations block, so they run off the async workers.
async fn apply<K>(recorder: Arc<GitRecorder>, obj: K, deleted: bool) -> Result<(), RecorderError>
where
    K: Resource<DynamicType = ()> + Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        if deleted {
            recorder.remove(&obj)
        } else {
            recorder.record(&obj)
        }
    })
    .await??;
    Ok(())
}
