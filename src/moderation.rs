//! Persistence of accepted comments.
//!
//! A comment either goes straight to the published branch or onto its own
//! review branch with a pull request against the published branch. Both
//! paths are an ordered list of [`StoreStep`]s; the first failing step ends
//! the run. Steps already completed are not undone, so a failed review run
//! can leave an orphaned branch or file behind for an operator to clean up.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{ContentStore, RepoRef, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Reviewed,
}

impl Route {
    pub fn select(require_approval: bool, suspicious: bool) -> Self {
        if require_approval || suspicious {
            Route::Reviewed
        } else {
            Route::Direct
        }
    }

    pub fn steps(self) -> &'static [StoreStep] {
        match self {
            Route::Direct => &[StoreStep::WriteFile],
            Route::Reviewed => &[
                StoreStep::ResolveHead,
                StoreStep::CreateBranch,
                StoreStep::WriteFile,
                StoreStep::OpenPullRequest,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStep {
    ResolveHead,
    CreateBranch,
    WriteFile,
    OpenPullRequest,
}

impl StoreStep {
    pub fn purpose(self) -> &'static str {
        match self {
            StoreStep::ResolveHead => "Failed to resolve published branch",
            StoreStep::CreateBranch => "Failed to create comment branch",
            StoreStep::WriteFile => "Failed to write comment",
            StoreStep::OpenPullRequest => "Failed to create PR",
        }
    }
}

#[derive(Debug, Error)]
#[error("{}: {source}", .step.purpose())]
pub struct PersistError {
    pub step: StoreStep,
    #[source]
    pub source: StoreError,
}

/// Everything the router needs to file one comment.
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    pub comment_id: &'a str,
    pub path: &'a str,
    pub content: &'a [u8],
    pub excerpt: &'a str,
}

pub fn review_branch(comment_id: &str) -> String {
    format!("comment-{comment_id}")
}

pub struct ModerationRouter<'s> {
    store: &'s dyn ContentStore,
    repo: &'s RepoRef,
    published_branch: &'s str,
    step_timeout: Duration,
}

impl<'s> ModerationRouter<'s> {
    pub fn new(store: &'s dyn ContentStore, repo: &'s RepoRef, published_branch: &'s str, step_timeout: Duration) -> Self {
        Self { store, repo, published_branch, step_timeout }
    }

    async fn bounded<T>(&self, step: StoreStep, fut: impl Future<Output = Result<T, StoreError>>) -> Result<T, PersistError> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(source)) => Err(PersistError { step, source }),
            Err(_) => Err(PersistError { step, source: StoreError::Timeout(self.step_timeout) }),
        }
    }

    pub async fn persist(&self, route: Route, sub: &Submission<'_>) -> Result<(), PersistError> {
        let branch = match route {
            Route::Direct => self.published_branch.to_string(),
            Route::Reviewed => review_branch(sub.comment_id),
        };
        let mut head_sha = String::new();
        for &step in route.steps() {
            let outcome = match step {
                StoreStep::ResolveHead => self
                    .bounded(step, self.store.get_branch_head(self.repo, self.published_branch))
                    .await
                    .map(|sha| head_sha = sha),
                StoreStep::CreateBranch => {
                    self.bounded(step, self.store.create_branch(self.repo, &branch, &head_sha)).await
                }
                StoreStep::WriteFile => {
                    self.bounded(step, self.store.create_file(self.repo, sub.path, sub.content, &branch, sub.excerpt))
                        .await
                }
                StoreStep::OpenPullRequest => {
                    self.bounded(
                        step,
                        self.store.create_pull_request(self.repo, sub.excerpt, &branch, self.published_branch),
                    )
                    .await
                }
            };
            if let Err(e) = outcome {
                warn!(comment_id = sub.comment_id, ?route, ?step, error = %e.source, "comment persistence aborted");
                return Err(e);
            }
        }
        info!(comment_id = sub.comment_id, ?route, %branch, path = sub.path, "comment persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: Option<&'static str>,
        hang: Option<&'static str>,
    }

    impl Recorder {
        async fn record(&self, call: String, op: &'static str) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(call);
            if self.hang == Some(op) {
                std::future::pending::<()>().await;
            }
            if self.fail == Some(op) {
                return Err(StoreError::Status { status: 422, message: "Reference already exists".into() });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContentStore for Recorder {
        async fn get_branch_head(&self, _: &RepoRef, branch: &str) -> Result<String, StoreError> {
            self.record(format!("head {branch}"), "head").await.map(|_| "abc123".to_string())
        }
        async fn create_branch(&self, _: &RepoRef, branch: &str, from: &str) -> Result<(), StoreError> {
            self.record(format!("branch {branch} {from}"), "branch").await
        }
        async fn create_file(&self, _: &RepoRef, path: &str, _: &[u8], branch: &str, msg: &str) -> Result<(), StoreError> {
            self.record(format!("file {path} {branch} {msg}"), "file").await
        }
        async fn create_pull_request(&self, _: &RepoRef, title: &str, head: &str, base: &str) -> Result<(), StoreError> {
            self.record(format!("pr {title} {head}->{base}"), "pr").await
        }
    }

    fn repo() -> RepoRef {
        RepoRef { owner: "acme".into(), repo: "site".into() }
    }

    fn submission() -> Submission<'static> {
        Submission { comment_id: "42", path: "t/1/2/x/1-hi.json", content: b"{}", excerpt: "hi" }
    }

    #[test]
    fn route_selection() {
        assert_eq!(Route::select(false, false), Route::Direct);
        assert_eq!(Route::select(true, false), Route::Reviewed);
        assert_eq!(Route::select(false, true), Route::Reviewed);
    }

    #[tokio::test]
    async fn direct_writes_once_to_published_branch() {
        let store = Recorder::default();
        let repo = repo();
        let router = ModerationRouter::new(&store, &repo, "master", Duration::from_secs(5));
        router.persist(Route::Direct, &submission()).await.unwrap();
        assert_eq!(*store.calls.lock().unwrap(), vec!["file t/1/2/x/1-hi.json master hi"]);
    }

    #[tokio::test]
    async fn reviewed_runs_four_steps_in_order() {
        let store = Recorder::default();
        let repo = repo();
        let router = ModerationRouter::new(&store, &repo, "master", Duration::from_secs(5));
        router.persist(Route::Reviewed, &submission()).await.unwrap();
        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![
                "head master",
                "branch comment-42 abc123",
                "file t/1/2/x/1-hi.json comment-42 hi",
                "pr hi comment-42->master",
            ]
        );
    }

    #[tokio::test]
    async fn failed_branch_stops_the_run() {
        let store = Recorder { fail: Some("branch"), ..Default::default() };
        let repo = repo();
        let router = ModerationRouter::new(&store, &repo, "master", Duration::from_secs(5));
        let err = router.persist(Route::Reviewed, &submission()).await.unwrap_err();
        assert_eq!(err.step, StoreStep::CreateBranch);
        assert!(err.to_string().starts_with("Failed to create comment branch"));
        assert_eq!(store.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn each_failing_step_reports_its_purpose() {
        let cases = [
            ("head", Route::Reviewed, StoreStep::ResolveHead, "Failed to resolve published branch", 1),
            ("file", Route::Reviewed, StoreStep::WriteFile, "Failed to write comment", 3),
            ("pr", Route::Reviewed, StoreStep::OpenPullRequest, "Failed to create PR", 4),
            ("file", Route::Direct, StoreStep::WriteFile, "Failed to write comment", 1),
        ];
        for (op, route, step, message, calls) in cases {
            let store = Recorder { fail: Some(op), ..Default::default() };
            let repo = repo();
            let router = ModerationRouter::new(&store, &repo, "master", Duration::from_secs(5));
            let err = router.persist(route, &submission()).await.unwrap_err();
            assert_eq!(err.step, step);
            assert_eq!(err.to_string(), format!("{message}: 422: Reference already exists"));
            assert!(matches!(err.source, StoreError::Status { status: 422, .. }));
            assert_eq!(store.calls.lock().unwrap().len(), calls, "{op} on {route:?}");
        }
    }

    #[tokio::test]
    async fn hung_step_times_out() {
        let store = Recorder { hang: Some("file"), ..Default::default() };
        let repo = repo();
        let router = ModerationRouter::new(&store, &repo, "master", Duration::from_millis(20));
        let err = router.persist(Route::Direct, &submission()).await.unwrap_err();
        assert_eq!(err.step, StoreStep::WriteFile);
        assert!(matches!(err.source, StoreError::Timeout(_)));
    }
}
