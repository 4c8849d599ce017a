//! Cloud identity lookups
//!
//! Asks the cloud who the current token belongs to. Requests are debounced
//! through a `PollGate`: one in flight at a time, a cooldown after errors,
//! and a refresh only when the identity key changed or the last answer is
//! stale. Right after a token registration the lookup becomes blocking: it
//! ignores the cooldown and asks the server to wait for the registration.

use devloop_cloud::{CloudClient, WhoAmIRequest};
use devloop_store::actions::CloudStatusReceivedAction;
use devloop_store::patterns::{PollGate, PollMode};
use devloop_store::{Action, ChangeSummary, StoreHandle, Subscriber};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Answers older than this are refreshed
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);
/// Periodic lookups pause this long after an error
pub const ERROR_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// What an answer depends on
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusKey {
    address: String,
    token: String,
    team_id: String,
    version: String,
}

impl From<&WhoAmIRequest> for StatusKey {
    fn from(request: &WhoAmIRequest) -> Self {
        Self {
            address: request.address.clone(),
            token: request.token.clone(),
            team_id: request.team_id.clone(),
            version: request.version.clone(),
        }
    }
}

pub struct CloudStatusManager {
    client: Arc<dyn CloudClient>,
    gate: Arc<PollGate>,
    /// Key of the last successful lookup
    last_key: Arc<Mutex<Option<StatusKey>>>,
}

impl CloudStatusManager {
    pub fn new(client: Arc<dyn CloudClient>) -> Self {
        Self {
            client,
            gate: PollGate::new(ERROR_COOLDOWN),
            last_key: Arc::new(Mutex::new(None)),
        }
    }

    fn is_fresh(&self, key: &StatusKey) -> bool {
        let same_key =
            self.last_key.lock().unwrap_or_else(PoisonError::into_inner).as_ref() == Some(key);
        same_key
            && self
                .gate
                .since_last_success()
                .is_some_and(|age| age < REFRESH_INTERVAL)
    }
}

impl Subscriber for CloudStatusManager {
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        _summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        let request = {
            let state = store.read_state();
            if state.cloud_address.is_empty() || state.token.is_empty() {
                return Ok(());
            }
            WhoAmIRequest {
                address: state.cloud_address.clone(),
                token: state.token.clone(),
                team_id: state.team_id.clone(),
                version: state.build_info.version.clone(),
                wait_for_registration: state.cloud_status.waiting_for_status_post_registration,
            }
        };

        let key = StatusKey::from(&request);
        let mode = if request.wait_for_registration {
            PollMode::Blocking
        } else {
            PollMode::Periodic
        };
        if mode == PollMode::Periodic && self.is_fresh(&key) {
            return Ok(());
        }
        let Some(permit) = self.gate.try_begin(mode) else {
            return Ok(());
        };

        let ctx = ctx.clone();
        let store = store.clone();
        let client = self.client.clone();
        let last_key = self.last_key.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = ctx.cancelled() => return,
                result = client.whoami(&request) => result,
            };
            match result {
                Ok(resp) => {
                    *last_key.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
                    permit.succeed();
                    store.dispatch(Action::CloudStatusReceived(CloudStatusReceivedAction {
                        found: resp.found,
                        username: resp.username,
                        team_name: resp.team_name,
                        suggested_version: resp.suggested_version,
                        is_post_registration_lookup: mode == PollMode::Blocking,
                    }));
                }
                Err(e) => {
                    log::debug!("Error looking up cloud status at {}: {}", request.address, e);
                    permit.fail();
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use devloop_cloud::{CloudError, WhoAmIResponse};
    use devloop_store::{ActionKind, TestingStore};
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[derive(Default)]
    struct FakeCloudClient {
        requests: Mutex<Vec<WhoAmIRequest>>,
        fail: Mutex<bool>,
    }

    impl FakeCloudClient {
        fn requests(&self) -> Vec<WhoAmIRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl CloudClient for FakeCloudClient {
        async fn whoami(&self, request: &WhoAmIRequest) -> Result<WhoAmIResponse, CloudError> {
            self.requests.lock().unwrap().push(request.clone());
            if *self.fail.lock().unwrap() {
                return Err(CloudError::Status {
                    status: 500,
                    body: "unavailable".to_string(),
                });
            }
            Ok(WhoAmIResponse {
                found: true,
                username: "user1".to_string(),
                team_name: "team1".to_string(),
                suggested_version: "0.2.0".to_string(),
            })
        }
    }

    struct Fixture {
        client: Arc<FakeCloudClient>,
        manager: CloudStatusManager,
        st: Arc<TestingStore>,
        ctx: CancellationToken,
    }

    impl Fixture {
        fn new() -> Self {
            let client = Arc::new(FakeCloudClient::default());
            let st = TestingStore::new();
            st.with_state(|s| {
                s.cloud_address = "cloud.test".to_string();
                s.token = "fake-token".to_string();
                s.build_info.version = "0.1.0".to_string();
            });
            Self {
                manager: CloudStatusManager::new(client.clone()),
                client,
                st,
                ctx: CancellationToken::new(),
            }
        }

        fn notify(&mut self) {
            self.manager
                .on_change(&self.ctx, &self.st.handle(), &ChangeSummary::legacy())
                .unwrap();
        }

        async fn wait_for_status(&self) -> CloudStatusReceivedAction {
            match self
                .st
                .wait_for_action(ActionKind::CloudStatusReceived, TIMEOUT)
                .await
                .unwrap()
            {
                Action::CloudStatusReceived(status) => status,
                other => panic!("unexpected action {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_token_no_request() {
        let mut f = Fixture::new();
        f.st.with_state(|s| s.token.clear());
        f.notify();

        f.st.assert_no_action(ActionKind::CloudStatusReceived, TIMEOUT)
            .await
            .unwrap();
        assert!(f.client.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_dispatches_status() {
        let mut f = Fixture::new();
        f.notify();

        let status = f.wait_for_status().await;
        assert_eq!(
            status,
            CloudStatusReceivedAction {
                found: true,
                username: "user1".to_string(),
                team_name: "team1".to_string(),
                suggested_version: "0.2.0".to_string(),
                is_post_registration_lookup: false,
            }
        );
        assert_eq!(
            f.client.requests(),
            vec![WhoAmIRequest {
                address: "cloud.test".to_string(),
                token: "fake-token".to_string(),
                team_id: String::new(),
                version: "0.1.0".to_string(),
                wait_for_registration: false,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_key_waits_for_refresh_interval() {
        let mut f = Fixture::new();
        f.notify();
        f.wait_for_status().await;

        f.notify();
        f.st.assert_no_action(ActionKind::CloudStatusReceived, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(f.client.requests().len(), 1);

        tokio::time::advance(REFRESH_INTERVAL).await;
        f.notify();
        f.wait_for_status().await;
        assert_eq!(f.client.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_change_refreshes_immediately() {
        let mut f = Fixture::new();
        f.notify();
        f.wait_for_status().await;

        f.st.with_state(|s| s.team_id = "team-42".to_string());
        f.notify();
        f.wait_for_status().await;

        let requests = f.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].team_id, "team-42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_cools_down_periodic_but_not_blocking() {
        let mut f = Fixture::new();
        f.client.set_fail(true);
        f.notify();
        f.st.assert_no_action(ActionKind::CloudStatusReceived, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(f.client.requests().len(), 1);

        // still cooling down
        f.client.set_fail(false);
        f.notify();
        f.st.assert_no_action(ActionKind::CloudStatusReceived, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(f.client.requests().len(), 1);

        f.st.with_state(|s| s.cloud_status.waiting_for_status_post_registration = true);
        f.notify();
        let status = f.wait_for_status().await;
        assert!(status.is_post_registration_lookup);

        let requests = f.client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].wait_for_registration);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires() {
        let mut f = Fixture::new();
        f.client.set_fail(true);
        f.notify();
        f.st.assert_no_action(ActionKind::CloudStatusReceived, TIMEOUT)
            .await
            .unwrap();

        f.client.set_fail(false);
        tokio::time::advance(ERROR_COOLDOWN).await;
        f.notify();
        f.wait_for_status().await;
        assert_eq!(f.client.requests().len(), 2);
    }
}
