//! Credential attachment around outgoing API requests.
//!
//! Every request to the protected API surface passes through
//! `CredentialInterceptor`, which decides per request whether to forward it
//! unauthenticated, attach the stored credential, or renew the credential
//! first. A refresh failure or a 401 from the API ends the session and
//! surfaces the triggering error to the caller unchanged.
//!
//! The decision is a three-way branch evaluated independently per request;
//! there is no cross-request coordination. Two requests that both observe an
//! expiring credential will each trigger their own refresh (see DESIGN.md).

use std::sync::Arc;

use chrono::Duration;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::auth::{default_renewal_window, SessionAuthority, TokenStore, REFRESH_ROUTE};

use super::transport::{OutgoingRequest, Transport, TransportResponse};
use super::ApiError;

pub struct CredentialInterceptor {
    store: Arc<dyn TokenStore>,
    authority: Arc<dyn SessionAuthority>,
    transport: Arc<dyn Transport>,
    renewal_window: Duration,
    refresh_segment: String,
}

impl CredentialInterceptor {
    pub fn new(
        store: Arc<dyn TokenStore>,
        authority: Arc<dyn SessionAuthority>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            authority,
            transport,
            renewal_window: default_renewal_window(),
            refresh_segment: REFRESH_ROUTE.to_string(),
        }
    }

    /// Override the renewal lookahead window.
    pub fn with_renewal_window(mut self, window: Duration) -> Self {
        self.renewal_window = window;
        self
    }

    /// Forward a request, attaching and renewing the credential as needed.
    ///
    /// Per request, exactly one of three paths is taken:
    /// - pass through: refresh-endpoint requests and requests with no stored
    ///   credential are forwarded unmodified
    /// - attach: a credential outside the renewal window is attached as-is
    /// - refresh then attach: a credential inside the renewal window is
    ///   renewed first; the request goes out with the new credential or, if
    ///   the refresh fails, not at all
    pub async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, ApiError> {
        // A refresh call must never be intercepted into refreshing again
        if request.path().contains(&self.refresh_segment) {
            return self.transport.dispatch(request).await;
        }

        let Some(credential) = self.store.get() else {
            // Unauthenticated call; whether the API accepts it is not the
            // interceptor's concern
            return self.transport.dispatch(request).await;
        };

        let token = if credential.needs_refresh(self.renewal_window) {
            debug!(
                expires_at = %credential.expires_at,
                "Credential inside renewal window, refreshing before dispatch"
            );
            let fresh = match self.authority.refresh().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(error = %e, "Credential refresh failed, ending session");
                    self.authority.end_session();
                    return Err(e.into());
                }
            };
            if let Err(e) = self.store.set(fresh.clone()) {
                warn!(error = %e, "Failed to persist refreshed credential");
            }
            fresh.value
        } else {
            credential.value
        };

        let response = self.transport.dispatch(request.with_bearer(&token)?).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            warn!("API rejected the attached credential, ending session");
            self.authority.end_session();
            return Err(ApiError::Unauthorized);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use reqwest::header;

    use crate::auth::{Credential, MemoryTokenStore, RefreshError};

    use super::*;

    struct FakeAuthority {
        next_token: Mutex<Option<Credential>>,
        refresh_calls: AtomicUsize,
        sessions_ended: AtomicUsize,
    }

    impl FakeAuthority {
        fn refreshing_to(credential: Credential) -> Self {
            Self {
                next_token: Mutex::new(Some(credential)),
                refresh_calls: AtomicUsize::new(0),
                sessions_ended: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                next_token: Mutex::new(None),
                refresh_calls: AtomicUsize::new(0),
                sessions_ended: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SessionAuthority for FakeAuthority {
        async fn refresh(&self) -> Result<Credential, RefreshError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.next_token
                .lock()
                .unwrap()
                .clone()
                .ok_or(RefreshError::Rejected(StatusCode::UNAUTHORIZED))
        }

        fn end_session(&self) {
            self.sessions_ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeTransport {
        status: StatusCode,
        forwarded: Mutex<Vec<OutgoingRequest>>,
    }

    impl FakeTransport {
        fn responding(status: StatusCode) -> Self {
            Self {
                status,
                forwarded: Mutex::new(Vec::new()),
            }
        }

        fn forwarded(&self) -> Vec<OutgoingRequest> {
            self.forwarded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn dispatch(
            &self,
            request: OutgoingRequest,
        ) -> Result<TransportResponse, ApiError> {
            self.forwarded.lock().unwrap().push(request);
            Ok(TransportResponse {
                status: self.status,
                body: "{}".to_string(),
            })
        }
    }

    struct Harness {
        store: Arc<MemoryTokenStore>,
        authority: Arc<FakeAuthority>,
        transport: Arc<FakeTransport>,
        interceptor: CredentialInterceptor,
    }

    fn harness(authority: FakeAuthority, status: StatusCode) -> Harness {
        let store = Arc::new(MemoryTokenStore::new());
        let authority = Arc::new(authority);
        let transport = Arc::new(FakeTransport::responding(status));
        let interceptor = CredentialInterceptor::new(
            store.clone(),
            authority.clone(),
            transport.clone(),
        );
        Harness {
            store,
            authority,
            transport,
            interceptor,
        }
    }

    fn fresh_credential(value: &str) -> Credential {
        Credential::with_expiry(value, Utc::now() + Duration::hours(1))
    }

    fn expiring_credential(value: &str) -> Credential {
        // Expires in 2 minutes, well inside the 5 minute renewal window
        Credential::with_expiry(value, Utc::now() + Duration::minutes(2))
    }

    fn bearer_of(request: &OutgoingRequest) -> Option<&str> {
        request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_no_credential_forwards_without_header() {
        let h = harness(FakeAuthority::failing(), StatusCode::OK);

        h.interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await
            .unwrap();

        let forwarded = h.transport.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert!(bearer_of(&forwarded[0]).is_none());
        assert_eq!(h.authority.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_endpoint_is_never_intercepted() {
        let h = harness(FakeAuthority::refreshing_to(fresh_credential("t2")), StatusCode::OK);
        h.store.set(expiring_credential("t1")).unwrap();

        h.interceptor
            .send(OutgoingRequest::post("https://api.wayfarer.app/auth/refresh"))
            .await
            .unwrap();

        // Forwarded unmodified, no refresh triggered despite the expiring
        // credential
        let forwarded = h.transport.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert!(bearer_of(&forwarded[0]).is_none());
        assert_eq!(h.authority.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fresh_credential_attached_without_refresh() {
        let h = harness(FakeAuthority::failing(), StatusCode::OK);
        h.store.set(fresh_credential("t1")).unwrap();

        h.interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await
            .unwrap();

        let forwarded = h.transport.forwarded();
        assert_eq!(bearer_of(&forwarded[0]), Some("Bearer t1"));
        assert_eq!(h.authority.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiring_credential_refreshed_before_dispatch() {
        let h = harness(FakeAuthority::refreshing_to(fresh_credential("t2")), StatusCode::OK);
        h.store.set(expiring_credential("t1")).unwrap();

        h.interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await
            .unwrap();

        // The forwarded request carries the new credential and the store
        // now holds it
        let forwarded = h.transport.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(bearer_of(&forwarded[0]), Some("Bearer t2"));
        assert_eq!(h.store.get().unwrap().value, "t2");
        assert_eq!(h.authority.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.authority.sessions_ended.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_blocks_request_and_ends_session_once() {
        let h = harness(FakeAuthority::failing(), StatusCode::OK);
        h.store.set(expiring_credential("t1")).unwrap();

        let result = h
            .interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await;

        // The refresh error surfaces, the original request never goes out
        assert!(matches!(
            result,
            Err(ApiError::Refresh(RefreshError::Rejected(_)))
        ));
        assert!(h.transport.forwarded().is_empty());
        assert_eq!(h.authority.sessions_ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_response_ends_session_once() {
        let h = harness(FakeAuthority::failing(), StatusCode::UNAUTHORIZED);
        h.store.set(fresh_credential("t1")).unwrap();

        let result = h
            .interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(h.transport.forwarded().len(), 1);
        assert_eq!(h.authority.sessions_ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_passthrough_does_not_end_session() {
        // A 401 on a request that carried no credential is the caller's
        // problem, not a session event
        let h = harness(FakeAuthority::failing(), StatusCode::UNAUTHORIZED);

        let response = h
            .interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(h.authority.sessions_ended.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_renewal_window() {
        // Expires in 2 minutes; with a 1 minute window that is still fresh
        let h = harness(FakeAuthority::refreshing_to(fresh_credential("t2")), StatusCode::OK);
        h.store.set(expiring_credential("t1")).unwrap();
        let interceptor = CredentialInterceptor::new(
            h.store.clone(),
            h.authority.clone(),
            h.transport.clone(),
        )
        .with_renewal_window(Duration::minutes(1));

        interceptor
            .send(OutgoingRequest::get("https://api.wayfarer.app/itineraries"))
            .await
            .unwrap();

        let forwarded = h.transport.forwarded();
        assert_eq!(bearer_of(&forwarded[0]), Some("Bearer t1"));
        assert_eq!(h.authority.refresh_calls.load(Ordering::SeqCst), 0);
    }
}
