#![cfg(feature = "reqwest")]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::Semaphore;
// self
use lif_client::{
	_preludet::test_reqwest_transport,
	auth::AccessToken,
	client::ApiClient,
	config::ClientConfig,
	error::RefreshError,
	refresh::{RefreshFuture, RefreshPhase, TokenRefresher},
	store::{MemoryStorage, TokenStore},
	url::Url,
};

/// Refresher that parks until the test opens the gate, then yields a fixed outcome.
struct GatedRefresher {
	gate: Semaphore,
	calls: AtomicUsize,
	outcome: Result<AccessToken, RefreshError>,
}
impl GatedRefresher {
	fn new(outcome: Result<AccessToken, RefreshError>) -> Arc<Self> {
		Arc::new(Self { gate: Semaphore::new(0), calls: AtomicUsize::new(0), outcome })
	}
}
impl TokenRefresher for GatedRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let _permit = self.gate.acquire().await.map_err(|_| RefreshError::Abandoned)?;

			self.outcome.clone()
		})
	}
}

fn build_client(
	server: &MockServer,
	store: TokenStore,
	refresher: Arc<GatedRefresher>,
) -> ApiClient {
	let config = ClientConfig::new(
		Url::parse(&server.url("/api")).expect("Mock base URL should parse successfully."),
	);

	ApiClient::builder(config.clone())
		.transport(test_reqwest_transport(config))
		.token_store(store)
		.refresher(refresher)
		.build()
		.expect("Reqwest-backed client should build.")
}

const WAIT_LIMIT: Duration = Duration::from_secs(10);

async fn wait_until_queued(client: &ApiClient, refresher: &GatedRefresher, queued: usize) {
	let parked = async {
		while refresher.calls.load(Ordering::SeqCst) == 0
			|| client.refresh_coordinator().pending() < queued
		{
			tokio::task::yield_now().await;
		}
	};

	tokio::time::timeout(WAIT_LIMIT, parked)
		.await
		.expect("Requests should park behind the refresh before the wait limit.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/accounts").header("authorization", "Bearer T1");
			then.status(401).json_body(json!({ "message": "Token expired" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/accounts").header("authorization", "Bearer T2");
			then.status(200).json_body(json!({ "data": "ok", "status": 200 }));
		})
		.await;
	let store = TokenStore::new(Arc::new(MemoryStorage::default()));

	store.set_token(&AccessToken::new("T1")).expect("Memory storage writes should succeed.");

	let refresher = GatedRefresher::new(Ok(AccessToken::new("T2")));
	let client = build_client(&server, store.clone(), refresher.clone());
	let calls: Vec<_> = (0..4)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get::<String>("/accounts").await })
		})
		.collect();

	wait_until_queued(&client, &refresher, 3).await;

	assert_eq!(client.refresh_coordinator().phase(), RefreshPhase::Refreshing);

	refresher.gate.add_permits(1);

	for call in calls {
		let value = tokio::time::timeout(WAIT_LIMIT, call)
			.await
			.expect("Request should settle before the wait limit.")
			.expect("Request task should not panic.")
			.expect("Every request should succeed after the shared refresh.");

		assert_eq!(value, "ok");
	}

	assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
	assert_eq!(client.refresh_coordinator().phase(), RefreshPhase::Idle);
	assert_eq!(client.refresh_coordinator().metrics().queued(), 3);
	assert_eq!(store.get_token().as_ref().map(AccessToken::expose), Some("T2"));

	stale.assert_calls_async(4).await;
	fresh.assert_calls_async(4).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_shared_refresh_rejects_every_request_and_logs_out() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/accounts");
			then.status(401).json_body(json!({ "message": "Token expired" }));
		})
		.await;
	let store = TokenStore::new(Arc::new(MemoryStorage::default()));

	store.set_token(&AccessToken::new("T1")).expect("Memory storage writes should succeed.");

	let refresher =
		GatedRefresher::new(Err(RefreshError::Rejected { status: 401, message: None }));
	let client = build_client(&server, store.clone(), refresher.clone());
	let calls: Vec<_> = (0..3)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get::<String>("/accounts").await })
		})
		.collect();

	wait_until_queued(&client, &refresher, 2).await;
	refresher.gate.add_permits(1);

	for call in calls {
		let err = tokio::time::timeout(WAIT_LIMIT, call)
			.await
			.expect("Request should settle before the wait limit.")
			.expect("Request task should not panic.")
			.expect_err("Every request should fail once the refresh is rejected.");

		assert_eq!(err.status, 401);
	}

	assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
	assert_eq!(client.refresh_coordinator().metrics().failures(), 1);
	assert_eq!(store.get_token(), None);

	stale.assert_calls_async(3).await;
}
