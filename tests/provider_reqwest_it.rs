#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use time::macros;
// self
use session_broker::{
	_preludet::*,
	error::{ExchangeError, RefreshError},
	provider::{ProfileSource, ProviderClient},
};

#[tokio::test]
async fn exchange_resolves_relative_expiry_and_subject() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"idp-access\",\"refresh_token\":\"idp-refresh\",\"token_type\":\"bearer\",\"expires_in\":3600,\"sub\":\"user-1\"}",
				);
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let grant = client
		.exchange_identity("assertion-1")
		.await
		.expect("Identity exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.subject.as_ref().map(AsRef::as_ref), Some("user-1"));
	assert_eq!(grant.access_token.expose(), "idp-access");
	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("idp-refresh"));
	assert!(grant.expires_at >= before + Duration::hours(1));
	assert!(grant.expires_at <= OffsetDateTime::now_utc() + Duration::hours(1));
}

#[tokio::test]
async fn exchange_honors_absolute_expiry() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"idp-access\",\"token_type\":\"bearer\",\"expires_at\":\"2030-01-01T00:00:00Z\",\"sub\":\"user-1\"}",
				);
		})
		.await;
	let grant = client
		.exchange_identity("assertion-1")
		.await
		.expect("Identity exchange should succeed.");

	assert_eq!(grant.expires_at, macros::datetime!(2030-01-01 00:00 UTC));
	assert_eq!(grant.refresh_token, None);
}

#[tokio::test]
async fn exchange_rejection_maps_to_rejected() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/exchange");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"access_denied\"}");
		})
		.await;
	let err = client
		.exchange_identity("assertion-1")
		.await
		.expect_err("A denied assertion must not produce a grant.");

	assert!(matches!(err, ExchangeError::Rejected { .. }));
}

#[tokio::test]
async fn exchange_missing_expiry_is_a_boundary_error() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"idp-access\",\"token_type\":\"bearer\",\"sub\":\"user-1\"}");
		})
		.await;
	let err = client
		.exchange_identity("assertion-1")
		.await
		.expect_err("A grant without an expiry must be refused at the boundary.");

	assert!(matches!(err, ExchangeError::Expiry(_)));
}

#[tokio::test]
async fn refresh_rotates_tokens_when_the_provider_rotates() {
	let server = MockServer::start_async().await;
	let client = test_resource_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/resource/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"res-access-2\",\"refresh_token\":\"res-refresh-2\",\"token_type\":\"bearer\",\"expires_in\":1800}",
				);
		})
		.await;
	let grant = client.refresh("res-refresh-1").await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "res-access-2");
	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("res-refresh-2"));
}

#[tokio::test]
async fn refresh_reports_no_rotation_when_the_token_is_kept() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"idp-access-2\",\"token_type\":\"bearer\",\"expires_in\":1800}");
		})
		.await;
	let grant = client.refresh("idp-refresh-1").await.expect("Refresh should succeed.");

	assert_eq!(grant.refresh_token, None, "The broker reuses the input token in this case.");
}

#[tokio::test]
async fn refresh_invalid_grant_is_unauthorized() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"token revoked\"}");
		})
		.await;
	let err = client.refresh("dead-token").await.expect_err("A revoked token must be rejected.");

	assert!(matches!(err, RefreshError::Unauthorized { .. }));
}

#[tokio::test]
async fn refresh_server_errors_are_transient_with_retry_hint() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/token");
			then.status(503).header("retry-after", "30").body("upstream maintenance");
		})
		.await;
	let err = client.refresh("still-good").await.expect_err("A 503 must not succeed.");

	match err {
		RefreshError::Transient { status, retry_after, .. } => {
			assert_eq!(status, Some(503));
			assert_eq!(retry_after, Some(Duration::seconds(30)));
		},
		other => panic!("Expected a transient failure, got {other:?}."),
	}
}

#[tokio::test]
async fn refresh_malformed_json_stays_transient() {
	let server = MockServer::start_async().await;
	let client = test_idp_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/token");
			then.status(200).header("content-type", "text/html").body("<html>gateway</html>");
		})
		.await;
	let err = client.refresh("still-good").await.expect_err("Garbage must not produce a grant.");

	assert!(
		matches!(err, RefreshError::Transient { .. }),
		"A garbled response must never be confused with a rejected token.",
	);
}

#[tokio::test]
async fn profile_fetch_parses_the_snapshot() {
	let server = MockServer::start_async().await;
	let client = test_resource_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/resource/profile");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"displayName\":\"Jo Doe\",\"pictureUrl\":\"https://cdn.example/jo.png\",\"position\":\"Editor\"}",
				);
		})
		.await;
	let profile = client.fetch_profile("res-access").await.expect("Profile fetch should succeed.");

	mock.assert_async().await;

	assert_eq!(profile.display_name.as_deref(), Some("Jo Doe"));
	assert_eq!(profile.picture_url.as_deref(), Some("https://cdn.example/jo.png"));
	assert_eq!(profile.position.as_deref(), Some("Editor"));
}

#[tokio::test]
async fn profile_fetch_surfaces_http_errors() {
	let server = MockServer::start_async().await;
	let client = test_resource_client(&server.base_url());
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/resource/profile");
			then.status(500).body("boom");
		})
		.await;
	let err = client.fetch_profile("res-access").await.expect_err("A 500 must surface.");

	assert_eq!(err.status, Some(500));
}
