//! REST client behaviour against a mock PostgREST server.

use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use trowel_rest::{
    Body, Filter, MediaUpload, OrcidLookup, Prefer, ResourcePath, RestClient, RestError,
    RestRequest,
};
use trowel_telemetry::Metrics;
use trowel_test_support::fixtures::{FIND_ENTRY_ID, FIND_UUID, find_record, rows};
use trowel_test_support::postgrest::PostgrestMock;
use url::Url;

fn client_for(mock: &PostgrestMock) -> Result<RestClient> {
    Ok(RestClient::new(mock.api_url(), Duration::from_secs(5))?)
}

#[tokio::test]
async fn get_with_uuid_filter_returns_rows() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let select = mock.expect_select("list_finds", FIND_UUID, rows([find_record()]));
    let client = client_for(&mock)?;

    let path = ResourcePath::by_uuid("list_finds", FIND_UUID).to_string();
    let value = client.request("get", &path, Body::Empty, None).await?;

    select.assert();
    assert_eq!(value[0]["entry_id"], json!(FIND_ENTRY_ID));
    Ok(())
}

#[tokio::test]
async fn prefer_header_is_sent_on_mutations() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let update = mock.expect_update("edit_find", FIND_UUID, rows([find_record()]));
    let client = client_for(&mock)?;

    let request = RestRequest::patch(ResourcePath::by_uuid("edit_find", FIND_UUID))
        .body(find_record())
        .prefer(Prefer::ReturnRepresentation);
    let value = client.execute(request).await?;

    update.assert();
    assert_eq!(value[0]["uuid"], json!(FIND_UUID));
    Ok(())
}

#[tokio::test]
async fn merge_duplicates_upserts_are_tagged() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let upsert = mock.server().mock(|when, then| {
        when.method(POST)
            .path("/edit_relation")
            .header("prefer", "resolution=merge-duplicates,return=representation");
        then.status(201).json_body(json!([{"uuid": "r1"}]));
    });
    let client = client_for(&mock)?;

    client
        .request(
            "POST",
            "edit_relation",
            json!([{"uuid": "r1", "kind": "above"}]),
            Some(Prefer::MergeDuplicates),
        )
        .await?;

    upsert.assert();
    Ok(())
}

#[tokio::test]
async fn empty_success_bodies_decode_to_null() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let delete = mock.server().mock(|when, then| {
        when.method(DELETE).path("/edit_note");
        then.status(204);
    });
    let client = client_for(&mock)?;

    let value = client
        .request("delete", "edit_note?uuid=eq.n1", Body::Empty, None)
        .await?;

    delete.assert();
    assert_eq!(value, Value::Null);
    Ok(())
}

#[tokio::test]
async fn status_errors_keep_the_backend_message() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let failure = mock.expect_failure(PATCH, "edit_find", 409, "duplicate key value");
    let client = client_for(&mock)?;

    let err = client
        .request("patch", "edit_find?uuid=eq.x", json!({}), None)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;

    failure.assert();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(err.message(), "request failed with status code 409");
    assert_eq!(err.response_message(), Some("duplicate key value"));
    Ok(())
}

#[tokio::test]
async fn transport_errors_have_no_response() -> Result<()> {
    let client = RestClient::new(Url::parse("http://127.0.0.1:9/")?, Duration::from_secs(2))?;
    let err = client
        .request("get", "list_finds", Body::Empty, None)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
    assert!(matches!(err, RestError::Transport { .. }));
    assert_eq!(err.response_message(), None);
    assert!(err.message().starts_with("request to http://127.0.0.1:9/list_finds failed: "));
    Ok(())
}

#[tokio::test]
async fn responses_are_counted_by_method_and_status() -> Result<()> {
    let mock = PostgrestMock::start().await;
    mock.expect_list("list_context", json!([]));
    mock.expect_failure(GET, "list_terms", 500, "boom");
    let metrics = Metrics::new()?;
    let client = client_for(&mock)?.with_metrics(metrics.clone());

    client.request("get", "list_context", Body::Empty, None).await?;
    let _ = client.request("get", "list_terms", Body::Empty, None).await;

    let rendered = metrics.render()?;
    assert!(rendered.contains(r#"rest_requests_total{method="GET",status="200"} 1"#));
    assert!(rendered.contains(r#"rest_requests_total{method="GET",status="500"} 1"#));
    Ok(())
}

#[tokio::test]
async fn filters_render_into_the_query_string() -> Result<()> {
    let mock = PostgrestMock::start().await;
    let terms = mock.server().mock(|when, then| {
        when.method(GET)
            .path("/v_terms")
            .query_param("tags", "cs.{pottery}")
            .query_param("or", "(type.eq.find,type.eq.bag)");
        then.status(200).json_body(json!([{"uuid": "t1"}]));
    });
    let client = client_for(&mock)?;

    let path = ResourcePath::new("v_terms")
        .filter(Filter::contains("tags", ["pottery"]))
        .filter(Filter::or(vec![
            Filter::eq("type", "find"),
            Filter::eq("type", "bag"),
        ]));
    let value = client
        .request("get", &path.to_string(), Body::Empty, None)
        .await?;

    terms.assert();
    assert_eq!(value[0]["uuid"], json!("t1"));
    Ok(())
}

#[tokio::test]
async fn orcid_records_are_fetched_as_typed_views() -> Result<()> {
    let server = MockServer::start_async().await;
    let record = server.mock(|when, then| {
        when.method(GET).path("/0000-0002-1825-0097/public-record.json");
        then.status(200).json_body(json!({
            "displayName": "Josiah Carberry",
            "website": {"websites": [{"urlName": "Home", "url": "https://example.org"}]}
        }));
    });
    let client = RestClient::new(Url::parse(&server.base_url())?, Duration::from_secs(5))?;
    let lookup = OrcidLookup::with_base(Url::parse(&server.base_url())?);

    let orcid = client
        .fetch_orcid_record(&lookup, "0000-0002-1825-0097")
        .await?;

    record.assert();
    assert_eq!(orcid.display_name.as_deref(), Some("Josiah Carberry"));
    assert_eq!(orcid.first_website(), Some("Home"));
    Ok(())
}

#[tokio::test]
async fn external_calls_bypass_the_api_root() -> Result<()> {
    let server = MockServer::start_async().await;
    let target = server.mock(|when, then| {
        when.method(GET).path("/resources/redirect").query_param("url", "https://example.org/a");
        then.status(200).json_body(json!({"ok": true}));
    });
    let client = RestClient::new(Url::parse("http://127.0.0.1:9/")?, Duration::from_secs(5))?;
    let redirect = Url::parse(&server.url("/resources/redirect"))?;
    let url = trowel_rest::proxied_url(&redirect, "https://example.org/a");

    let value = client
        .external("get", url.as_str(), Body::Empty, HeaderMap::new())
        .await?;

    target.assert();
    assert_eq!(value, json!({"ok": true}));
    Ok(())
}

#[tokio::test]
async fn media_uploads_post_multipart_forms() -> Result<()> {
    let server = MockServer::start_async().await;
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/upload/")
            .header_exists("content-type");
        then.status(200).json_body(json!({
            "message": "File uploaded",
            "file_path": "/media/x.jp2",
            "file_originalname": "x.tif",
            "file_filename": "x.jp2"
        }));
    });
    let client = RestClient::new(Url::parse("http://127.0.0.1:9/")?, Duration::from_secs(5))?;
    let endpoint = Url::parse(&server.url("/upload/"))?;
    let mut media = MediaUpload::new("x.tif", vec![0, 1, 2], None);
    media.media_type = Some("photo".into());

    let response = client.upload_media(&endpoint, media).await?;

    upload.assert();
    assert_eq!(response.file_path.as_deref(), Some("/media/x.jp2"));
    assert_eq!(response.summary(), "File uploaded x.tif --> x.jp2");
    Ok(())
}
