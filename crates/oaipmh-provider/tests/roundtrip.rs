//! End-to-end tests: the real client driving a served file repository.

use std::fs;
use std::net::SocketAddr;

use tempfile::TempDir;

use oaipmh_client::{Client, ListArgs, RecordIterator, Session};
use oaipmh_core::{Error, ListQuery, Window};
use oaipmh_provider::{FileRepository, Provider};

/// Create a repository directory with `count` records in one set.
fn repository_with_records(count: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let set_dir = dir.path().join("alpha");
    fs::create_dir(&set_dir).unwrap();

    for i in 0..count {
        fs::write(
            set_dir.join(format!("rec{:03}.xml", i)),
            format!(
                "<?xml version=\"1.0\"?>\n<doc><seq>{}</seq></doc>",
                i
            ),
        )
        .unwrap();
    }

    dir
}

/// Serve a provider over the directory on an ephemeral port.
async fn serve(dir: &TempDir) -> SocketAddr {
    let provider = Provider::new(FileRepository::new(dir.path()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let router = provider.router();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

fn list_args() -> ListArgs {
    ListArgs {
        prefix: "iso19139".to_string(),
        ..ListArgs::default()
    }
}

#[tokio::test]
async fn paged_list_records_round_trips_without_duplicates() {
    let dir = repository_with_records(250);
    let addr = serve(&dir).await;

    let client = Client::new(&format!("http://{}/", addr)).unwrap();
    let mut iter = client.list_records(list_args());

    let mut ids = Vec::new();
    loop {
        match iter.next().await {
            Ok(()) => {
                let record = iter.record().unwrap();
                assert!(!record.metadata.contains("<?xml"), "PI must be stripped");
                ids.push(record.header.identifier.clone());
            }
            Err(Error::NoMore) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    // 250 records arrive over three pages, in repository order, with no
    // duplicates.
    let expected: Vec<String> = (0..250).map(|i| format!("rec{:03}", i)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn list_identifiers_pages_through_the_repository() {
    let dir = repository_with_records(120);
    let addr = serve(&dir).await;

    let session = Session::new(
        Client::new(&format!("http://{}/", addr)).unwrap(),
        "iso19139",
    );

    let mut count = 0;
    session
        .list_identifiers(&ListQuery::default(), Window::unbounded(), &mut |res: oaipmh_core::HeaderResult| {
            assert!(!res.deleted);
            assert_eq!(res.header.set_spec, vec!["alpha"]);
            count += 1;
            true
        })
        .await
        .unwrap();

    assert_eq!(count, 120);
}

#[tokio::test]
async fn get_record_fetches_a_single_record() {
    let dir = repository_with_records(5);
    let addr = serve(&dir).await;

    let session = Session::new(
        Client::new(&format!("http://{}/", addr)).unwrap(),
        "iso19139",
    );

    let record = session.get_record("rec003").await.unwrap();
    assert_eq!(record.identifier(), "rec003");
    assert_eq!(record.content, "<doc><seq>3</seq></doc>");

    let err = session.get_record("rec999").await.unwrap_err();
    assert!(err.to_string().contains("rec999"));
}

#[tokio::test]
async fn identify_describes_the_repository() {
    let dir = repository_with_records(1);
    let addr = serve(&dir).await;

    let client = Client::new(&format!("http://{}/", addr)).unwrap();
    let identify = client.identify().await.unwrap();

    assert_eq!(identify.protocol_version, "2.0");
    assert_eq!(identify.deleted_record, "transient");
    assert_eq!(identify.granularity, "YYYY-MM-DDThh:mm:ssZ");
    assert_eq!(identify.earliest_datestamp, "1900-01-01T00:00:00Z");
}

#[tokio::test]
async fn sets_and_formats_are_listed() {
    let dir = repository_with_records(3);
    let addr = serve(&dir).await;

    let client = Client::new(&format!("http://{}/", addr)).unwrap();

    let formats = client.list_metadata_formats().await.unwrap();
    assert_eq!(formats.len(), 1);
    assert_eq!(formats[0].prefix, "iso19139");

    let session = Session::new(client, "iso19139");
    let mut specs = Vec::new();
    session
        .list_sets(Window::unbounded(), &mut |set: oaipmh_core::wire::Set| {
            specs.push(set.spec);
            true
        })
        .await
        .unwrap();
    assert_eq!(specs, vec!["alpha"]);
}

#[tokio::test]
async fn unknown_verb_is_a_well_formed_error_with_status_200() {
    let dir = repository_with_records(1);
    let addr = serve(&dir).await;

    let response = reqwest::get(format!("http://{}/?verb=Frobnicate", addr))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "application/xml"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("<error code=\"badVerb\">"));
    assert!(body.contains("Frobnicate"));
}

#[tokio::test]
async fn unknown_resumption_token_is_rejected_in_band() {
    let dir = repository_with_records(1);
    let addr = serve(&dir).await;

    let response = reqwest::get(format!(
        "http://{}/?verb=ListRecords&resumptionToken=bogus/7",
        addr
    ))
    .await
    .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("badResumptionToken"));
}

#[tokio::test]
async fn tokens_are_consumed_by_resumption() {
    let dir = repository_with_records(150);
    let addr = serve(&dir).await;

    // First page hands out a token.
    let body = reqwest::get(format!("http://{}/?verb=ListIdentifiers", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let token = body
        .split("<resumptionToken>")
        .nth(1)
        .and_then(|rest| rest.split("</resumptionToken>").next())
        .expect("first page should carry a token");
    assert!(token.ends_with("/100"));

    // Resuming it serves the remainder with no further token.
    let body = reqwest::get(format!(
        "http://{}/?verb=ListIdentifiers&resumptionToken={}",
        addr, token
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();
    assert!(!body.contains("<resumptionToken>"));
    assert!(body.contains("rec149"));

    // The registry entry was consumed; replaying the token fails.
    let body = reqwest::get(format!(
        "http://{}/?verb=ListIdentifiers&resumptionToken={}",
        addr, token
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();
    assert!(body.contains("badResumptionToken"));
}
