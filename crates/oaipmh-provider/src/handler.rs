//! The provider HTTP handler: verb dispatch and response framing.
//!
//! Requests arrive as form-encoded POSTs or query-string GETs. Verbs are
//! matched case-insensitively. An unknown verb produces a well-formed
//! OAI-PMH response whose payload is `<error code="badVerb">` with HTTP
//! status 200; repository failures during dispatch produce HTTP 500 with
//! the error message as the body.

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use oaipmh_core::error::{Error, ErrorCode};
use oaipmh_core::wire::{
    encode_envelope, Envelope, Header, HeaderList, Identify, Payload, ProtocolFault, Record,
    RecordList, RequestEcho, SetList,
};
use oaipmh_core::{min_datestamp, next_n_records, RecordCursor, Repository, Result, StoredRecord};

use crate::tokens::TokenRegistry;

/// Records served per list response before a resumption token is minted.
const PAGE_SIZE: usize = 100;

/// The request parameters a verb call can carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerbParams {
    #[serde(default)]
    pub verb: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default, rename = "resumptionToken")]
    pub resumption_token: Option<String>,
    #[serde(default, rename = "metadataPrefix")]
    pub metadata_prefix: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
}

struct ProviderState {
    repository: Box<dyn Repository>,
    tokens: TokenRegistry,
}

/// A hostable OAI-PMH provider over a repository.
pub struct Provider {
    state: Arc<ProviderState>,
}

impl Provider {
    /// Create a provider over a repository.
    pub fn new(repository: impl Repository + 'static) -> Self {
        Provider {
            state: Arc::new(ProviderState {
                repository: Box::new(repository),
                tokens: TokenRegistry::new(),
            }),
        }
    }

    /// The axum router serving the provider at `/`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_get).post(handle_post))
            .with_state(Arc::clone(&self.state))
    }

    /// Bind `addr` and serve until the process ends.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("OAI-PMH provider running at {}", addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_get(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Query(params): Query<VerbParams>,
) -> Response {
    respond(state, &headers, params).await
}

async fn handle_post(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Form(params): Form<VerbParams>,
) -> Response {
    respond(state, &headers, params).await
}

async fn respond(state: Arc<ProviderState>, headers: &HeaderMap, params: VerbParams) -> Response {
    let verb = params.verb.clone().unwrap_or_default();
    debug!(verb = %verb, "request");

    let payload = match dispatch(&state, &verb, &params).await {
        Ok(payload) => payload,
        Err(err) => {
            error!(verb = %verb, error = %err, "internal server error during dispatch");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    let envelope = Envelope {
        response_date: Utc::now(),
        request: RequestEcho {
            base_url: format!("http://{}/", host),
            verb,
        },
        payload,
    };

    match encode_envelope(&envelope) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "internal server error while writing response");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn dispatch(state: &ProviderState, verb: &str, params: &VerbParams) -> Result<Payload> {
    match verb.to_lowercase().as_str() {
        "identify" => Ok(identify()),
        "listmetadataformats" => list_metadata_formats(state).await,
        "listsets" => list_sets(state).await,
        "listidentifiers" => list_identifiers(state, params).await,
        "listrecords" => list_records(state, params).await,
        "getrecord" => get_record(state, params).await,
        _ => Ok(Payload::Error(ProtocolFault {
            code: ErrorCode::BadVerb,
            message: format!("Illegal OAI verb: {}", verb),
        })),
    }
}

fn identify() -> Payload {
    Payload::Identify(Identify {
        repository_name: "oaipmh served repository".to_string(),
        base_url: String::new(),
        protocol_version: "2.0".to_string(),
        admin_email: String::new(),
        earliest_datestamp: min_datestamp().to_rfc3339_opts(SecondsFormat::Secs, true),
        deleted_record: "transient".to_string(),
        granularity: "YYYY-MM-DDThh:mm:ssZ".to_string(),
    })
}

async fn list_metadata_formats(state: &ProviderState) -> Result<Payload> {
    Ok(Payload::ListMetadataFormats(state.repository.formats()))
}

async fn list_sets(state: &ProviderState) -> Result<Payload> {
    let sets = state.repository.sets().await?;
    Ok(Payload::ListSets(SetList {
        sets,
        resumption_token: None,
    }))
}

async fn list_identifiers(state: &ProviderState, params: &VerbParams) -> Result<Payload> {
    let (records, token) = match serve_page(state, params).await? {
        Ok(page) => page,
        Err(fault) => return Ok(Payload::Error(fault)),
    };

    let headers = records.iter().map(stored_to_header).collect();
    Ok(Payload::ListIdentifiers(HeaderList {
        headers,
        resumption_token: token,
    }))
}

async fn list_records(state: &ProviderState, params: &VerbParams) -> Result<Payload> {
    let (records, token) = match serve_page(state, params).await? {
        Ok(page) => page,
        Err(fault) => return Ok(Payload::Error(fault)),
    };

    let records = records
        .iter()
        .map(stored_to_record)
        .collect::<Result<Vec<_>>>()?;
    Ok(Payload::ListRecords(RecordList {
        records,
        resumption_token: token,
    }))
}

async fn get_record(state: &ProviderState, params: &VerbParams) -> Result<Payload> {
    let Some(id) = params.identifier.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(Payload::Error(ProtocolFault {
            code: ErrorCode::BadArgument,
            message: "identifier is required".to_string(),
        }));
    };

    match state.repository.record(id).await? {
        Some(record) => Ok(Payload::GetRecord(Box::new(stored_to_record(&record)?))),
        None => Ok(Payload::Error(ProtocolFault {
            code: ErrorCode::IdDoesNotExist,
            message: format!("No record with identifier '{}'", id),
        })),
    }
}

/// Serve one page of a list verb: up to [`PAGE_SIZE`] records plus a
/// resumption token while the cursor still has more. The outer `Result`
/// is an internal failure; the inner one is a protocol-level fault that
/// still gets a well-formed response.
async fn serve_page(
    state: &ProviderState,
    params: &VerbParams,
) -> Result<std::result::Result<(Vec<StoredRecord>, Option<String>), ProtocolFault>> {
    let mut cursor: Box<dyn RecordCursor> = match params
        .resumption_token
        .as_deref()
        .filter(|t| !t.is_empty())
    {
        Some(token) => match state.tokens.resume(token) {
            Some(cursor) => cursor,
            None => {
                return Ok(Err(ProtocolFault {
                    code: ErrorCode::BadResumptionToken,
                    message: format!("Unknown or expired resumption token: {}", token),
                }))
            }
        },
        None => {
            let set = params.set.as_deref().filter(|s| !s.is_empty());
            state
                .repository
                .list_records(set, min_datestamp(), Utc::now())
                .await?
        }
    };

    let (records, has_more) = next_n_records(cursor.as_mut(), PAGE_SIZE);
    let token = has_more.then(|| state.tokens.mint(cursor));

    Ok(Ok((records, token)))
}

fn stored_to_header(record: &StoredRecord) -> Header {
    Header {
        identifier: record.id.clone(),
        datestamp: record.date,
        set_spec: vec![record.set.clone()],
        status: None,
    }
}

fn stored_to_record(record: &StoredRecord) -> Result<Record> {
    let metadata = record.content().map_err(|err| {
        Error::for_record(&record.id, err)
    })?;
    Ok(Record {
        header: stored_to_header(record),
        metadata,
    })
}
