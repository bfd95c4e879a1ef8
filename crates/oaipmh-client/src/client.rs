//! The OAI-PMH protocol client.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument, trace};

use oaipmh_core::error::{Error, TransportError};
use oaipmh_core::wire::{self, decode_envelope, Envelope, Payload};
use oaipmh_core::{EndpointUrl, Result};

use crate::iter::{ListIdentifiersIter, ListRecordsIter, ListSetsIter};

/// How requests are carried over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Form-encoded POST. The default.
    #[default]
    Post,
    /// Query-string GET, for providers that mishandle POST.
    Get,
}

/// How much of the HTTP exchange gets logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    /// Log nothing.
    #[default]
    None,
    /// Log the method and URL of each request.
    Request,
    /// Also log the response status.
    Response,
    /// Also log the full response body, line by line.
    Body,
}

/// Arguments for the listing verbs.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// The metadata prefix to request.
    pub prefix: String,
    /// The set to restrict to. `None` means all sets.
    pub set: Option<String>,
    /// Lower datestamp bound.
    pub from: Option<DateTime<Utc>>,
    /// Upper datestamp bound.
    pub until: Option<DateTime<Utc>>,
}

impl ListArgs {
    fn into_params(self) -> Vec<(String, String)> {
        let mut params = vec![("metadataPrefix".to_string(), self.prefix)];
        if let Some(from) = self.from {
            params.push((
                "from".to_string(),
                from.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(until) = self.until {
            params.push((
                "until".to_string(),
                until.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(set) = self.set.filter(|s| !s.is_empty()) {
            params.push(("set".to_string(), set));
        }
        params
    }
}

/// A client for one OAI-PMH provider.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: EndpointUrl,
    transport: Transport,
    debug: DebugLevel,
}

impl Client {
    /// Create a client for the given provider URL. Fails when the URL is
    /// not an absolute http/https URL.
    pub fn new(provider_url: &str) -> Result<Self> {
        let endpoint = EndpointUrl::new(provider_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("oaipmh/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Ok(Self {
            http,
            endpoint,
            transport: Transport::default(),
            debug: DebugLevel::default(),
        })
    }

    /// Select the HTTP transport.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Select the debug level.
    pub fn debug_level(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    /// The provider endpoint this client talks to.
    pub fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }

    /// A client for a different provider sharing this client's transport
    /// and debug settings.
    pub fn for_endpoint(&self, provider_url: &str) -> Result<Self> {
        Ok(Self {
            http: self.http.clone(),
            endpoint: EndpointUrl::new(provider_url)?,
            transport: self.transport,
            debug: self.debug,
        })
    }

    /// Perform one verb call and decode the response envelope. A payload
    /// carrying an `<error>` element is surfaced as [`Error::Protocol`].
    #[instrument(skip(self, params), fields(endpoint = %self.endpoint))]
    pub(crate) async fn fetch(&self, verb: &str, params: Vec<(String, String)>) -> Result<Envelope> {
        let mut params = params;
        params.push(("verb".to_string(), verb.to_string()));

        if self.debug >= DebugLevel::Request {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            let method = match self.transport {
                Transport::Post => "POST",
                Transport::Get => "GET",
            };
            debug!(">> {} {}?{}", method, self.endpoint, query);
        }

        let response = match self.transport {
            Transport::Post => {
                self.http
                    .post(self.endpoint.as_str())
                    .form(&params)
                    .send()
                    .await?
            }
            Transport::Get => {
                self.http
                    .get(self.endpoint.as_str())
                    .query(&params)
                    .send()
                    .await?
            }
        };

        if self.debug >= DebugLevel::Response {
            debug!("<< {}", response.status());
        }

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(Error::Transport(TransportError::Status {
                status: status.as_u16(),
            }));
        }

        let body = response.text().await?;
        if self.debug >= DebugLevel::Body {
            for line in body.lines() {
                trace!("<< body: {}", line);
            }
        }

        let envelope = decode_envelope(&body)?;
        if let Payload::Error(fault) = &envelope.payload {
            return Err(Error::Protocol {
                code: fault.code.clone(),
                message: fault.message.clone(),
            });
        }

        Ok(envelope)
    }

    /// A lazy iterator over the headers matching `args`.
    pub fn list_identifiers(&self, args: ListArgs) -> ListIdentifiersIter {
        ListIdentifiersIter::new(self.clone(), args.into_params())
    }

    /// A lazy iterator over the records matching `args`.
    pub fn list_records(&self, args: ListArgs) -> ListRecordsIter {
        ListRecordsIter::new(self.clone(), args.into_params())
    }

    /// A lazy iterator over the provider's sets.
    pub fn list_sets(&self) -> ListSetsIter {
        ListSetsIter::new(self.clone())
    }

    /// Fetch a single record by identifier.
    pub async fn get_record(&self, prefix: &str, id: &str) -> Result<wire::Record> {
        let params = vec![
            ("metadataPrefix".to_string(), prefix.to_string()),
            ("identifier".to_string(), id.to_string()),
        ];

        let envelope = self.fetch("GetRecord", params).await?;
        match envelope.payload {
            Payload::GetRecord(record) => Ok(*record),
            _ => Err(Error::Malformed(
                "GetRecord response carries the wrong payload".to_string(),
            )),
        }
    }

    /// Fetch the provider's identity.
    pub async fn identify(&self) -> Result<wire::Identify> {
        let envelope = self.fetch("Identify", Vec::new()).await?;
        match envelope.payload {
            Payload::Identify(identify) => Ok(identify),
            _ => Err(Error::Malformed(
                "Identify response carries the wrong payload".to_string(),
            )),
        }
    }

    /// Fetch the provider's metadata formats.
    pub async fn list_metadata_formats(&self) -> Result<Vec<wire::MetadataFormat>> {
        let envelope = self.fetch("ListMetadataFormats", Vec::new()).await?;
        match envelope.payload {
            Payload::ListMetadataFormats(formats) => Ok(formats),
            _ => Err(Error::Malformed(
                "ListMetadataFormats response carries the wrong payload".to_string(),
            )),
        }
    }
}
