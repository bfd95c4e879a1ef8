//! XML decoding of OAI-PMH response envelopes.
//!
//! The decoder walks quick-xml events and matches on local element names,
//! so both default-namespace and prefixed responses are accepted. The raw
//! inner XML of `<metadata>` is captured by slicing the source document,
//! which keeps the producer's namespace declarations intact.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, ErrorCode};
use crate::Result;

use super::{
    Envelope, Header, HeaderList, Identify, MetadataFormat, Payload, ProtocolFault, Record,
    RecordList, RequestEcho, Set, SetList,
};

/// Decode a full OAI-PMH response envelope from an XML document.
pub fn decode_envelope(xml: &str) -> Result<Envelope> {
    Decoder::new(xml).envelope()
}

struct Decoder<'a> {
    reader: Reader<&'a [u8]>,
    xml: &'a str,
}

impl<'a> Decoder<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        Self { reader, xml }
    }

    fn envelope(mut self) -> Result<Envelope> {
        let mut response_date = DateTime::<Utc>::UNIX_EPOCH;
        let mut request = RequestEcho::default();
        let mut payload: Option<Payload> = None;

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"OAI-PMH" => {}
                    b"responseDate" => {
                        response_date = parse_datestamp(&self.element_text(&e)?)?;
                    }
                    b"request" => request = self.request(&e)?,
                    b"error" => payload = Some(Payload::Error(self.fault(&e)?)),
                    b"Identify" => payload = Some(Payload::Identify(self.identify(&e)?)),
                    b"ListMetadataFormats" => {
                        payload = Some(Payload::ListMetadataFormats(self.formats(&e)?));
                    }
                    b"ListSets" => payload = Some(Payload::ListSets(self.sets(&e)?)),
                    b"ListIdentifiers" => {
                        payload = Some(Payload::ListIdentifiers(self.headers(&e)?));
                    }
                    b"ListRecords" => payload = Some(Payload::ListRecords(self.records(&e)?)),
                    b"GetRecord" => payload = Some(Payload::GetRecord(self.get_record(&e)?)),
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"error" => payload = Some(Payload::Error(self.fault_empty(&e)?)),
                    b"request" => {
                        request.verb = attr(&e, b"verb")?.unwrap_or_default();
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let payload = payload.ok_or_else(|| {
            Error::Malformed("response envelope carries no payload element".to_string())
        })?;

        Ok(Envelope {
            response_date,
            request,
            payload,
        })
    }

    fn request(&mut self, start: &BytesStart) -> Result<RequestEcho> {
        let verb = attr(start, b"verb")?.unwrap_or_default();
        let base_url = self.element_text(start)?;
        Ok(RequestEcho { base_url, verb })
    }

    fn fault(&mut self, start: &BytesStart) -> Result<ProtocolFault> {
        let code = attr(start, b"code")?.unwrap_or_default();
        let message = self.element_text(start)?;
        Ok(ProtocolFault {
            code: ErrorCode::from_wire(&code),
            message,
        })
    }

    fn fault_empty(&mut self, start: &BytesStart) -> Result<ProtocolFault> {
        let code = attr(start, b"code")?.unwrap_or_default();
        Ok(ProtocolFault {
            code: ErrorCode::from_wire(&code),
            message: String::new(),
        })
    }

    fn identify(&mut self, start: &BytesStart) -> Result<Identify> {
        let mut id = Identify {
            repository_name: String::new(),
            base_url: String::new(),
            protocol_version: String::new(),
            admin_email: String::new(),
            earliest_datestamp: String::new(),
            deleted_record: String::new(),
            granularity: String::new(),
        };

        self.each_child(start, |dec, child| {
            let text = dec.element_text(&child)?;
            match child.local_name().as_ref() {
                b"repositoryName" => id.repository_name = text,
                b"baseURL" | b"baseUrl" => id.base_url = text,
                b"protocolVersion" => id.protocol_version = text,
                b"adminEmail" => id.admin_email = text,
                b"earliestDatestamp" => id.earliest_datestamp = text,
                b"deletedRecord" => id.deleted_record = text,
                b"granularity" => id.granularity = text,
                _ => {}
            }
            Ok(())
        })?;

        Ok(id)
    }

    fn formats(&mut self, start: &BytesStart) -> Result<Vec<MetadataFormat>> {
        let mut formats = Vec::new();

        self.each_child(start, |dec, child| {
            if child.local_name().as_ref() == b"metadataFormat" {
                let mut format = MetadataFormat {
                    prefix: String::new(),
                    schema: String::new(),
                    namespace: String::new(),
                };
                dec.each_child(&child, |dec, field| {
                    let text = dec.element_text(&field)?;
                    match field.local_name().as_ref() {
                        b"metadataPrefix" => format.prefix = text,
                        b"schema" => format.schema = text,
                        b"metadataNamespace" => format.namespace = text,
                        _ => {}
                    }
                    Ok(())
                })?;
                formats.push(format);
            } else {
                dec.skip(&child)?;
            }
            Ok(())
        })?;

        Ok(formats)
    }

    fn sets(&mut self, start: &BytesStart) -> Result<SetList> {
        let mut token = None;

        let sets = self.each_child_or_token(start, &mut token, |dec, child| {
            if child.local_name().as_ref() != b"set" {
                dec.skip(&child)?;
                return Ok(None);
            }

            let mut set = Set {
                spec: String::new(),
                name: String::new(),
                description: String::new(),
            };
            dec.each_child(&child, |dec, field| {
                match field.local_name().as_ref() {
                    b"setSpec" => set.spec = dec.element_text(&field)?,
                    b"setName" => set.name = dec.element_text(&field)?,
                    b"setDescription" => set.description = dec.description_text(&field)?,
                    _ => dec.skip(&field)?,
                }
                Ok(())
            })?;
            Ok(Some(set))
        })?;

        Ok(SetList {
            sets,
            resumption_token: token,
        })
    }

    /// Pull the `<description>` text out of a set description's embedded
    /// Dublin Core container, wherever it nests.
    fn description_text(&mut self, start: &BytesStart) -> Result<String> {
        let mut description = String::new();
        let end = start.to_end().into_owned();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if e.local_name().as_ref() == b"description" {
                        description = self.element_text(&e)?;
                    }
                }
                Event::End(e) if e.name() == end.name() => break,
                Event::Eof => {
                    return Err(Error::Malformed(
                        "unexpected end of document inside setDescription".to_string(),
                    ))
                }
                _ => {}
            }
        }

        Ok(description)
    }

    fn headers(&mut self, start: &BytesStart) -> Result<HeaderList> {
        let mut token = None;

        let headers = self.each_child_or_token(start, &mut token, |dec, child| {
            if child.local_name().as_ref() == b"header" {
                Ok(Some(dec.header(&child)?))
            } else {
                dec.skip(&child)?;
                Ok(None)
            }
        })?;

        Ok(HeaderList {
            headers,
            resumption_token: token,
        })
    }

    fn records(&mut self, start: &BytesStart) -> Result<RecordList> {
        let mut token = None;

        let records = self.each_child_or_token(start, &mut token, |dec, child| {
            if child.local_name().as_ref() == b"record" {
                Ok(Some(dec.record(&child)?))
            } else {
                dec.skip(&child)?;
                Ok(None)
            }
        })?;

        Ok(RecordList {
            records,
            resumption_token: token,
        })
    }

    fn get_record(&mut self, start: &BytesStart) -> Result<Box<Record>> {
        let mut record = None;

        self.each_child(start, |dec, child| {
            if child.local_name().as_ref() == b"record" {
                record = Some(dec.record(&child)?);
            } else {
                dec.skip(&child)?;
            }
            Ok(())
        })?;

        record.map(Box::new).ok_or_else(|| {
            Error::Malformed("GetRecord response carries no record element".to_string())
        })
    }

    fn record(&mut self, start: &BytesStart) -> Result<Record> {
        let mut header = None;
        let mut metadata = String::new();
        let end = start.to_end().into_owned();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"header" => header = Some(self.header(&e)?),
                    b"metadata" => {
                        // Slice the source so the producer's markup survives
                        // untouched.
                        let span = self.reader.read_to_end(e.name())?;
                        let span = span.start as usize..span.end as usize;
                        metadata = self.xml[span].trim().to_string();
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == end.name() => break,
                Event::Eof => {
                    return Err(Error::Malformed(
                        "unexpected end of document inside record".to_string(),
                    ))
                }
                _ => {}
            }
        }

        let header = header.ok_or_else(|| {
            Error::Malformed("record element carries no header".to_string())
        })?;

        Ok(Record { header, metadata })
    }

    fn header(&mut self, start: &BytesStart) -> Result<Header> {
        let status = attr(start, b"status")?;
        let mut identifier = String::new();
        let mut datestamp = DateTime::<Utc>::UNIX_EPOCH;
        let mut set_spec = Vec::new();

        self.each_child(start, |dec, child| {
            match child.local_name().as_ref() {
                b"identifier" => identifier = dec.element_text(&child)?,
                b"datestamp" => datestamp = parse_datestamp(&dec.element_text(&child)?)?,
                b"setSpec" => set_spec.push(dec.element_text(&child)?),
                _ => dec.skip(&child)?,
            }
            Ok(())
        })?;

        Ok(Header {
            identifier,
            datestamp,
            set_spec,
            status,
        })
    }

    /// Run `f` over every child element of `start`, also collecting an
    /// optional `<resumptionToken>` into `token`. `f` returns the decoded
    /// item, or `None` when the child was consumed some other way.
    fn each_child_or_token<T>(
        &mut self,
        start: &BytesStart,
        token: &mut Option<String>,
        mut f: impl FnMut(&mut Self, BytesStart<'static>) -> Result<Option<T>>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let end = start.to_end().into_owned();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    let e = e.into_owned();
                    if e.local_name().as_ref() == b"resumptionToken" {
                        let text = self.element_text(&e)?;
                        if !text.is_empty() {
                            *token = Some(text);
                        }
                    } else if let Some(item) = f(self, e)? {
                        items.push(item);
                    }
                }
                Event::Empty(_) => {}
                Event::End(e) if e.name() == end.name() => break,
                Event::Eof => {
                    return Err(Error::Malformed(
                        "unexpected end of document inside list response".to_string(),
                    ))
                }
                _ => {}
            }
        }

        Ok(items)
    }

    /// Run `f` over every child element of `start`.
    fn each_child(
        &mut self,
        start: &BytesStart,
        mut f: impl FnMut(&mut Self, BytesStart<'static>) -> Result<()>,
    ) -> Result<()> {
        let end = start.to_end().into_owned();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => f(self, e.into_owned())?,
                Event::End(e) if e.name() == end.name() => break,
                Event::Eof => {
                    return Err(Error::Malformed(
                        "unexpected end of document".to_string(),
                    ))
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Collect the text content of the element opened by `start`,
    /// skipping any nested markup.
    fn element_text(&mut self, start: &BytesStart) -> Result<String> {
        let mut text = String::new();
        let end = start.to_end().into_owned();

        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => {
                    text.push_str(std::str::from_utf8(&c).map_err(|e| {
                        Error::Malformed(format!("invalid UTF-8 in CDATA: {}", e))
                    })?)
                }
                Event::Start(e) => self.skip(&e)?,
                Event::End(e) if e.name() == end.name() => break,
                Event::Eof => {
                    return Err(Error::Malformed(
                        "unexpected end of document".to_string(),
                    ))
                }
                _ => {}
            }
        }

        Ok(text.trim().to_string())
    }

    fn skip(&mut self, start: &BytesStart) -> Result<()> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }
}

fn attr(start: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Malformed(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a wire datestamp: full UTC RFC3339, or a bare `YYYY-MM-DD` for
/// providers with day granularity.
pub(crate) fn parse_datestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(Error::Malformed(format!("invalid datestamp '{}'", s)))
}
