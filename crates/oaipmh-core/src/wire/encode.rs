//! XML encoding of OAI-PMH response envelopes.
//!
//! Produces the provider's response framing: an XML declaration followed
//! by an indented envelope carrying the UTC response date and the echoed
//! request element. Record metadata is written verbatim, so whatever the
//! repository stored is what goes over the wire.

use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::Error;
use crate::Result;

use super::{
    Envelope, Header, Identify, MetadataFormat, Payload, ProtocolFault, Record, RecordList,
    HeaderList, Set, SetList, OAI_DC_NS, OAI_PMH_NS,
};

type XmlWriter = Writer<Vec<u8>>;
type WriteResult = std::result::Result<(), quick_xml::Error>;

/// Encode a response envelope as an XML document.
pub fn encode_envelope(envelope: &Envelope) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(Error::from)?;

    writer
        .create_element("OAI-PMH")
        .with_attribute(("xmlns", OAI_PMH_NS))
        .write_inner_content(|w| {
            let date = envelope
                .response_date
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            text_element(w, "responseDate", &date)?;

            w.create_element("request")
                .with_attribute(("verb", envelope.request.verb.as_str()))
                .write_text_content(BytesText::new(&envelope.request.base_url))?;

            match &envelope.payload {
                Payload::Error(fault) => write_fault(w, fault),
                Payload::Identify(identify) => write_identify(w, identify),
                Payload::ListMetadataFormats(formats) => write_formats(w, formats),
                Payload::ListSets(sets) => write_sets(w, sets),
                Payload::ListIdentifiers(headers) => write_headers(w, headers),
                Payload::ListRecords(records) => write_records(w, records),
                Payload::GetRecord(record) => w
                    .create_element("GetRecord")
                    .write_inner_content(|w| write_record(w, record))
                    .map(|_| ()),
            }
        })
        .map_err(Error::from)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Malformed(format!("produced non-UTF8 output: {}", e)))
}

fn write_fault(w: &mut XmlWriter, fault: &ProtocolFault) -> WriteResult {
    w.create_element("error")
        .with_attribute(("code", fault.code.as_str()))
        .write_text_content(BytesText::new(&fault.message))?;
    Ok(())
}

fn write_identify(w: &mut XmlWriter, identify: &Identify) -> WriteResult {
    w.create_element("Identify").write_inner_content(|w| {
        text_element(w, "repositoryName", &identify.repository_name)?;
        text_element(w, "baseURL", &identify.base_url)?;
        text_element(w, "protocolVersion", &identify.protocol_version)?;
        text_element(w, "adminEmail", &identify.admin_email)?;
        text_element(w, "earliestDatestamp", &identify.earliest_datestamp)?;
        text_element(w, "deletedRecord", &identify.deleted_record)?;
        text_element(w, "granularity", &identify.granularity)
    })?;
    Ok(())
}

fn write_formats(w: &mut XmlWriter, formats: &[MetadataFormat]) -> WriteResult {
    w.create_element("ListMetadataFormats")
        .write_inner_content(|w| {
            for format in formats {
                w.create_element("metadataFormat").write_inner_content(|w| {
                    text_element(w, "metadataPrefix", &format.prefix)?;
                    text_element(w, "schema", &format.schema)?;
                    text_element(w, "metadataNamespace", &format.namespace)
                })?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn write_sets(w: &mut XmlWriter, list: &SetList) -> WriteResult {
    w.create_element("ListSets").write_inner_content(|w| {
        for set in &list.sets {
            write_set(w, set)?;
        }
        write_token(w, &list.resumption_token)
    })?;
    Ok(())
}

fn write_set(w: &mut XmlWriter, set: &Set) -> WriteResult {
    w.create_element("set").write_inner_content(|w| {
        text_element(w, "setSpec", &set.spec)?;
        text_element(w, "setName", &set.name)?;
        w.create_element("setDescription").write_inner_content(|w| {
            w.create_element("dc")
                .with_attribute(("xmlns", OAI_DC_NS))
                .write_inner_content(|w| text_element(w, "description", &set.description))?;
            Ok::<(), quick_xml::Error>(())
        })?;
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn write_headers(w: &mut XmlWriter, list: &HeaderList) -> WriteResult {
    w.create_element("ListIdentifiers").write_inner_content(|w| {
        for header in &list.headers {
            write_header(w, header)?;
        }
        write_token(w, &list.resumption_token)
    })?;
    Ok(())
}

fn write_records(w: &mut XmlWriter, list: &RecordList) -> WriteResult {
    w.create_element("ListRecords").write_inner_content(|w| {
        for record in &list.records {
            write_record(w, record)?;
        }
        write_token(w, &list.resumption_token)
    })?;
    Ok(())
}

fn write_record(w: &mut XmlWriter, record: &Record) -> WriteResult {
    w.create_element("record").write_inner_content(|w| {
        write_header(w, &record.header)?;
        if !record.metadata.is_empty() {
            w.create_element("metadata").write_inner_content(|w| {
                // Already XML. BytesText::from_escaped suppresses escaping
                // so the stored markup passes through verbatim.
                w.write_event(Event::Text(BytesText::from_escaped(
                    record.metadata.as_str(),
                )))
            })?;
        }
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn write_header(w: &mut XmlWriter, header: &Header) -> WriteResult {
    let element = w.create_element("header");
    let element = match &header.status {
        Some(status) => element.with_attribute(("status", status.as_str())),
        None => element,
    };

    element.write_inner_content(|w| {
        text_element(w, "identifier", &header.identifier)?;
        let stamp = header.datestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        text_element(w, "datestamp", &stamp)?;
        for spec in &header.set_spec {
            text_element(w, "setSpec", spec)?;
        }
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn write_token(w: &mut XmlWriter, token: &Option<String>) -> WriteResult {
    if let Some(token) = token {
        text_element(w, "resumptionToken", token)?;
    }
    Ok(())
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> WriteResult {
    w.create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::wire::{decode_envelope, RequestEcho};
    use chrono::{TimeZone, Utc};

    fn envelope(payload: Payload) -> Envelope {
        Envelope {
            response_date: Utc.with_ymd_and_hms(2015, 2, 3, 4, 5, 6).unwrap(),
            request: RequestEcho {
                base_url: "http://localhost:8080/".to_string(),
                verb: "ListRecords".to_string(),
            },
            payload,
        }
    }

    #[test]
    fn envelope_framing() {
        let out = encode_envelope(&envelope(Payload::Error(ProtocolFault {
            code: ErrorCode::BadVerb,
            message: "Illegal OAI verb: Frobnicate".to_string(),
        })))
        .unwrap();

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("xmlns=\"http://www.openarchives.org/OAI/2.0/\""));
        assert!(out.contains("<responseDate>2015-02-03T04:05:06Z</responseDate>"));
        assert!(out.contains("<request verb=\"ListRecords\">http://localhost:8080/</request>"));
        assert!(out.contains("<error code=\"badVerb\">Illegal OAI verb: Frobnicate</error>"));
    }

    #[test]
    fn record_metadata_is_not_escaped() {
        let record = Record {
            header: Header {
                identifier: "urn:one".to_string(),
                datestamp: Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap(),
                set_spec: vec!["alpha".to_string()],
                status: None,
            },
            metadata: "<doc><title>A &amp; B</title></doc>".to_string(),
        };

        let out = encode_envelope(&envelope(Payload::ListRecords(RecordList {
            records: vec![record],
            resumption_token: Some("tok/100".to_string()),
        })))
        .unwrap();

        assert!(out.contains("<doc><title>A &amp; B</title></doc>"));
        assert!(!out.contains("&lt;doc&gt;"));
        assert!(out.contains("<resumptionToken>tok/100</resumptionToken>"));
    }

    #[test]
    fn encoded_envelope_decodes_back() {
        let record = Record {
            header: Header {
                identifier: "urn:round/trip one".to_string(),
                datestamp: Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap(),
                set_spec: vec!["alpha".to_string()],
                status: None,
            },
            metadata: "<doc a=\"1\"><x/></doc>".to_string(),
        };

        let out = encode_envelope(&envelope(Payload::ListRecords(RecordList {
            records: vec![record],
            resumption_token: None,
        })))
        .unwrap();

        let decoded = decode_envelope(&out).unwrap();
        let Payload::ListRecords(list) = decoded.payload else {
            panic!("expected records payload");
        };
        assert_eq!(list.records.len(), 1);
        assert_eq!(list.records[0].header.identifier, "urn:round/trip one");
        assert_eq!(list.records[0].metadata, "<doc a=\"1\"><x/></doc>");
        assert_eq!(list.resumption_token, None);
    }

    #[test]
    fn sets_carry_dc_descriptions() {
        let out = encode_envelope(&envelope(Payload::ListSets(SetList {
            sets: vec![Set {
                spec: "alpha".to_string(),
                name: "Alpha".to_string(),
                description: "A set".to_string(),
            }],
            resumption_token: None,
        })))
        .unwrap();

        assert!(out.contains("xmlns=\"http://www.openarchives.org/OAI/2.0/oai_dc/\""));

        let decoded = decode_envelope(&out).unwrap();
        let Payload::ListSets(list) = decoded.payload else {
            panic!("expected sets payload");
        };
        assert_eq!(list.sets[0].description, "A set");
    }
}
