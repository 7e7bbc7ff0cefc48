//! `maven-metadata.xml` parsing for version discovery.

use pomdep_util::errors::{PomdepError, PomdepResult};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Artifact-level repository metadata listing the published versions.
#[derive(Debug, Clone, Default)]
pub struct RepoMetadata {
    pub group_id: String,
    pub artifact_id: String,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

/// Parse an artifact-level `maven-metadata.xml`.
pub fn parse_metadata(xml: &str) -> PomdepResult<RepoMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = RepoMetadata::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"metadata" {
                    parse_body(&mut reader, &mut meta)?;
                } else {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(meta)
}

fn parse_body(reader: &mut Reader<&[u8]>, meta: &mut RepoMetadata) -> PomdepResult<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"groupId" => meta.group_id = read_text(reader)?,
                b"artifactId" => meta.artifact_id = read_text(reader)?,
                b"versioning" => parse_versioning(reader, meta)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"metadata" => return Ok(()),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_versioning(reader: &mut Reader<&[u8]>, meta: &mut RepoMetadata) -> PomdepResult<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"latest" => meta.latest = Some(read_text(reader)?),
                b"release" => meta.release = Some(read_text(reader)?),
                b"versions" => parse_versions(reader, meta)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"versioning" => return Ok(()),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_versions(reader: &mut Reader<&[u8]>, meta: &mut RepoMetadata) -> PomdepResult<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"version" => meta.versions.push(read_text(reader)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"versions" => return Ok(()),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn read_text(reader: &mut Reader<&[u8]>) -> PomdepResult<String> {
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => text = t.unescape().unwrap_or_default().to_string(),
            Ok(Event::Start(e)) => {
                reader.read_to_end(e.name()).map_err(xml_error)?;
            }
            Ok(Event::End(_)) => return Ok(text),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn xml_error(err: quick_xml::Error) -> miette::Report {
    PomdepError::Xml {
        message: format!("failed to parse maven-metadata.xml: {err}"),
    }
    .into()
}

fn truncated() -> miette::Report {
    PomdepError::Xml {
        message: "unexpected end of maven-metadata.xml".to_string(),
    }
    .into()
}
