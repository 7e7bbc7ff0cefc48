//! POM XML parsing: descriptor documents into [`Pom`] models.
//!
//! The parser walks quick-xml events with one reader function per
//! element kind, so repeated elements (`<dependency>`, `<exclusion>`,
//! `<profile>`) accumulate naturally and unknown elements are skipped
//! wholesale.

use indexmap::IndexMap;
use pomdep_core::coord::Coord;
use pomdep_resolver::tree::{DepNode, DepTree};
use pomdep_util::errors::{PomdepError, PomdepResult};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::pom::{Activation, Pom, Profile};

/// Parse a POM document into a model.
///
/// The own coordinate falls back to the parent's group and version when
/// the project omits them.
pub fn parse_pom(xml: &str) -> PomdepResult<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut project = RawProject::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"project" {
                    parse_project(&mut reader, &mut project)?;
                } else {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(project.into_pom())
}

/// Accumulates project fields until the whole document is consumed.
#[derive(Default)]
struct RawProject {
    group: String,
    artifact: String,
    version: String,
    parent: Coord,
    dependencies: Vec<DepNode>,
    management: Vec<DepNode>,
    properties: IndexMap<String, String>,
    profiles: Vec<RawProfile>,
}

struct RawProfile {
    activation: Activation,
    dependencies: Vec<DepNode>,
    management: Vec<DepNode>,
    properties: IndexMap<String, String>,
}

impl RawProject {
    fn into_pom(self) -> Pom {
        let mut coord = Coord::new(&self.group, &self.artifact, &self.version, "");
        if coord.group.is_empty() {
            coord.group = self.parent.group.clone();
        }
        if coord.version.is_empty() {
            coord.version = self.parent.version.clone();
        }

        let mut pom = Pom::new();
        pom.coord = coord.clone();
        pom.parent = self.parent;
        pom.deps = tree_of(coord.clone(), self.dependencies);
        pom.deps_mgmt = tree_of(coord.clone(), self.management);
        for (key, value) in self.properties {
            pom.properties.insert(key, value);
        }
        pom.profiles = self
            .profiles
            .into_iter()
            .map(|raw| Profile {
                activation: raw.activation,
                deps: tree_of(coord.clone(), raw.dependencies),
                deps_mgmt: tree_of(coord.clone(), raw.management),
                properties: raw.properties,
            })
            .collect();
        pom
    }
}

fn tree_of(root: Coord, deps: Vec<DepNode>) -> DepTree {
    let mut tree = DepTree::new(root);
    tree.root.deps = deps;
    tree
}

fn parse_project(reader: &mut Reader<&[u8]>, project: &mut RawProject) -> PomdepResult<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"groupId" => project.group = read_text(reader)?,
                b"artifactId" => project.artifact = read_text(reader)?,
                b"version" => project.version = read_text(reader)?,
                b"parent" => project.parent = parse_parent(reader)?,
                b"dependencies" => project.dependencies = parse_dependencies(reader)?,
                b"dependencyManagement" => {
                    project.management = parse_dependency_management(reader)?;
                }
                b"properties" => project.properties = parse_properties(reader)?,
                b"profiles" => project.profiles = parse_profiles(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"project" => return Ok(()),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_parent(reader: &mut Reader<&[u8]>) -> PomdepResult<Coord> {
    let mut group = String::new();
    let mut artifact = String::new();
    let mut version = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"groupId" => group = read_text(reader)?,
                b"artifactId" => artifact = read_text(reader)?,
                b"version" => version = read_text(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"parent" => {
                return Ok(Coord::new(&group, &artifact, &version, ""));
            }
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_dependencies(reader: &mut Reader<&[u8]>) -> PomdepResult<Vec<DepNode>> {
    let mut deps = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"dependency" => deps.push(parse_dependency(reader)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"dependencies" => return Ok(deps),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

/// `<dependencyManagement>` wraps a plain `<dependencies>` block.
fn parse_dependency_management(reader: &mut Reader<&[u8]>) -> PomdepResult<Vec<DepNode>> {
    let mut deps = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"dependencies" => deps = parse_dependencies(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"dependencyManagement" => {
                return Ok(deps);
            }
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_dependency(reader: &mut Reader<&[u8]>) -> PomdepResult<DepNode> {
    let mut group = String::new();
    let mut artifact = String::new();
    let mut version = String::new();
    let mut scope = String::new();
    let mut optional = false;
    let mut exclusions = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"groupId" => group = read_text(reader)?,
                b"artifactId" => artifact = read_text(reader)?,
                b"version" => version = read_text(reader)?,
                b"scope" => scope = read_text(reader)?,
                b"optional" => optional = read_text(reader)?.to_lowercase() == "true",
                b"exclusions" => exclusions = parse_exclusions(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"dependency" => {
                let mut dep =
                    DepNode::with_optional(Coord::new(&group, &artifact, &version, &scope), optional);
                dep.exclusions = exclusions;
                return Ok(dep);
            }
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_exclusions(reader: &mut Reader<&[u8]>) -> PomdepResult<Vec<Coord>> {
    let mut patterns = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"exclusion" => patterns.push(parse_exclusion(reader)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"exclusions" => return Ok(patterns),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_exclusion(reader: &mut Reader<&[u8]>) -> PomdepResult<Coord> {
    let mut group = String::new();
    let mut artifact = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"groupId" => group = read_text(reader)?,
                b"artifactId" => artifact = read_text(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"exclusion" => {
                return Ok(Coord::new(&group, &artifact, "", ""));
            }
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

/// Every child element is a property; a repeated key keeps its last
/// value, an empty element becomes the empty string.
fn parse_properties(reader: &mut Reader<&[u8]>) -> PomdepResult<IndexMap<String, String>> {
    let mut properties = IndexMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let key = String::from_utf8_lossy(e.name().as_ref()).to_string();
                properties.insert(key, read_text(reader)?);
            }
            Ok(Event::Empty(e)) => {
                let key = String::from_utf8_lossy(e.name().as_ref()).to_string();
                properties.insert(key, String::new());
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"properties" => return Ok(properties),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_profiles(reader: &mut Reader<&[u8]>) -> PomdepResult<Vec<RawProfile>> {
    let mut profiles = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"profile" => profiles.push(parse_profile(reader)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"profiles" => return Ok(profiles),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_profile(reader: &mut Reader<&[u8]>) -> PomdepResult<RawProfile> {
    let mut profile = RawProfile {
        activation: Activation::default(),
        dependencies: Vec::new(),
        management: Vec::new(),
        properties: IndexMap::new(),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"activation" => profile.activation = parse_activation(reader)?,
                b"dependencies" => profile.dependencies = parse_dependencies(reader)?,
                b"dependencyManagement" => {
                    profile.management = parse_dependency_management(reader)?;
                }
                b"properties" => profile.properties = parse_properties(reader)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"profile" => return Ok(profile),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_activation(reader: &mut Reader<&[u8]>) -> PomdepResult<Activation> {
    let mut activation = Activation::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"activeByDefault" => activation.active_by_default = Some(read_text(reader)?),
                b"jdk" => activation.jdk = Some(read_text(reader)?),
                b"property" => parse_activation_property(reader, &mut activation)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"activation" => return Ok(activation),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

fn parse_activation_property(
    reader: &mut Reader<&[u8]>,
    activation: &mut Activation,
) -> PomdepResult<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"name" => activation.property_name = Some(read_text(reader)?),
                b"value" => activation.property_value = Some(read_text(reader)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"property" => return Ok(()),
            Ok(Event::Eof) => return Err(truncated()),
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
}

/// Text content of the element whose start tag was just consumed.
/// Nested elements are skipped; an empty element yields `""`.
fn read_text(reader: &mut Reader<&[u8]>) -> PomdepResult<String> {
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                text = t.unescape().unwrap_or_default().to_string();
            }
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
        message: format!("failed to parse POM document: {err}"),
    }
    .into()
}

fn truncated() -> miette::Report {
    PomdepError::Xml {
        message: "unexpected end of POM document".to_string(),
    }
    .into()
}
