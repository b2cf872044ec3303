//! VOTable parsing helpers for end-to-end assertions
//!
//! Parsing the whole body also proves the document is well-formed XML.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub ucd: Option<String>,
    pub datatype: Option<String>,
    pub unit: Option<String>,
}

/// The parts of a VOTable the tests assert on.
#[derive(Debug, Default)]
pub struct VoTableSummary {
    pub version: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldSummary>,
    pub rows: Vec<Vec<String>>,
    /// `value` of the `<INFO name="Error">` element of an error document.
    pub error: Option<String>,
    /// Text of a trailing `<INFO name="QUERY_STATUS">`.
    pub query_status: Option<String>,
}

impl VoTableSummary {
    /// Parses `xml`, panicking if it is not a well-formed VOTable.
    pub fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        let mut summary = VoTableSummary::default();
        let mut stack: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut row: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    if name == "VOTABLE" {
                        summary.version = attribute(&e, "version");
                    }
                    if name == "FIELD" {
                        summary.fields.push(field(&e));
                    }
                    if name == "TR" {
                        row.clear();
                    }
                    text.clear();
                    stack.push(name);
                }
                Ok(Event::Empty(e)) => match element_name(&e).as_str() {
                    "FIELD" => summary.fields.push(field(&e)),
                    "TD" => row.push(String::new()),
                    "INFO" if attribute(&e, "name").as_deref() == Some("Error") => {
                        summary.error = attribute(&e, "value");
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    text.push_str(&e.unescape().expect("Invalid text content"));
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let opened = stack.pop().expect("Unbalanced closing tag");
                    assert_eq!(opened, name, "Mismatched closing tag");
                    let parent = stack.last().map(String::as_str);
                    match (name.as_str(), parent) {
                        ("TD", _) => row.push(text.clone()),
                        ("TR", _) => summary.rows.push(row.clone()),
                        ("DESCRIPTION", Some("VOTABLE")) => {
                            summary.description = Some(text.trim().to_string())
                        }
                        ("INFO", _) => summary.query_status = Some(text.trim().to_string()),
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!(
                    "Malformed XML at position {}: {:?}\n{}",
                    reader.buffer_position(),
                    e,
                    xml
                ),
            }
        }

        assert!(stack.is_empty(), "Unclosed elements: {:?}", stack);
        assert!(summary.version.is_some(), "Missing VOTABLE root:\n{}", xml);
        summary
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Values of one column across all rows.
    pub fn column(&self, name: &str) -> Vec<&str> {
        let index = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .unwrap_or_else(|| panic!("No field named {}", name));
        self.rows.iter().map(|r| r[index].as_str()).collect()
    }
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .map(|a| a.expect("Invalid attribute"))
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| a.unescape_value().expect("Invalid attribute value").into_owned())
}

fn field(e: &BytesStart) -> FieldSummary {
    FieldSummary {
        name: attribute(e, "name").expect("FIELD without name"),
        ucd: attribute(e, "ucd"),
        datatype: attribute(e, "datatype"),
        unit: attribute(e, "unit"),
    }
}
