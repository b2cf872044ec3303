use super::fields::FieldDef;
use super::{VOTABLE_NAMESPACE, VOTABLE_VERSION, XSI_NAMESPACE};
use crate::conesearch::ConeSearchError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Write;

type Result<T> = std::result::Result<T, ConeSearchError>;

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Replaces code points XML 1.0 cannot carry, even escaped, with U+FFFD.
pub(crate) fn xml_safe(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(
            value
                .chars()
                .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        )
    }
}

fn push_attr(elem: &mut BytesStart<'_>, key: &str, value: &str) {
    elem.push_attribute((key, xml_safe(value).as_ref()));
}

/// Incremental VOTable writer.
///
/// Elements are written in document order as the caller goes. The caller is
/// responsible for calling the `begin_*`/`end_*` pairs in matching order;
/// the inner buffer can be drained between rows with [`Self::get_mut`].
pub struct VoTableWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> VoTableWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn event<'a>(&mut self, event: Event<'a>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| ConeSearchError::Encoding(e.to_string()))
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.event(Event::Text(BytesText::new(&xml_safe(text))))?;
        self.end(name)
    }

    /// XML declaration, the `VOTABLE` root and the service description.
    pub fn begin_document(&mut self, description: &str) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("VOTABLE");
        root.push_attribute(("version", VOTABLE_VERSION));
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("xmlns", VOTABLE_NAMESPACE));
        let schema_location = format!("{} {}", VOTABLE_NAMESPACE, VOTABLE_NAMESPACE);
        root.push_attribute(("xsi:schemaLocation", schema_location.as_str()));
        self.event(Event::Start(root))?;

        self.text_element("DESCRIPTION", description)
    }

    /// Opens the results resource and table, declares the fields and opens
    /// the table data.
    pub fn begin_table(
        &mut self,
        name: &str,
        description: Option<&str>,
        fields: &[FieldDef],
    ) -> Result<()> {
        let mut resource = BytesStart::new("RESOURCE");
        resource.push_attribute(("type", "results"));
        self.event(Event::Start(resource))?;

        let mut table = BytesStart::new("TABLE");
        push_attr(&mut table, "name", name);
        self.event(Event::Start(table))?;

        if let Some(description) = description {
            self.text_element("DESCRIPTION", description)?;
        }
        for field in fields {
            self.write_field(field)?;
        }

        self.start("DATA")?;
        self.start("TABLEDATA")
    }

    fn write_field(&mut self, field: &FieldDef) -> Result<()> {
        let mut elem = BytesStart::new("FIELD");
        push_attr(&mut elem, "ID", &field.id);
        push_attr(&mut elem, "name", &field.name);
        if let Some(ucd) = &field.ucd {
            push_attr(&mut elem, "ucd", ucd);
        }
        elem.push_attribute(("datatype", field.datatype.as_str()));
        if let Some(arraysize) = field.arraysize() {
            elem.push_attribute(("arraysize", arraysize));
        }
        if let Some(unit) = &field.unit {
            push_attr(&mut elem, "unit", unit);
        }

        match &field.description {
            Some(description) => {
                self.event(Event::Start(elem))?;
                self.text_element("DESCRIPTION", description)?;
                self.end("FIELD")
            }
            None => self.event(Event::Empty(elem)),
        }
    }

    /// Writes one `TR`. `None` cells are written as empty `TD`s.
    pub fn write_row(&mut self, cells: &[Option<String>]) -> Result<()> {
        self.start("TR")?;
        for cell in cells {
            match cell {
                Some(text) => self.text_element("TD", text)?,
                None => self.event(Event::Empty(BytesStart::new("TD")))?,
            }
        }
        self.end("TR")
    }

    /// Closes the table data and the table, leaving the resource open.
    pub fn end_table(&mut self) -> Result<()> {
        self.end("TABLEDATA")?;
        self.end("DATA")?;
        self.end("TABLE")
    }

    /// Reports a failure that happened after the table was started.
    pub fn write_query_status_error(&mut self, message: &str) -> Result<()> {
        let mut info = BytesStart::new("INFO");
        info.push_attribute(("name", "QUERY_STATUS"));
        info.push_attribute(("value", "ERROR"));
        self.event(Event::Start(info))?;
        self.event(Event::Text(BytesText::new(&xml_safe(message))))?;
        self.end("INFO")
    }

    pub fn end_resource(&mut self) -> Result<()> {
        self.end("RESOURCE")
    }

    pub fn write_error_info(&mut self, message: &str) -> Result<()> {
        let mut info = BytesStart::new("INFO");
        info.push_attribute(("ID", "Error"));
        info.push_attribute(("name", "Error"));
        push_attr(&mut info, "value", message);
        self.event(Event::Empty(info))
    }

    pub fn end_document(&mut self) -> Result<()> {
        self.end("VOTABLE")?;
        self.writer
            .get_mut()
            .write_all(b"\n")
            .map_err(|e| ConeSearchError::Encoding(e.to_string()))
    }
}

/// Collapses line breaks and trims, so the message fits a single attribute line.
pub(crate) fn single_line(message: &str) -> String {
    message
        .split(['\n', '\r'])
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Builds the single-`INFO` error document returned for every failure.
pub fn error_document(description: &str, message: &str) -> Result<Vec<u8>> {
    let mut writer = VoTableWriter::new(Vec::new());
    writer.begin_document(description)?;
    writer.write_error_info(&single_line(message))?;
    writer.end_document()?;
    Ok(writer.into_inner())
}
