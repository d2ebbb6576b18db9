//! Request body builder over `quick_xml::Writer`.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{RfcError, RfcResult};

/// Incremental XML document writer.
///
/// Tracks open elements so that [`XmlBuilder::finish`] can reject a
/// document whose elements were not all closed.
pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
}

impl XmlBuilder {
    /// Starts a document with an XML declaration.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` if the declaration cannot be written.
    pub fn new() -> RfcResult<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        Ok(Self {
            writer,
            open: Vec::new(),
        })
    }

    /// Opens an element with attributes.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` on writer failure.
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> RfcResult<&mut Self> {
        let mut element = BytesStart::new(name);
        for attr in attributes {
            element.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(element))?;
        self.open.push(name.to_owned());
        Ok(self)
    }

    /// Closes the innermost open element.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` if no element is open.
    pub fn end(&mut self) -> RfcResult<&mut Self> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| RfcError::XmlWrite("end without open element".into()))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Writes a self-closing element.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` on writer failure.
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> RfcResult<&mut Self> {
        let mut element = BytesStart::new(name);
        for attr in attributes {
            element.push_attribute(*attr);
        }
        self.writer.write_event(Event::Empty(element))?;
        Ok(self)
    }

    /// Writes escaped character data.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` on writer failure.
    pub fn text(&mut self, text: &str) -> RfcResult<&mut Self> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    /// Writes `<name attrs>text</name>`.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` on writer failure.
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> RfcResult<&mut Self> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end()
    }

    /// Returns the finished document.
    ///
    /// ## Errors
    /// Returns `RfcError::XmlWrite` if elements remain open.
    pub fn finish(self) -> RfcResult<String> {
        if let Some(name) = self.open.last() {
            return Err(RfcError::XmlWrite(format!("unclosed element: {name}")));
        }
        String::from_utf8(self.writer.into_inner()).map_err(|e| RfcError::XmlWrite(e.to_string()))
    }
}
