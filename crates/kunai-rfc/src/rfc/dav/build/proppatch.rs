//! `PROPPATCH` body for the per-user free/busy message.

use crate::error::RfcResult;
use crate::rfc::dav::namespace::Namespace;
use crate::rfc::mapi::{PropTag, PropValue};
use crate::rfc::xml::XmlBuilder;

/// Builds a `propertyupdate` that sets every non-empty property and removes
/// the empty multi-valued ones.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
#[tracing::instrument(skip(props), fields(count = props.len()))]
pub fn build_proppatch(props: &[(PropTag, PropValue)]) -> RfcResult<String> {
    let namespaces = [Namespace::DAV, Namespace::MAPI, Namespace::DATATYPE];
    let declarations: Vec<(String, &str)> = namespaces
        .iter()
        .filter_map(Namespace::declaration)
        .collect();
    let root_attrs: Vec<(&str, &str)> = declarations
        .iter()
        .map(|(key, value)| (key.as_str(), *value))
        .collect();

    let (set, remove): (Vec<_>, Vec<_>) = props.iter().partition(|(_, value)| !value.is_empty());

    let mut xml = XmlBuilder::new()?;
    xml.start("a:propertyupdate", &root_attrs)?;

    if !set.is_empty() {
        xml.start("a:set", &[])?;
        xml.start("a:prop", &[])?;
        for (tag, value) in &set {
            let name = format!("p:{}", tag.dav_name());
            let typed = [("dt:dt", tag.kind.dav_type())];
            if tag.kind.is_multi_valued() {
                xml.start(&name, &typed)?;
                for item in value.to_strings() {
                    xml.text_element("dt:v", &[], &item)?;
                }
                xml.end()?;
            } else {
                let text = value.to_strings().concat();
                xml.text_element(&name, &typed, &text)?;
            }
        }
        xml.end()?;
        xml.end()?;
    }

    if !remove.is_empty() {
        xml.start("a:remove", &[])?;
        xml.start("a:prop", &[])?;
        for (tag, _) in &remove {
            xml.empty(&format!("p:{}", tag.dav_name()), &[])?;
        }
        xml.end()?;
        xml.end()?;
    }

    xml.end()?;
    xml.finish()
}
