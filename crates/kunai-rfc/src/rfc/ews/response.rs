//! EWS response parsers.

use super::envelope::response_body;
use crate::error::{RfcError, RfcResult};
use crate::rfc::xml::{ParseError, XmlElement};

/// Availability answer for one requested mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxAvailability {
    /// Merged status string, one digit per slot.
    Merged(String),
    Error { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub change_key: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub id: String,
    pub change_key: Option<String>,
    pub subject: String,
}

fn message_error(message: &XmlElement) -> Option<RfcError> {
    if message.attr("ResponseClass") != Some("Error") {
        return None;
    }
    let text = |name: &str| {
        message
            .child(name)
            .map(|e| e.text().to_string())
            .unwrap_or_default()
    };
    Some(RfcError::EwsError {
        code: text("ResponseCode"),
        message: text("MessageText"),
    })
}

/// The single `*ResponseMessage` of a one-operation response, checked for errors.
fn single_message<'a>(body: &'a XmlElement, name: &str) -> RfcResult<&'a XmlElement> {
    let message = body
        .find(name)
        .ok_or_else(|| ParseError::missing_element(name))?;
    match message_error(message) {
        Some(err) => Err(err),
        None => Ok(message),
    }
}

fn item_id(element: &XmlElement, id_element: &str) -> RfcResult<(String, Option<String>)> {
    let id = element
        .child(id_element)
        .ok_or_else(|| ParseError::missing_element(id_element))?;
    let value = id
        .attr("Id")
        .ok_or_else(|| ParseError::missing_attribute(id_element, "Id"))?;
    Ok((value.to_string(), id.attr("ChangeKey").map(str::to_string)))
}

/// Parses `GetUserAvailability`, one entry per mailbox in request order.
///
/// ## Errors
/// Returns `RfcError::SoapFault` or `RfcError::XmlParse` when the response
/// as a whole is unusable. Per-mailbox failures are returned as
/// [`MailboxAvailability::Error`].
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_availability(xml: &[u8]) -> RfcResult<Vec<MailboxAvailability>> {
    let body = response_body(xml)?;
    let array = body
        .find("FreeBusyResponseArray")
        .ok_or_else(|| ParseError::missing_element("FreeBusyResponseArray"))?;

    let mut out = Vec::new();
    for response in array.children_named("FreeBusyResponse") {
        if let Some(RfcError::EwsError { code, message }) = response
            .child("ResponseMessage")
            .and_then(message_error)
        {
            out.push(MailboxAvailability::Error { code, message });
            continue;
        }
        let merged = response
            .path(&["FreeBusyView", "MergedFreeBusy"])
            .map(|e| e.text().to_string())
            .unwrap_or_default();
        out.push(MailboxAvailability::Merged(merged));
    }
    Ok(out)
}

/// Parses `FindFolder` into the folders found.
///
/// ## Errors
/// Returns `RfcError::EwsError` when the operation failed.
pub fn parse_find_folder(xml: &[u8]) -> RfcResult<Vec<FolderEntry>> {
    let body = response_body(xml)?;
    let message = single_message(&body, "FindFolderResponseMessage")?;
    let Some(folders) = message.find("Folders") else {
        return Ok(Vec::new());
    };
    folders
        .children
        .iter()
        .filter(|f| f.child("FolderId").is_some())
        .map(|folder| -> RfcResult<FolderEntry> {
            let (id, change_key) = item_id(folder, "FolderId")?;
            Ok(FolderEntry {
                id,
                change_key,
                display_name: folder
                    .child("DisplayName")
                    .map(|e| e.text().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Parses `FindItem` into the items found.
///
/// ## Errors
/// Returns `RfcError::EwsError` when the operation failed.
pub fn parse_find_item(xml: &[u8]) -> RfcResult<Vec<ItemEntry>> {
    let body = response_body(xml)?;
    let message = single_message(&body, "FindItemResponseMessage")?;
    let Some(items) = message.find("Items") else {
        return Ok(Vec::new());
    };
    items
        .children
        .iter()
        .filter(|i| i.child("ItemId").is_some())
        .map(item_entry)
        .collect()
}

fn item_entry(item: &XmlElement) -> RfcResult<ItemEntry> {
    let (id, change_key) = item_id(item, "ItemId")?;
    Ok(ItemEntry {
        id,
        change_key,
        subject: item
            .child("Subject")
            .map(|e| e.text().to_string())
            .unwrap_or_default(),
    })
}

/// Parses `CreateItem` and returns the created item.
///
/// ## Errors
/// Returns `RfcError::EwsError` when the operation failed, and a parse
/// error if no item id came back.
pub fn parse_create_item(xml: &[u8]) -> RfcResult<ItemEntry> {
    let body = response_body(xml)?;
    let message = single_message(&body, "CreateItemResponseMessage")?;
    let item = message
        .find("Items")
        .and_then(|items| items.children.first())
        .ok_or_else(|| ParseError::missing_element("Items"))?;
    item_entry(item)
}

/// ## Errors
/// Returns `RfcError::EwsError` when the operation failed.
pub fn parse_update_item(xml: &[u8]) -> RfcResult<()> {
    let body = response_body(xml)?;
    single_message(&body, "UpdateItemResponseMessage")?;
    Ok(())
}

/// Picks the entry whose name equals `wanted`, ignoring ASCII case, or
/// failing that the first whose name contains it.
#[must_use]
pub fn match_by_name<'a, T>(
    entries: &'a [T],
    wanted: &str,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    entries
        .iter()
        .find(|e| name(*e).eq_ignore_ascii_case(wanted))
        .or_else(|| {
            let wanted = wanted.to_lowercase();
            entries
                .iter()
                .find(|e| name(*e).to_lowercase().contains(&wanted))
        })
}
