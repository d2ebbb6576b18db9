//! EWS request builders.

use chrono::{DateTime, Utc};

use super::envelope::soap_envelope;
use crate::error::RfcResult;
use crate::rfc::mapi::{PropTag, PropValue};
use crate::rfc::xml::XmlBuilder;

const EWS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parent folder of a folder search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    PublicFoldersRoot,
    Id(String),
}

impl FolderRef {
    fn write(&self, xml: &mut XmlBuilder) -> RfcResult<()> {
        match self {
            Self::PublicFoldersRoot => {
                xml.empty("t:DistinguishedFolderId", &[("Id", "publicfoldersroot")])?;
            }
            Self::Id(id) => {
                xml.empty("t:FolderId", &[("Id", id.as_str())])?;
            }
        }
        Ok(())
    }
}

/// UTC with no daylight saving, so all times in the request are UTC.
fn write_utc_time_zone(xml: &mut XmlBuilder) -> RfcResult<()> {
    xml.start("t:TimeZone", &[])?;
    xml.text_element("t:Bias", &[], "0")?;
    for transition in ["t:StandardTime", "t:DaylightTime"] {
        xml.start(transition, &[])?;
        xml.text_element("t:Bias", &[], "0")?;
        xml.text_element("t:Time", &[], "00:00:00")?;
        xml.text_element("t:DayOrder", &[], "1")?;
        xml.text_element("t:Month", &[], "1")?;
        xml.text_element("t:DayOfWeek", &[], "Sunday")?;
        xml.end()?;
    }
    xml.end()?;
    Ok(())
}

/// `GetUserAvailability` for several mailboxes with a merged-only view.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
pub fn get_user_availability(
    mailboxes: &[&str],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot_minutes: u32,
) -> RfcResult<String> {
    soap_envelope(|xml| {
        xml.start("m:GetUserAvailabilityRequest", &[])?;
        write_utc_time_zone(xml)?;
        xml.start("m:MailboxDataArray", &[])?;
        for mailbox in mailboxes {
            xml.start("t:MailboxData", &[])?;
            xml.start("t:Email", &[])?;
            xml.text_element("t:Address", &[], mailbox)?;
            xml.end()?;
            xml.text_element("t:AttendeeType", &[], "Required")?;
            xml.text_element("t:ExcludeConflicts", &[], "false")?;
            xml.end()?;
        }
        xml.end()?;
        xml.start("t:FreeBusyViewOptions", &[])?;
        xml.start("t:TimeWindow", &[])?;
        xml.text_element("t:StartTime", &[], &start.format(EWS_TIME_FORMAT).to_string())?;
        xml.text_element("t:EndTime", &[], &end.format(EWS_TIME_FORMAT).to_string())?;
        xml.end()?;
        xml.text_element(
            "t:MergedFreeBusyIntervalInMinutes",
            &[],
            &slot_minutes.to_string(),
        )?;
        xml.text_element("t:RequestedView", &[], "MergedOnly")?;
        xml.end()?;
        xml.end()?;
        Ok(())
    })
}

/// Shallow `FindFolder` below `parent`.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
pub fn find_folder(parent: &FolderRef) -> RfcResult<String> {
    soap_envelope(|xml| {
        xml.start("m:FindFolder", &[("Traversal", "Shallow")])?;
        xml.start("m:FolderShape", &[])?;
        xml.text_element("t:BaseShape", &[], "Default")?;
        xml.end()?;
        xml.start("m:ParentFolderIds", &[])?;
        parent.write(xml)?;
        xml.end()?;
        xml.end()?;
        Ok(())
    })
}

/// Shallow `FindItem` in a folder, returning ids and subjects.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
pub fn find_item(folder_id: &str) -> RfcResult<String> {
    soap_envelope(|xml| {
        xml.start("m:FindItem", &[("Traversal", "Shallow")])?;
        xml.start("m:ItemShape", &[])?;
        xml.text_element("t:BaseShape", &[], "IdOnly")?;
        xml.start("t:AdditionalProperties", &[])?;
        xml.empty("t:FieldURI", &[("FieldURI", "item:Subject")])?;
        xml.end()?;
        xml.end()?;
        xml.start("m:ParentFolderIds", &[])?;
        xml.empty("t:FolderId", &[("Id", folder_id)])?;
        xml.end()?;
        xml.end()?;
        Ok(())
    })
}

/// `CreateItem` of the hidden free/busy message for one recipient.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
pub fn create_item(folder_id: &str, subject: &str) -> RfcResult<String> {
    soap_envelope(|xml| {
        xml.start("m:CreateItem", &[("MessageDisposition", "SaveOnly")])?;
        xml.start("m:SavedItemFolderId", &[])?;
        xml.empty("t:FolderId", &[("Id", folder_id)])?;
        xml.end()?;
        xml.start("m:Items", &[])?;
        xml.start("t:Message", &[])?;
        xml.text_element("t:ItemClass", &[], "IPM.Post")?;
        xml.text_element("t:Subject", &[], subject)?;
        xml.end()?;
        xml.end()?;
        xml.end()?;
        Ok(())
    })
}

fn write_field_uri(xml: &mut XmlBuilder, tag: PropTag) -> RfcResult<()> {
    let ews_tag = tag.ews_tag();
    xml.empty(
        "t:ExtendedFieldURI",
        &[
            ("PropertyTag", ews_tag.as_str()),
            ("PropertyType", tag.kind.ews_type()),
        ],
    )?;
    Ok(())
}

/// `UpdateItem` writing MAPI properties onto an item.
///
/// Present values are set with `SetItemField`; empty multi-valued ones are
/// removed with `DeleteItemField`.
///
/// ## Errors
/// Returns `RfcError::XmlWrite` if the document cannot be produced.
pub fn update_item(
    item_id: &str,
    change_key: Option<&str>,
    props: &[(PropTag, PropValue)],
) -> RfcResult<String> {
    soap_envelope(|xml| {
        xml.start(
            "m:UpdateItem",
            &[
                ("ConflictResolution", "AlwaysOverwrite"),
                ("MessageDisposition", "SaveOnly"),
            ],
        )?;
        xml.start("m:ItemChanges", &[])?;
        xml.start("t:ItemChange", &[])?;
        match change_key {
            Some(key) => xml.empty("t:ItemId", &[("Id", item_id), ("ChangeKey", key)])?,
            None => xml.empty("t:ItemId", &[("Id", item_id)])?,
        };
        xml.start("t:Updates", &[])?;
        for (tag, value) in props {
            if value.is_empty() {
                xml.start("t:DeleteItemField", &[])?;
                write_field_uri(xml, *tag)?;
                xml.end()?;
                continue;
            }
            xml.start("t:SetItemField", &[])?;
            write_field_uri(xml, *tag)?;
            xml.start("t:Message", &[])?;
            xml.start("t:ExtendedProperty", &[])?;
            write_field_uri(xml, *tag)?;
            // Base64 blobs are sent unwrapped.
            let values: Vec<String> = value
                .to_strings()
                .into_iter()
                .map(|v| v.replace('\n', ""))
                .collect();
            if tag.kind.is_multi_valued() {
                xml.start("t:Values", &[])?;
                for v in &values {
                    xml.text_element("t:Value", &[], v)?;
                }
                xml.end()?;
            } else {
                xml.text_element("t:Value", &[], &values.concat())?;
            }
            xml.end()?;
            xml.end()?;
            xml.end()?;
        }
        xml.end()?;
        xml.end()?;
        xml.end()?;
        xml.end()?;
        Ok(())
    })
}
