//! Core types shared between daemon and client.

use serde::{Deserialize, Serialize};

/// The source table a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    /// Plain text messages.
    Sms,
    /// Multimedia messages (attachments, quotes, group updates).
    Mms,
}

impl MessageCategory {
    /// Both categories, in the order their search branches are unioned.
    pub const ALL: [MessageCategory; 2] = [MessageCategory::Sms, MessageCategory::Mms];

    /// Discriminator carried on every search result row.
    pub fn is_mms(&self) -> bool {
        matches!(self, MessageCategory::Mms)
    }

    /// Parse a category from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sms" => Some(MessageCategory::Sms),
            "mms" => Some(MessageCategory::Mms),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessageCategory::Sms => "sms",
            MessageCategory::Mms => "mms",
        }
    }
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit layout of the message type/flags column.
pub mod message_types {
    /// Low bits holding the base message type.
    pub const BASE_TYPE_MASK: i64 = 0x1F;

    /// Base type of a "contact changed their profile" notice.
    pub const PROFILE_CHANGE_TYPE: i64 = 7;
    /// Base type of a group call notice.
    pub const GROUP_CALL_TYPE: i64 = 12;

    /// Set on group (v2) membership/update messages.
    pub const GROUP_V2_BIT: i64 = 0x80000;

    /// Special-type bits used by payment notifications.
    pub const SPECIAL_TYPE_PAYMENTS_NOTIFICATION: i64 = 0x3_0000_0000;

    /// Extract the base type from a flags value.
    pub fn base_type(flags: i64) -> i64 {
        flags & BASE_TYPE_MASK
    }

    pub fn is_group_v2(flags: i64) -> bool {
        flags & GROUP_V2_BIT != 0
    }
}

/// A single full-text search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRow {
    /// Recipient that owns the conversation the message belongs to.
    pub conversation_recipient: i64,
    /// Recipient that sent the message.
    pub message_recipient: i64,
    /// Excerpt around the matched terms.
    pub snippet: String,
    /// Received timestamp in milliseconds, comparable across categories.
    pub date_received: i64,
    pub thread_id: i64,
    /// Full message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub message_id: i64,
    /// Whether the hit came from the multimedia table.
    pub is_mms: bool,
}

impl SearchResultRow {
    /// Category the hit came from.
    pub fn category(&self) -> MessageCategory {
        if self.is_mms {
            MessageCategory::Mms
        } else {
            MessageCategory::Sms
        }
    }
}

/// A message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub thread_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Received timestamp in milliseconds.
    pub date_received: i64,
    /// Sender of the message.
    pub recipient_id: i64,
    /// Type/flags bitmask, see [`message_types`].
    #[serde(default)]
    pub type_flags: i64,
}

/// Changes to apply to a stored message. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    /// New body. `Some(None)` (JSON `null`) clears it.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_flags: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
}

// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl MessagePatch {
    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.type_flags.is_none() && self.thread_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::message_types::*;
    use super::*;

    #[test]
    fn test_category_names() {
        for category in MessageCategory::ALL {
            assert_eq!(MessageCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(MessageCategory::from_name("fax"), None);
        assert!(MessageCategory::Mms.is_mms());
        assert!(!MessageCategory::Sms.is_mms());
    }

    #[test]
    fn test_base_type_ignores_high_bits() {
        let flags = GROUP_CALL_TYPE | GROUP_V2_BIT | 0x100;
        assert_eq!(base_type(flags), GROUP_CALL_TYPE);
        assert!(is_group_v2(flags));
        assert!(!is_group_v2(PROFILE_CHANGE_TYPE));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(MessagePatch::default().is_empty());
        let patch = MessagePatch {
            body: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_null_body_clears() {
        let patch: MessagePatch = serde_json::from_str(r#"{"body":null}"#).unwrap();
        assert_eq!(patch.body, Some(None));

        let patch: MessagePatch = serde_json::from_str(r#"{"type_flags":7}"#).unwrap();
        assert_eq!(patch.body, None);
        assert_eq!(patch.type_flags, Some(7));
    }
}
