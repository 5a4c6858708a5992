use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MESSAGE: &str = "message";
pub const CONVERSATION_UPDATE: &str = "conversationUpdate";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivityError {
    #[error("activity is missing {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// The subset of a Bot Framework activity this service reads or writes.
/// Unknown fields are ignored on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

/// What the service does with an inbound activity.
#[derive(Debug, PartialEq, Eq)]
pub enum ActivityKind<'a> {
    Message { session_id: &'a str, text: &'a str },
    MembersAdded(&'a [ChannelAccount]),
    Other,
}

impl Activity {
    pub fn kind(&self) -> Result<ActivityKind<'_>, ActivityError> {
        match self.activity_type.as_str() {
            MESSAGE => {
                let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) else {
                    return Ok(ActivityKind::Other);
                };
                let session_id = self
                    .conversation
                    .as_ref()
                    .map(|c| c.id.as_str())
                    .filter(|id| !id.is_empty())
                    .ok_or(ActivityError::MissingField("conversation.id"))?;
                Ok(ActivityKind::Message { session_id, text })
            }
            CONVERSATION_UPDATE if !self.members_added.is_empty() => {
                Ok(ActivityKind::MembersAdded(&self.members_added))
            }
            _ => Ok(ActivityKind::Other),
        }
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.recipient.as_ref().map(|r| r.id.as_str())
    }

    /// A text message addressed back to the sender of `self`.
    pub fn reply(&self, text: &str) -> Activity {
        Activity {
            activity_type: MESSAGE.to_string(),
            id: None,
            text: Some(text.to_string()),
            service_url: self.service_url.clone(),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            members_added: Vec::new(),
            reply_to_id: self.id.clone(),
        }
    }
}
