// Closed allow-list of QubeTalk routes

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QubeTalkEndpoint {
    /// Root resource; the upstream exposes it directly under the API prefix
    #[default]
    Messages,
    Channels,
    Inbox,
}

impl QubeTalkEndpoint {
    /// Exact match only
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "/messages" => Some(Self::Messages),
            "/channels" => Some(Self::Channels),
            "/inbox" => Some(Self::Inbox),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "/messages",
            Self::Channels => "/channels",
            Self::Inbox => "/inbox",
        }
    }

    /// Path appended after the API prefix
    pub fn upstream_suffix(&self) -> &'static str {
        match self {
            Self::Messages => "",
            Self::Channels => "/channels",
            Self::Inbox => "/inbox",
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Messages)
    }
}

impl fmt::Display for QubeTalkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
