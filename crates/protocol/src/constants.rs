/// Media type used for every JSON exchange with the object API.
pub const MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Content type of the raw object bytes sent to an upload link.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Path segment appended to the configured API URL for negotiation.
pub const OBJECTS_PATH: &str = "objects";

/// Link relations this client understands.
///
/// Servers may return relations outside this set; they are kept in the
/// resource but never acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Upload,
    Verify,
    Download,
}

impl Relation {
    /// Name of the relation as it appears in the `_links` map.
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Upload => "upload",
            Relation::Verify => "verify",
            Relation::Download => "download",
        }
    }

    /// Parses a relation name. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "upload" => Some(Relation::Upload),
            "verify" => Some(Relation::Verify),
            "download" => Some(Relation::Download),
            _ => None,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
