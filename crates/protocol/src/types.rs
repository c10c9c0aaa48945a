use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::Relation;

/// A server-issued transfer step.
///
/// Header keys are kept verbatim; HTTP treats them case-insensitively when
/// they are put on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, String>,
}

impl Link {
    /// Creates a link without extra headers.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            header: BTreeMap::new(),
        }
    }

    /// Adds a header to send with this step.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(name.into(), value.into());
        self
    }

    /// Returns true when `href` is an absolute http(s) URL.
    pub fn has_absolute_href(&self) -> bool {
        match url::Url::parse(&self.href) {
            Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
            Err(_) => false,
        }
    }
}

/// Negotiation payload for a single object.
///
/// Requests carry only `oid` and `size`; responses add the `_links` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectResource {
    #[serde(default)]
    pub oid: String,
    #[serde(default)]
    pub size: i64,
    #[serde(
        rename = "_links",
        alias = "links",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub links: Option<HashMap<String, Link>>,
}

impl ObjectResource {
    /// Builds the minimal request body sent to negotiation and verify.
    pub fn request(oid: impl Into<String>, size: i64) -> Self {
        Self {
            oid: oid.into(),
            size,
            links: None,
        }
    }

    /// Looks up a known relation.
    pub fn link(&self, relation: Relation) -> Option<&Link> {
        self.links.as_ref()?.get(relation.as_str())
    }

    /// Returns true when the server advertised `relation`.
    pub fn has_link(&self, relation: Relation) -> bool {
        self.link(relation).is_some()
    }

    /// Inserts or replaces a relation.
    pub fn set_link(&mut self, relation: &str, link: Link) {
        self.links
            .get_or_insert_with(HashMap::new)
            .insert(relation.to_string(), link);
    }

    /// Checks a negotiation response before any transfer starts.
    ///
    /// The `upload` relation is mandatory. Relations the upload follows
    /// (`upload`, `verify`) must point at an absolute http(s) URL; other
    /// relations are carried along unchecked.
    pub fn validate_for_upload(&self) -> Result<&Link, ProtocolError> {
        let upload = self
            .link(Relation::Upload)
            .ok_or(ProtocolError::MissingLink(Relation::Upload.as_str()))?;
        check_href(Relation::Upload, upload)?;

        for (name, link) in self.links.iter().flatten() {
            if let Some(relation @ Relation::Verify) = Relation::parse(name) {
                check_href(relation, link)?;
            }
        }

        Ok(upload)
    }

    /// Copy of this resource without links, as sent to the verify step.
    pub fn without_links(&self) -> Self {
        Self::request(self.oid.clone(), self.size)
    }
}

fn check_href(relation: Relation, link: &Link) -> Result<(), ProtocolError> {
    if link.has_absolute_href() {
        return Ok(());
    }
    Err(ProtocolError::InvalidHref {
        relation: relation.as_str().to_string(),
        href: link.href.clone(),
    })
}
