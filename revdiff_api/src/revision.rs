use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use super::visibility::DeletionFlags;

/// Concrete revision identifier. Sentinel values never fit in this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(NonZeroU64);

impl RevisionId {
    /// Wrap a raw id, returning `None` for the `0` sentinel.
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Raw integer value.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the page owning a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

/// The `new` half of a revision specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewSpec {
    /// Literal id; `0` means "the current revision".
    Id(u64),
    /// The revision preceding `old`, with `old` becoming the new side.
    Prev,
    /// The revision following `old`.
    Next,
}

/// Loosely specified revision pair as received from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSpecifier {
    /// Old revision id; `0` asks for the predecessor of the new side.
    pub old: u64,
    /// New revision id or relative marker.
    pub new: NewSpec,
}

impl RevisionSpecifier {
    /// Explicit pair of literal ids.
    pub const fn ids(old: u64, new: u64) -> Self {
        Self {
            old,
            new: NewSpec::Id(new),
        }
    }

    /// Compare `revision` against the one before it.
    pub const fn prev(revision: u64) -> Self {
        Self {
            old: revision,
            new: NewSpec::Prev,
        }
    }

    /// Compare `revision` against the one after it.
    pub const fn next(revision: u64) -> Self {
        Self {
            old: revision,
            new: NewSpec::Next,
        }
    }
}

/// Resolution state of the old side.
///
/// `Unresolved` and `NoPredecessor` are deliberately distinct: the first asks
/// the loader to derive the predecessor of the new revision, the second is an
/// already-known absence that must stay absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OldRef {
    /// Literal zero: derive from the new revision once it is loaded.
    Unresolved,
    /// There is no earlier revision to compare against.
    NoPredecessor,
    /// Concrete revision id.
    Id(RevisionId),
}

impl OldRef {
    /// Interpret a raw request value.
    pub const fn from_raw(raw: u64) -> Self {
        match RevisionId::new(raw) {
            Some(id) => Self::Id(id),
            None => Self::Unresolved,
        }
    }

    /// The concrete id, if any.
    pub const fn id(self) -> Option<RevisionId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Unresolved | Self::NoPredecessor => None,
        }
    }
}

/// Resolution state of the new side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewRef {
    /// Literal zero: the page's current revision.
    Current,
    /// Concrete revision id.
    Id(RevisionId),
}

impl NewRef {
    /// Interpret a raw request value.
    pub const fn from_raw(raw: u64) -> Self {
        match RevisionId::new(raw) {
            Some(id) => Self::Id(id),
            None => Self::Current,
        }
    }

    /// The concrete id, if any.
    pub const fn id(self) -> Option<RevisionId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Current => None,
        }
    }
}

/// A specifier after relative markers have been looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIds {
    /// Old side.
    pub old: OldRef,
    /// New side.
    pub new: NewRef,
}

/// Content model tag attached to serialized content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentModel {
    /// Wiki markup.
    Wikitext,
    /// Plain text.
    Text,
    /// Stylesheet source.
    Css,
    /// Script source.
    JavaScript,
    /// JSON document.
    Json,
    /// Any model without a text serialization suitable for line diffs.
    Other(String),
}

impl ContentModel {
    /// Whether line-oriented diff backends apply to this model.
    pub const fn is_text(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Stable name used in problem reports and logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Wikitext => "wikitext",
            Self::Text => "text",
            Self::Css => "css",
            Self::JavaScript => "javascript",
            Self::Json => "json",
            Self::Other(name) => name,
        }
    }
}

impl Default for ContentModel {
    fn default() -> Self {
        Self::Wikitext
    }
}

/// Serialized revision content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlob {
    /// Model of the serialized text.
    #[serde(default)]
    pub model: ContentModel,
    /// Serialized text.
    pub text: String,
}

impl ContentBlob {
    /// Create a blob with an explicit model.
    pub fn new(model: ContentModel, text: impl Into<String>) -> Self {
        Self {
            model,
            text: text.into(),
        }
    }

    /// Create a wikitext blob.
    pub fn wikitext(text: impl Into<String>) -> Self {
        Self::new(ContentModel::Wikitext, text)
    }
}

/// Immutable snapshot of a page at one point in time.
///
/// Fields are private; builder methods consume the value, so a record cannot
/// change once it has been handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    id: RevisionId,
    page: PageId,
    timestamp: i64,
    #[serde(default)]
    deleted: DeletionFlags,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    content_model: ContentModel,
}

impl RevisionRecord {
    /// Create a visible wikitext revision without author information.
    pub const fn new(id: RevisionId, page: PageId, timestamp: i64) -> Self {
        Self {
            id,
            page,
            timestamp,
            deleted: DeletionFlags::empty(),
            author: None,
            content_model: ContentModel::Wikitext,
        }
    }

    /// Set the deletion/suppression flags.
    #[must_use]
    pub fn with_deleted(mut self, deleted: DeletionFlags) -> Self {
        self.deleted = deleted;
        self
    }

    /// Set the author name.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the content model of the revision's main content.
    #[must_use]
    pub fn with_content_model(mut self, model: ContentModel) -> Self {
        self.content_model = model;
        self
    }

    /// Revision identifier.
    pub const fn id(&self) -> RevisionId {
        self.id
    }

    /// Owning page.
    pub const fn page(&self) -> PageId {
        self.page
    }

    /// Unix timestamp (seconds) of the revision.
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Deletion/suppression flags.
    pub const fn deleted(&self) -> DeletionFlags {
        self.deleted
    }

    /// Whether every bit of `field` is set on this revision.
    pub const fn is_deleted(&self, field: DeletionFlags) -> bool {
        self.deleted.contains(field)
    }

    /// Author name when recorded.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Content model of the main content.
    pub const fn content_model(&self) -> &ContentModel {
        &self.content_model
    }
}

/// Trace of a revision that has been moved to the deletion archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRevision {
    /// Page the revision belonged to.
    pub page: PageId,
    /// Unix timestamp (seconds) of the archived revision.
    pub timestamp: i64,
}
