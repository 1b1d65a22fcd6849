//! Core types shared by subscription managers and their collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one subscription manager client.
///
/// Each GUI instance gets its own client ID, as does the prefetcher, so their
/// subscriptions never affect each other.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        ClientId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId(s.to_string())
    }
}

/// Caller-chosen subscription identifier.
///
/// Unique within one manager across path and non-path subscriptions.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        SubscriptionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        SubscriptionId(s.to_string())
    }
}

/// Identifier of a top-level folder (TLF).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlfId(pub String);

impl fmt::Debug for TlfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TlfId({})", self.0)
    }
}

/// Name of a revision line within a TLF.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(pub String);

impl BranchName {
    /// The default, live revision line.
    pub fn master() -> Self {
        BranchName("master".to_string())
    }
}

/// A TLF plus one of its revision lines.
///
/// This is the unit the change source watches.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderBranch {
    pub tlf: TlfId,
    pub branch: BranchName,
}

impl FolderBranch {
    pub fn new(tlf: impl Into<String>, branch: BranchName) -> Self {
        Self {
            tlf: TlfId(tlf.into()),
            branch,
        }
    }

    /// Folder-branch on the master revision line.
    pub fn master(tlf: impl Into<String>) -> Self {
        Self::new(tlf, BranchName::master())
    }
}

impl fmt::Debug for FolderBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FolderBranch({}@{})", self.tlf.0, self.branch.0)
    }
}

/// Non-path topics a client can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    JournalStatus,
    OnlineStatus,
    DownloadStatus,
    FilesTabBadge,
    OverallSyncStatus,
    Settings,
    UploadStatus,
}

/// Path topics a client can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTopic {
    /// Entries of a directory changed.
    Children,
    /// Metadata of the node itself changed.
    Stat,
}

/// Identifier of a node, as reported by the change source.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A node the change source reported a mutation on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedNode {
    pub id: NodeId,
    pub folder_branch: FolderBranch,
    /// Plaintext path relative to the TLF root, when it is known.
    pub path: Option<String>,
}

impl ChangedNode {
    pub fn new(id: NodeId, folder_branch: FolderBranch, path: impl Into<String>) -> Self {
        Self {
            id,
            folder_branch,
            path: Some(path.into()),
        }
    }
}

/// Byte range touched by a local write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteRange {
    pub offset: u64,
    pub len: u64,
}

/// One entry of a batch of changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeChange {
    pub node: ChangedNode,
    /// Names of directory entries that changed, if the node is a directory.
    pub dir_updated: Vec<String>,
    /// Byte ranges that changed, if the node is a file.
    pub file_updated: Vec<WriteRange>,
}

impl NodeChange {
    pub fn new(node: ChangedNode) -> Self {
        Self {
            node,
            dir_updated: Vec::new(),
            file_updated: Vec::new(),
        }
    }
}

/// New identity of a TLF after a handle change (e.g. a rename or a resolved
/// social assertion).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlfHandle {
    pub tlf: TlfId,
    pub name: String,
}
