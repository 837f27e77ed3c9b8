//! Reference pattern categories.

use std::fmt;
use std::str::FromStr;

use ghcore_entities::NodeType;
use serde::{Deserialize, Serialize};

/// The kind of reference a matched text was found by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkCategory {
    #[serde(rename = "Issue_PR")]
    IssuePr,
    #[serde(rename = "SHA")]
    Sha,
    Actor,
    Repo,
    #[serde(rename = "Branch_Tag_GHDir")]
    BranchTagDir,
    CommitComment,
    Gollum,
    Release,
    #[serde(rename = "GitHub_Files_FileChanges")]
    FilesFileChanges,
    #[serde(rename = "GitHub_Other_Links")]
    OtherLinks,
    #[serde(rename = "GitHub_Other_Service")]
    OtherService,
    #[serde(rename = "GitHub_Service_External_Links")]
    ExternalLinks,
}

impl LinkCategory {
    pub const ALL: [Self; 12] = [
        Self::IssuePr,
        Self::Sha,
        Self::Actor,
        Self::Repo,
        Self::BranchTagDir,
        Self::CommitComment,
        Self::Gollum,
        Self::Release,
        Self::FilesFileChanges,
        Self::OtherLinks,
        Self::OtherService,
        Self::ExternalLinks,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IssuePr => "Issue_PR",
            Self::Sha => "SHA",
            Self::Actor => "Actor",
            Self::Repo => "Repo",
            Self::BranchTagDir => "Branch_Tag_GHDir",
            Self::CommitComment => "CommitComment",
            Self::Gollum => "Gollum",
            Self::Release => "Release",
            Self::FilesFileChanges => "GitHub_Files_FileChanges",
            Self::OtherLinks => "GitHub_Other_Links",
            Self::OtherService => "GitHub_Other_Service",
            Self::ExternalLinks => "GitHub_Service_External_Links",
        }
    }

    /// Entity types a reference of this category may resolve to.
    #[must_use]
    pub const fn candidates(self) -> &'static [NodeType] {
        use NodeType::{
            Actor, Branch, Commit, CommitComment, Gollum, Issue, IssueComment, Obj, PullRequest,
            PullRequestReview, PullRequestReviewComment, Release, Repo, Tag,
        };
        match self {
            Self::IssuePr => &[
                Issue,
                PullRequest,
                IssueComment,
                PullRequestReview,
                PullRequestReviewComment,
                Obj,
            ],
            Self::Sha => &[Commit, Obj],
            Self::Actor => &[Actor, Obj],
            Self::Repo => &[Repo, Obj],
            Self::BranchTagDir => &[Branch, Tag, Obj],
            Self::CommitComment => &[CommitComment, Obj],
            Self::Gollum => &[Gollum, Obj],
            Self::Release => &[Release, Obj],
            Self::FilesFileChanges | Self::OtherLinks | Self::OtherService | Self::ExternalLinks => {
                &[Obj]
            }
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkCategory {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or("unknown link category")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for category in LinkCategory::ALL {
            assert_eq!(category.as_str().parse(), Ok(category));
        }
        assert_eq!("sha".parse(), Ok(LinkCategory::Sha));
        assert!("Discussion".parse::<LinkCategory>().is_err());
    }

    #[test]
    fn every_category_admits_obj() {
        for category in LinkCategory::ALL {
            assert_eq!(category.candidates().last(), Some(&NodeType::Obj));
        }
        assert_eq!(LinkCategory::Sha.candidates(), &[NodeType::Commit, NodeType::Obj]);
    }
}
