pub mod branch_info;
pub mod search;

use serde::Deserialize;
use serde::Deserializer;

use crate::options::Options;
use crate::upsource::UpsourceClient;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    ReviewSearch,
    BranchInfo,
}

/// per-branch verdict, failures never abort the whole run
pub async fn check_branch(client: &UpsourceClient, options: &Options, branch: &str) -> CheckResult {
    match options.check_strategy {
        Strategy::ReviewSearch => search::check(client, options, branch).await,
        Strategy::BranchInfo => branch_info::check(client, options, branch).await,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub is_pass: bool,
    pub message: String,
}

impl CheckResult {
    pub fn pass(message: String) -> CheckResult {
        CheckResult {
            is_pass: true,
            message,
        }
    }

    pub fn fail(message: String) -> CheckResult {
        CheckResult {
            is_pass: false,
            message,
        }
    }
}

// upsource encodes participant roles and states as bare numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Reviewer,
    Watcher,
    Other(u8),
}

impl From<u64> for Role {
    fn from(code: u64) -> Role {
        match code {
            1 => Role::Author,
            2 => Role::Reviewer,
            3 => Role::Watcher,
            other => Role::Other(u8::try_from(other).unwrap_or(u8::MAX)),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Role, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Role::from(u64::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unread,
    Read,
    Accepted,
    Rejected,
    Other(u8),
}

impl From<u64> for State {
    fn from(code: u64) -> State {
        match code {
            1 => State::Unread,
            2 => State::Read,
            3 => State::Accepted,
            4 => State::Rejected,
            other => State::Other(u8::try_from(other).unwrap_or(u8::MAX)),
        }
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<State, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(State::from(u64::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub role: Role,
    pub state: Option<State>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDescriptor {
    pub review_id: Option<ReviewIdRef>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl ReviewDescriptor {
    pub fn id(&self) -> Option<&str> {
        match self.review_id.as_ref().and_then(|r| r.review_id.as_deref()) {
            Some("") | None => None,
            Some(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIdRef {
    pub review_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewList {
    #[serde(default)]
    pub reviews: Vec<ReviewDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    pub can_create_review: Option<CanCreateReview>,
    pub review_info: Option<ReviewDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanCreateReview {
    #[serde(default)]
    pub is_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub reviewers: usize,
    pub accepted: usize,
}

impl Tally {
    /// accepted counts only reviewers, so accepted <= reviewers holds
    pub fn of(participants: &[Participant]) -> Tally {
        let reviewers = participants
            .iter()
            .filter(|p| p.role == Role::Reviewer)
            .count();
        let accepted = participants
            .iter()
            .filter(|p| p.role == Role::Reviewer && p.state == Some(State::Accepted))
            .count();
        Tally {
            reviewers,
            accepted,
        }
    }

    pub fn is_pass(self) -> bool {
        self.reviewers > 0 && self.accepted == self.reviewers
    }
}
