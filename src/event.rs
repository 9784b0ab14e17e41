//! Normalization of GitHub webhook payloads into [`EventRecord`]s.
//!
//! Only `push` and `pull_request` deliveries produce records. Payloads are
//! deserialized into typed structs first, so a missing field surfaces as a
//! [`NormalizeError::MalformedPayload`] instead of being defaulted.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

/// The value of the `X-GitHub-Event` header, restricted to what we handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Ping,
    Push,
    PullRequest,
}

impl FromStr for EventKind {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(Self::Ping),
            "push" => Ok(Self::Push),
            "pull_request" => Ok(Self::PullRequest),
            other => Err(NormalizeError::InvalidEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ping => "ping",
            Self::Push => "push",
            Self::PullRequest => "pull_request",
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub head_commit: Commit,
    pub pusher: Pusher,
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    pub id: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct Pusher {
    pub name: String,
}

/// Only `action` is read up front; the pull request itself is decoded once
/// the action says it produces a record.
#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: Option<serde_json::Value>,
}

/// Fields shared by opened and merged pull requests.
#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub user: User,
    pub head: GitRef,
    pub base: GitRef,
}

#[derive(Debug, Deserialize)]
struct Opened {
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct Merged {
    merged_at: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// A normalized repository event, as stored and as listed by `GET /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub request_id: String,
    pub author: String,
    #[serde(flatten)]
    pub action: EventAction,
    pub timestamp: String,
}

/// Classified event kind. A push has no source branch, so the variant has
/// no field for one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    Push {
        to_branch: String,
    },
    PullRequest {
        from_branch: String,
        to_branch: String,
    },
    Merge {
        from_branch: String,
        to_branch: String,
    },
}

impl EventAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Push { .. } => "PUSH",
            Self::PullRequest { .. } => "PULL_REQUEST",
            Self::Merge { .. } => "MERGE",
        }
    }

    pub fn from_branch(&self) -> Option<&str> {
        match self {
            Self::Push { .. } => None,
            Self::PullRequest { from_branch, .. } | Self::Merge { from_branch, .. } => {
                Some(from_branch.as_str())
            }
        }
    }

    pub fn to_branch(&self) -> &str {
        match self {
            Self::Push { to_branch }
            | Self::PullRequest { to_branch, .. }
            | Self::Merge { to_branch, .. } => to_branch.as_str(),
        }
    }
}

impl EventRecord {
    /// The activity line shown on the dashboard.
    pub fn describe(&self) -> String {
        match &self.action {
            EventAction::Push { to_branch } => {
                format!("{} pushed to {} on {}", self.author, to_branch, self.timestamp)
            }
            EventAction::PullRequest {
                from_branch,
                to_branch,
            } => format!(
                "{} submitted a pull request from {} to {} on {}",
                self.author, from_branch, to_branch, self.timestamp
            ),
            EventAction::Merge {
                from_branch,
                to_branch,
            } => format!(
                "{} merged branch {} to {} on {}",
                self.author, from_branch, to_branch, self.timestamp
            ),
        }
    }
}

/// Outcome of a successful normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Record(EventRecord),
    Ignored,
}

/// Maps a webhook delivery onto a record, or decides it should be ignored.
///
/// `ping` is acknowledged by the endpoint before it gets here; passing it in
/// is treated like any other unsupported type.
pub fn normalize(
    kind: EventKind,
    payload: serde_json::Value,
) -> Result<Normalized, NormalizeError> {
    match kind {
        EventKind::Push => {
            let payload: PushPayload = serde_json::from_value(payload)?;
            Ok(Normalized::Record(from_push(payload)))
        }
        EventKind::PullRequest => {
            let payload: PullRequestPayload = serde_json::from_value(payload)?;
            from_pull_request(payload)
        }
        EventKind::Ping => Err(NormalizeError::InvalidEventType(kind.to_string())),
    }
}

fn from_push(payload: PushPayload) -> EventRecord {
    EventRecord {
        request_id: payload.head_commit.id,
        author: payload.pusher.name,
        action: EventAction::Push {
            to_branch: branch_name(&payload.git_ref).to_string(),
        },
        timestamp: payload.head_commit.timestamp,
    }
}

fn from_pull_request(payload: PullRequestPayload) -> Result<Normalized, NormalizeError> {
    let opened = match payload.action.as_str() {
        "opened" => true,
        "closed" => false,
        _ => return Ok(Normalized::Ignored),
    };

    let pr = payload.pull_request.ok_or_else(|| missing("pull_request"))?;

    if !opened && !is_merged(&pr)? {
        return Ok(Normalized::Ignored);
    }

    let common = PullRequest::deserialize(&pr)?;
    let (from_branch, to_branch) = (common.head.name, common.base.name);
    let (action, timestamp) = if opened {
        let Opened { created_at } = Opened::deserialize(&pr)?;
        (
            EventAction::PullRequest {
                from_branch,
                to_branch,
            },
            created_at,
        )
    } else {
        let Merged { merged_at } = Merged::deserialize(&pr)?;
        (
            EventAction::Merge {
                from_branch,
                to_branch,
            },
            merged_at,
        )
    };

    Ok(Normalized::Record(EventRecord {
        request_id: common.id.to_string(),
        author: common.user.login,
        action,
        timestamp,
    }))
}

/// `merged` must be present on a closed pull request; `null` counts as not
/// merged.
fn is_merged(pr: &serde_json::Value) -> Result<bool, NormalizeError> {
    match pr.get("merged") {
        None => Err(missing("merged")),
        Some(serde_json::Value::Bool(merged)) => Ok(*merged),
        Some(serde_json::Value::Null) => Ok(false),
        Some(other) => Err(NormalizeError::MalformedPayload(format!(
            "invalid type for `merged`: {other}"
        ))),
    }
}

fn missing(field: &str) -> NormalizeError {
    NormalizeError::MalformedPayload(format!("missing field `{field}`"))
}

/// Last `/`-separated segment of a ref: `refs/heads/main` -> `main`.
fn branch_name(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}
