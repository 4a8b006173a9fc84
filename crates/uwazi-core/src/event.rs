//! Change notifications emitted by an [`IssueStore`](crate::store::IssueStore)
//! after each committed mutation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::issue::{Status, VoteDirection};

/// Capacity of the broadcast channel backends use for [`IssueEvent`]s.
/// Subscribers that fall further behind than this observe a lag error.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IssueEvent {
  Submitted {
    issue_id: Uuid,
  },
  Voted {
    issue_id:  Uuid,
    direction: VoteDirection,
  },
  StatusChanged {
    issue_id: Uuid,
    from:     Status,
    to:       Status,
  },
  Responded {
    issue_id: Uuid,
  },
  NoteAdded {
    issue_id: Uuid,
  },
  UpdatePosted {
    issue_id:  Uuid,
    is_public: bool,
  },
}

impl IssueEvent {
  pub fn issue_id(&self) -> Uuid {
    match self {
      Self::Submitted { issue_id }
      | Self::Voted { issue_id, .. }
      | Self::StatusChanged { issue_id, .. }
      | Self::Responded { issue_id }
      | Self::NoteAdded { issue_id }
      | Self::UpdatePosted { issue_id, .. } => *issue_id,
    }
  }
}
