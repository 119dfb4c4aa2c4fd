//! Lookup enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed data order (1-based) in the
//! corresponding lookup table (`step_statuses`, `case_types`).

use serde::{Deserialize, Serialize};

/// Lookup ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant = $val ),+
        }

        impl $name {
            /// Return the database lookup ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database lookup ID, `None` for unknown IDs.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Wire / display label.
            pub fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

define_status_enum! {
    /// Workflow step status of a case.
    StepStatus {
        Unassigned = 1 => "UNASSIGNED",
        NotStarted = 2 => "NOT_STARTED",
        InProgress = 3 => "IN_PROGRESS",
        Completed = 4 => "COMPLETED",
    }
}

define_status_enum! {
    /// Kind of review work a case represents.
    CaseType {
        Abstraction = 1 => "abstraction",
        Consensus = 2 => "consensus",
        Physician = 3 => "physician",
        PeerReview = 4 => "peer-review",
    }
}

impl StepStatus {
    /// Human wording used in generated transition notes.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

impl CaseType {
    /// Only abstraction work is reviewed by two independent seats.
    pub fn is_paired(self) -> bool {
        matches!(self, Self::Abstraction)
    }
}
