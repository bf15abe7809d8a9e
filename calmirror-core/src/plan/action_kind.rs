use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Insert,
    Cancel,
    Skip,
}

impl ActionKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ActionKind::Insert => "+",
            ActionKind::Cancel => "x",
            ActionKind::Skip => "=",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Insert => write!(f, "insert"),
            ActionKind::Cancel => write!(f, "cancel"),
            ActionKind::Skip => write!(f, "skip"),
        }
    }
}
