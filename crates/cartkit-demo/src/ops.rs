#![forbid(unsafe_code)]

//! Cart actions as typed on the command line.

use std::fmt;
use std::str::FromStr;

use cartkit_store::{CartStore, ItemId};

use crate::error::DemoError;

/// One cart operation: `inc:<id>`, `dec:<id>`, `del:<id>` or `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Increase(ItemId),
    Decrease(ItemId),
    Delete(ItemId),
    Reset,
}

impl Action {
    /// Apply to `store`. Returns whether the action touched an item.
    pub fn apply(self, store: &CartStore) -> bool {
        match self {
            Self::Increase(id) => store.increase_amount(id),
            Self::Decrease(id) => store.decrease_amount(id),
            Self::Delete(id) => store.delete_item(id),
            Self::Reset => {
                store.reset();
                true
            }
        }
    }
}

impl FromStr for Action {
    type Err = DemoError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == "reset" {
            return Ok(Self::Reset);
        }
        let (verb, id) = raw
            .split_once(':')
            .ok_or_else(|| DemoError::invalid(format!("unknown action `{raw}`")))?;
        let id: ItemId = id
            .trim()
            .parse()
            .map_err(|_| DemoError::invalid(format!("item id `{id}` is not a number")))?;
        match verb {
            "inc" => Ok(Self::Increase(id)),
            "dec" => Ok(Self::Decrease(id)),
            "del" => Ok(Self::Delete(id)),
            other => Err(DemoError::invalid(format!("unknown action `{other}`"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase(id) => write!(f, "inc:{id}"),
            Self::Decrease(id) => write!(f, "dec:{id}"),
            Self::Delete(id) => write!(f, "del:{id}"),
            Self::Reset => f.write_str("reset"),
        }
    }
}
