use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `FUNC_START [name=type&value...]`
    FuncStart,
    /// `FUNC_END`
    FuncEnd,
    /// `malloc <bytes>`
    Malloc,
    /// `realloc <bytes>`
    Realloc,
    /// `free`
    Free,
    /// `mutex_lock <wait_ms>`
    MutexLock,
    /// `mutex_unlock <hold_ms> [implicit]`
    MutexUnlock,
    /// `cond_wait_returned <wait_ms>`
    CondWaitReturned,
    /// `cond_timedwait_returned <wait_ms>`
    CondTimedwaitReturned,
    /// `RPC_start`
    RpcStart,
    /// `RPC_end <remote_call_id>`
    RpcEnd,
    /// `pagefault <minor> <major>`
    PageFault,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FuncStart => "FUNC_START",
            EventKind::FuncEnd => "FUNC_END",
            EventKind::Malloc => "malloc",
            EventKind::Realloc => "realloc",
            EventKind::Free => "free",
            EventKind::MutexLock => "mutex_lock",
            EventKind::MutexUnlock => "mutex_unlock",
            EventKind::CondWaitReturned => "cond_wait_returned",
            EventKind::CondTimedwaitReturned => "cond_timedwait_returned",
            EventKind::RpcStart => "RPC_start",
            EventKind::RpcEnd => "RPC_end",
            EventKind::PageFault => "pagefault",
        }
    }

    /// Number of arguments that have to follow the kind on a line.
    /// `FUNC_START` takes any number of features.
    pub fn min_args(&self) -> usize {
        match self {
            EventKind::FuncStart | EventKind::FuncEnd | EventKind::Free | EventKind::RpcStart => 0,
            EventKind::PageFault => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FUNC_START" => Ok(EventKind::FuncStart),
            "FUNC_END" => Ok(EventKind::FuncEnd),
            "malloc" => Ok(EventKind::Malloc),
            "realloc" => Ok(EventKind::Realloc),
            "free" => Ok(EventKind::Free),
            "mutex_lock" => Ok(EventKind::MutexLock),
            "mutex_unlock" => Ok(EventKind::MutexUnlock),
            "cond_wait_returned" => Ok(EventKind::CondWaitReturned),
            "cond_timedwait_returned" => Ok(EventKind::CondTimedwaitReturned),
            "RPC_start" => Ok(EventKind::RpcStart),
            "RPC_end" => Ok(EventKind::RpcEnd),
            "pagefault" => Ok(EventKind::PageFault),
            other => Err(Error::UnknownEventKind(other.to_owned())),
        }
    }
}

/// Trailing token of a `mutex_unlock` emitted on behalf of a condition variable wait
pub const IMPLICIT_UNLOCK_TAG: &str = "implicit";
