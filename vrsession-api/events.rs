/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::SessionHandle;
use crate::Time;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The lifecycle state of a session, as reported by the runtime.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionState {
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Unknown
    }
}

impl SessionState {
    /// Whether the runtime considers a session in this state to be running,
    /// i.e. frames may (and should) be submitted.
    pub fn is_running(self) -> bool {
        match self {
            SessionState::Ready
            | SessionState::Synchronized
            | SessionState::Visible
            | SessionState::Focused => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionStateChanged {
    pub session: SessionHandle,
    pub state: SessionState,
    pub time: Time,
}

/// Events delivered by the runtime's event queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    SessionStateChanged(SessionStateChanged),
    /// The runtime is about to lose the instance; all sessions have to go.
    InstanceLossPending { loss_time: Time },
    /// The event queue overflowed and events were dropped.
    EventsLost { lost_event_count: u32 },
}
