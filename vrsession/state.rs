/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The session state transition table. The runtime decides which state a
//! session is in; this only maps each reported state to what the session has to
//! do about it. Runtime calls happen in `Session::handle_state_change_event`.

use vrsession_api::SessionState;

/// Whether the owner of a session should keep it or destroy it after a state
/// change was handled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifeExpectancy {
    KeepAlive,
    Destroy,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StateAction {
    Nothing,
    /// The runtime is ready for frames, begin the session.
    BeginSession,
    /// The runtime stopped frame submission. It will follow up with
    /// `Exiting`, so only end the session here, don't destroy it yet.
    EndSession,
    Destroy,
}

pub fn transition(state: SessionState) -> StateAction {
    match state {
        SessionState::Ready => StateAction::BeginSession,
        SessionState::Stopping => StateAction::EndSession,
        SessionState::Exiting | SessionState::LossPending => StateAction::Destroy,
        SessionState::Unknown
        | SessionState::Idle
        | SessionState::Synchronized
        | SessionState::Visible
        | SessionState::Focused => StateAction::Nothing,
    }
}

impl StateAction {
    pub fn life_expectancy(self) -> LifeExpectancy {
        match self {
            StateAction::Destroy => LifeExpectancy::Destroy,
            _ => LifeExpectancy::KeepAlive,
        }
    }
}
