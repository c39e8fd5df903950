/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The result of a call into the XR runtime.
pub type XrResult<T> = Result<T, RuntimeError>;

/// A failed runtime call, carrying the runtime's (negative) result code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeError(pub i32);

impl RuntimeError {
    pub const VALIDATION_FAILURE: RuntimeError = RuntimeError(-1);
    pub const RUNTIME_FAILURE: RuntimeError = RuntimeError(-2);
    pub const OUT_OF_MEMORY: RuntimeError = RuntimeError(-3);
    pub const SIZE_INSUFFICIENT: RuntimeError = RuntimeError(-11);
    pub const HANDLE_INVALID: RuntimeError = RuntimeError(-12);
    pub const INSTANCE_LOST: RuntimeError = RuntimeError(-13);
    pub const SESSION_RUNNING: RuntimeError = RuntimeError(-14);
    pub const SESSION_NOT_RUNNING: RuntimeError = RuntimeError(-16);
    pub const SESSION_LOST: RuntimeError = RuntimeError(-17);
    pub const SYSTEM_INVALID: RuntimeError = RuntimeError(-18);
    pub const SWAPCHAIN_FORMAT_UNSUPPORTED: RuntimeError = RuntimeError(-27);
    pub const FORM_FACTOR_UNSUPPORTED: RuntimeError = RuntimeError(-34);
    pub const FORM_FACTOR_UNAVAILABLE: RuntimeError = RuntimeError(-35);
    pub const CALL_ORDER_INVALID: RuntimeError = RuntimeError(-37);
    pub const GRAPHICS_DEVICE_INVALID: RuntimeError = RuntimeError(-38);

    fn name(self) -> Option<&'static str> {
        let name = match self {
            RuntimeError::VALIDATION_FAILURE => "XR_ERROR_VALIDATION_FAILURE",
            RuntimeError::RUNTIME_FAILURE => "XR_ERROR_RUNTIME_FAILURE",
            RuntimeError::OUT_OF_MEMORY => "XR_ERROR_OUT_OF_MEMORY",
            RuntimeError::SIZE_INSUFFICIENT => "XR_ERROR_SIZE_INSUFFICIENT",
            RuntimeError::HANDLE_INVALID => "XR_ERROR_HANDLE_INVALID",
            RuntimeError::INSTANCE_LOST => "XR_ERROR_INSTANCE_LOST",
            RuntimeError::SESSION_RUNNING => "XR_ERROR_SESSION_RUNNING",
            RuntimeError::SESSION_NOT_RUNNING => "XR_ERROR_SESSION_NOT_RUNNING",
            RuntimeError::SESSION_LOST => "XR_ERROR_SESSION_LOST",
            RuntimeError::SYSTEM_INVALID => "XR_ERROR_SYSTEM_INVALID",
            RuntimeError::SWAPCHAIN_FORMAT_UNSUPPORTED => "XR_ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED",
            RuntimeError::FORM_FACTOR_UNSUPPORTED => "XR_ERROR_FORM_FACTOR_UNSUPPORTED",
            RuntimeError::FORM_FACTOR_UNAVAILABLE => "XR_ERROR_FORM_FACTOR_UNAVAILABLE",
            RuntimeError::CALL_ORDER_INVALID => "XR_ERROR_CALL_ORDER_INVALID",
            RuntimeError::GRAPHICS_DEVICE_INVALID => "XR_ERROR_GRAPHICS_DEVICE_INVALID",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "XR_UNKNOWN_ERROR ({})", self.0),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Errors raised while starting, running or ending a VR session.
#[derive(Debug, Error)]
pub enum Error {
    /// A callback or setting the session depends on was not provided.
    #[error("invalid API usage: {0}")]
    Configuration(&'static str),
    #[error("failed to get device information, is a device plugged in? ({0})")]
    RuntimeQuery(#[source] RuntimeError),
    #[error(
        "available graphics context version does not meet the following requirements: {0}"
    )]
    Capability(String),
    #[error(
        "failed to create VR session; the runtime may have additional requirements for the \
         graphics driver that are not met, other causes are possible too ({0})"
    )]
    SessionCreate(#[source] RuntimeError),
    #[error("failed to cleanly begin the VR session ({0})")]
    SessionBegin(#[source] RuntimeError),
    #[error("failed to cleanly end the VR session ({0})")]
    SessionEnd(#[source] RuntimeError),
    #[error("{0} ({1})")]
    FrameSync(&'static str, #[source] RuntimeError),
    #[error("failed to submit rendered frame ({0})")]
    FrameSubmit(#[source] RuntimeError),
    #[error("no format matching the runtime supported swapchain formats found")]
    FormatNegotiation,
    /// Any other runtime call that failed, with a description of what was attempted.
    #[error("{0} ({1})")]
    Runtime(&'static str, #[source] RuntimeError),
    #[error("none of the requested graphics bindings is supported by the runtime")]
    NoMatchingBinding,
    #[error("no VR session is running")]
    NoSession,
}
