/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate implements the VR session lifecycle and frame submission engine on
//! top of the runtime and graphics traits of `vrsession-api`.

#[cfg(feature = "headless")]
pub mod headless;

pub mod graphics_binding;
pub mod state;

mod context;
mod draw_info;
mod session;
mod swapchain;

pub use context::Context;
pub use context::ContextCreateInfo;
pub use context::ContextFlags;
pub use context::RuntimeId;

pub use draw_info::DrawInfo;
pub use draw_info::FrameTimings;
pub use draw_info::AVERAGE_FRAME_COUNT;

pub use session::Session;
pub use session::SessionBeginInfo;
pub use session::SessionSettings;

pub use state::LifeExpectancy;
