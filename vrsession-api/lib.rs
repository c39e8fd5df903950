/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate defines the Rust API between a VR session engine, the XR runtime it
//! drives and the graphics backend it renders through. It is implemented by the
//! `vrsession` crate.

mod error;
mod events;
mod funcs;
mod graphics;
mod handle;
mod runtime;
mod view;

pub use error::Error;
pub use error::RuntimeError;
pub use error::XrResult;

pub use events::Event;
pub use events::SessionState;
pub use events::SessionStateChanged;

pub use funcs::BindGraphicsContextFn;
pub use funcs::CustomFuncs;
pub use funcs::DrawViewFn;
pub use funcs::UnbindGraphicsContextFn;

pub use graphics::GraphicsBinding;
pub use graphics::GraphicsBindingType;
pub use graphics::GraphicsContext;
pub use graphics::SessionBinding;
pub use graphics::SwapchainImage;

pub use handle::SessionHandle;
pub use handle::SpaceHandle;
pub use handle::SwapchainHandle;
pub use handle::SystemId;

pub use runtime::CompositionLayerProjection;
pub use runtime::CompositionLayerProjectionView;
pub use runtime::Duration;
pub use runtime::EnvironmentBlendMode;
pub use runtime::FormFactor;
pub use runtime::FrameEndInfo;
pub use runtime::FrameState;
pub use runtime::GraphicsRequirements;
pub use runtime::ReferenceSpaceType;
pub use runtime::Runtime;
pub use runtime::RuntimeProperties;
pub use runtime::SwapchainCreateInfo;
pub use runtime::SwapchainSubImage;
pub use runtime::SwapchainUsageFlags;
pub use runtime::Time;
pub use runtime::Version;
pub use runtime::ViewConfigurationType;
pub use runtime::ViewConfigurationView;

pub use view::DrawViewInfo;
pub use view::Fov;
pub use view::Native;
pub use view::Pose;
pub use view::View;
pub use view::ViewOrigin;
pub use view::Viewport;
