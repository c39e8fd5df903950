/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

/// Traits to be implemented by graphics backends
use crate::DrawViewInfo;
use crate::Runtime;
use crate::SystemId;
use crate::Version;
use crate::ViewOrigin;

use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The graphics API a session renders with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GraphicsBindingType {
    OpenGL,
    D3D11,
}

impl GraphicsBindingType {
    /// The runtime extension that has to be available to use this binding.
    pub fn extension_name(self) -> &'static str {
        match self {
            GraphicsBindingType::OpenGL => "XR_KHR_opengl_enable",
            GraphicsBindingType::D3D11 => "XR_KHR_D3D11_enable",
        }
    }
}

/// The graphics API specific data chained into session creation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionBinding {
    OpenGL { display: u64, context: u64 },
    D3D11 { device: u64 },
}

/// One image of a swapchain. The header (`binding_type`) is allocated by the
/// graphics binding; `image` is filled in by the runtime.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwapchainImage {
    pub binding_type: GraphicsBindingType,
    /// The native image: a texture name for OpenGL, a texture pointer for D3D11.
    pub image: u64,
}

impl SwapchainImage {
    pub fn empty(binding_type: GraphicsBindingType) -> SwapchainImage {
        SwapchainImage {
            binding_type,
            image: 0,
        }
    }
}

/// A graphics context owned by the host application, bound for the lifetime of
/// a session.
pub trait GraphicsContext {
    fn api_version(&self) -> Version;

    /// The display connection the context lives on, if the platform has one.
    fn native_display(&self) -> u64 {
        0
    }

    /// The native context (OpenGL) or device (D3D11) handle.
    fn native_handle(&self) -> u64;

    /// Copies the view the host just rendered into a swapchain image.
    /// This is called on the thread the context is current on.
    fn blit_to_swapchain_image(&self, image: &SwapchainImage, info: &DrawViewInfo);
}

/// The graphics API specific part of a session: format negotiation, session
/// creation data, swapchain image allocation and submission.
pub trait GraphicsBinding {
    fn binding_type(&self) -> GraphicsBindingType;

    /// Checks the context's API version against what the runtime requires for
    /// `system`. On failure, returns a description of the unmet requirements.
    fn check_version_requirements(
        &self,
        context: &dyn GraphicsContext,
        runtime: &dyn Runtime,
        system: SystemId,
    ) -> Result<(), String>;

    fn init_from_context(&mut self, context: Rc<dyn GraphicsContext>);

    /// Only valid after `init_from_context`.
    fn session_binding(&self) -> Option<SessionBinding>;

    /// Picks one of the formats the runtime supports, or `None` if the binding
    /// can work with none of them.
    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<i64>;

    fn create_swapchain_images(&mut self, image_count: u32) -> Vec<SwapchainImage>;

    fn view_origin(&self) -> ViewOrigin;

    /// Hands a rendered view over to a swapchain image. While this method is
    /// being called, the binding has unique access to the image.
    fn submit_to_swapchain(&mut self, image: &SwapchainImage, info: &DrawViewInfo);
}
