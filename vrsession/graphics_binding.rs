/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The built-in graphics bindings. Both leave the actual rendering to the host's
//! graphics context and only deal with what the runtime needs to know.

use vrsession_api::DrawViewInfo;
use vrsession_api::GraphicsBinding;
use vrsession_api::GraphicsBindingType;
use vrsession_api::GraphicsContext;
use vrsession_api::GraphicsRequirements;
use vrsession_api::Runtime;
use vrsession_api::SessionBinding;
use vrsession_api::SwapchainImage;
use vrsession_api::SystemId;
use vrsession_api::Version;
use vrsession_api::ViewOrigin;

use log::debug;

use std::rc::Rc;

pub const GL_RGBA8: i64 = 0x8058;
pub const GL_RGBA16: i64 = 0x805B;
pub const GL_SRGB8_ALPHA8: i64 = 0x8C43;

pub const DXGI_FORMAT_R8G8B8A8_UNORM: i64 = 28;
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: i64 = 29;
pub const DXGI_FORMAT_B8G8R8A8_UNORM: i64 = 87;

/// Creates the binding for `binding_type`. It still has to be initialized from a
/// graphics context before use.
pub fn create_from_type(binding_type: GraphicsBindingType) -> Box<dyn GraphicsBinding> {
    match binding_type {
        GraphicsBindingType::OpenGL => Box::new(OpenGLBinding::default()),
        GraphicsBindingType::D3D11 => Box::new(D3D11Binding::default()),
    }
}

/// Returns the first of the binding's formats (in its order of preference) that
/// the runtime supports too.
pub fn choose_swapchain_format_from_candidates(
    binding_formats: &[i64],
    runtime_formats: &[i64],
) -> Option<i64> {
    binding_formats
        .iter()
        .find(|format| runtime_formats.contains(*format))
        .copied()
}

fn check_version(
    api_name: &str,
    version: Version,
    requirements: &GraphicsRequirements,
) -> Result<(), String> {
    // Patch levels aren't reported consistently, compare major.minor only.
    let version = Version::new(version.major, version.minor, 0);
    let min = requirements.min_api_version_supported;
    let max = requirements.max_api_version_supported;
    if version >= Version::new(min.major, min.minor, 0)
        && version <= Version::new(max.major, max.minor, 0)
    {
        return Ok(());
    }
    Err(format!(
        "Min {api} version {}.{}\nMax {api} version {}.{}\n",
        min.major,
        min.minor,
        max.major,
        max.minor,
        api = api_name
    ))
}

fn query_requirements(
    runtime: &dyn Runtime,
    system: SystemId,
    binding_type: GraphicsBindingType,
) -> Result<GraphicsRequirements, String> {
    runtime
        .graphics_requirements(system, binding_type)
        .map_err(|e| format!("failed to get graphics requirements from the runtime: {}", e))
}

#[derive(Default)]
pub struct OpenGLBinding {
    context: Option<Rc<dyn GraphicsContext>>,
}

impl GraphicsBinding for OpenGLBinding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::OpenGL
    }

    fn check_version_requirements(
        &self,
        context: &dyn GraphicsContext,
        runtime: &dyn Runtime,
        system: SystemId,
    ) -> Result<(), String> {
        let requirements = query_requirements(runtime, system, self.binding_type())?;
        check_version("OpenGL", context.api_version(), &requirements)
    }

    fn init_from_context(&mut self, context: Rc<dyn GraphicsContext>) {
        debug!("OpenGL binding uses context {:#x}", context.native_handle());
        self.context = Some(context);
    }

    fn session_binding(&self) -> Option<SessionBinding> {
        self.context.as_ref().map(|context| SessionBinding::OpenGL {
            display: context.native_display(),
            context: context.native_handle(),
        })
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<i64> {
        choose_swapchain_format_from_candidates(
            &[GL_RGBA8, GL_RGBA16, GL_SRGB8_ALPHA8],
            runtime_formats,
        )
    }

    fn create_swapchain_images(&mut self, image_count: u32) -> Vec<SwapchainImage> {
        (0..image_count)
            .map(|_| SwapchainImage::empty(GraphicsBindingType::OpenGL))
            .collect()
    }

    fn view_origin(&self) -> ViewOrigin {
        ViewOrigin::BottomLeft
    }

    fn submit_to_swapchain(&mut self, image: &SwapchainImage, info: &DrawViewInfo) {
        debug_assert_eq!(image.binding_type, GraphicsBindingType::OpenGL);
        if let Some(ref context) = self.context {
            context.blit_to_swapchain_image(image, info);
        }
    }
}

#[derive(Default)]
pub struct D3D11Binding {
    context: Option<Rc<dyn GraphicsContext>>,
}

impl GraphicsBinding for D3D11Binding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::D3D11
    }

    /// The context's API version is its feature level (11.0, 11.1, ...).
    fn check_version_requirements(
        &self,
        context: &dyn GraphicsContext,
        runtime: &dyn Runtime,
        system: SystemId,
    ) -> Result<(), String> {
        let requirements = query_requirements(runtime, system, self.binding_type())?;
        check_version("D3D feature level", context.api_version(), &requirements)
    }

    fn init_from_context(&mut self, context: Rc<dyn GraphicsContext>) {
        debug!("D3D11 binding uses device {:#x}", context.native_handle());
        self.context = Some(context);
    }

    fn session_binding(&self) -> Option<SessionBinding> {
        self.context.as_ref().map(|context| SessionBinding::D3D11 {
            device: context.native_handle(),
        })
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<i64> {
        choose_swapchain_format_from_candidates(
            &[
                DXGI_FORMAT_R8G8B8A8_UNORM,
                DXGI_FORMAT_B8G8R8A8_UNORM,
                DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
            ],
            runtime_formats,
        )
    }

    fn create_swapchain_images(&mut self, image_count: u32) -> Vec<SwapchainImage> {
        (0..image_count)
            .map(|_| SwapchainImage::empty(GraphicsBindingType::D3D11))
            .collect()
    }

    fn view_origin(&self) -> ViewOrigin {
        ViewOrigin::TopLeft
    }

    fn submit_to_swapchain(&mut self, image: &SwapchainImage, info: &DrawViewInfo) {
        debug_assert_eq!(image.binding_type, GraphicsBindingType::D3D11);
        if let Some(ref context) = self.context {
            context.blit_to_swapchain_image(image, info);
        }
    }
}
