/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use vrsession_api::Error;
use vrsession_api::GraphicsBinding;
use vrsession_api::Runtime;
use vrsession_api::RuntimeError;
use vrsession_api::SessionHandle;
use vrsession_api::SwapchainCreateInfo;
use vrsession_api::SwapchainHandle;
use vrsession_api::SwapchainImage;
use vrsession_api::SwapchainUsageFlags;
use vrsession_api::ViewConfigurationView;

use log::{debug, warn};
use scopeguard::ScopeGuard;

pub(crate) fn choose_swapchain_format(
    runtime: &dyn Runtime,
    session: SessionHandle,
    binding: &dyn GraphicsBinding,
) -> Result<i64, Error> {
    let runtime_formats = runtime
        .enumerate_swapchain_formats(session)
        .map_err(|e| Error::Runtime("failed to get swapchain image formats", e))?;
    binding
        .choose_swapchain_format(&runtime_formats)
        .ok_or(Error::FormatNegotiation)
}

/// Creates a swapchain for one view along with its images. If anything fails
/// after the swapchain itself was created, it is destroyed again.
pub(crate) fn create_swapchain(
    runtime: &dyn Runtime,
    session: SessionHandle,
    binding: &mut dyn GraphicsBinding,
    view: &ViewConfigurationView,
) -> Result<(SwapchainHandle, Vec<SwapchainImage>), Error> {
    let format = choose_swapchain_format(runtime, session, binding)?;
    let create_info = SwapchainCreateInfo {
        usage_flags: SwapchainUsageFlags::SAMPLED | SwapchainUsageFlags::COLOR_ATTACHMENT,
        format,
        sample_count: view.recommended_swapchain_sample_count,
        width: view.recommended_image_rect_width,
        height: view.recommended_image_rect_height,
        face_count: 1,
        array_size: 1,
        mip_count: 1,
    };
    let swapchain = runtime
        .create_swapchain(session, &create_info)
        .map_err(|e| Error::Runtime("failed to create swapchain", e))?;
    let swapchain = scopeguard::guard(swapchain, |swapchain| {
        if let Err(e) = runtime.destroy_swapchain(swapchain) {
            warn!("failed to destroy partially created swapchain: {}", e);
        }
    });

    let images = create_swapchain_images(runtime, *swapchain, binding)?;
    debug!(
        "created {}x{} swapchain {:?} with {} images (format {:#x})",
        create_info.width,
        create_info.height,
        *swapchain,
        images.len(),
        format
    );
    Ok((ScopeGuard::into_inner(swapchain), images))
}

fn create_swapchain_images(
    runtime: &dyn Runtime,
    swapchain: SwapchainHandle,
    binding: &mut dyn GraphicsBinding,
) -> Result<Vec<SwapchainImage>, Error> {
    let image_count = runtime.swapchain_image_count(swapchain).map_err(|e| {
        Error::Runtime(
            "failed to get count of swapchain images to create for the VR session",
            e,
        )
    })?;
    if image_count == 0 {
        return Err(Error::Runtime(
            "runtime reported no images for a swapchain of the VR session",
            RuntimeError::SIZE_INSUFFICIENT,
        ));
    }
    let mut images = binding.create_swapchain_images(image_count);
    let written = runtime
        .enumerate_swapchain_images(swapchain, &mut images)
        .map_err(|e| Error::Runtime("failed to create swapchain images for the VR session", e))?;
    if written as usize != images.len() || written != image_count {
        return Err(Error::Runtime(
            "swapchain image count changed between enumeration calls",
            RuntimeError::SIZE_INSUFFICIENT,
        ));
    }
    Ok(images)
}
