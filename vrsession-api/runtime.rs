/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

/// The XR runtime, as seen by a session.
use crate::Event;
use crate::Fov;
use crate::GraphicsBindingType;
use crate::Pose;
use crate::SessionBinding;
use crate::SessionHandle;
use crate::SpaceHandle;
use crate::SwapchainHandle;
use crate::SwapchainImage;
use crate::SystemId;
use crate::View;
use crate::Viewport;
use crate::XrResult;

use bitflags::bitflags;
use euclid::Rect;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in runtime time, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Time(pub i64);

/// A runtime duration, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Duration(pub i64);

impl Duration {
    pub const INFINITE: Duration = Duration(i64::MAX);
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u32) -> Version {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FormFactor {
    HeadMountedDisplay,
    HandheldDisplay,
}

/// Only stereo rendering is supported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewConfigurationType {
    PrimaryStereo,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EnvironmentBlendMode {
    Opaque,
    Additive,
    AlphaBlend,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeProperties {
    pub runtime_name: String,
    pub runtime_version: Version,
}

/// The graphics API versions a runtime can work with for a given system.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraphicsRequirements {
    pub min_api_version_supported: Version,
    pub max_api_version_supported: Version,
}

/// The runtime's recommendation for rendering one view.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewConfigurationView {
    pub recommended_image_rect_width: u32,
    pub max_image_rect_width: u32,
    pub recommended_image_rect_height: u32,
    pub max_image_rect_height: u32,
    pub recommended_swapchain_sample_count: u32,
    pub max_swapchain_sample_count: u32,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct SwapchainUsageFlags: u64 {
        const COLOR_ATTACHMENT = 0x0000_0001;
        const DEPTH_STENCIL_ATTACHMENT = 0x0000_0002;
        const UNORDERED_ACCESS = 0x0000_0004;
        const TRANSFER_SRC = 0x0000_0008;
        const TRANSFER_DST = 0x0000_0010;
        const SAMPLED = 0x0000_0020;
        const MUTABLE_FORMAT = 0x0000_0040;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SwapchainCreateInfo {
    pub usage_flags: SwapchainUsageFlags,
    pub format: i64,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
    pub face_count: u32,
    pub array_size: u32,
    pub mip_count: u32,
}

/// The per-frame timing information handed out by the runtime's frame wait.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameState {
    pub predicted_display_time: Time,
    pub predicted_display_period: Duration,
    pub should_render: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwapchainSubImage {
    pub swapchain: SwapchainHandle,
    pub image_rect: Rect<i32, Viewport>,
    pub image_array_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompositionLayerProjectionView {
    pub pose: Pose,
    pub fov: Fov,
    pub sub_image: SwapchainSubImage,
}

/// A stereo projection layer, one projection view per eye.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompositionLayerProjection {
    pub space: SpaceHandle,
    pub views: Vec<CompositionLayerProjectionView>,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameEndInfo<'a> {
    pub display_time: Time,
    pub environment_blend_mode: EnvironmentBlendMode,
    pub layers: &'a [CompositionLayerProjection],
}

/// The calls a session makes into an XR runtime.
///
/// Handles passed in must have been created by the same runtime. All methods
/// are called from the single thread that owns the session.
pub trait Runtime {
    fn properties(&self) -> XrResult<RuntimeProperties>;

    /// The names of the instance extensions the runtime supports.
    fn enumerate_extensions(&self) -> XrResult<Vec<String>>;

    /// Pops the next event from the runtime's event queue, if any.
    fn poll_event(&self) -> XrResult<Option<Event>>;

    fn system(&self, form_factor: FormFactor) -> XrResult<SystemId>;

    fn graphics_requirements(
        &self,
        system: SystemId,
        binding_type: GraphicsBindingType,
    ) -> XrResult<GraphicsRequirements>;

    fn enumerate_view_configuration_views(
        &self,
        system: SystemId,
        view_type: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>>;

    fn create_session(&self, system: SystemId, binding: &SessionBinding)
        -> XrResult<SessionHandle>;
    fn begin_session(
        &self,
        session: SessionHandle,
        view_type: ViewConfigurationType,
    ) -> XrResult<()>;
    fn end_session(&self, session: SessionHandle) -> XrResult<()>;
    fn request_exit_session(&self, session: SessionHandle) -> XrResult<()>;
    fn destroy_session(&self, session: SessionHandle) -> XrResult<()>;

    fn create_reference_space(
        &self,
        session: SessionHandle,
        space_type: ReferenceSpaceType,
        pose_in_reference_space: &Pose,
    ) -> XrResult<SpaceHandle>;
    fn destroy_space(&self, space: SpaceHandle) -> XrResult<()>;

    /// Supported swapchain formats, in the runtime's order of preference.
    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>>;
    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle>;
    fn destroy_swapchain(&self, swapchain: SwapchainHandle) -> XrResult<()>;

    fn swapchain_image_count(&self, swapchain: SwapchainHandle) -> XrResult<u32>;
    /// Fills in the native images of `images` and returns how many were written.
    fn enumerate_swapchain_images(
        &self,
        swapchain: SwapchainHandle,
        images: &mut [SwapchainImage],
    ) -> XrResult<u32>;
    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<u32>;
    fn wait_swapchain_image(&self, swapchain: SwapchainHandle, timeout: Duration)
        -> XrResult<()>;
    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<()>;

    /// This method should block until the application should start its next
    /// frame, and return the timing for it.
    fn wait_frame(&self, session: SessionHandle) -> XrResult<FrameState>;
    fn begin_frame(&self, session: SessionHandle) -> XrResult<()>;
    fn end_frame(&self, session: SessionHandle, info: &FrameEndInfo) -> XrResult<()>;

    fn locate_views(
        &self,
        session: SessionHandle,
        view_type: ViewConfigurationType,
        display_time: Time,
        space: SpaceHandle,
    ) -> XrResult<Vec<View>>;
}
