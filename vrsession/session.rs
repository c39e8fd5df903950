/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::context::RuntimeId;
use crate::draw_info::DrawInfo;
use crate::graphics_binding;
use crate::state::{self, LifeExpectancy, StateAction};
use crate::swapchain;

use vrsession_api::CompositionLayerProjection;
use vrsession_api::CompositionLayerProjectionView;
use vrsession_api::CustomFuncs;
use vrsession_api::DrawViewInfo;
use vrsession_api::Duration;
use vrsession_api::EnvironmentBlendMode;
use vrsession_api::Error;
use vrsession_api::FormFactor;
use vrsession_api::FrameEndInfo;
use vrsession_api::GraphicsBinding;
use vrsession_api::GraphicsBindingType;
use vrsession_api::GraphicsContext;
use vrsession_api::Pose;
use vrsession_api::ReferenceSpaceType;
use vrsession_api::Runtime;
use vrsession_api::RuntimeError;
use vrsession_api::SessionHandle;
use vrsession_api::SessionState;
use vrsession_api::SessionStateChanged;
use vrsession_api::SpaceHandle;
use vrsession_api::SwapchainHandle;
use vrsession_api::SwapchainImage;
use vrsession_api::SwapchainSubImage;
use vrsession_api::SystemId;
use vrsession_api::View;
use vrsession_api::ViewConfigurationType;
use vrsession_api::XrResult;

use euclid::Point2D;
use euclid::Rect;
use euclid::Size2D;

use log::{debug, error, info, warn};
use scopeguard::ScopeGuard;

use std::any::Any;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

// Only stereo rendering is supported.
const VIEW_TYPE: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

pub struct SessionBeginInfo {
    /// Where the viewer starts out. Not used until reference spaces can be set
    /// up from it.
    pub base_pose: Pose,
}

/// The context settings a session is created with.
#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    pub binding_type: GraphicsBindingType,
    pub runtime_id: RuntimeId,
    pub debug_time: bool,
}

/// A VR session: the runtime session handle plus everything created for it.
///
/// All methods have to be called from the thread that owns the session; frame
/// drawing and state change handling must not be interleaved concurrently.
pub struct Session {
    runtime: Rc<dyn Runtime>,
    funcs: CustomFuncs,
    settings: SessionSettings,

    system_id: Option<SystemId>,
    handle: Option<SessionHandle>,
    state: SessionState,
    reference_space: Option<SpaceHandle>,
    views: Vec<View>,
    swapchains: Vec<SwapchainHandle>,
    swapchain_images: HashMap<SwapchainHandle, Vec<SwapchainImage>>,
    swapchain_image_width: i32,
    swapchain_image_height: i32,

    gpu_ctx: Option<Rc<dyn GraphicsContext>>,
    gpu_binding: Option<Box<dyn GraphicsBinding>>,
    draw_info: Option<DrawInfo>,
}

impl Session {
    pub fn new(runtime: Rc<dyn Runtime>, funcs: CustomFuncs, settings: SessionSettings) -> Session {
        Session {
            runtime,
            funcs,
            settings,
            system_id: None,
            handle: None,
            state: SessionState::Unknown,
            reference_space: None,
            views: vec![],
            swapchains: vec![],
            swapchain_images: HashMap::new(),
            swapchain_image_width: 0,
            swapchain_image_height: 0,
            gpu_ctx: None,
            gpu_binding: None,
            draw_info: None,
        }
    }

    /// A system is the combination of a head-mounted display plus controllers and
    /// whatever other devices the runtime manages. This looks it up.
    pub fn init_system(&mut self) -> Result<SystemId, Error> {
        debug_assert!(self.system_id.is_none(), "system queried twice");
        let system = self
            .runtime
            .system(FormFactor::HeadMountedDisplay)
            .map_err(Error::RuntimeQuery)?;
        self.system_id = Some(system);
        Ok(system)
    }

    /// Creates the runtime session and everything needed to draw into it.
    ///
    /// On failure, whatever was created so far stays owned by the session and is
    /// released when it is dropped.
    pub fn start(&mut self, begin_info: &SessionBeginInfo) -> Result<(), Error> {
        debug_assert!(self.handle.is_none(), "session started twice");
        if self.funcs.bind_graphics_context.is_none() {
            return Err(Error::Configuration(
                "no way to bind a graphics context to the VR session, set the graphics \
                 context bind functions before starting the session",
            ));
        }

        let system = self.init_system()?;

        let context = self.bind_graphics_context().ok_or(Error::Configuration(
            "no graphics context returned through the bind function, this is required for \
             starting the session",
        ))?;

        let mut binding = graphics_binding::create_from_type(self.settings.binding_type);
        binding
            .check_version_requirements(&*context, &*self.runtime, system)
            .map_err(Error::Capability)?;
        binding.init_from_context(context);
        let session_binding = binding.session_binding().ok_or(Error::Configuration(
            "graphics binding has no session data after initialization",
        ))?;
        self.gpu_binding = Some(binding);

        let handle = self
            .runtime
            .create_session(system, &session_binding)
            .map_err(Error::SessionCreate)?;
        self.handle = Some(handle);

        self.prepare_drawing(system, handle)?;
        self.create_reference_space(handle, &begin_info.base_pose)?;

        info!(
            "VR session {:?} created with {} views of {}x{}",
            handle,
            self.swapchains.len(),
            self.swapchain_image_width,
            self.swapchain_image_height
        );
        Ok(())
    }

    /// Asks the runtime to wind the session down. The runtime follows up with
    /// `Stopping` and `Exiting` state changes; nothing is torn down here.
    pub fn request_end(&mut self) {
        if let Some(handle) = self.handle {
            if let Err(e) = self.runtime.request_exit_session(handle) {
                warn!("failed to request the VR session to end: {}", e);
            }
        }
    }

    /// Ends the runtime session, releases the graphics context and discards the
    /// per-frame draw state. The session handle and its resources are kept until
    /// the session is dropped.
    pub fn end(&mut self) -> Result<(), Error> {
        debug_assert!(self.handle.is_some(), "ending a session that was never created");
        let handle = self.handle.ok_or(Error::NoSession)?;

        self.runtime.end_session(handle).map_err(Error::SessionEnd)?;
        self.unbind_graphics_context();
        self.draw_info = None;
        debug!("VR session {:?} ended", handle);
        Ok(())
    }

    /// Handles a state change the runtime reported for this session. The
    /// returned value tells the owner whether it has to destroy the session now;
    /// the session never destroys itself.
    pub fn handle_state_change_event(
        &mut self,
        event: &SessionStateChanged,
    ) -> Result<LifeExpectancy, Error> {
        let previous = mem::replace(&mut self.state, event.state);
        debug!("VR session state {:?} -> {:?}", previous, event.state);

        // The runtime may send events for an already destroyed session, our
        // handle should be gone then.
        debug_assert!(
            self.handle.is_none() || self.handle == Some(event.session),
            "state change for a foreign session"
        );

        let action = state::transition(event.state);
        match (action, self.handle) {
            (StateAction::BeginSession, Some(handle)) => {
                if let Err(e) = self.runtime.begin_session(handle, VIEW_TYPE) {
                    self.state = previous;
                    return Err(Error::SessionBegin(e));
                }
            },
            // The runtime moves on to `Exiting`, don't destroy the session yet.
            (StateAction::EndSession, Some(_)) => self.end()?,
            _ => {},
        }

        Ok(action.life_expectancy())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.state.is_running()
    }

    /// Draws and submits one frame. Blocks until the runtime wants the frame to
    /// start, which paces the caller to the display's refresh rate.
    pub fn draw(&mut self, custom_data: &mut dyn Any) -> Result<(), Error> {
        self.begin_frame_drawing()?;

        let should_render = self
            .draw_info
            .as_ref()
            .map_or(false, |draw_info| draw_info.frame_state().should_render);
        let mut layers = vec![];
        if should_render {
            layers.push(self.draw_layer(custom_data)?);
        }

        self.end_frame_drawing(&layers)
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.handle
    }

    pub fn system_id(&self) -> Option<SystemId> {
        self.system_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn reference_space(&self) -> Option<SpaceHandle> {
        self.reference_space
    }

    pub fn swapchains(&self) -> &[SwapchainHandle] {
        &self.swapchains
    }

    pub fn swapchain_images(&self, swapchain: SwapchainHandle) -> Option<&[SwapchainImage]> {
        self.swapchain_images.get(&swapchain).map(|images| &images[..])
    }

    pub fn swapchain_image_sets(&self) -> usize {
        self.swapchain_images.len()
    }

    pub fn swapchain_size(&self) -> Size2D<i32, vrsession_api::Viewport> {
        Size2D::new(self.swapchain_image_width, self.swapchain_image_height)
    }

    /// The views located for the most recently rendered frame.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn draw_info(&self) -> Option<&DrawInfo> {
        self.draw_info.as_ref()
    }

    fn prepare_drawing(&mut self, system: SystemId, handle: SessionHandle) -> Result<(), Error> {
        let view_configs = self
            .runtime
            .enumerate_view_configuration_views(system, VIEW_TYPE)
            .map_err(|e| Error::Runtime("failed to get view configurations", e))?;

        let binding = match self.gpu_binding.as_mut() {
            Some(binding) => binding,
            None => return Err(Error::Configuration("graphics binding not initialized")),
        };
        for view_config in &view_configs {
            let (swapchain, images) =
                swapchain::create_swapchain(&*self.runtime, handle, binding.as_mut(), view_config)?;

            self.swapchain_image_width = view_config.recommended_image_rect_width as i32;
            self.swapchain_image_height = view_config.recommended_image_rect_height as i32;
            self.swapchains.push(swapchain);
            self.swapchain_images.insert(swapchain, images);
        }

        self.views = vec![View::default(); view_configs.len()];
        self.draw_info = Some(DrawInfo::new());
        Ok(())
    }

    fn create_reference_space(
        &mut self,
        handle: SessionHandle,
        _base_pose: &Pose,
    ) -> Result<(), Error> {
        // TODO: Hand the runtime a reference pose derived from the base pose once
        // there is a way to define origin, up direction and an initial view
        // rotation. Until then the local space is used as is and the host applies
        // the base pose onto its own camera.
        let space = self
            .runtime
            .create_reference_space(handle, ReferenceSpaceType::Local, &Pose::identity())
            .map_err(|e| Error::Runtime("failed to create reference space", e))?;
        self.reference_space = Some(space);
        Ok(())
    }

    fn begin_frame_drawing(&mut self) -> Result<(), Error> {
        let handle = self.handle.ok_or(Error::NoSession)?;
        let draw_info = self.draw_info.as_mut().ok_or(Error::NoSession)?;

        // Blocking call, releases us in sync with the display's refresh cadence.
        let frame_state = self.runtime.wait_frame(handle).map_err(|e| {
            Error::FrameSync(
                "failed to synchronize frame rates between the host and the device",
                e,
            )
        })?;
        self.runtime
            .begin_frame(handle)
            .map_err(|e| Error::FrameSync("failed to submit frame rendering start state", e))?;

        draw_info.set_frame_state(frame_state);
        if self.settings.debug_time {
            draw_info.mark_frame_begin();
        }
        Ok(())
    }

    fn draw_layer(&mut self, custom_data: &mut dyn Any) -> Result<CompositionLayerProjection, Error> {
        let handle = self.handle.ok_or(Error::NoSession)?;
        let space = self.reference_space.ok_or(Error::NoSession)?;
        let display_time = match self.draw_info {
            Some(ref draw_info) => draw_info.frame_state().predicted_display_time,
            None => return Err(Error::NoSession),
        };

        self.views = self
            .runtime
            .locate_views(handle, VIEW_TYPE, display_time, space)
            .map_err(|e| Error::Runtime("failed to query frame view and projection state", e))?;
        debug_assert_eq!(
            self.views.len(),
            self.swapchains.len(),
            "view count differs from swapchain count"
        );

        let view_count = self.views.len().min(self.swapchains.len());
        let mut projection_views = Vec::with_capacity(view_count);
        for view_idx in 0..view_count {
            let swapchain = self.swapchains[view_idx];
            let view = self.views[view_idx];
            projection_views.push(self.draw_view(swapchain, &view, custom_data)?);
        }

        Ok(CompositionLayerProjection {
            space,
            views: projection_views,
        })
    }

    fn draw_view(
        &mut self,
        swapchain: SwapchainHandle,
        view: &View,
        custom_data: &mut dyn Any,
    ) -> Result<CompositionLayerProjectionView, Error> {
        let runtime = &*self.runtime;
        let image_idx = runtime
            .acquire_swapchain_image(swapchain)
            .map_err(|e| Error::Runtime("failed to acquire swapchain image for the VR session", e))?;
        // No timeout: the image is expected to be available quickly compared to
        // the frame wait. A backend that never releases it blocks us here.
        runtime
            .wait_swapchain_image(swapchain, Duration::INFINITE)
            .map_err(|e| Error::Runtime("failed to acquire swapchain image for the VR session", e))?;
        // From here on the image has to go back to the runtime, or the next
        // frame can't acquire it.
        let acquired = scopeguard::guard(swapchain, |swapchain| {
            if let Err(e) = runtime.release_swapchain_image(swapchain) {
                warn!("failed to release swapchain image after a failed draw: {}", e);
            }
        });

        let sub_image = SwapchainSubImage {
            swapchain,
            image_rect: Rect::new(
                Point2D::zero(),
                Size2D::new(self.swapchain_image_width, self.swapchain_image_height),
            ),
            image_array_index: 0,
        };
        let image = self
            .swapchain_images
            .get(&swapchain)
            .and_then(|images| images.get(image_idx as usize))
            .copied()
            .ok_or(Error::Runtime(
                "runtime handed out a swapchain image that was never enumerated",
                RuntimeError::VALIDATION_FAILURE,
            ))?;
        let binding = match self.gpu_binding.as_mut() {
            Some(binding) => binding,
            None => return Err(Error::Configuration("graphics binding not initialized")),
        };

        let draw_view_info = DrawViewInfo {
            pose: draw_view_pose(&view.pose),
            fov: view.fov,
            viewport: sub_image.image_rect,
            origin: binding.view_origin(),
            expects_srgb_buffer: self.settings.runtime_id.expects_srgb_buffer(),
        };
        if let Some(ref draw_view) = self.funcs.draw_view {
            draw_view(&draw_view_info, custom_data);
        }
        binding.submit_to_swapchain(&image, &draw_view_info);

        runtime
            .release_swapchain_image(ScopeGuard::into_inner(acquired))
            .map_err(|e| {
                Error::Runtime(
                    "failed to release swapchain image used to submit VR session frame",
                    e,
                )
            })?;

        Ok(CompositionLayerProjectionView {
            pose: view.pose,
            fov: view.fov,
            sub_image,
        })
    }

    fn end_frame_drawing(&mut self, layers: &[CompositionLayerProjection]) -> Result<(), Error> {
        let handle = self.handle.ok_or(Error::NoSession)?;
        let draw_info = self.draw_info.as_mut().ok_or(Error::NoSession)?;

        let end_info = FrameEndInfo {
            display_time: draw_info.frame_state().predicted_display_time,
            environment_blend_mode: EnvironmentBlendMode::Opaque,
            layers,
        };
        self.runtime
            .end_frame(handle, &end_info)
            .map_err(Error::FrameSubmit)?;

        if self.settings.debug_time {
            let timings = draw_info.finish_frame();
            info!(
                "VR frame render time: {:.0}ms - {:.2} FPS ({:.2} FPS {} frames average)",
                timings.duration_ms,
                timings.fps(),
                timings.average_fps(),
                crate::AVERAGE_FRAME_COUNT
            );
        }
        Ok(())
    }

    fn bind_graphics_context(&mut self) -> Option<Rc<dyn GraphicsContext>> {
        let bind = self.funcs.bind_graphics_context.as_ref()?;
        self.gpu_ctx = bind(self.settings.binding_type);
        self.gpu_ctx.clone()
    }

    fn unbind_graphics_context(&mut self) {
        let context = self.gpu_ctx.take();
        if let Some(ref unbind) = self.funcs.unbind_graphics_context {
            unbind(self.settings.binding_type, context);
        }
    }
}

/// Poses are handed to the host the way the runtime reports them.
///
/// Once proper reference space set up exists, this is where they'd be converted
/// to a Z-up host convention: position (x, -z, y), orientation (w, x, -z, y).
fn draw_view_pose(pose: &Pose) -> Pose {
    *pose
}

fn check_destroy(result: XrResult<()>, what: &str) {
    if let Err(e) = result {
        error!("failed to destroy {}: {}", what, e);
        debug_assert!(false, "failed to destroy {}: {}", what, e);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.unbind_graphics_context();

        for swapchain in self.swapchains.drain(..) {
            check_destroy(self.runtime.destroy_swapchain(swapchain), "swapchain");
        }
        self.swapchain_images.clear();
        if let Some(space) = self.reference_space.take() {
            check_destroy(self.runtime.destroy_space(space), "reference space");
        }
        if let Some(handle) = self.handle.take() {
            check_destroy(self.runtime.destroy_session(handle), "session");
        }

        self.state = SessionState::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use euclid::{Rotation3D, Vector3D};

    #[test]
    fn view_poses_pass_through() {
        let pose = Pose {
            position: Vector3D::new(1., 2., 3.),
            orientation: Rotation3D::quaternion(0.1, 0.2, 0.3, 0.9),
        };
        let converted = draw_view_pose(&pose);
        assert_eq!(converted.position_xyz(), [1., 2., 3.]);
        assert_eq!(converted.orientation_wxyz(), [0.9, 0.1, 0.2, 0.3]);
    }
}
