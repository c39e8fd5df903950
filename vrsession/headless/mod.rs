/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! An in-process runtime without a display. It simulates the session state
//! progression of a real runtime, checks call order the way a validation layer
//! would, and records every call so tests can inspect what a session did.

use crate::graphics_binding::{
    DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_R8G8B8A8_UNORM_SRGB, GL_RGBA8, GL_SRGB8_ALPHA8,
};

use vrsession_api::DrawViewInfo;
use vrsession_api::Duration;
use vrsession_api::Event;
use vrsession_api::FormFactor;
use vrsession_api::FrameEndInfo;
use vrsession_api::FrameState;
use vrsession_api::Fov;
use vrsession_api::GraphicsBindingType;
use vrsession_api::GraphicsContext;
use vrsession_api::GraphicsRequirements;
use vrsession_api::Pose;
use vrsession_api::ReferenceSpaceType;
use vrsession_api::Runtime;
use vrsession_api::RuntimeError;
use vrsession_api::RuntimeProperties;
use vrsession_api::SessionBinding;
use vrsession_api::SessionHandle;
use vrsession_api::SessionState;
use vrsession_api::SessionStateChanged;
use vrsession_api::SpaceHandle;
use vrsession_api::SwapchainCreateInfo;
use vrsession_api::SwapchainHandle;
use vrsession_api::SwapchainImage;
use vrsession_api::SystemId;
use vrsession_api::Time;
use vrsession_api::Version;
use vrsession_api::View;
use vrsession_api::ViewConfigurationType;
use vrsession_api::ViewConfigurationView;
use vrsession_api::XrResult;

use crossbeam_channel::{unbounded, Receiver, Sender};
use euclid::{Rotation3D, Vector3D};
use log::{debug, warn};

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread;
use std::time::Duration as StdDuration;

const SYSTEM_ID: SystemId = SystemId(1);

// 90Hz
const DEFAULT_FRAME_PERIOD_NS: i64 = 11_111_111;

/// How the headless runtime presents itself and what it supports.
#[derive(Clone, Debug)]
pub struct HeadlessRuntimeInit {
    pub runtime_name: String,
    pub runtime_version: Version,
    pub extensions: Vec<String>,
    /// Whether a head-mounted display is "plugged in".
    pub system_available: bool,
    pub graphics_requirements: GraphicsRequirements,
    pub view_configs: Vec<ViewConfigurationView>,
    /// What `locate_views` reports, one per view configuration.
    pub views: Vec<View>,
    /// Supported swapchain formats, in order of preference.
    pub swapchain_formats: Vec<i64>,
    pub swapchain_image_count: u32,
    /// How long `wait_frame` blocks.
    pub frame_interval: StdDuration,
}

fn eye_view(x_offset: f32) -> View {
    View {
        pose: Pose {
            position: Vector3D::new(x_offset, 0., 0.),
            orientation: Rotation3D::identity(),
        },
        fov: Fov {
            angle_left: -0.8,
            angle_right: 0.8,
            angle_up: 0.8,
            angle_down: -0.8,
        },
    }
}

impl Default for HeadlessRuntimeInit {
    fn default() -> Self {
        let view_config = ViewConfigurationView {
            recommended_image_rect_width: 1440,
            max_image_rect_width: 2880,
            recommended_image_rect_height: 1600,
            max_image_rect_height: 3200,
            recommended_swapchain_sample_count: 1,
            max_swapchain_sample_count: 4,
        };
        HeadlessRuntimeInit {
            runtime_name: "Headless".into(),
            runtime_version: Version::new(1, 0, 0),
            extensions: vec![
                GraphicsBindingType::OpenGL.extension_name().into(),
                GraphicsBindingType::D3D11.extension_name().into(),
            ],
            system_available: true,
            graphics_requirements: GraphicsRequirements {
                min_api_version_supported: Version::new(3, 3, 0),
                max_api_version_supported: Version::new(4, 6, 0),
            },
            view_configs: vec![view_config; 2],
            views: vec![eye_view(-0.032), eye_view(0.032)],
            swapchain_formats: vec![
                GL_RGBA8,
                GL_SRGB8_ALPHA8,
                DXGI_FORMAT_R8G8B8A8_UNORM,
                DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
            ],
            swapchain_image_count: 3,
            frame_interval: StdDuration::from_millis(0),
        }
    }
}

/// The runtime entry points, for call logs and failure injection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RuntimeCall {
    Properties,
    EnumerateExtensions,
    PollEvent,
    System,
    GraphicsRequirements,
    EnumerateViewConfigurationViews,
    CreateSession,
    BeginSession,
    EndSession,
    RequestExitSession,
    DestroySession,
    CreateReferenceSpace,
    DestroySpace,
    EnumerateSwapchainFormats,
    CreateSwapchain,
    DestroySwapchain,
    SwapchainImageCount,
    EnumerateSwapchainImages,
    AcquireSwapchainImage,
    WaitSwapchainImage,
    ReleaseSwapchainImage,
    WaitFrame,
    BeginFrame,
    EndFrame,
    LocateViews,
}

#[derive(Default)]
struct SessionData {
    running: bool,
    frame_waited: bool,
    in_frame: bool,
}

struct SwapchainData {
    session: SessionHandle,
    images: Vec<u64>,
    next_image: usize,
    acquired: Option<u32>,
    waited: bool,
}

struct HeadlessRuntimeData {
    init: HeadlessRuntimeInit,
    next_handle: u64,
    sessions: HashMap<SessionHandle, SessionData>,
    spaces: HashMap<SpaceHandle, SessionHandle>,
    swapchains: HashMap<SwapchainHandle, SwapchainData>,
    calls: Vec<RuntimeCall>,
    failures: HashMap<RuntimeCall, RuntimeError>,
    should_render: bool,
    submitted_layer_counts: Vec<usize>,
}

pub struct HeadlessRuntime {
    data: RefCell<HeadlessRuntimeData>,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl HeadlessRuntimeData {
    fn record(&mut self, call: RuntimeCall) -> XrResult<()> {
        self.calls.push(call);
        match self.failures.get(&call) {
            Some(error) => {
                debug!("headless runtime: failing {:?} with {}", call, error);
                Err(*error)
            },
            None => Ok(()),
        }
    }

    fn new_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_system(&self, system: SystemId) -> XrResult<()> {
        if system != SYSTEM_ID || !self.init.system_available {
            return Err(RuntimeError::SYSTEM_INVALID);
        }
        Ok(())
    }

    fn session(&mut self, session: SessionHandle) -> XrResult<&mut SessionData> {
        self.sessions
            .get_mut(&session)
            .ok_or(RuntimeError::HANDLE_INVALID)
    }

    fn running_session(&mut self, session: SessionHandle) -> XrResult<&mut SessionData> {
        let data = self.session(session)?;
        if !data.running {
            return Err(RuntimeError::SESSION_NOT_RUNNING);
        }
        Ok(data)
    }

    fn swapchain(&mut self, swapchain: SwapchainHandle) -> XrResult<&mut SwapchainData> {
        self.swapchains
            .get_mut(&swapchain)
            .ok_or(RuntimeError::HANDLE_INVALID)
    }
}

fn now() -> Time {
    Time(time::precise_time_ns() as i64)
}

impl HeadlessRuntime {
    pub fn new(init: HeadlessRuntimeInit) -> HeadlessRuntime {
        let (sender, receiver) = unbounded();
        let data = HeadlessRuntimeData {
            init,
            next_handle: 0,
            sessions: HashMap::new(),
            spaces: HashMap::new(),
            swapchains: HashMap::new(),
            calls: vec![],
            failures: HashMap::new(),
            should_render: true,
            submitted_layer_counts: vec![],
        };
        HeadlessRuntime {
            data: RefCell::new(data),
            sender,
            receiver,
        }
    }

    /// Makes every following `call` fail with `error`, or succeed again when
    /// `error` is `None`. The call still shows up in the call log.
    pub fn set_failing(&self, call: RuntimeCall, error: Option<RuntimeError>) {
        let mut data = self.data.borrow_mut();
        match error {
            Some(error) => data.failures.insert(call, error),
            None => data.failures.remove(&call),
        };
    }

    pub fn set_should_render(&self, should_render: bool) {
        self.data.borrow_mut().should_render = should_render;
    }

    /// Queues a state change, as if the runtime decided on it by itself.
    pub fn push_state(&self, session: SessionHandle, state: SessionState) {
        self.push_event(Event::SessionStateChanged(SessionStateChanged {
            session,
            state,
            time: now(),
        }));
    }

    pub fn push_event(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn pending_events(&self) -> usize {
        self.receiver.len()
    }

    /// Appends images to a swapchain after it was enumerated, the way a runtime
    /// handing out images it never reported would.
    pub fn add_unenumerated_images(&self, swapchain: SwapchainHandle, count: u32) {
        if let Some(data) = self.data.borrow_mut().swapchains.get_mut(&swapchain) {
            let first = data.images.len() as u64;
            data.images
                .extend((first..first + count as u64).map(|idx| 0xdead_0000 + idx));
        }
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.data.borrow().calls.clone()
    }

    pub fn call_count(&self, call: RuntimeCall) -> usize {
        self.data
            .borrow()
            .calls
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    pub fn clear_calls(&self) {
        self.data.borrow_mut().calls.clear();
    }

    /// The number of layers passed to each successful `end_frame`.
    pub fn submitted_layer_counts(&self) -> Vec<usize> {
        self.data.borrow().submitted_layer_counts.clone()
    }

    pub fn live_sessions(&self) -> usize {
        self.data.borrow().sessions.len()
    }

    pub fn live_spaces(&self) -> usize {
        self.data.borrow().spaces.len()
    }

    pub fn live_swapchains(&self) -> usize {
        self.data.borrow().swapchains.len()
    }

    pub fn is_session_running(&self, session: SessionHandle) -> bool {
        self.data
            .borrow()
            .sessions
            .get(&session)
            .map_or(false, |data| data.running)
    }
}

impl Default for HeadlessRuntime {
    fn default() -> Self {
        HeadlessRuntime::new(HeadlessRuntimeInit::default())
    }
}

impl Runtime for HeadlessRuntime {
    fn properties(&self) -> XrResult<RuntimeProperties> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::Properties)?;
        Ok(RuntimeProperties {
            runtime_name: data.init.runtime_name.clone(),
            runtime_version: data.init.runtime_version,
        })
    }

    fn enumerate_extensions(&self) -> XrResult<Vec<String>> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EnumerateExtensions)?;
        Ok(data.init.extensions.clone())
    }

    fn poll_event(&self) -> XrResult<Option<Event>> {
        self.data.borrow_mut().record(RuntimeCall::PollEvent)?;
        Ok(self.receiver.try_recv().ok())
    }

    fn system(&self, form_factor: FormFactor) -> XrResult<SystemId> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::System)?;
        if form_factor != FormFactor::HeadMountedDisplay {
            return Err(RuntimeError::FORM_FACTOR_UNSUPPORTED);
        }
        if !data.init.system_available {
            return Err(RuntimeError::FORM_FACTOR_UNAVAILABLE);
        }
        Ok(SYSTEM_ID)
    }

    fn graphics_requirements(
        &self,
        system: SystemId,
        _binding_type: GraphicsBindingType,
    ) -> XrResult<GraphicsRequirements> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::GraphicsRequirements)?;
        data.check_system(system)?;
        Ok(data.init.graphics_requirements)
    }

    fn enumerate_view_configuration_views(
        &self,
        system: SystemId,
        _view_type: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EnumerateViewConfigurationViews)?;
        data.check_system(system)?;
        Ok(data.init.view_configs.clone())
    }

    fn create_session(
        &self,
        system: SystemId,
        binding: &SessionBinding,
    ) -> XrResult<SessionHandle> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::CreateSession)?;
        data.check_system(system)?;
        let handle_valid = match *binding {
            SessionBinding::OpenGL { context, .. } => context != 0,
            SessionBinding::D3D11 { device } => device != 0,
        };
        if !handle_valid {
            return Err(RuntimeError::GRAPHICS_DEVICE_INVALID);
        }

        let session = SessionHandle(data.new_handle());
        data.sessions.insert(session, SessionData::default());
        drop(data);

        self.push_state(session, SessionState::Idle);
        self.push_state(session, SessionState::Ready);
        Ok(session)
    }

    fn begin_session(
        &self,
        session: SessionHandle,
        _view_type: ViewConfigurationType,
    ) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::BeginSession)?;
        let session_data = data.session(session)?;
        if session_data.running {
            return Err(RuntimeError::SESSION_RUNNING);
        }
        session_data.running = true;
        drop(data);

        for state in &[
            SessionState::Synchronized,
            SessionState::Visible,
            SessionState::Focused,
        ] {
            self.push_state(session, *state);
        }
        Ok(())
    }

    fn end_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EndSession)?;
        let session_data = data.running_session(session)?;
        *session_data = SessionData::default();
        drop(data);

        self.push_state(session, SessionState::Idle);
        self.push_state(session, SessionState::Exiting);
        Ok(())
    }

    fn request_exit_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::RequestExitSession)?;
        data.running_session(session)?;
        drop(data);

        self.push_state(session, SessionState::Stopping);
        Ok(())
    }

    fn destroy_session(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::DestroySession)?;
        data.sessions
            .remove(&session)
            .ok_or(RuntimeError::HANDLE_INVALID)?;

        // Child handles go with their session.
        let spaces = data.spaces.len();
        let swapchains = data.swapchains.len();
        data.spaces.retain(|_, owner| *owner != session);
        data.swapchains.retain(|_, swapchain| swapchain.session != session);
        if spaces != data.spaces.len() || swapchains != data.swapchains.len() {
            warn!("headless runtime: session {:?} destroyed with live children", session);
        }
        Ok(())
    }

    fn create_reference_space(
        &self,
        session: SessionHandle,
        _space_type: ReferenceSpaceType,
        _pose_in_reference_space: &Pose,
    ) -> XrResult<SpaceHandle> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::CreateReferenceSpace)?;
        data.session(session)?;
        let space = SpaceHandle(data.new_handle());
        data.spaces.insert(space, session);
        Ok(space)
    }

    fn destroy_space(&self, space: SpaceHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::DestroySpace)?;
        data.spaces
            .remove(&space)
            .map(|_| ())
            .ok_or(RuntimeError::HANDLE_INVALID)
    }

    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> XrResult<Vec<i64>> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EnumerateSwapchainFormats)?;
        data.session(session)?;
        Ok(data.init.swapchain_formats.clone())
    }

    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::CreateSwapchain)?;
        data.session(session)?;
        if !data.init.swapchain_formats.contains(&info.format) {
            return Err(RuntimeError::SWAPCHAIN_FORMAT_UNSUPPORTED);
        }
        if info.width == 0 || info.height == 0 || info.sample_count == 0 {
            return Err(RuntimeError::VALIDATION_FAILURE);
        }

        let handle = data.new_handle();
        let images = (0..data.init.swapchain_image_count as u64)
            .map(|idx| 0x1000 + handle * 0x10 + idx)
            .collect();
        let swapchain = SwapchainHandle(handle);
        data.swapchains.insert(
            swapchain,
            SwapchainData {
                session,
                images,
                next_image: 0,
                acquired: None,
                waited: false,
            },
        );
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::DestroySwapchain)?;
        data.swapchains
            .remove(&swapchain)
            .map(|_| ())
            .ok_or(RuntimeError::HANDLE_INVALID)
    }

    fn swapchain_image_count(&self, swapchain: SwapchainHandle) -> XrResult<u32> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::SwapchainImageCount)?;
        Ok(data.swapchain(swapchain)?.images.len() as u32)
    }

    fn enumerate_swapchain_images(
        &self,
        swapchain: SwapchainHandle,
        images: &mut [SwapchainImage],
    ) -> XrResult<u32> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EnumerateSwapchainImages)?;
        let swapchain = data.swapchain(swapchain)?;
        if images.len() < swapchain.images.len() {
            return Err(RuntimeError::SIZE_INSUFFICIENT);
        }
        for (header, image) in images.iter_mut().zip(&swapchain.images) {
            header.image = *image;
        }
        Ok(swapchain.images.len() as u32)
    }

    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<u32> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::AcquireSwapchainImage)?;
        let swapchain = data.swapchain(swapchain)?;
        if swapchain.acquired.is_some() {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        let idx = swapchain.next_image as u32;
        swapchain.next_image = (swapchain.next_image + 1) % swapchain.images.len().max(1);
        swapchain.acquired = Some(idx);
        Ok(idx)
    }

    fn wait_swapchain_image(&self, swapchain: SwapchainHandle, _timeout: Duration) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::WaitSwapchainImage)?;
        let swapchain = data.swapchain(swapchain)?;
        if swapchain.acquired.is_none() || swapchain.waited {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        swapchain.waited = true;
        Ok(())
    }

    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::ReleaseSwapchainImage)?;
        let swapchain = data.swapchain(swapchain)?;
        if swapchain.acquired.is_none() || !swapchain.waited {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        swapchain.acquired = None;
        swapchain.waited = false;
        Ok(())
    }

    fn wait_frame(&self, session: SessionHandle) -> XrResult<FrameState> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::WaitFrame)?;
        data.running_session(session)?.frame_waited = true;
        let should_render = data.should_render;
        let interval = data.init.frame_interval;
        drop(data);

        if interval > StdDuration::from_millis(0) {
            thread::sleep(interval);
        }
        let period = if interval > StdDuration::from_millis(0) {
            interval.as_nanos() as i64
        } else {
            DEFAULT_FRAME_PERIOD_NS
        };
        Ok(FrameState {
            predicted_display_time: Time(now().0 + period),
            predicted_display_period: Duration(period),
            should_render,
        })
    }

    fn begin_frame(&self, session: SessionHandle) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::BeginFrame)?;
        let session = data.running_session(session)?;
        if !session.frame_waited {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        session.frame_waited = false;
        session.in_frame = true;
        Ok(())
    }

    fn end_frame(&self, session: SessionHandle, info: &FrameEndInfo) -> XrResult<()> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::EndFrame)?;
        if !data.running_session(session)?.in_frame {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        let image_held = data
            .swapchains
            .values()
            .any(|swapchain| swapchain.session == session && swapchain.acquired.is_some());
        if image_held {
            return Err(RuntimeError::CALL_ORDER_INVALID);
        }
        for layer in info.layers {
            if !data.spaces.contains_key(&layer.space) {
                return Err(RuntimeError::HANDLE_INVALID);
            }
            for view in &layer.views {
                if !data.swapchains.contains_key(&view.sub_image.swapchain) {
                    return Err(RuntimeError::HANDLE_INVALID);
                }
            }
        }

        data.running_session(session)?.in_frame = false;
        data.submitted_layer_counts.push(info.layers.len());
        Ok(())
    }

    fn locate_views(
        &self,
        session: SessionHandle,
        _view_type: ViewConfigurationType,
        _display_time: Time,
        space: SpaceHandle,
    ) -> XrResult<Vec<View>> {
        let mut data = self.data.borrow_mut();
        data.record(RuntimeCall::LocateViews)?;
        data.running_session(session)?;
        if !data.spaces.contains_key(&space) {
            return Err(RuntimeError::HANDLE_INVALID);
        }
        Ok(data.init.views.clone())
    }
}

/// A graphics context that renders nothing and remembers every blit.
pub struct HeadlessGraphicsContext {
    version: Version,
    handle: u64,
    blits: RefCell<Vec<(SwapchainImage, DrawViewInfo)>>,
}

impl HeadlessGraphicsContext {
    pub fn new(version: Version) -> HeadlessGraphicsContext {
        HeadlessGraphicsContext {
            version,
            handle: 0xc0_47e7,
            blits: RefCell::new(vec![]),
        }
    }

    pub fn blits(&self) -> Vec<(SwapchainImage, DrawViewInfo)> {
        self.blits.borrow().clone()
    }
}

impl GraphicsContext for HeadlessGraphicsContext {
    fn api_version(&self) -> Version {
        self.version
    }

    fn native_handle(&self) -> u64 {
        self.handle
    }

    fn blit_to_swapchain_image(&self, image: &SwapchainImage, info: &DrawViewInfo) {
        self.blits.borrow_mut().push((*image, *info));
    }
}
