/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::session::{Session, SessionBeginInfo, SessionSettings};
use crate::state::LifeExpectancy;

use vrsession_api::CustomFuncs;
use vrsession_api::DrawViewInfo;
use vrsession_api::Error;
use vrsession_api::Event;
use vrsession_api::GraphicsBindingType;
use vrsession_api::GraphicsContext;
use vrsession_api::Runtime;

use log::{debug, info, warn};

use std::any::Any;
use std::rc::Rc;

/// Runtimes that need special treatment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuntimeId {
    Monado,
    Oculus,
    WindowsMixedReality,
    Unknown,
}

impl RuntimeId {
    pub fn from_runtime_name(name: &str) -> RuntimeId {
        if name.contains("Monado") {
            RuntimeId::Monado
        } else if name.contains("Oculus") {
            RuntimeId::Oculus
        } else if name.contains("Windows Mixed Reality") {
            RuntimeId::WindowsMixedReality
        } else {
            RuntimeId::Unknown
        }
    }

    /// Windows Mixed Reality composites the swapchain as sRGB, whatever format
    /// it was created with.
    pub fn expects_srgb_buffer(self) -> bool {
        self == RuntimeId::WindowsMixedReality
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ContextFlags {
    /// Log what the runtime reports and the session does.
    pub debug: bool,
    /// Measure and log frame render times.
    pub debug_time: bool,
}

#[derive(Clone, Debug)]
pub struct ContextCreateInfo {
    /// Graphics APIs the host can render with, in order of preference.
    pub gpu_binding_candidates: Vec<GraphicsBindingType>,
    pub flags: ContextFlags,
}

/// Owns the runtime connection and at most one session.
pub struct Context {
    runtime: Rc<dyn Runtime>,
    funcs: CustomFuncs,
    binding_type: GraphicsBindingType,
    runtime_id: RuntimeId,
    flags: ContextFlags,
    session: Option<Session>,
}

impl Context {
    pub fn new(runtime: Rc<dyn Runtime>, create_info: &ContextCreateInfo) -> Result<Context, Error> {
        let properties = runtime
            .properties()
            .map_err(|e| Error::Runtime("failed to get runtime properties", e))?;
        let extensions = runtime
            .enumerate_extensions()
            .map_err(|e| Error::Runtime("failed to get runtime extensions", e))?;

        if create_info.flags.debug {
            info!(
                "Connected to VR runtime: {} (version {})",
                properties.runtime_name, properties.runtime_version
            );
            for extension in &extensions {
                debug!("Runtime extension: {}", extension);
            }
        }

        let binding_type = create_info
            .gpu_binding_candidates
            .iter()
            .copied()
            .find(|candidate| {
                extensions
                    .iter()
                    .any(|extension| extension == candidate.extension_name())
            })
            .ok_or(Error::NoMatchingBinding)?;

        Ok(Context {
            runtime,
            funcs: CustomFuncs::default(),
            binding_type,
            runtime_id: RuntimeId::from_runtime_name(&properties.runtime_name),
            flags: create_info.flags,
            session: None,
        })
    }

    /// Sets the functions used to hand a graphics context to the session when it
    /// starts, and to take it back when the session ends.
    pub fn set_graphics_context_bind_funcs<B, U>(&mut self, bind: B, unbind: U)
    where
        B: Fn(GraphicsBindingType) -> Option<Rc<dyn GraphicsContext>> + 'static,
        U: Fn(GraphicsBindingType, Option<Rc<dyn GraphicsContext>>) + 'static,
    {
        self.funcs.bind_graphics_context = Some(Rc::new(bind));
        self.funcs.unbind_graphics_context = Some(Rc::new(unbind));
    }

    pub fn set_draw_view_func<F>(&mut self, draw_view: F)
    where
        F: Fn(&DrawViewInfo, &mut dyn Any) + 'static,
    {
        self.funcs.draw_view = Some(Rc::new(draw_view));
    }

    pub fn session_start(&mut self, begin_info: &SessionBeginInfo) -> Result<(), Error> {
        if self.session.is_some() {
            return Err(Error::Configuration("a VR session is already running"));
        }

        let settings = SessionSettings {
            binding_type: self.binding_type,
            runtime_id: self.runtime_id,
            debug_time: self.flags.debug_time,
        };
        // Functions set later on only apply to the next session.
        let mut session = Session::new(self.runtime.clone(), self.funcs.clone(), settings);
        session.start(begin_info)?;
        self.session = Some(session);
        Ok(())
    }

    pub fn session_request_end(&mut self) {
        if let Some(ref mut session) = self.session {
            session.request_end();
        }
    }

    pub fn session_is_running(&self) -> bool {
        self.session.as_ref().map_or(false, Session::is_running)
    }

    /// Draws a frame if there is a running session. Blocks until the runtime
    /// wants the next frame.
    pub fn draw_session_views(&mut self, custom_data: &mut dyn Any) -> Result<(), Error> {
        match self.session {
            Some(ref mut session) if session.is_running() => session.draw(custom_data),
            _ => Ok(()),
        }
    }

    /// Handles all pending runtime events. Returns whether there were any.
    pub fn events_handle(&mut self) -> Result<bool, Error> {
        let mut handled = false;
        while let Some(event) = self
            .runtime
            .poll_event()
            .map_err(|e| Error::Runtime("failed to poll runtime events", e))?
        {
            handled = true;
            match event {
                Event::SessionStateChanged(state_change) => {
                    let life = match self.session {
                        Some(ref mut session) => session.handle_state_change_event(&state_change)?,
                        None => {
                            debug!("ignoring state change without a session: {:?}", state_change);
                            continue;
                        },
                    };
                    if life == LifeExpectancy::Destroy {
                        debug!("destroying VR session after {:?}", state_change.state);
                        self.session = None;
                    }
                },
                Event::InstanceLossPending { loss_time } => {
                    warn!("VR runtime instance will be lost at {:?}", loss_time);
                    self.session = None;
                },
                Event::EventsLost { lost_event_count } => {
                    warn!("VR runtime dropped {} events", lost_event_count);
                },
            }
        }
        Ok(handled)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn runtime_id(&self) -> RuntimeId {
        self.runtime_id
    }

    pub fn graphics_binding_type(&self) -> GraphicsBindingType {
        self.binding_type
    }

    pub fn is_debug_mode(&self) -> bool {
        self.flags.debug
    }

    pub fn is_debug_time_mode(&self) -> bool {
        self.flags.debug_time
    }
}
