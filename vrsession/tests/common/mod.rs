/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use vrsession::headless::{HeadlessGraphicsContext, HeadlessRuntime, HeadlessRuntimeInit};
use vrsession::{RuntimeId, Session, SessionBeginInfo, SessionSettings};

use vrsession_api::CustomFuncs;
use vrsession_api::DrawViewInfo;
use vrsession_api::GraphicsBindingType;
use vrsession_api::GraphicsContext;
use vrsession_api::Pose;
use vrsession_api::SessionHandle;
use vrsession_api::SessionState;
use vrsession_api::SessionStateChanged;
use vrsession_api::Time;
use vrsession_api::Version;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Everything a session test needs to look at after the fact.
pub struct Host {
    pub runtime: Rc<HeadlessRuntime>,
    pub gpu: Rc<HeadlessGraphicsContext>,
    /// One entry per unbind call, `true` if a context was handed back.
    pub unbinds: Rc<RefCell<Vec<bool>>>,
    pub drawn_views: Rc<RefCell<usize>>,
}

impl Host {
    pub fn new(init: HeadlessRuntimeInit) -> Host {
        Host::with_gpu_version(init, Version::new(4, 5, 0))
    }

    pub fn with_gpu_version(init: HeadlessRuntimeInit, version: Version) -> Host {
        Host {
            runtime: Rc::new(HeadlessRuntime::new(init)),
            gpu: Rc::new(HeadlessGraphicsContext::new(version)),
            unbinds: Rc::new(RefCell::new(vec![])),
            drawn_views: Rc::new(RefCell::new(0)),
        }
    }

    pub fn funcs(&self) -> CustomFuncs {
        let gpu = self.gpu.clone();
        let unbinds = self.unbinds.clone();
        let drawn_views = self.drawn_views.clone();
        CustomFuncs {
            bind_graphics_context: Some(Rc::new(move |_: GraphicsBindingType| {
                Some(gpu.clone() as Rc<dyn GraphicsContext>)
            })),
            unbind_graphics_context: Some(Rc::new(
                move |_: GraphicsBindingType, context: Option<Rc<dyn GraphicsContext>>| {
                    unbinds.borrow_mut().push(context.is_some())
                },
            )),
            draw_view: Some(Rc::new(move |_: &DrawViewInfo, _: &mut dyn Any| {
                *drawn_views.borrow_mut() += 1
            })),
        }
    }

    pub fn session(&self, binding_type: GraphicsBindingType) -> Session {
        let settings = SessionSettings {
            binding_type,
            runtime_id: RuntimeId::Unknown,
            debug_time: false,
        };
        Session::new(self.runtime.clone(), self.funcs(), settings)
    }

    /// A started OpenGL session that did not see any state change yet.
    pub fn started_session(&self) -> Session {
        let mut session = self.session(GraphicsBindingType::OpenGL);
        session.start(&begin_info()).unwrap();
        session
    }

    /// A started session the runtime reported `Ready` for.
    pub fn running_session(&self) -> Session {
        let mut session = self.started_session();
        handle_state(&mut session, SessionState::Ready).unwrap();
        session
    }

    pub fn unbinds_with_context(&self) -> usize {
        self.unbinds.borrow().iter().filter(|bound| **bound).count()
    }

    pub fn assert_all_released(&self) {
        assert_eq!(self.runtime.live_swapchains(), 0, "swapchains leaked");
        assert_eq!(self.runtime.live_spaces(), 0, "spaces leaked");
        assert_eq!(self.runtime.live_sessions(), 0, "sessions leaked");
    }
}

pub fn begin_info() -> SessionBeginInfo {
    SessionBeginInfo {
        base_pose: Pose::identity(),
    }
}

pub fn handle_state(
    session: &mut Session,
    state: SessionState,
) -> Result<vrsession::LifeExpectancy, vrsession_api::Error> {
    let event = SessionStateChanged {
        session: session.handle().unwrap_or(SessionHandle(0)),
        state,
        time: Time(0),
    };
    session.handle_state_change_event(&event)
}
