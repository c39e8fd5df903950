/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use common::{begin_info, handle_state, Host};

use vrsession::graphics_binding::DXGI_FORMAT_R8G8B8A8_UNORM;
use vrsession::headless::{HeadlessRuntimeInit, RuntimeCall};
use vrsession::LifeExpectancy;

use vrsession_api::CustomFuncs;
use vrsession_api::Error;
use vrsession_api::GraphicsBindingType;
use vrsession_api::RuntimeError;
use vrsession_api::SessionState;
use vrsession_api::Version;
use vrsession_api::ViewOrigin;

use proptest::prelude::*;

#[test]
fn start_prepares_one_swapchain_per_view() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let session = host.started_session();

    assert!(session.handle().is_some());
    assert!(session.reference_space().is_some());
    assert!(session.draw_info().is_some());
    assert_eq!(session.state(), SessionState::Unknown);
    assert!(!session.is_running());

    assert_eq!(session.swapchains().len(), 2);
    assert_eq!(session.swapchain_image_sets(), 2);
    assert_eq!(session.views().len(), 2);
    for swapchain in session.swapchains() {
        let images = session.swapchain_images(*swapchain).unwrap();
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|image| image.image != 0));
        assert!(images
            .iter()
            .all(|image| image.binding_type == GraphicsBindingType::OpenGL));
    }
    assert_eq!(session.swapchain_size().width, 1440);
    assert_eq!(session.swapchain_size().height, 1600);
    assert_eq!(host.runtime.live_swapchains(), 2);
}

#[test]
fn ready_begins_the_session() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.started_session();
    // Idle and Ready from session creation.
    assert_eq!(host.runtime.pending_events(), 2);

    let life = handle_state(&mut session, SessionState::Ready).unwrap();
    assert_eq!(life, LifeExpectancy::KeepAlive);
    assert!(session.is_running());
    assert!(host.runtime.is_session_running(session.handle().unwrap()));
    assert_eq!(host.runtime.call_count(RuntimeCall::BeginSession), 1);
    assert_eq!(host.runtime.pending_events(), 5);
}

#[test]
fn failed_begin_keeps_previous_state() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.started_session();
    handle_state(&mut session, SessionState::Idle).unwrap();
    host.runtime
        .set_failing(RuntimeCall::BeginSession, Some(RuntimeError::RUNTIME_FAILURE));

    let result = handle_state(&mut session, SessionState::Ready);
    match result {
        Err(Error::SessionBegin(e)) => assert_eq!(e, RuntimeError::RUNTIME_FAILURE),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.is_running());
}

#[test]
fn stopping_ends_but_keeps_the_session() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    let handle = session.handle().unwrap();

    let life = handle_state(&mut session, SessionState::Stopping).unwrap();
    assert_eq!(life, LifeExpectancy::KeepAlive);
    assert_eq!(session.handle(), Some(handle));
    assert!(session.draw_info().is_none());
    assert!(!session.is_running());
    assert!(!host.runtime.is_session_running(handle));
    assert_eq!(host.unbinds_with_context(), 1);

    let life = handle_state(&mut session, SessionState::Exiting).unwrap();
    assert_eq!(life, LifeExpectancy::Destroy);

    drop(session);
    host.assert_all_released();
    assert_eq!(host.unbinds_with_context(), 1);
}

#[test]
fn loss_pending_asks_for_destruction() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    let life = handle_state(&mut session, SessionState::LossPending).unwrap();
    assert_eq!(life, LifeExpectancy::Destroy);
}

#[test]
fn frame_draws_every_view() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    host.runtime.clear_calls();

    session.draw(&mut ()).unwrap();

    assert_eq!(*host.drawn_views.borrow(), 2);
    assert_eq!(host.runtime.submitted_layer_counts(), vec![1]);
    assert_eq!(
        host.runtime.calls(),
        vec![
            RuntimeCall::WaitFrame,
            RuntimeCall::BeginFrame,
            RuntimeCall::LocateViews,
            RuntimeCall::AcquireSwapchainImage,
            RuntimeCall::WaitSwapchainImage,
            RuntimeCall::ReleaseSwapchainImage,
            RuntimeCall::AcquireSwapchainImage,
            RuntimeCall::WaitSwapchainImage,
            RuntimeCall::ReleaseSwapchainImage,
            RuntimeCall::EndFrame,
        ]
    );

    let blits = host.gpu.blits();
    assert_eq!(blits.len(), 2);
    for (image, info) in &blits {
        assert_eq!(image.binding_type, GraphicsBindingType::OpenGL);
        assert_eq!(info.origin, ViewOrigin::BottomLeft);
        assert!(!info.expects_srgb_buffer);
        assert_eq!(info.viewport.size.width, 1440);
        assert_eq!(info.viewport.size.height, 1600);
    }
    // Poses are passed on as the runtime located them.
    assert_eq!(blits[0].1.pose.position_xyz(), [-0.032, 0., 0.]);
    assert_eq!(blits[1].1.pose.position_xyz(), [0.032, 0., 0.]);
    assert_eq!(session.views()[1].pose.position_xyz(), [0.032, 0., 0.]);
}

#[test]
fn swapchain_images_are_used_round_robin() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    let first = session.swapchains()[0];
    let images = session.swapchain_images(first).unwrap().to_vec();

    for _ in 0..4 {
        session.draw(&mut ()).unwrap();
    }

    let used: Vec<u64> = host
        .gpu
        .blits()
        .iter()
        .step_by(2)
        .map(|(image, _)| image.image)
        .collect();
    assert_eq!(
        used,
        vec![images[0].image, images[1].image, images[2].image, images[0].image]
    );
}

#[test]
fn frame_without_rendering_submits_no_layers() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    host.runtime.set_should_render(false);
    host.runtime.clear_calls();

    session.draw(&mut ()).unwrap();

    assert_eq!(host.runtime.submitted_layer_counts(), vec![0]);
    assert_eq!(host.runtime.call_count(RuntimeCall::LocateViews), 0);
    assert_eq!(host.runtime.call_count(RuntimeCall::AcquireSwapchainImage), 0);
    assert_eq!(host.runtime.call_count(RuntimeCall::ReleaseSwapchainImage), 0);
    assert_eq!(host.runtime.call_count(RuntimeCall::EndFrame), 1);
    assert_eq!(*host.drawn_views.borrow(), 0);
}

#[test]
fn frame_sync_failure_is_reported() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    host.runtime
        .set_failing(RuntimeCall::WaitFrame, Some(RuntimeError::SESSION_LOST));

    match session.draw(&mut ()) {
        Err(Error::FrameSync(_, e)) => assert_eq!(e, RuntimeError::SESSION_LOST),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn failed_image_enumeration_releases_everything() {
    let host = Host::new(HeadlessRuntimeInit::default());
    host.runtime.set_failing(
        RuntimeCall::EnumerateSwapchainImages,
        Some(RuntimeError::OUT_OF_MEMORY),
    );

    let mut session = host.session(GraphicsBindingType::OpenGL);
    match session.start(&begin_info()) {
        Err(Error::Runtime(_, e)) => assert_eq!(e, RuntimeError::OUT_OF_MEMORY),
        other => panic!("unexpected result {:?}", other),
    }
    // The swapchain that was created is destroyed right away.
    assert_eq!(host.runtime.live_swapchains(), 0);
    assert_eq!(host.runtime.call_count(RuntimeCall::DestroySwapchain), 1);
    assert!(session.swapchains().is_empty());

    drop(session);
    host.assert_all_released();
    assert_eq!(host.unbinds_with_context(), 1);
}

#[test]
fn swapchain_without_images_fails_start() {
    let host = Host::new(HeadlessRuntimeInit {
        swapchain_image_count: 0,
        ..HeadlessRuntimeInit::default()
    });

    let mut session = host.session(GraphicsBindingType::OpenGL);
    match session.start(&begin_info()) {
        Err(Error::Runtime(_, e)) => assert_eq!(e, RuntimeError::SIZE_INSUFFICIENT),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(host.runtime.call_count(RuntimeCall::EnumerateSwapchainImages), 0);
    assert!(session.swapchains().is_empty());

    drop(session);
    host.assert_all_released();
}

#[test]
fn failed_view_draw_releases_the_image() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();
    let first = session.swapchains()[0];
    host.runtime.add_unenumerated_images(first, 1);

    for _ in 0..3 {
        session.draw(&mut ()).unwrap();
    }
    // The fourth image of the first swapchain is unknown to the session.
    match session.draw(&mut ()) {
        Err(Error::Runtime(_, e)) => assert_eq!(e, RuntimeError::VALIDATION_FAILURE),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(
        host.runtime.call_count(RuntimeCall::AcquireSwapchainImage),
        host.runtime.call_count(RuntimeCall::ReleaseSwapchainImage)
    );

    // The next frame starts over at the first image.
    session.draw(&mut ()).unwrap();
    assert_eq!(host.runtime.submitted_layer_counts(), vec![1, 1, 1, 1]);
}

#[test]
fn failed_reference_space_releases_swapchains() {
    let host = Host::new(HeadlessRuntimeInit::default());
    host.runtime.set_failing(
        RuntimeCall::CreateReferenceSpace,
        Some(RuntimeError::RUNTIME_FAILURE),
    );

    let mut session = host.session(GraphicsBindingType::OpenGL);
    assert!(session.start(&begin_info()).is_err());
    assert_eq!(host.runtime.live_swapchains(), 2);

    drop(session);
    host.assert_all_released();
    assert_eq!(host.runtime.call_count(RuntimeCall::DestroySwapchain), 2);
    assert_eq!(host.runtime.call_count(RuntimeCall::DestroySpace), 0);
}

#[test]
fn disjoint_formats_fail_negotiation() {
    let host = Host::new(HeadlessRuntimeInit {
        swapchain_formats: vec![DXGI_FORMAT_R8G8B8A8_UNORM],
        ..HeadlessRuntimeInit::default()
    });

    let mut session = host.session(GraphicsBindingType::OpenGL);
    assert!(matches!(
        session.start(&begin_info()),
        Err(Error::FormatNegotiation)
    ));
    assert_eq!(host.runtime.call_count(RuntimeCall::CreateSwapchain), 0);
    drop(session);
    host.assert_all_released();
}

#[test]
fn d3d11_session_uses_top_left_origin() {
    let host = Host::with_gpu_version(HeadlessRuntimeInit::default(), Version::new(4, 0, 0));
    let mut session = host.session(GraphicsBindingType::D3D11);
    session.start(&begin_info()).unwrap();
    handle_state(&mut session, SessionState::Ready).unwrap();

    session.draw(&mut ()).unwrap();

    let blits = host.gpu.blits();
    assert_eq!(blits.len(), 2);
    assert!(blits
        .iter()
        .all(|(image, info)| image.binding_type == GraphicsBindingType::D3D11
            && info.origin == ViewOrigin::TopLeft));
}

#[test]
fn start_needs_bind_function() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = vrsession::Session::new(
        host.runtime.clone(),
        CustomFuncs::default(),
        vrsession::SessionSettings {
            binding_type: GraphicsBindingType::OpenGL,
            runtime_id: vrsession::RuntimeId::Unknown,
            debug_time: false,
        },
    );

    assert!(matches!(
        session.start(&begin_info()),
        Err(Error::Configuration(_))
    ));
    assert!(host.runtime.calls().is_empty());
}

#[test]
fn old_graphics_context_is_rejected() {
    let host = Host::with_gpu_version(HeadlessRuntimeInit::default(), Version::new(2, 1, 0));
    let mut session = host.session(GraphicsBindingType::OpenGL);

    match session.start(&begin_info()) {
        Err(Error::Capability(requirements)) => {
            assert!(requirements.contains("Min OpenGL version 3.3"));
            assert!(requirements.contains("Max OpenGL version 4.6"));
        },
        other => panic!("unexpected result {:?}", other.err()),
    }
    assert_eq!(host.runtime.call_count(RuntimeCall::CreateSession), 0);
}

#[test]
fn missing_device_fails_system_query() {
    let host = Host::new(HeadlessRuntimeInit {
        system_available: false,
        ..HeadlessRuntimeInit::default()
    });
    let mut session = host.session(GraphicsBindingType::OpenGL);

    match session.start(&begin_info()) {
        Err(Error::RuntimeQuery(e)) => assert_eq!(e, RuntimeError::FORM_FACTOR_UNAVAILABLE),
        other => panic!("unexpected result {:?}", other.err()),
    }
    assert!(session.system_id().is_none());
    assert!(session.handle().is_none());
}

#[test]
fn rejected_graphics_device_fails_session_creation() {
    let host = Host::new(HeadlessRuntimeInit::default());
    host.runtime.set_failing(
        RuntimeCall::CreateSession,
        Some(RuntimeError::GRAPHICS_DEVICE_INVALID),
    );
    let mut session = host.session(GraphicsBindingType::OpenGL);

    assert!(matches!(
        session.start(&begin_info()),
        Err(Error::SessionCreate(RuntimeError::GRAPHICS_DEVICE_INVALID))
    ));
    drop(session);
    host.assert_all_released();
    assert_eq!(host.runtime.call_count(RuntimeCall::DestroySession), 0);
}

#[test]
fn request_end_only_asks_the_runtime() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let mut session = host.running_session();

    session.request_end();

    assert!(session.is_running());
    assert!(session.draw_info().is_some());
    assert_eq!(host.runtime.call_count(RuntimeCall::RequestExitSession), 1);
    assert_eq!(host.runtime.call_count(RuntimeCall::EndSession), 0);
}

#[test]
fn debug_time_records_frame_durations() {
    let host = Host::new(HeadlessRuntimeInit::default());
    let settings = vrsession::SessionSettings {
        binding_type: GraphicsBindingType::OpenGL,
        runtime_id: vrsession::RuntimeId::Unknown,
        debug_time: true,
    };
    let mut session = vrsession::Session::new(host.runtime.clone(), host.funcs(), settings);
    session.start(&begin_info()).unwrap();
    handle_state(&mut session, SessionState::Ready).unwrap();

    for _ in 0..3 {
        session.draw(&mut ()).unwrap();
    }
    let draw_info = session.draw_info().unwrap();
    assert_eq!(draw_info.recent_frame_times().count(), 3);
}

fn any_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Unknown),
        Just(SessionState::Idle),
        Just(SessionState::Ready),
        Just(SessionState::Synchronized),
        Just(SessionState::Visible),
        Just(SessionState::Focused),
        Just(SessionState::Stopping),
        Just(SessionState::LossPending),
        Just(SessionState::Exiting),
    ]
}

proptest! {
    #[test]
    fn running_follows_the_last_accepted_state(states in prop::collection::vec(any_state(), 1..24)) {
        let host = Host::new(HeadlessRuntimeInit::default());
        let mut session = host.started_session();

        for state in states {
            let previous = session.state();
            // A state the runtime rejects acting on (begin while running, end
            // while not running) is allowed to fail. Only a failed begin keeps
            // the previous state.
            let expected = match handle_state(&mut session, state) {
                Ok(life) => {
                    let destroy = state == SessionState::Exiting
                        || state == SessionState::LossPending;
                    prop_assert_eq!(life == LifeExpectancy::Destroy, destroy);
                    state
                },
                Err(Error::SessionBegin(e)) => {
                    prop_assert_eq!(state, SessionState::Ready);
                    prop_assert_eq!(e, RuntimeError::SESSION_RUNNING);
                    previous
                },
                Err(Error::SessionEnd(e)) => {
                    prop_assert_eq!(state, SessionState::Stopping);
                    prop_assert_eq!(e, RuntimeError::SESSION_NOT_RUNNING);
                    state
                },
                Err(other) => {
                    prop_assert!(false, "unexpected error {:?}", other);
                    state
                },
            };
            prop_assert_eq!(session.state(), expected);
            prop_assert_eq!(session.is_running(), expected.is_running());
        }
    }
}
