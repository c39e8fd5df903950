/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::DrawViewInfo;
use crate::GraphicsBindingType;
use crate::GraphicsContext;

use std::any::Any;
use std::rc::Rc;

/// Binds (and possibly creates) a graphics context of the given type. Called
/// once when a session starts.
pub type BindGraphicsContextFn =
    Rc<dyn Fn(GraphicsBindingType) -> Option<Rc<dyn GraphicsContext>>>;

/// Unbinds (and possibly destroys) the context handed out by the bind function.
/// Also called when a session is torn down after a failed start, in which case
/// there may be no context to release.
pub type UnbindGraphicsContextFn =
    Rc<dyn Fn(GraphicsBindingType, Option<Rc<dyn GraphicsContext>>)>;

/// Draws one view synchronously. The second argument is the custom data passed
/// to the frame's draw call.
pub type DrawViewFn = Rc<dyn Fn(&DrawViewInfo, &mut dyn Any)>;

/// The functions the host application injects into the session.
#[derive(Clone, Default)]
pub struct CustomFuncs {
    pub bind_graphics_context: Option<BindGraphicsContextFn>,
    pub unbind_graphics_context: Option<UnbindGraphicsContextFn>,
    pub draw_view: Option<DrawViewFn>,
}
