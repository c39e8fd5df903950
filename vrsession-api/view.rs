/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate uses `euclid`'s typed units for the coordinate spaces it exposes.

use euclid::Rect;
use euclid::Rotation3D;
use euclid::Vector3D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The coordinate space the runtime reports poses in (the reference space).
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Native {}

/// The unnormalized image coordinate space of a swapchain image, measured in
/// pixels.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Viewport {}

/// A position and orientation in the reference space. The orientation's
/// `i`, `j`, `k`, `r` components are the quaternion's x, y, z, w.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    pub position: Vector3D<f32, Native>,
    pub orientation: Rotation3D<f32, Native, Native>,
}

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

impl Pose {
    pub fn identity() -> Pose {
        Pose {
            position: Vector3D::zero(),
            orientation: Rotation3D::identity(),
        }
    }

    pub fn position_xyz(&self) -> [f32; 3] {
        [self.position.x, self.position.y, self.position.z]
    }

    pub fn orientation_wxyz(&self) -> [f32; 4] {
        [
            self.orientation.r,
            self.orientation.i,
            self.orientation.j,
            self.orientation.k,
        ]
    }
}

/// Field of view angles in radians, left and down usually being negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

/// A located view (eye) for a given display time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct View {
    pub pose: Pose,
    pub fov: Fov,
}

/// Which corner of the swapchain image pixel row zero starts at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewOrigin {
    BottomLeft,
    TopLeft,
}

/// Everything the host needs to draw one view of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrawViewInfo {
    pub pose: Pose,
    pub fov: Fov,
    pub viewport: Rect<i32, Viewport>,
    /// The image origin of the swapchain; hosts rendering with the other
    /// convention have to flip vertically.
    pub origin: ViewOrigin,
    /// Some runtimes don't apply the output transfer function correctly, so
    /// the host has to write sRGB encoded values itself.
    pub expects_srgb_buffer: bool,
}
