//! Camera component and the renderer's view state

use cinder_core::{CinderError, EntityId, Result};
use cinder_ecs::World;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Projection parameters; attach to an entity to view the scene from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Use orthographic projection (true) or perspective (false)
    pub orthographic: bool,
    /// Half the visible height in orthographic mode
    pub ortho_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
            orthographic: false,
            ortho_height: 5.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Right-handed projection with 0..1 depth
    pub fn projection_matrix(&self) -> Mat4 {
        if self.orthographic {
            let half_h = self.ortho_height;
            let half_w = half_h * self.aspect;
            Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
        } else {
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
        }
    }
}

/// Eye position used when no camera entity is active
pub const DEFAULT_EYE: Vec3 = Vec3::new(0.0, 0.0, 10.0);

/// View and projection for one pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
}

/// Which camera the renderer looks through
#[derive(Debug, Clone)]
pub struct ViewState {
    active: Option<EntityId>,
    default_camera: Camera,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            active: None,
            default_camera: Camera::default(),
        }
    }

    pub fn active(&self) -> Option<EntityId> {
        self.active
    }

    /// Look through `id`, which must carry a [`Camera`]
    pub fn set_camera(&mut self, world: &World, id: EntityId) -> Result<()> {
        if !world.contains(id) {
            return Err(CinderError::EntityNotFound(id.to_string()));
        }
        if !world.has::<Camera>(id) {
            return Err(CinderError::ComponentNotFound(format!(
                "Camera on '{}'",
                world.get_name(id).unwrap_or_default()
            )));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn restore_camera(&mut self) {
        self.active = None;
    }

    pub fn default_camera(&self) -> &Camera {
        &self.default_camera
    }

    /// Current view and projection. An active camera whose entity is gone
    /// falls back to the default camera.
    pub fn view_projection(&mut self, world: &World) -> ViewProjection {
        if let Some(id) = self.active {
            let resolved = world
                .get::<Camera>(id)
                .map(|camera| *camera)
                .zip(world.world_matrix(id));
            match resolved {
                Some((camera, world_matrix)) => {
                    return ViewProjection {
                        view: world_matrix.inverse(),
                        projection: camera.projection_matrix(),
                        eye: world_matrix.w_axis.truncate(),
                    };
                }
                None => {
                    log::warn!("Active camera {} no longer exists, using the default", id);
                    self.active = None;
                }
            }
        }

        ViewProjection {
            view: Mat4::look_at_rh(DEFAULT_EYE, Vec3::ZERO, Vec3::Y),
            projection: self.default_camera.projection_matrix(),
            eye: DEFAULT_EYE,
        }
    }
}
