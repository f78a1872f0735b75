//! Perspective camera, its GPU uniform and mouse driven orbit controls.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, perspective};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: cgmath::Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<cgmath::Rad<f32>>>(
        width: u32,
        height: u32,
        fovy: F,
        znear: f32,
        zfar: f32,
    ) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    /// Drawing buffer width and height in pixels, pixel ratio.
    pub viewport: [f32; 4],
    /// Near and far plane.
    pub clip: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
            viewport: [1.0, 1.0, 1.0, 0.0],
            clip: [0.1, 100.0, 0.0, 0.0],
        }
    }

    pub fn update_view_proj(
        &mut self,
        camera: &Camera,
        projection: &Projection,
        viewport: [u32; 2],
        pixel_ratio: f32,
    ) {
        let view = camera.calc_matrix();
        let proj = projection.calc_matrix();
        self.view_position = camera.position.to_homogeneous().into();
        self.view = view.into();
        self.proj = proj.into();
        self.view_proj = (proj * view).into();
        self.viewport = [viewport[0] as f32, viewport[1] as f32, pixel_ratio, 0.0];
        self.clip = [projection.znear, projection.zfar, 0.0, 0.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbit, dolly and pan around a target point.
///
/// Left drag rotates, right drag pans, the wheel dollies. With damping enabled the
/// motion keeps easing out after the input stops, so [`OrbitControls::update`] has to
/// run every frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_pixels: cgmath::Vector2<f32>,
    pan_offset: Vector3<f32>,
    rotating: bool,
    panning: bool,
    cursor: Option<(f32, f32)>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_pixels: cgmath::Vector2::new(0.0, 0.0),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            rotating: false,
            panning: false,
            cursor: None,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn damped() -> Self {
        Self {
            enable_damping: true,
            ..Self::default()
        }
    }

    /// Returns true if the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent, viewport_height: f32) -> bool {
        if !self.enabled {
            return false;
        }
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.rotating = pressed,
                    MouseButton::Right | MouseButton::Middle => self.panning = pressed,
                    _ => return false,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x as f32, position.y as f32);
                let previous = self.cursor.replace(current);
                match previous {
                    Some((x, y)) if self.rotating || self.panning => {
                        let (dx, dy) = (current.0 - x, current.1 - y);
                        if self.rotating {
                            self.rotate_by_pixels(dx, dy, viewport_height);
                        } else {
                            self.pan_by_pixels(dx, dy);
                        }
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.dolly(dy);
                true
            }
            _ => false,
        }
    }

    /// Ends a drag on any button release or focus loss, including the ones the gui keeps
    /// from [`OrbitControls::handle_window_events`].
    pub fn release_drag(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button,
                ..
            } => match button {
                MouseButton::Left => self.rotating = false,
                MouseButton::Right | MouseButton::Middle => self.panning = false,
                _ => (),
            },
            WindowEvent::Focused(false) => {
                self.rotating = false;
                self.panning = false;
            }
            _ => (),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.rotating || self.panning
    }

    /// A full viewport height of drag turns the camera once around.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32) {
        self.pan_pixels += cgmath::Vector2::new(dx, dy) * self.pan_speed;
    }

    /// Positive steps move towards the target.
    pub fn dolly(&mut self, steps: f32) {
        let factor = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else if steps < 0.0 {
            self.scale /= factor;
        }
    }

    /// Applies pending input to `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection, viewport_height: f32) -> bool {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        if radius < EPS {
            return false;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        // convert accumulated pan pixels into world space at the target's distance
        if self.pan_pixels.magnitude2() > 0.0 {
            let target_distance = radius * (projection.fovy.0 / 2.0).tan();
            let height = viewport_height.max(1.0);
            let view = camera.calc_matrix();
            let right = Vector3::new(view.x.x, view.y.x, view.z.x);
            let up = Vector3::new(view.x.y, view.y.y, view.z.y);
            self.pan_offset += right * (-2.0 * self.pan_pixels.x * target_distance / height)
                + up * (2.0 * self.pan_pixels.y * target_distance / height);
            self.pan_pixels = cgmath::Vector2::new(0.0, 0.0);
        }

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * factor;
        phi += self.delta_phi * factor;
        phi = phi.clamp(self.min_polar_angle, self.max_polar_angle).clamp(EPS, PI - EPS);
        radius = (radius * self.scale).clamp(self.min_distance.max(EPS), self.max_distance);
        camera.target += self.pan_offset * factor;

        let sin_phi = phi.sin();
        let new_offset = Vector3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let previous = camera.position;
        camera.position = camera.target + new_offset;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        (camera.position - previous).magnitude2() > EPS * EPS
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controls: OrbitControls,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn setup() -> (Camera, Projection) {
        (
            Camera::new((0.0, 0.0, 3.0)),
            Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 100.0),
        )
    }

    #[test]
    fn idle_update_keeps_the_camera() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::damped();
        assert!(!controls.update(&mut camera, &projection, 600.0));
        assert_relative_eq!(camera.position.z, 3.0, epsilon = 1e-5);
        assert_relative_eq!(camera.position.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn rotating_keeps_the_distance() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::new();
        controls.rotate_by_pixels(150.0, 0.0, 600.0);
        assert!(controls.update(&mut camera, &projection, 600.0));
        let distance = (camera.position - camera.target).magnitude();
        assert_relative_eq!(distance, 3.0, epsilon = 1e-4);
        // quarter turn to the left around y
        assert_relative_eq!(camera.position.x, -3.0, epsilon = 1e-4);
    }

    #[test]
    fn damping_eases_towards_the_full_rotation() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::damped();
        controls.rotate_by_pixels(150.0, 0.0, 600.0);
        controls.update(&mut camera, &projection, 600.0);
        let first = camera.position.x;
        assert!(first < 0.0 && first > -3.0);
        for _ in 0..500 {
            controls.update(&mut camera, &projection, 600.0);
        }
        assert_relative_eq!(camera.position.x, -3.0, epsilon = 1e-3);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::new();
        controls.rotate_by_pixels(0.0, 10_000.0, 600.0);
        controls.update(&mut camera, &projection, 600.0);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.y.is_finite());
    }

    #[test]
    fn dolly_in_and_out() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::new();
        controls.dolly(1.0);
        controls.update(&mut camera, &projection, 600.0);
        assert_relative_eq!(camera.position.z, 3.0 * 0.95, epsilon = 1e-5);
        controls.dolly(-1.0);
        controls.update(&mut camera, &projection, 600.0);
        assert_relative_eq!(camera.position.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::new();
        controls.pan_by_pixels(100.0, 0.0);
        controls.update(&mut camera, &projection, 600.0);
        assert!(camera.target.x < 0.0);
        assert_relative_eq!(camera.position.x, camera.target.x, epsilon = 1e-5);
    }

    #[test]
    fn disabled_controls_ignore_events() {
        let mut controls = OrbitControls::new();
        controls.enabled = false;
        let event = WindowEvent::CursorLeft {
            device_id: unsafe { winit::event::DeviceId::dummy() },
        };
        assert!(!controls.handle_window_events(&event, 600.0));
    }

    fn mouse(state: ElementState, button: MouseButton) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state,
            button,
        }
    }

    fn cursor_at(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: winit::dpi::PhysicalPosition::new(x, y),
        }
    }

    #[test]
    fn release_over_the_gui_ends_the_drag() {
        let (mut camera, projection) = setup();
        let mut controls = OrbitControls::new();
        assert!(controls.handle_window_events(&mouse(ElementState::Pressed, MouseButton::Left), 600.0));
        controls.handle_window_events(&cursor_at(100.0, 100.0), 600.0);
        assert!(controls.handle_window_events(&cursor_at(110.0, 100.0), 600.0));
        assert!(controls.is_dragging());

        // the gui swallows the release, only release_drag sees it
        controls.release_drag(&mouse(ElementState::Released, MouseButton::Left));
        assert!(!controls.is_dragging());
        controls.update(&mut camera, &projection, 600.0);
        let settled = camera.position;
        assert!(!controls.handle_window_events(&cursor_at(300.0, 100.0), 600.0));
        assert!(!controls.update(&mut camera, &projection, 600.0));
        assert_eq!(camera.position, settled);
    }

    #[test]
    fn focus_loss_ends_panning() {
        let mut controls = OrbitControls::new();
        controls.handle_window_events(&mouse(ElementState::Pressed, MouseButton::Right), 600.0);
        assert!(controls.is_dragging());
        controls.release_drag(&mouse(ElementState::Pressed, MouseButton::Left));
        assert!(controls.is_dragging());
        controls.release_drag(&WindowEvent::Focused(false));
        assert!(!controls.is_dragging());
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 100.0);
        assert_relative_eq!(projection.aspect, 800.0 / 600.0);
        projection.resize(1920, 1080);
        assert_relative_eq!(projection.aspect, 1920.0 / 1080.0);
        projection.resize(10, 0);
        assert!(projection.aspect.is_finite());
    }
}
