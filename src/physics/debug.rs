//! Debug-draw sink. Pure output: nothing drawn here feeds back into the simulation.

use std::sync::{Arc, Mutex};

use glam::DVec2;

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    /// Manifold contact points.
    pub const CONTACT: Self = Self([0.0, 1.0, 0.0, 1.0]);
    /// Manifold normal scaled by depth, and polygon edge normals.
    pub const NORMAL: Self = Self([1.0, 0.0, 1.0, 1.0]);
    /// Cast ray.
    pub const RAY: Self = Self([1.0, 0.0, 0.0, 1.0]);
    /// Ray hit.
    pub const RAY_HIT: Self = Self([0.0, 0.0, 1.0, 1.0]);
}

/// Receiver for debug geometry emitted by the physics layer.
pub trait DebugDraw: Send {
    fn line(&mut self, from: DVec2, to: DVec2, color: Color);

    fn circle(&mut self, center: DVec2, radius: f64, color: Color);

    /// Closed outline. Defaults to one line per edge.
    fn polygon(&mut self, points: &[DVec2], color: Color) {
        for (i, &p) in points.iter().enumerate() {
            let next = points[(i + 1) % points.len()];
            self.line(p, next, color);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDraw;

impl DebugDraw for NullDraw {
    fn line(&mut self, _from: DVec2, _to: DVec2, _color: Color) {}

    fn circle(&mut self, _center: DVec2, _radius: f64, _color: Color) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line { from: DVec2, to: DVec2, color: Color },
    Circle { center: DVec2, radius: f64, color: Color },
}

/// Records draw calls into a buffer shared with its clones.
///
/// Hand one clone to the physics world and keep another to read back what was
/// drawn (for example from the render thread).
#[derive(Debug, Default, Clone)]
pub struct DebugRecorder {
    commands: Arc<Mutex<Vec<DrawCommand>>>,
}

impl DebugRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every command recorded so far.
    pub fn drain(&self) -> Vec<DrawCommand> {
        let mut commands = self
            .commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *commands)
    }

    pub fn len(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, command: DrawCommand) {
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command);
    }
}

impl DebugDraw for DebugRecorder {
    fn line(&mut self, from: DVec2, to: DVec2, color: Color) {
        self.push(DrawCommand::Line { from, to, color });
    }

    fn circle(&mut self, center: DVec2, radius: f64, color: Color) {
        self.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }
}
