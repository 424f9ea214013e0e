use crate::display::{InputEvent, MouseButtonKind};

/// Pointer state as the simulation reads it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    /// Normalized output coordinate, row 0 at the top
    pub position: [f32; 2],
    /// True while a button or finger is down
    pub active: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            position: [0.5, 0.5],
            active: false,
        }
    }
}

/// Tracks mouse and touch input against the window it arrives in
pub struct BrushInteractor {
    window: (u32, u32),
    brush: Brush,
}

impl BrushInteractor {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window: (window_width.max(1), window_height.max(1)),
            brush: Brush::default(),
        }
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window = (width.max(1), height.max(1));
    }

    /// Feed one input event. Returns true if it touched the brush.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::MouseDown {
                x,
                y,
                button: MouseButtonKind::Left,
            } => {
                self.brush.active = true;
                self.move_to_pixel(x, y);
            },
            InputEvent::MouseMove { x, y } => self.move_to_pixel(x, y),
            InputEvent::MouseUp {
                button: MouseButtonKind::Left,
                ..
            }
            | InputEvent::PointerLeave => self.brush.active = false,
            InputEvent::TouchDown { x, y } => {
                self.brush.active = true;
                self.move_to(x, y);
            },
            InputEvent::TouchMove { x, y } => self.move_to(x, y),
            InputEvent::TouchUp => self.brush.active = false,
            InputEvent::Resized { width, height } => {
                self.set_window_size(width, height);
                return false;
            },
            _ => return false,
        }
        true
    }

    fn move_to_pixel(&mut self, x: i32, y: i32) {
        self.move_to(x as f32 / self.window.0 as f32, y as f32 / self.window.1 as f32);
    }

    fn move_to(&mut self, u: f32, v: f32) {
        self.brush.position = [u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_drag_release() {
        let mut brush = BrushInteractor::new(640, 480);
        assert!(!brush.brush().active);

        brush.handle_event(&InputEvent::MouseDown {
            x: 320,
            y: 120,
            button: MouseButtonKind::Left,
        });
        assert!(brush.brush().active);
        assert_eq!(brush.brush().position, [0.5, 0.25]);

        brush.handle_event(&InputEvent::MouseMove { x: 160, y: 480 });
        assert_eq!(brush.brush().position, [0.25, 1.0]);

        brush.handle_event(&InputEvent::MouseUp {
            x: 160,
            y: 480,
            button: MouseButtonKind::Left,
        });
        assert!(!brush.brush().active);
        assert_eq!(brush.brush().position, [0.25, 1.0]);
    }

    #[test]
    fn test_right_button_does_not_paint() {
        let mut brush = BrushInteractor::new(100, 100);
        assert!(!brush.handle_event(&InputEvent::MouseDown {
            x: 10,
            y: 10,
            button: MouseButtonKind::Right,
        }));
        assert!(!brush.brush().active);
    }

    #[test]
    fn test_leaving_window_lifts_brush() {
        let mut brush = BrushInteractor::new(100, 100);
        brush.handle_event(&InputEvent::MouseDown {
            x: 10,
            y: 10,
            button: MouseButtonKind::Left,
        });
        brush.handle_event(&InputEvent::PointerLeave);
        assert!(!brush.brush().active);
    }

    #[test]
    fn test_touch_is_already_normalized() {
        let mut brush = BrushInteractor::new(100, 100);
        brush.handle_event(&InputEvent::TouchDown { x: 0.2, y: 0.7 });
        assert_eq!(brush.brush(), Brush {
            position: [0.2, 0.7],
            active: true
        });
        brush.handle_event(&InputEvent::TouchMove { x: 1.4, y: -0.1 });
        assert_eq!(brush.brush().position, [1.0, 0.0]);
        brush.handle_event(&InputEvent::TouchUp);
        assert!(!brush.brush().active);
    }

    #[test]
    fn test_resize_changes_scaling() {
        let mut brush = BrushInteractor::new(100, 100);
        brush.handle_event(&InputEvent::Resized {
            width: 200,
            height: 50,
        });
        brush.handle_event(&InputEvent::MouseMove { x: 50, y: 25 });
        assert_eq!(brush.brush().position, [0.25, 0.5]);
    }
}
