mod brush;

pub use brush::{Brush, BrushInteractor};
