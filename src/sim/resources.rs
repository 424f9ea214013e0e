//! Grid sizing
//!
//! The grid follows the output surface, shrunk on one axis to the input
//! image's aspect ratio in image mode, then divided by the chunkiness factor.

use super::Field;
use crate::error::EngineError;
use crate::gpu::{FilterMode, RenderContext};
use crate::settings::Interface;

/// Size and sampling of the four fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPlan {
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

/// Chunky grids are displayed as crisp blocks
pub fn filter_for(chunkiness: u32) -> FilterMode {
    if chunkiness > 1 {
        FilterMode::Nearest
    } else {
        FilterMode::Linear
    }
}

/// Grid required for an output of `target` pixels and an input of `input`
/// pixels. Integer arithmetic keeps exact aspect ratios exact.
pub fn plan(target: (u32, u32), input: (u32, u32), interface: Interface, chunkiness: u32) -> GridPlan {
    let (tw, th) = (u64::from(target.0.max(1)), u64::from(target.1.max(1)));
    let (iw, ih) = (u64::from(input.0.max(1)), u64::from(input.1.max(1)));
    let (mut w, mut h) = (tw, th);

    if interface == Interface::Image {
        // Compare tw/th against iw/ih without dividing
        let lhs = tw * ih;
        let rhs = iw * th;
        if lhs > rhs {
            w = rhs.div_ceil(ih);
        } else if lhs < rhs {
            h = lhs.div_ceil(iw);
        }
    }

    let chunk = u64::from(chunkiness.max(1));
    GridPlan {
        width: w.div_ceil(chunk).max(1) as u32,
        height: h.div_ceil(chunk).max(1) as u32,
        filter: filter_for(chunkiness),
    }
}

/// Bring every field to `plan`. Returns true when any field was reallocated,
/// which invalidates the running state.
pub fn allocate(ctx: &mut RenderContext, fields: &mut [Field], plan: GridPlan) -> Result<bool, EngineError> {
    let mut resized = false;
    for field in fields.iter_mut() {
        resized |= field.reserve(ctx, plan.width, plan.height)?;
        field.set_filter(ctx, plan.filter)?;
    }
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::DeviceLimits;

    #[test]
    fn test_wide_input_trims_height() {
        let p = plan((800, 600), (1600, 900), Interface::Image, 1);
        assert_eq!((p.width, p.height), (800, 450));
    }

    #[test]
    fn test_tall_input_trims_width() {
        let p = plan((800, 600), (600, 800), Interface::Image, 1);
        assert_eq!((p.width, p.height), (450, 600));
    }

    #[test]
    fn test_parameter_map_ignores_input() {
        let p = plan((800, 600), (1600, 900), Interface::ParameterMap, 1);
        assert_eq!((p.width, p.height), (800, 600));
    }

    #[test]
    fn test_chunkiness_rounds_up_and_switches_filter() {
        let p = plan((801, 600), (801, 600), Interface::Image, 4);
        assert_eq!((p.width, p.height), (201, 150));
        assert_eq!(p.filter, FilterMode::Nearest);
        assert_eq!(plan((10, 10), (1, 1), Interface::Image, 0).filter, FilterMode::Linear);
    }

    #[test]
    fn test_allocate_reports_resize_once() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let mut fields: Vec<Field> = (0..4).map(|_| Field::new(&mut ctx)).collect();
        let p = plan((16, 8), (16, 8), Interface::Image, 1);
        assert!(allocate(&mut ctx, &mut fields, p).unwrap());
        assert!(!allocate(&mut ctx, &mut fields, p).unwrap());
        assert!(fields.iter().all(|f| f.width() == 16 && f.height() == 8));
    }
}
