//! App layer of the splat reconstruction pipeline: synthetic clouds, phase
//! timing and benchmark harnesses around the [`splat_index`] core.

pub mod cloud;
pub mod util;
