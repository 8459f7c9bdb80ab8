//! Structuring elements and binary morphology.

mod binary;
mod element;

pub use binary::{
    binary_closing, binary_dilation, binary_erosion, binary_opening, remove_small_holes,
    remove_small_objects,
};
pub use element::StructuringElement;
