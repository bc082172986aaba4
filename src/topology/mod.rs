//! Entity classes of a plot file and their layout rules.

pub mod element_class;

pub use element_class::{ElementClass, MaterialType};
