pub mod color;
pub mod easing;
pub mod light;
pub mod mapping;
pub mod value;

pub use color::Rgb;
pub use easing::Easing;
pub use light::{Light, LightFilter, LightType};
pub use mapping::{
    Compound, ConditionalRanges, LabelMap, LabelRanges, OutputRange, ParameterMapping,
};
pub use value::Value;
