pub mod quantity_sample;

pub use quantity_sample::QuantitySample;
