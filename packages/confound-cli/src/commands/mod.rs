pub mod batch;
pub mod censor;
pub mod clean;
pub mod columns;
pub mod convolve;
pub mod validate;
