//! Block transforms and predictors
//!
//! Frequency-domain pieces of the VarDCT path (8x8 DCT, zigzag scan,
//! quantization matrices) and the spatial pieces of the modular path
//! (MED predictor, DC prediction, Haar squeeze).

pub mod dct;
pub mod predict;
pub mod quant;
pub mod squeeze;
pub mod zigzag;

pub use dct::{extract_block, forward_dct_8x8, inverse_dct_8x8, place_block};
pub use predict::{med_reconstruct, med_residuals, predict_dc};
pub use quant::{
    adaptive_scale, block_variance, dequantize_block, quantize_block, roi_factor, QuantMatrix,
    ADAPTIVE_QUANT_CALIBRATION,
};
pub use squeeze::{
    squeeze_horizontal, squeeze_vertical, unsqueeze_horizontal, unsqueeze_vertical,
};
pub use zigzag::{scan_block, unscan_block, ZIGZAG_8X8};
