pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod labels;
pub mod onnx;
pub mod output;
pub mod runtime;
pub mod session;
pub mod transport;
pub mod vision;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
