//! # vslice-core
//!
//! vslice 核心库, 提供统一错误类型与比特流读取器.
//!
//! slice 解码调度 (`vslice-codec`) 与外部熵解码引擎都基于本 crate 的
//! [`InputBitstream`] 读取码流, 并以 [`VsliceError`] 报告码流一致性错误.

pub mod bitstream;
pub mod error;

// 重导出常用类型
pub use bitstream::InputBitstream;
pub use error::{VsliceError, VsliceResult};
