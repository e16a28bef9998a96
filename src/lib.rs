//! # vslice
//!
//! 纯 Rust 实现的 VVC slice 级 CTU 解码调度核心.
//!
//! 负责把一个 slice 的数据拆分为熵编码子流, 按 CTU 顺序驱动外部的熵解码与
//! 重建引擎, 并在 tile / 波前行边界处完成上下文同步与预测状态重置.
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `vslice-core` | 错误类型与比特流读取 |
//! | `vslice-codec` | 地址映射、子流拆分与 slice 解码调度 |

/// 错误类型与比特流读取
pub use vslice_core as core;

/// slice 解码调度
pub use vslice_codec as codec;

pub mod config;
pub mod logging;

/// 获取 vslice 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
