//! 熵解码与重建引擎 trait 定义.
//!
//! slice 解码调度只负责 CTU 循环与边界处的状态切换, CTU 语法解析和
//! 样本重建交给实现以下 trait 的引擎完成.
//!
//! 调度器持有全部子流, 每次需要读码流时把当前活动子流以 `&mut` 借给引擎,
//! 引擎内部不保存子流引用.

use vslice_core::VsliceResult;
use vslice_core::bitstream::InputBitstream;

use crate::params::Slice;
use crate::picture::{CodingStructure, CtuArea};

/// 熵解码引擎 (CABAC)
pub trait EntropyDecoder {
    /// 可整体保存与恢复的上下文状态
    type ContextState: Clone;

    /// 按 slice 类型与 QP 重置全部上下文, 并在 `bits` 上开始算术解码
    fn init_ctx_models(&mut self, slice: &Slice, bits: &mut InputBitstream) -> VsliceResult<()>;

    /// 复制当前上下文状态
    fn context_state(&self) -> Self::ContextState;

    /// 用快照覆盖当前上下文状态
    fn set_context_state(&mut self, state: Self::ContextState);

    /// 解析一个 CTU 的语法元素, 写入 `cs`
    ///
    /// `prev_qp` 为亮度/色度的前序 QP, 解析过程中按 QP 预测规则更新.
    fn parse_coding_tree_unit(
        &mut self,
        bits: &mut InputBitstream,
        cs: &mut CodingStructure,
        area: &CtuArea,
        prev_qp: &mut [i32; 2],
        ctu_rs_addr: u32,
    ) -> VsliceResult<()>;

    /// 读取终止位 (end_of_slice / end_of_subset)
    fn read_terminating_bit(&mut self, bits: &mut InputBitstream) -> VsliceResult<bool>;

    /// 检查子流或 slice 末尾的剩余字节
    ///
    /// `no_trailing_bytes_expected` 为真时 (子流末尾) 要求读完对齐比特后没有剩余数据.
    fn check_remaining_bytes(
        &mut self,
        bits: &mut InputBitstream,
        no_trailing_bytes_expected: bool,
    ) -> VsliceResult<()>;
}

/// CTU 重建引擎
pub trait CtuReconstructor {
    /// 重建一个已解析的 CTU (预测、反量化、反变换)
    fn reconstruct_ctu(&mut self, cs: &mut CodingStructure, area: &CtuArea) -> VsliceResult<()>;
}
