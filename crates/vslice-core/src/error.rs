//! 统一错误类型定义.
//!
//! 所有 vslice crate 共用的错误类型. 码流一致性错误与调用契约错误分开表示,
//! 二者对当前 slice 都是致命的: 调用方只能丢弃已写入的图像缓冲并从 slice 起点重新解码.

use thiserror::Error;

/// vslice 统一错误类型
#[derive(Debug, Error)]
pub enum VsliceError {
    /// 无效参数 (如 tile 划分与图像尺寸不一致)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏或不符合标准的码流)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 子流提取超出剩余比特数
    #[error("子流越界: 子流 {index} 请求 {requested_bits} 位, 剩余 {available_bits} 位")]
    SubstreamOverrun {
        /// 子流索引
        index: usize,
        /// 请求的比特数
        requested_bits: usize,
        /// 剩余可用比特数
        available_bits: usize,
    },

    /// 子流或 slice 末尾缺少终止位
    #[error("缺少终止位: ctu_rs_addr={ctu_rs_addr}, slice_end={slice_end}")]
    MissingTerminatingBit {
        /// 终止位所在 CTU 的光栅地址
        ctu_rs_addr: u32,
        /// 是否为 slice 末尾 (否则为子流末尾)
        slice_end: bool,
    },

    /// 已到达码流末尾
    #[error("已到达码流末尾")]
    Eof,

    /// 内部错误 (调用契约被破坏, 不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl VsliceError {
    /// 是否为码流一致性错误.
    ///
    /// 符合标准的编码器不会产生此类码流; 出现时说明上游数据损坏.
    /// 其余错误表示解码器自身的契约被破坏.
    pub fn is_bitstream_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidData(_)
                | Self::SubstreamOverrun { .. }
                | Self::MissingTerminatingBit { .. }
                | Self::Eof
        )
    }
}

/// vslice 统一 Result 类型
pub type VsliceResult<T> = Result<T, VsliceError>;
