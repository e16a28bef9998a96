//! 子流拆分.
//!
//! slice 数据由若干熵编码子流首尾相接组成. 前 k 个子流的字节长度由
//! slice header 的 entry point 给出, 最后一个子流占据剩余全部比特.

use vslice_core::bitstream::InputBitstream;
use vslice_core::{VsliceError, VsliceResult};

/// 一个 slice 的全部子流
///
/// 在 `decode_slice` 内部持有, 调用结束时随之释放.
#[derive(Debug, Clone)]
pub struct SubstreamSet {
    substreams: Vec<InputBitstream>,
}

impl SubstreamSet {
    /// 子流个数
    pub fn len(&self) -> usize {
        self.substreams.len()
    }

    /// 是否没有子流 (合法拆分至少产生一个)
    pub fn is_empty(&self) -> bool {
        self.substreams.is_empty()
    }

    /// 获取第 `id` 个子流
    ///
    /// 码流标记的子流结束次数多于子流个数时会越界, 返回 `Internal`.
    pub fn get_mut(&mut self, id: usize) -> VsliceResult<&mut InputBitstream> {
        let len = self.substreams.len();
        self.substreams.get_mut(id).ok_or_else(|| {
            VsliceError::Internal(format!("子流索引越界: id={}, 子流数={}", id, len))
        })
    }

    /// 按顺序遍历子流
    pub fn iter(&self) -> impl Iterator<Item = &InputBitstream> {
        self.substreams.iter()
    }
}

/// 按子流长度表拆分码流
///
/// 共产生 `sizes.len() + 1` 个子流: 第 i 个 (i < k) 长 `sizes[i] * 8` 比特,
/// 最后一个取 `bitstream` 中剩余的全部比特. 拆分后 `bitstream` 位于末尾.
pub fn extract_substreams(
    bitstream: &mut InputBitstream,
    sizes: &[u32],
) -> VsliceResult<SubstreamSet> {
    let mut substreams = Vec::with_capacity(sizes.len() + 1);
    for (index, &size) in sizes.iter().enumerate() {
        let requested_bits = (size as usize) << 3;
        let available_bits = bitstream.bits_left();
        if requested_bits > available_bits {
            return Err(VsliceError::SubstreamOverrun {
                index,
                requested_bits,
                available_bits,
            });
        }
        substreams.push(bitstream.extract_substream(requested_bits)?);
    }
    let rest = bitstream.bits_left();
    substreams.push(bitstream.extract_substream(rest)?);

    log::trace!(
        "子流拆分: 子流数={}, 长度={:?}",
        substreams.len(),
        substreams.iter().map(InputBitstream::bit_len).collect::<Vec<_>>()
    );
    Ok(SubstreamSet { substreams })
}
