//! 比特流读取器.
//!
//! 提供从 slice 数据中按位读取的能力, 并支持把码流切分为若干独立子流
//! (tile / 波前行各自一个熵编码段).
//!
//! 按大端位序读取 (MSB first). 底层数据以 [`Bytes`] 持有, 字节对齐的子流提取
//! 只增加引用计数, 不复制数据.

use bytes::Bytes;

use crate::{VsliceError, VsliceResult};

/// 输入比特流
///
/// 持有数据所有权, 可整体移动给子流使用者. 有效位数可以不是 8 的倍数
/// (非对齐提取的子流最后一个字节只有高位有效).
///
/// # 示例
/// ```
/// use vslice_core::bitstream::InputBitstream;
///
/// let mut bs = InputBitstream::new(vec![0b1011_0001, 0b0101_0101]);
/// assert_eq!(bs.read_bits(4).unwrap(), 0b1011);
/// let mut sub = bs.extract_substream(4).unwrap();
/// assert_eq!(sub.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(bs.bits_left(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct InputBitstream {
    /// 源数据
    data: Bytes,
    /// 有效比特总数
    bit_len: usize,
    /// 当前读取位置 (比特)
    pos: usize,
}

impl InputBitstream {
    /// 创建新的比特流, 全部字节有效
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let bit_len = data.len() * 8;
        Self {
            data,
            bit_len,
            pos: 0,
        }
    }

    /// 创建只有前 `bit_len` 位有效的比特流
    pub fn with_bit_len(data: impl Into<Bytes>, bit_len: usize) -> VsliceResult<Self> {
        let data = data.into();
        if bit_len > data.len() * 8 {
            return Err(VsliceError::InvalidArgument(format!(
                "有效位数 {} 超过数据长度 {} 字节",
                bit_len,
                data.len(),
            )));
        }
        Ok(Self {
            data,
            bit_len,
            pos: 0,
        })
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.bit_len - self.pos
    }

    /// 有效比特总数
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 当前位置是否字节对齐
    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> VsliceResult<u32> {
        if self.pos >= self.bit_len {
            return Err(VsliceError::Eof);
        }
        let byte = self.data[self.pos >> 3];
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> VsliceResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(VsliceError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(VsliceError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let bit_in_byte = (self.pos & 7) as u32;
            let available = 8 - bit_in_byte;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.pos >> 3] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);
            self.pos += to_read as usize;
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> VsliceResult<u32> {
        let saved = self.pos;
        let result = self.read_bits(n);
        self.pos = saved;
        result
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> VsliceResult<()> {
        if n > self.bits_left() {
            return Err(VsliceError::Eof);
        }
        self.pos += n;
        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事. 不会越过有效位末尾.
    pub fn align_to_byte(&mut self) {
        let aligned = (self.pos + 7) & !7;
        self.pos = aligned.min(self.bit_len);
    }

    /// 读出 rbsp 尾部比特: 一个 `1` 后跟若干 `0` 直到字节对齐
    pub fn read_out_trailing_bits(&mut self) -> VsliceResult<()> {
        if self.read_bit()? != 1 {
            return Err(VsliceError::InvalidData("尾部比特缺少停止位".into()));
        }
        while !self.is_byte_aligned() {
            if self.read_bit()? != 0 {
                return Err(VsliceError::InvalidData("尾部对齐比特不为 0".into()));
            }
        }
        Ok(())
    }

    /// 从当前位置提取 `num_bits` 位作为独立子流, 并前移当前位置.
    ///
    /// 当前位置与长度都字节对齐时与原码流共享底层数据; 否则逐字节复制,
    /// 子流末尾不足一字节的部分左对齐存放.
    pub fn extract_substream(&mut self, num_bits: usize) -> VsliceResult<InputBitstream> {
        if num_bits > self.bits_left() {
            return Err(VsliceError::Eof);
        }

        if self.is_byte_aligned() && num_bits % 8 == 0 {
            let start = self.pos >> 3;
            let end = start + (num_bits >> 3);
            self.pos += num_bits;
            return Ok(InputBitstream::new(self.data.slice(start..end)));
        }

        let mut buf = Vec::with_capacity(num_bits.div_ceil(8));
        let mut remaining = num_bits;
        while remaining >= 8 {
            buf.push(self.read_bits(8)? as u8);
            remaining -= 8;
        }
        if remaining > 0 {
            let tail = self.read_bits(remaining as u32)? as u8;
            buf.push(tail << (8 - remaining));
        }
        InputBitstream::with_bit_len(buf, num_bits)
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}
