//! slice 解码所需的参数集与 slice 描述.
//!
//! SPS/PPS/APS 与 slice header 的解析不在本 crate 范围内, 这里只定义
//! 解析结果中 CTU 循环真正用到的字段. 参数集以 `Arc` 共享, slice 解码期间只读.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vslice_core::{VsliceError, VsliceResult};

use crate::slice_decoder::address::TileLayout;

/// ALF APS 表容量
pub const ALF_CTB_MAX_NUM_APS: usize = 8;

/// slice 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceType {
    /// 双向预测 slice
    B,
    /// 单向预测 slice
    P,
    /// 帧内 slice
    I,
}

impl SliceType {
    /// 是否为帧内 slice
    pub fn is_intra(self) -> bool {
        self == Self::I
    }
}

/// 色度格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaFormat {
    /// 单色 (4:0:0)
    Monochrome,
    /// 4:2:0
    Yuv420,
    /// 4:2:2
    Yuv422,
    /// 4:4:4
    Yuv444,
}

impl ChromaFormat {
    /// 分量个数
    pub fn num_components(self) -> usize {
        match self {
            Self::Monochrome => 1,
            _ => 3,
        }
    }

    /// 色度水平/垂直下采样位移 `(shift_x, shift_y)`
    pub fn chroma_shift(self) -> (u32, u32) {
        match self {
            Self::Yuv420 => (1, 1),
            Self::Yuv422 => (1, 0),
            Self::Monochrome | Self::Yuv444 => (0, 0),
        }
    }
}

/// SPS 中与 CTU 循环相关的字段
#[derive(Debug, Clone)]
pub struct Sps {
    /// SPS ID
    pub sps_id: u32,
    /// 亮度宽度 (像素)
    pub pic_width: u32,
    /// 亮度高度 (像素)
    pub pic_height: u32,
    /// log2(CTU 尺寸)
    pub log2_ctu_size: u32,
    /// 色度格式
    pub chroma_format: ChromaFormat,
    /// 亮度位深
    pub bit_depth: u32,
    /// 帧内块拷贝 (IBC) 是否启用
    pub ibc_enabled: bool,
    /// 调色板模式是否启用
    pub palette_enabled: bool,
}

impl Sps {
    /// CTU 尺寸 (亮度像素)
    pub fn ctu_size(&self) -> u32 {
        1 << self.log2_ctu_size
    }

    /// 图像宽度 (CTU 数)
    pub fn width_in_ctus(&self) -> u32 {
        self.pic_width.div_ceil(self.ctu_size())
    }

    /// 图像高度 (CTU 数)
    pub fn height_in_ctus(&self) -> u32 {
        self.pic_height.div_ceil(self.ctu_size())
    }
}

/// PPS 中与 CTU 循环相关的字段
#[derive(Debug, Clone)]
pub struct Pps {
    /// PPS ID
    pub pps_id: u32,
    /// 引用的 SPS ID
    pub sps_id: u32,
    /// tile 划分 (每个 slice 只读)
    pub tiles: TileLayout,
    /// 熵编码同步 (波前并行) 是否启用
    pub entropy_coding_sync_enabled: bool,
}

impl Pps {
    /// 按显式 tile 列宽/行高构建 PPS
    pub fn new(
        pps_id: u32,
        sps: &Sps,
        tile_column_widths: &[u32],
        tile_row_heights: &[u32],
        entropy_coding_sync_enabled: bool,
    ) -> VsliceResult<Self> {
        let tiles = TileLayout::new(
            sps.width_in_ctus(),
            sps.height_in_ctus(),
            tile_column_widths,
            tile_row_heights,
        )?;
        Ok(Self {
            pps_id,
            sps_id: sps.sps_id,
            tiles,
            entropy_coding_sync_enabled,
        })
    }

    /// 单 tile 覆盖整幅图像的 PPS
    pub fn single_tile(pps_id: u32, sps: &Sps, entropy_coding_sync_enabled: bool) -> Self {
        Self {
            pps_id,
            sps_id: sps.sps_id,
            tiles: TileLayout::single(sps.width_in_ctus(), sps.height_in_ctus()),
            entropy_coding_sync_enabled,
        }
    }
}

/// APS 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApsType {
    /// 自适应环路滤波参数
    Alf,
    /// 亮度映射与色度缩放参数
    Lmcs,
    /// 量化缩放列表
    ScalingList,
}

/// 自适应参数集 (只保留标识, 具体参数由重建引擎解释)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aps {
    /// APS ID
    pub aps_id: u32,
    /// APS 类型
    pub aps_type: ApsType,
}

/// 一个 slice 的解码描述
///
/// 由上层 (slice header 解析) 构造. 对 slice 解码调度而言只读,
/// 唯一的例外是处理计时.
#[derive(Debug, Clone)]
pub struct Slice {
    /// slice 类型
    pub slice_type: SliceType,
    /// slice 量化参数
    pub slice_qp: i32,
    /// 图像顺序号
    pub poc: i32,
    /// 独立 slice 索引 (用于邻居可用性判断)
    pub independent_slice_idx: u32,
    /// 低延迟 (所有参考帧 POC 均不大于当前帧)
    pub low_delay: bool,
    /// 激活的 SPS
    pub sps: Arc<Sps>,
    /// 激活的 PPS
    pub pps: Arc<Pps>,
    /// ALF APS 表
    pub alf_apss: [Option<Arc<Aps>>; ALF_CTB_MAX_NUM_APS],
    /// LMCS APS
    pub lmcs_aps: Option<Arc<Aps>>,
    /// 缩放列表 APS
    pub scaling_list_aps: Option<Arc<Aps>>,
    /// 子流字节长度表 (entry point 偏移换算后的结果)
    pub substream_sizes: Vec<u32>,
    /// slice 内 CTU 的光栅地址, 按解码顺序排列
    pub ctu_addrs: Vec<u32>,
    processing_started: Option<Instant>,
    processing_time: Duration,
}

impl Slice {
    /// 创建 slice 描述, 其余字段取默认值
    pub fn new(
        slice_type: SliceType,
        slice_qp: i32,
        sps: Arc<Sps>,
        pps: Arc<Pps>,
        ctu_addrs: Vec<u32>,
    ) -> Self {
        Self {
            slice_type,
            slice_qp,
            poc: 0,
            independent_slice_idx: 0,
            low_delay: false,
            sps,
            pps,
            alf_apss: Default::default(),
            lmcs_aps: None,
            scaling_list_aps: None,
            substream_sizes: Vec::new(),
            ctu_addrs,
            processing_started: None,
            processing_time: Duration::ZERO,
        }
    }

    /// 是否为帧内 slice
    pub fn is_intra(&self) -> bool {
        self.slice_type.is_intra()
    }

    /// slice 内 CTU 数
    pub fn num_ctus_in_slice(&self) -> usize {
        self.ctu_addrs.len()
    }

    /// slice 内第 `idx` 个 CTU 的光栅地址
    pub fn ctu_addr_in_slice(&self, idx: usize) -> VsliceResult<u32> {
        self.ctu_addrs.get(idx).copied().ok_or_else(|| {
            VsliceError::Internal(format!(
                "slice 内 CTU 索引越界: idx={}, num_ctus={}",
                idx,
                self.ctu_addrs.len()
            ))
        })
    }

    /// 第一个 CTU 的光栅地址
    pub fn first_ctu_rs_addr(&self) -> Option<u32> {
        self.ctu_addrs.first().copied()
    }

    /// 显式声明的子流长度个数
    pub fn number_of_substream_sizes(&self) -> usize {
        self.substream_sizes.len()
    }

    /// 开始处理计时
    pub fn start_processing_timer(&mut self) {
        self.processing_started = Some(Instant::now());
    }

    /// 结束处理计时, 累加到总处理时间
    pub fn stop_processing_timer(&mut self) {
        if let Some(started) = self.processing_started.take() {
            self.processing_time += started.elapsed();
        }
    }

    /// 累计处理时间
    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }
}
