//! 图像与编码结构.
//!
//! [`Picture`] 聚合 slice 解码写入的全部图像级缓冲. 各缓冲的写入窗口:
//! - `prev_qp`: 由调度器在边界处重置, CTU 解析期间由熵解码引擎更新;
//! - `mcts_info`: 仅由调度器在帧间 slice 的每个 CTU 前写入;
//! - `cs`: 解析期间由熵解码引擎写入, 重建期间由重建引擎写入,
//!   边界处的预测状态重置由调度器完成.
//!
//! 三者是互不重叠的字段, 可以同时以 `&mut` 借出.

use std::sync::Arc;

use crate::params::{ALF_CTB_MAX_NUM_APS, Aps, ChromaFormat, Pps, Slice, SliceType, Sps};
use crate::slice_decoder::carry_over::{BcwCodingOrder, MotionLut, PalettePredictor, QP_UNDEFINED};

/// 亮度平面上的矩形区域 (像素)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Area {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Area {
    /// 创建区域
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 是否包含某个像素
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// 一个 CTU 覆盖的区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtuArea {
    /// 色度格式
    pub chroma_format: ChromaFormat,
    /// 亮度区域 (未按图像边界裁剪)
    pub luma: Area,
}

impl CtuArea {
    /// 亮度左上角位置
    pub fn luma_pos(&self) -> (u32, u32) {
        (self.luma.x, self.luma.y)
    }
}

/// 图像预计算几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureGeometry {
    /// 亮度宽度 (像素)
    pub luma_width: u32,
    /// 亮度高度 (像素)
    pub luma_height: u32,
    /// 色度格式
    pub chroma_format: ChromaFormat,
    /// CTU 尺寸
    pub max_cu_size: u32,
    /// log2(CTU 尺寸)
    pub log2_max_cu_size: u32,
    /// 图像宽度 (CTU 数)
    pub width_in_ctus: u32,
    /// 图像高度 (CTU 数)
    pub height_in_ctus: u32,
    /// CTU 总数
    pub size_in_ctus: u32,
}

impl PictureGeometry {
    /// 由 SPS 计算
    pub fn from_sps(sps: &Sps) -> Self {
        let width_in_ctus = sps.width_in_ctus();
        let height_in_ctus = sps.height_in_ctus();
        Self {
            luma_width: sps.pic_width,
            luma_height: sps.pic_height,
            chroma_format: sps.chroma_format,
            max_cu_size: sps.ctu_size(),
            log2_max_cu_size: sps.log2_ctu_size,
            width_in_ctus,
            height_in_ctus,
            size_in_ctus: width_in_ctus * height_in_ctus,
        }
    }

    /// 亮度位置所在 CTU 的光栅地址
    pub fn ctu_addr_from_luma(&self, x: u32, y: u32) -> u32 {
        (y >> self.log2_max_cu_size) * self.width_in_ctus + (x >> self.log2_max_cu_size)
    }

    /// CTU 位置 (CTU 单位) 对应的区域
    pub fn ctu_area(&self, ctu_x: u32, ctu_y: u32) -> CtuArea {
        CtuArea {
            chroma_format: self.chroma_format,
            luma: Area::new(
                ctu_x * self.max_cu_size,
                ctu_y * self.max_cu_size,
                self.max_cu_size,
                self.max_cu_size,
            ),
        }
    }

    /// CTU 矩形 (CTU 单位) 对应的亮度区域, 按图像边界裁剪
    pub fn clipped_luma_area(&self, ctu_x: u32, ctu_y: u32, width: u32, height: u32) -> Area {
        let x = ctu_x * self.max_cu_size;
        let y = ctu_y * self.max_cu_size;
        let right = ((ctu_x + width) * self.max_cu_size).min(self.luma_width);
        let bottom = ((ctu_y + height) * self.max_cu_size).min(self.luma_height);
        Area::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

/// 重建样本平面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub data: Vec<u16>,
}

impl Plane {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stride: width as usize,
            data: vec![0; width as usize * height as usize],
        }
    }
}

/// SAO 模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaoMode {
    #[default]
    Off,
    New,
    MergeLeft,
    MergeAbove,
}

/// 单个分量的 SAO 参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaoOffset {
    pub mode: SaoMode,
    pub type_idx: u8,
    pub type_aux: u8,
    pub offsets: [i32; 4],
}

/// 一个 CTU 的 SAO 参数 (三个分量)
pub type SaoBlockParams = [SaoOffset; 3];

/// 已解码 CTU 的归属, 用于邻居可用性判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtuOwner {
    pub independent_slice_idx: u32,
    pub tile_idx: u32,
}

/// 编码结构
///
/// 保存当前 slice 绑定的参数集与图像级解码缓冲.
#[derive(Debug, Clone)]
pub struct CodingStructure {
    /// 图像几何
    pub pcv: PictureGeometry,
    /// 当前 slice 的 SPS
    pub sps: Arc<Sps>,
    /// 当前 slice 的 PPS
    pub pps: Arc<Pps>,
    /// 当前 slice 类型
    pub slice_type: SliceType,
    /// 当前 slice 的独立 slice 索引
    pub independent_slice_idx: u32,
    /// ALF APS 表
    pub alf_apss: [Option<Arc<Aps>>; ALF_CTB_MAX_NUM_APS],
    /// LMCS APS
    pub lmcs_aps: Option<Arc<Aps>>,
    /// 缩放列表 APS
    pub scaling_list_aps: Option<Arc<Aps>>,
    /// 色度 QP 调整索引
    pub chroma_qp_adj: i32,
    /// 重建样本平面
    pub planes: Vec<Plane>,
    /// 每个 CTU 的 SAO 参数
    pub sao_params: Vec<SaoBlockParams>,
    /// 每个分量、每个 CTU 的 ALF 开关
    pub alf_ctu_enable_flag: [Vec<u8>; 3],
    /// 每个 CTU 的亮度 ALF 滤波器索引
    pub alf_ctb_filter_index: Vec<i16>,
    /// 每个色度分量、每个 CTU 的 ALF 备选滤波器
    pub alf_ctu_alternative: [Vec<u8>; 2],
    /// 运动向量历史表
    pub motion_lut: MotionLut,
    /// IBC 参考缓冲是否需要重新初始化
    pub reset_ibc_buffer: bool,
    /// 调色板预测器
    pub prev_plt: PalettePredictor,
    /// BCW 编码顺序
    pub bcw_order: BcwCodingOrder,
    ctu_owners: Vec<Option<CtuOwner>>,
}

impl CodingStructure {
    /// 为给定参数集创建编码结构, 全部缓冲清零
    pub fn new(sps: Arc<Sps>, pps: Arc<Pps>) -> Self {
        let pcv = PictureGeometry::from_sps(&sps);
        let (shift_x, shift_y) = sps.chroma_format.chroma_shift();
        let planes = (0..sps.chroma_format.num_components())
            .map(|comp| {
                if comp == 0 {
                    Plane::new(pcv.luma_width, pcv.luma_height)
                } else {
                    Plane::new(
                        pcv.luma_width.div_ceil(1 << shift_x),
                        pcv.luma_height.div_ceil(1 << shift_y),
                    )
                }
            })
            .collect();
        let size = pcv.size_in_ctus as usize;
        Self {
            pcv,
            sps,
            pps,
            slice_type: SliceType::I,
            independent_slice_idx: 0,
            alf_apss: Default::default(),
            lmcs_aps: None,
            scaling_list_aps: None,
            chroma_qp_adj: 0,
            planes,
            sao_params: Vec::new(),
            alf_ctu_enable_flag: Default::default(),
            alf_ctb_filter_index: Vec::new(),
            alf_ctu_alternative: Default::default(),
            motion_lut: MotionLut::default(),
            reset_ibc_buffer: false,
            prev_plt: PalettePredictor::default(),
            bcw_order: BcwCodingOrder::default(),
            ctu_owners: vec![None; size],
        }
    }

    /// 绑定 slice 的参数集引用
    pub fn bind_slice(&mut self, slice: &Slice) {
        self.sps = Arc::clone(&slice.sps);
        self.pps = Arc::clone(&slice.pps);
        self.slice_type = slice.slice_type;
        self.independent_slice_idx = slice.independent_slice_idx;
        self.alf_apss = slice.alf_apss.clone();
        self.lmcs_aps = slice.lmcs_aps.clone();
        self.scaling_list_aps = slice.scaling_list_aps.clone();
        self.chroma_qp_adj = 0;
    }

    /// 重新分配 SAO 参数, 所有 CTU 置为关闭
    pub fn resize_sao(&mut self, num_ctus: usize) {
        self.sao_params.clear();
        self.sao_params.resize(num_ctus, SaoBlockParams::default());
    }

    /// 重新分配 ALF 开关, 全部清零
    pub fn resize_alf_ctu_enable_flag(&mut self, num_ctus: usize) {
        for flags in &mut self.alf_ctu_enable_flag {
            flags.clear();
            flags.resize(num_ctus, 0);
        }
    }

    /// 重新分配 ALF 滤波器索引, 全部清零
    pub fn resize_alf_ctb_filter_index(&mut self, num_ctus: usize) {
        self.alf_ctb_filter_index.clear();
        self.alf_ctb_filter_index.resize(num_ctus, 0);
    }

    /// 重新分配 ALF 色度备选滤波器, 全部清零
    pub fn resize_alf_ctu_alternative(&mut self, num_ctus: usize) {
        for alts in &mut self.alf_ctu_alternative {
            alts.clear();
            alts.resize(num_ctus, 0);
        }
    }

    /// 记录 CTU 已由某个 slice / tile 解码
    pub fn mark_ctu_decoded(&mut self, rs_addr: u32, owner: CtuOwner) {
        if let Some(slot) = self.ctu_owners.get_mut(rs_addr as usize) {
            *slot = Some(owner);
        }
    }

    /// 清空 CTU 归属表, 全部 CTU 视为未解码
    pub fn reset_ctu_owners(&mut self) {
        self.ctu_owners.fill(None);
    }

    /// CTU 的归属, 未解码时为 `None`
    pub fn ctu_owner(&self, rs_addr: u32) -> Option<CtuOwner> {
        self.ctu_owners.get(rs_addr as usize).copied().flatten()
    }

    /// 受限邻居可用性: 亮度位置 `(x, y)` 所在 CTU 已解码,
    /// 且与当前 CTU 属于同一独立 slice 与同一 tile.
    pub fn is_ctu_available_restricted(
        &self,
        x: i64,
        y: i64,
        independent_slice_idx: u32,
        tile_idx: u32,
    ) -> bool {
        if x < 0
            || y < 0
            || x >= i64::from(self.pcv.luma_width)
            || y >= i64::from(self.pcv.luma_height)
        {
            return false;
        }
        let addr = self.pcv.ctu_addr_from_luma(x as u32, y as u32);
        matches!(
            self.ctu_owner(addr),
            Some(owner) if owner.independent_slice_idx == independent_slice_idx
                && owner.tile_idx == tile_idx
        )
    }
}

/// 运动约束信息: 当前 CTU 与其所在 tile 的亮度区域
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MctsInfo {
    ctu_addr: Option<u32>,
    tile_area: Area,
}

impl MctsInfo {
    /// 为即将解码的 CTU 初始化
    pub fn init(&mut self, ctu_addr: u32, tile_area: Area) {
        self.ctu_addr = Some(ctu_addr);
        self.tile_area = tile_area;
    }

    /// 当前 CTU 地址
    pub fn ctu_addr(&self) -> Option<u32> {
        self.ctu_addr
    }

    /// 当前 tile 的亮度区域
    pub fn tile_area(&self) -> Area {
        self.tile_area
    }

    /// 参考块是否完全位于当前 tile 内
    pub fn is_ref_block_inside(&self, area: Area) -> bool {
        area.width > 0
            && area.height > 0
            && self.tile_area.contains(area.x, area.y)
            && self
                .tile_area
                .contains(area.x + area.width - 1, area.y + area.height - 1)
    }
}

/// 解码目标图像
///
/// CTU 归属表跨 slice 保留. 复用同一个 `Picture` 解码新图像 (或在调试停止、
/// 出错后从头重解) 前必须调用 [`Picture::reset`], 否则残留的归属会被当作
/// 已解码的上方 CTU.
#[derive(Debug, Clone)]
pub struct Picture {
    /// 图像顺序号
    pub poc: i32,
    /// 编码结构
    pub cs: CodingStructure,
    /// 前序量化参数对
    pub prev_qp: [i32; 2],
    /// 运动约束信息
    pub mcts_info: MctsInfo,
}

impl Picture {
    /// 创建空白图像
    pub fn new(poc: i32, sps: Arc<Sps>, pps: Arc<Pps>) -> Self {
        Self {
            poc,
            cs: CodingStructure::new(sps, pps),
            prev_qp: [QP_UNDEFINED; 2],
            mcts_info: MctsInfo::default(),
        }
    }

    /// 为解码新图像重置逐图像状态
    pub fn reset(&mut self, poc: i32) {
        self.poc = poc;
        self.prev_qp = [QP_UNDEFINED; 2];
        self.mcts_info = MctsInfo::default();
        self.cs.reset_ctu_owners();
    }
}
