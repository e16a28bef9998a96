//! 跨 CTU 延续的预测状态.
//!
//! 包括前序量化参数对、调色板预测器、运动向量历史表 (HMVP) 与
//! 双向加权 (BCW) 的编码顺序表. 这些状态在 CTU 之间延续,
//! 并在 slice / tile / 波前行起点按规则重置.

use vslice_core::{VsliceError, VsliceResult};

/// 未定义的量化参数
pub const QP_UNDEFINED: i32 = i32::MAX;

/// 调色板预测器最大条目数
pub const MAX_PLT_PRED_SIZE: usize = 63;

/// 运动向量历史表最大候选数
pub const MAX_NUM_HMVP_CANDS: usize = 5;

/// BCW 权重个数
pub const BCW_NUM: usize = 5;

/// BCW 权重基数 (log2)
pub const BCW_LOG2_WEIGHT_BASE: u32 = 3;

/// BCW 默认 (等权) 索引
pub const BCW_DEFAULT: u8 = 2;

/// BCW 权重表, 对应权重基数 8
pub const BCW_WEIGHTS: [i8; BCW_NUM] = [-2, 3, 4, 5, 10];

/// BCW 搜索顺序: 等权优先, 随后由近及远
pub const BCW_SEARCH_ORDER: [u8; BCW_NUM] = [2, 3, 1, 4, 0];

/// 把前序 QP 对重置为 slice QP
pub fn reset_prev_qp(prev_qp: &mut [i32; 2], slice_qp: i32) -> VsliceResult<()> {
    *prev_qp = [slice_qp, slice_qp];
    if prev_qp[0] == QP_UNDEFINED {
        return Err(VsliceError::InvalidData("前序 QP 未定义".into()));
    }
    Ok(())
}

// ============================================================
// 调色板预测器
// ============================================================

/// 调色板预测器
///
/// 亮度与色度通道各自维护当前条目数, 每个分量保存条目值.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettePredictor {
    cur_size: [usize; 2],
    entries: [Vec<u16>; 3],
}

impl Default for PalettePredictor {
    fn default() -> Self {
        Self {
            cur_size: [0; 2],
            entries: std::array::from_fn(|_| Vec::with_capacity(MAX_PLT_PRED_SIZE)),
        }
    }
}

impl PalettePredictor {
    /// 清空全部条目
    pub fn reset(&mut self) {
        self.cur_size = [0; 2];
        for comp in &mut self.entries {
            comp.clear();
        }
    }

    /// 通道 (0=亮度, 1=色度) 的当前条目数
    pub fn cur_size(&self, channel: usize) -> usize {
        self.cur_size[channel]
    }

    /// 分量的条目
    pub fn entries(&self, comp: usize) -> &[u16] {
        &self.entries[comp]
    }

    /// 更新一个通道的预测器条目, 超出容量的部分丢弃.
    ///
    /// 亮度通道对应分量 0, 色度通道对应分量 1 与 2.
    pub fn update(&mut self, channel: usize, comps: &[&[u16]]) {
        let first_comp = if channel == 0 { 0 } else { 1 };
        let mut size = 0;
        for (offset, values) in comps.iter().enumerate() {
            let comp = &mut self.entries[first_comp + offset];
            comp.clear();
            comp.extend(values.iter().take(MAX_PLT_PRED_SIZE));
            size = comp.len();
        }
        self.cur_size[channel] = size;
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.cur_size == [0; 2]
    }
}

// ============================================================
// 运动向量历史表
// ============================================================

/// 运动向量 (1/16 像素)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mv {
    pub x: i32,
    pub y: i32,
}

/// 一个 HMVP 候选的运动信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionInfo {
    /// 预测方向 (1=L0, 2=L1, 3=双向)
    pub inter_dir: u8,
    /// 两个参考列表的运动向量
    pub mv: [Mv; 2],
    /// 两个参考列表的参考索引 (-1 表示未使用)
    pub ref_idx: [i8; 2],
    /// BCW 索引
    pub bcw_idx: u8,
}

/// 运动向量历史表 (普通帧间 + IBC)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionLut {
    pub lut: Vec<MotionInfo>,
    pub lut_ibc: Vec<MotionInfo>,
}

impl MotionLut {
    /// 清空两张历史表
    pub fn clear(&mut self) {
        self.lut.clear();
        self.lut_ibc.clear();
    }

    /// 追加一个候选: 先移除相同候选, 表满时丢弃最旧的一项
    pub fn add_hmvp_cand(&mut self, info: MotionInfo, ibc: bool) {
        let lut = if ibc { &mut self.lut_ibc } else { &mut self.lut };
        if let Some(dup) = lut.iter().position(|cand| *cand == info) {
            lut.remove(dup);
        } else if lut.len() == MAX_NUM_HMVP_CANDS {
            lut.remove(0);
        }
        lut.push(info);
    }
}

// ============================================================
// BCW 编码顺序
// ============================================================

/// BCW 编码/解析顺序表
///
/// 非低延迟 slice 只允许中间三个权重.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BcwCodingOrder {
    coding_order: [u8; BCW_NUM],
    parsing_order: [u8; BCW_NUM],
    num_codable: u8,
}

impl Default for BcwCodingOrder {
    fn default() -> Self {
        let mut order = Self {
            coding_order: [0; BCW_NUM],
            parsing_order: [0; BCW_NUM],
            num_codable: 0,
        };
        order.reset(true);
        order
    }
}

impl BcwCodingOrder {
    /// 按搜索顺序重新生成编码/解析顺序
    ///
    /// 顺序表与参数无关. `low_delay` 只决定可编码权重个数, 对应解析时的
    /// 低延迟检查, 在此一并缓存.
    pub fn reset(&mut self, low_delay: bool) {
        self.parsing_order = BCW_SEARCH_ORDER;
        for (code, &bcw_idx) in BCW_SEARCH_ORDER.iter().enumerate() {
            self.coding_order[bcw_idx as usize] = code as u8;
        }
        self.num_codable = if low_delay { BCW_NUM as u8 } else { 3 };
    }

    /// BCW 索引对应的码字序号
    pub fn coding_index(&self, bcw_idx: u8) -> u8 {
        self.coding_order[bcw_idx as usize]
    }

    /// 码字序号对应的 BCW 索引
    pub fn bcw_idx_from_code(&self, code: u8) -> u8 {
        self.parsing_order[code as usize]
    }

    /// 可编码的权重个数
    pub fn num_codable(&self) -> u8 {
        self.num_codable
    }

    /// BCW 索引对应的 L1 权重 (L0 权重为基数减去它)
    pub fn weight(bcw_idx: u8) -> i8 {
        BCW_WEIGHTS[bcw_idx as usize]
    }
}
