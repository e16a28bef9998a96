//! slice 解码调度.
//!
//! 按 slice 内 CTU 顺序驱动熵解码引擎与重建引擎, 并在 slice / tile /
//! 波前行边界处完成以下工作:
//! - 子流切换与子流末尾的终止位检查;
//! - 熵解码上下文的重置与波前同步 (保存/恢复快照);
//! - 前序 QP、调色板预测器、运动向量历史表与 BCW 顺序表的重置.
//!
//! 解码流程:
//! 1. 绑定参数集并重新分配图像级缓冲
//! 2. 按 entry point 拆分子流, 在第一个子流上初始化上下文
//! 3. 逐个 CTU: 边界处理 -> 解析 -> 重建 -> 保存快照 -> 终止位检查

pub mod address;
pub mod carry_over;
pub mod context_cache;
pub mod substream;


use bitflags::bitflags;
use log::{debug, trace};
use vslice_core::bitstream::InputBitstream;
use vslice_core::{VsliceError, VsliceResult};

use crate::engine::{CtuReconstructor, EntropyDecoder};
use crate::params::{Slice, SliceType};
use crate::picture::{CtuOwner, Picture, PictureGeometry};

use address::CtuPosition;
use carry_over::reset_prev_qp;
use context_cache::ContextCache;
use substream::extract_substreams;

bitflags! {
    /// CTU 所处的边界, 决定解析前后的状态切换
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CtuBoundary: u8 {
        /// slice 第一个 CTU
        const SLICE_START         = 1 << 0;
        /// tile 左上角 CTU
        const TILE_START          = 1 << 1;
        /// 波前行起点 (tile 左边界, 非 tile 左上角, 且启用波前)
        const WAVEFRONT_ROW_START = 1 << 2;
        /// tile 左边界 (运动向量历史表在此清空)
        const TILE_LEFT_EDGE      = 1 << 3;
        /// 子流最后一个 CTU (tile 末尾或波前行末尾)
        const SUBSTREAM_END       = 1 << 4;
        /// slice 最后一个 CTU
        const SLICE_END           = 1 << 5;
    }
}

impl CtuBoundary {
    /// 按 CTU 位置与其在 slice 内的序号分类
    pub fn classify(
        ctu: &CtuPosition,
        ctu_idx: usize,
        num_ctus: usize,
        wavefronts_enabled: bool,
    ) -> Self {
        let mut boundary = Self::empty();
        boundary.set(Self::SLICE_START, ctu_idx == 0);
        boundary.set(Self::SLICE_END, ctu_idx + 1 == num_ctus);
        boundary.set(Self::TILE_LEFT_EDGE, ctu.is_tile_left_edge());
        if ctu.is_tile_origin() {
            boundary.insert(Self::TILE_START);
        } else if wavefronts_enabled && ctu.is_tile_left_edge() {
            boundary.insert(Self::WAVEFRONT_ROW_START);
        }
        boundary.set(
            Self::SUBSTREAM_END,
            ctu.is_tile_last_column() && (ctu.is_tile_bottom_row() || wavefronts_enabled),
        );
        boundary
    }
}

/// slice 解码选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceDecoderOptions {
    /// 在子流与 slice 末尾检查剩余字节
    pub check_trailing_bytes: bool,
}

impl Default for SliceDecoderOptions {
    fn default() -> Self {
        Self {
            check_trailing_bytes: true,
        }
    }
}

/// 一次 slice 解码的统计结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceDecodeSummary {
    /// 已解析并重建的 CTU 数
    pub ctus_decoded: usize,
    /// 拆分出的子流数
    pub substreams: usize,
    /// 通过终止位检查结束的子流数 (不含 slice 末尾)
    pub substreams_terminated: usize,
    /// 从上方快照恢复上下文的次数
    pub wpp_syncs: usize,
    /// 在调试 CTU 处提前停止时的 CTU 地址
    pub stopped_at_debug_ctu: Option<u32>,
}

/// slice 解码器
///
/// 持有熵解码引擎与重建引擎, 每次 [`decode_slice`](Self::decode_slice)
/// 调用互相独立, 调用之间不保留任何调度状态.
pub struct SliceDecoder<E: EntropyDecoder, R: CtuReconstructor> {
    entropy: E,
    reconstructor: R,
    options: SliceDecoderOptions,
}

impl<E: EntropyDecoder, R: CtuReconstructor> SliceDecoder<E, R> {
    /// 使用默认选项创建
    pub fn new(entropy: E, reconstructor: R) -> Self {
        Self::with_options(entropy, reconstructor, SliceDecoderOptions::default())
    }

    /// 使用指定选项创建
    pub fn with_options(entropy: E, reconstructor: R, options: SliceDecoderOptions) -> Self {
        Self {
            entropy,
            reconstructor,
            options,
        }
    }

    /// 当前选项
    pub fn options(&self) -> SliceDecoderOptions {
        self.options
    }

    /// 熵解码引擎
    pub fn entropy(&self) -> &E {
        &self.entropy
    }

    /// 熵解码引擎 (可变)
    pub fn entropy_mut(&mut self) -> &mut E {
        &mut self.entropy
    }

    /// 重建引擎
    pub fn reconstructor(&self) -> &R {
        &self.reconstructor
    }

    /// 重建引擎 (可变)
    pub fn reconstructor_mut(&mut self) -> &mut R {
        &mut self.reconstructor
    }

    /// 拆出两个引擎
    pub fn into_parts(self) -> (E, R) {
        (self.entropy, self.reconstructor)
    }

    /// 解码一个 slice 的全部 CTU
    ///
    /// `debug_ctu` 命中时在该 CTU 解析前停止并返回 `Ok`, 此时图像处于
    /// 部分解码状态. 出错时图像缓冲同样不完整, 调用方应从 slice 起点重新解码.
    pub fn decode_slice(
        &mut self,
        slice: &mut Slice,
        picture: &mut Picture,
        bitstream: &mut InputBitstream,
        debug_ctu: Option<u32>,
    ) -> VsliceResult<SliceDecodeSummary> {
        slice.start_processing_timer();
        let result = self.decode_slice_ctus(slice, picture, bitstream, debug_ctu);
        slice.stop_processing_timer();
        result
    }

    fn decode_slice_ctus(
        &mut self,
        slice: &Slice,
        picture: &mut Picture,
        bitstream: &mut InputBitstream,
        debug_ctu: Option<u32>,
    ) -> VsliceResult<SliceDecodeSummary> {
        let Picture {
            cs,
            prev_qp,
            mcts_info,
            ..
        } = picture;

        let tiles = &slice.pps.tiles;
        let slice_pcv = PictureGeometry::from_sps(&slice.sps);
        if slice_pcv != cs.pcv {
            return Err(VsliceError::InvalidArgument(format!(
                "SPS 几何 {}x{} (CTU {}) 与图像几何 {}x{} (CTU {}) 不一致",
                slice_pcv.luma_width,
                slice_pcv.luma_height,
                slice_pcv.max_cu_size,
                cs.pcv.luma_width,
                cs.pcv.luma_height,
                cs.pcv.max_cu_size,
            )));
        }
        if tiles.width_in_ctus() != cs.pcv.width_in_ctus
            || tiles.height_in_ctus() != cs.pcv.height_in_ctus
        {
            return Err(VsliceError::InvalidArgument(format!(
                "PPS 的 CTU 网格 {}x{} 与图像 {}x{} 不一致",
                tiles.width_in_ctus(),
                tiles.height_in_ctus(),
                cs.pcv.width_in_ctus,
                cs.pcv.height_in_ctus,
            )));
        }
        if slice.ctu_addrs.is_empty() {
            return Err(VsliceError::Internal("slice 不含任何 CTU".into()));
        }

        // 编码结构初始化
        cs.bind_slice(slice);
        let size_in_ctus = cs.pcv.size_in_ctus as usize;
        cs.resize_sao(size_in_ctus);
        cs.prev_plt.reset();
        if slice.first_ctu_rs_addr() == Some(0) {
            cs.resize_alf_ctu_enable_flag(size_in_ctus);
            cs.resize_alf_ctb_filter_index(size_in_ctus);
            cs.resize_alf_ctu_alternative(size_in_ctus);
        }

        let mut substreams = extract_substreams(bitstream, &slice.substream_sizes)?;
        let wavefronts_enabled = slice.pps.entropy_coding_sync_enabled;

        self.entropy.init_ctx_models(slice, substreams.get_mut(0)?)?;
        reset_prev_qp(prev_qp, slice.slice_qp)?;

        debug!("=========== POC: {} ===========", slice.poc);

        let mut sync_contexts: ContextCache<E::ContextState> = ContextCache::new();
        let mut summary = SliceDecodeSummary {
            substreams: substreams.len(),
            ..Default::default()
        };
        let mut sub_strm_id = 0usize;
        let num_ctus = slice.num_ctus_in_slice();

        for ctu_idx in 0..num_ctus {
            let ctu_rs_addr = slice.ctu_addr_in_slice(ctu_idx)?;
            let ctu = tiles.position(ctu_rs_addr)?;
            let area = cs.pcv.ctu_area(ctu.x, ctu.y);
            let (pos_x, pos_y) = area.luma_pos();
            let boundary = CtuBoundary::classify(&ctu, ctu_idx, num_ctus, wavefronts_enabled);

            trace!(
                "ctu={} pos=({}, {}) tile={} substream={} boundary={:?}",
                ctu_rs_addr,
                ctu.x,
                ctu.y,
                ctu.tile_idx,
                sub_strm_id,
                boundary
            );

            let bits = substreams.get_mut(sub_strm_id)?;

            // 上下文状态
            if boundary.contains(CtuBoundary::TILE_START) {
                // slice 第一个 CTU 已在进入时初始化
                if !boundary.contains(CtuBoundary::SLICE_START) {
                    self.entropy.init_ctx_models(slice, bits)?;
                    cs.prev_plt.reset();
                }
                reset_prev_qp(prev_qp, slice.slice_qp)?;
            } else if boundary.contains(CtuBoundary::WAVEFRONT_ROW_START) {
                if !boundary.contains(CtuBoundary::SLICE_START) {
                    self.entropy.init_ctx_models(slice, bits)?;
                    cs.prev_plt.reset();
                }
                if cs.is_ctu_available_restricted(
                    i64::from(pos_x),
                    i64::from(pos_y) - 1,
                    slice.independent_slice_idx,
                    ctu.tile_idx,
                ) {
                    sync_contexts.restore(&mut self.entropy)?;
                    summary.wpp_syncs += 1;
                    trace!("ctu={} 从上方 CTU 同步上下文", ctu_rs_addr);
                }
                reset_prev_qp(prev_qp, slice.slice_qp)?;
            }

            if slice.slice_type == SliceType::B && boundary.contains(CtuBoundary::SLICE_START) {
                cs.bcw_order.reset(slice.low_delay);
            }

            if (!slice.is_intra() || slice.sps.ibc_enabled)
                && boundary.contains(CtuBoundary::TILE_LEFT_EDGE)
            {
                cs.motion_lut.clear();
                cs.reset_ibc_buffer = true;
            }

            if !slice.is_intra() {
                let tile_area = cs.pcv.clipped_luma_area(
                    ctu.tile_x,
                    ctu.tile_y,
                    ctu.tile_width,
                    ctu.tile_height,
                );
                mcts_info.init(cs.pcv.ctu_addr_from_luma(pos_x, pos_y), tile_area);
            }

            if debug_ctu == Some(ctu_rs_addr) {
                debug!("在调试 CTU {} 处停止解码", ctu_rs_addr);
                summary.stopped_at_debug_ctu = Some(ctu_rs_addr);
                break;
            }

            self.entropy
                .parse_coding_tree_unit(bits, cs, &area, prev_qp, ctu_rs_addr)?;
            cs.mark_ctu_decoded(
                ctu_rs_addr,
                CtuOwner {
                    independent_slice_idx: slice.independent_slice_idx,
                    tile_idx: ctu.tile_idx,
                },
            );

            self.reconstructor.reconstruct_ctu(cs, &area)?;
            summary.ctus_decoded += 1;

            if wavefronts_enabled && boundary.contains(CtuBoundary::TILE_LEFT_EDGE) {
                sync_contexts.save(&self.entropy);
            }

            if boundary.contains(CtuBoundary::SLICE_END) {
                self.expect_terminating_bit(bits, ctu_rs_addr, true)?;
                if self.options.check_trailing_bytes {
                    self.entropy.check_remaining_bytes(bits, false)?;
                }
            } else if boundary.contains(CtuBoundary::SUBSTREAM_END) {
                self.expect_terminating_bit(bits, ctu_rs_addr, false)?;
                if self.options.check_trailing_bytes {
                    self.entropy.check_remaining_bytes(bits, true)?;
                }
                sub_strm_id += 1;
                summary.substreams_terminated += 1;
                trace!("子流 {} 结束于 ctu={}", sub_strm_id - 1, ctu_rs_addr);
            }
        }

        Ok(summary)
    }

    fn expect_terminating_bit(
        &mut self,
        bits: &mut InputBitstream,
        ctu_rs_addr: u32,
        slice_end: bool,
    ) -> VsliceResult<()> {
        if self.entropy.read_terminating_bit(bits)? {
            Ok(())
        } else {
            Err(VsliceError::MissingTerminatingBit {
                ctu_rs_addr,
                slice_end,
            })
        }
    }
}
