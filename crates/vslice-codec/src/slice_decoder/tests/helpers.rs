use std::sync::Arc;

use vslice_core::bitstream::InputBitstream;
use vslice_core::{VsliceError, VsliceResult};

use crate::engine::{CtuReconstructor, EntropyDecoder};
use crate::params::{ChromaFormat, Pps, Slice, SliceType, Sps};
use crate::picture::{CodingStructure, CtuArea, Picture};
use crate::slice_decoder::carry_over::{MotionInfo, Mv};
use crate::slice_decoder::{SliceDecoder, SliceDecoderOptions};

/// 测试用 CTU 尺寸 (log2)
pub const TEST_LOG2_CTU_SIZE: u32 = 4;

/// 终止位 `1` 加对齐零比特
pub const TERMINATOR: u8 = 0x80;

/// 某个 slice 类型与 QP 下的初始上下文
pub fn initial_context(slice_type: SliceType, slice_qp: i32) -> u64 {
    let type_seed = match slice_type {
        SliceType::B => 0xB000,
        SliceType::P => 0xA000,
        SliceType::I => 0x9000,
    };
    type_seed + slice_qp as u64
}

/// 解析一个 CTU 后的上下文
pub fn mix_context(ctx: u64, payload: u8) -> u64 {
    ctx.wrapping_mul(31).wrapping_add(u64::from(payload) + 1)
}

/// 单个 CTU 解析时观察到的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecord {
    pub ctu_rs_addr: u32,
    pub payload: u8,
    /// 解析前的上下文
    pub ctx_before: u64,
    /// 解析前的前序 QP
    pub prev_qp_before: [i32; 2],
    /// 解析前调色板预测器是否为空
    pub palette_empty: bool,
    /// 解析前运动向量历史表长度
    pub lut_len: usize,
    /// 解析前 IBC 缓冲重置标记
    pub reset_ibc_buffer: bool,
    /// 解析前 BCW 可编码权重个数
    pub bcw_num_codable: u8,
}

/// 按固定规则消耗比特的熵解码引擎
///
/// 每个 CTU 读取 8 位负载并混入上下文; 终止位为单个比特;
/// 剩余字节检查先对齐再要求子流读完.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    pub ctx: u64,
    pub inits: usize,
    pub restores: Vec<u64>,
    pub parses: Vec<ParseRecord>,
    pub terminating_bits: usize,
    pub trailing_checks: Vec<bool>,
}

impl ScriptedEngine {
    pub fn parse_of(&self, ctu_rs_addr: u32) -> &ParseRecord {
        self.parses
            .iter()
            .find(|p| p.ctu_rs_addr == ctu_rs_addr)
            .unwrap_or_else(|| panic!("CTU {} 未被解析", ctu_rs_addr))
    }
}

impl EntropyDecoder for ScriptedEngine {
    type ContextState = u64;

    fn init_ctx_models(&mut self, slice: &Slice, _bits: &mut InputBitstream) -> VsliceResult<()> {
        self.ctx = initial_context(slice.slice_type, slice.slice_qp);
        self.inits += 1;
        Ok(())
    }

    fn context_state(&self) -> u64 {
        self.ctx
    }

    fn set_context_state(&mut self, state: u64) {
        self.restores.push(state);
        self.ctx = state;
    }

    fn parse_coding_tree_unit(
        &mut self,
        bits: &mut InputBitstream,
        cs: &mut CodingStructure,
        _area: &CtuArea,
        prev_qp: &mut [i32; 2],
        ctu_rs_addr: u32,
    ) -> VsliceResult<()> {
        let payload = bits.read_bits(8)? as u8;
        self.parses.push(ParseRecord {
            ctu_rs_addr,
            payload,
            ctx_before: self.ctx,
            prev_qp_before: *prev_qp,
            palette_empty: cs.prev_plt.is_empty(),
            lut_len: cs.motion_lut.lut.len(),
            reset_ibc_buffer: cs.reset_ibc_buffer,
            bcw_num_codable: cs.bcw_order.num_codable(),
        });
        self.ctx = mix_context(self.ctx, payload);

        // 模拟 CTU 内部对延续状态的修改
        prev_qp[0] += 1;
        prev_qp[1] += 1;
        cs.prev_plt.update(0, &[&[u16::from(payload)][..]]);
        cs.motion_lut.add_hmvp_cand(
            MotionInfo {
                inter_dir: 1,
                mv: [
                    Mv {
                        x: i32::from(payload),
                        y: ctu_rs_addr as i32,
                    },
                    Mv::default(),
                ],
                ref_idx: [0, -1],
                bcw_idx: 2,
            },
            false,
        );
        cs.reset_ibc_buffer = false;
        Ok(())
    }

    fn read_terminating_bit(&mut self, bits: &mut InputBitstream) -> VsliceResult<bool> {
        self.terminating_bits += 1;
        Ok(bits.read_bit()? == 1)
    }

    fn check_remaining_bytes(
        &mut self,
        bits: &mut InputBitstream,
        no_trailing_bytes_expected: bool,
    ) -> VsliceResult<()> {
        self.trailing_checks.push(no_trailing_bytes_expected);
        bits.align_to_byte();
        if no_trailing_bytes_expected && !bits.is_eof() {
            return Err(VsliceError::InvalidData(format!(
                "子流末尾多出 {} 位",
                bits.bits_left()
            )));
        }
        Ok(())
    }
}

/// 记录重建顺序, 并把 CTU 地址写入左上角亮度样本
#[derive(Debug, Default)]
pub struct RecordingReconstructor {
    pub reconstructed: Vec<u32>,
}

impl CtuReconstructor for RecordingReconstructor {
    fn reconstruct_ctu(&mut self, cs: &mut CodingStructure, area: &CtuArea) -> VsliceResult<()> {
        let (x, y) = area.luma_pos();
        let addr = cs.pcv.ctu_addr_from_luma(x, y);
        self.reconstructed.push(addr);
        let luma = &mut cs.planes[0];
        let idx = y as usize * luma.stride + x as usize;
        luma.data[idx] = addr as u16 + 1;
        Ok(())
    }
}

pub type TestDecoder = SliceDecoder<ScriptedEngine, RecordingReconstructor>;

pub fn build_test_decoder() -> TestDecoder {
    SliceDecoder::new(ScriptedEngine::default(), RecordingReconstructor::default())
}

pub fn build_test_decoder_with_options(options: SliceDecoderOptions) -> TestDecoder {
    SliceDecoder::with_options(
        ScriptedEngine::default(),
        RecordingReconstructor::default(),
        options,
    )
}

pub fn build_test_sps(width_in_ctus: u32, height_in_ctus: u32) -> Arc<Sps> {
    Arc::new(Sps {
        sps_id: 0,
        pic_width: width_in_ctus << TEST_LOG2_CTU_SIZE,
        pic_height: height_in_ctus << TEST_LOG2_CTU_SIZE,
        log2_ctu_size: TEST_LOG2_CTU_SIZE,
        chroma_format: ChromaFormat::Yuv420,
        bit_depth: 8,
        ibc_enabled: false,
        palette_enabled: true,
    })
}

/// 启用 IBC 的 SPS
pub fn build_test_sps_with_ibc(width_in_ctus: u32, height_in_ctus: u32) -> Arc<Sps> {
    let mut sps = (*build_test_sps(width_in_ctus, height_in_ctus)).clone();
    sps.ibc_enabled = true;
    Arc::new(sps)
}

pub fn build_test_pps(
    sps: &Sps,
    tile_column_widths: &[u32],
    tile_row_heights: &[u32],
    wavefronts: bool,
) -> Arc<Pps> {
    Arc::new(
        Pps::new(0, sps, tile_column_widths, tile_row_heights, wavefronts)
            .expect("测试 tile 划分应合法"),
    )
}

pub fn build_test_picture(sps: &Arc<Sps>, pps: &Arc<Pps>) -> Picture {
    Picture::new(0, Arc::clone(sps), Arc::clone(pps))
}

pub fn build_test_slice(
    slice_type: SliceType,
    slice_qp: i32,
    sps: &Arc<Sps>,
    pps: &Arc<Pps>,
    ctu_addrs: Vec<u32>,
) -> Slice {
    Slice::new(slice_type, slice_qp, Arc::clone(sps), Arc::clone(pps), ctu_addrs)
}

/// 一个子流: 每个 CTU 一个负载字节, 末尾为终止位
pub fn build_substream(payloads: &[u8]) -> Vec<u8> {
    let mut data = payloads.to_vec();
    data.push(TERMINATOR);
    data
}

/// 拼接子流, 返回 slice 数据与 entry point 长度表
pub fn build_slice_data(substreams: &[Vec<u8>]) -> (InputBitstream, Vec<u32>) {
    let sizes = substreams
        .iter()
        .take(substreams.len().saturating_sub(1))
        .map(|s| s.len() as u32)
        .collect();
    let data: Vec<u8> = substreams.concat();
    (InputBitstream::new(data), sizes)
}

/// 每个 CTU 使用不同负载, 便于区分
pub fn payload_for(ctu_rs_addr: u32) -> u8 {
    0x10 + ctu_rs_addr as u8
}
