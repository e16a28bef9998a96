//! # vslice-codec
//!
//! VVC slice 解码调度库.
//!
//! 负责一个 slice 内 CTU 循环的全部边界逻辑: 子流拆分与切换、熵解码上下文的
//! 重置与波前同步、前序 QP 与各类预测器的重置、终止位检查. CTU 语法解析与
//! 样本重建由调用方通过 [`EntropyDecoder`] 与 [`CtuReconstructor`] 提供.
//!
//! ## 使用示例
//!
//! ```rust
//! use vslice_codec::{InputBitstream, TileLayout, extract_substreams};
//!
//! // 2x2 个 CTU 划分为左右两个 tile
//! let tiles = TileLayout::new(2, 2, &[1], &[2]).unwrap();
//! assert_eq!(tiles.tile_scan_addrs(), vec![0, 2, 1, 3]);
//!
//! // 一个 entry point 产生两个子流
//! let mut bs = InputBitstream::new(vec![0xAA, 0xBB, 0xCC]);
//! let substreams = extract_substreams(&mut bs, &[1]).unwrap();
//! assert_eq!(substreams.len(), 2);
//! ```

pub mod engine;
pub mod params;
pub mod picture;
pub mod slice_decoder;

// 重导出常用类型
pub use engine::{CtuReconstructor, EntropyDecoder};
pub use params::{ALF_CTB_MAX_NUM_APS, Aps, ApsType, ChromaFormat, Pps, Slice, SliceType, Sps};
pub use picture::{Area, CodingStructure, CtuArea, MctsInfo, Picture, PictureGeometry};
pub use slice_decoder::address::{CtuPosition, TileLayout};
pub use slice_decoder::carry_over::QP_UNDEFINED;
pub use slice_decoder::context_cache::ContextCache;
pub use slice_decoder::substream::{SubstreamSet, extract_substreams};
pub use slice_decoder::{CtuBoundary, SliceDecodeSummary, SliceDecoder, SliceDecoderOptions};
pub use vslice_core::bitstream::InputBitstream;
pub use vslice_core::{VsliceError, VsliceResult};
