use vslice_core::VsliceError;

use crate::params::SliceType;
use crate::picture::{Area, Picture};

use super::helpers::*;

const QP: i32 = 30;

fn row_substreams(rows: &[&[u32]]) -> Vec<Vec<u8>> {
    rows.iter()
        .map(|row| build_substream(&row.iter().map(|&a| payload_for(a)).collect::<Vec<_>>()))
        .collect()
}

#[test]
fn test_wpp_b_slice_3x2_syncs_second_row_from_first_ctu_snapshot() {
    let sps = build_test_sps(3, 2);
    let pps = build_test_pps(&sps, &[], &[], true);
    let mut picture = build_test_picture(&sps, &pps);
    let mut slice = build_test_slice(SliceType::B, QP, &sps, &pps, (0..6).collect());
    slice.low_delay = false;
    let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[0, 1, 2], &[3, 4, 5]]));
    slice.substream_sizes = sizes;
    picture.prev_qp = [3, 4];

    let mut dec = build_test_decoder();
    let summary = dec
        .decode_slice(&mut slice, &mut picture, &mut bs, None)
        .expect("3x2 波前 slice 应解码成功");

    assert_eq!(summary.ctus_decoded, 6);
    assert_eq!(summary.substreams, 2, "每个 CTU 行一个子流");
    assert_eq!(summary.substreams_terminated, 1, "只有第一行在子流末尾结束");
    assert_eq!(summary.wpp_syncs, 1);
    assert_eq!(summary.stopped_at_debug_ctu, None);

    let engine = dec.entropy();
    let fresh = initial_context(SliceType::B, QP);
    let snapshot = mix_context(fresh, payload_for(0));
    assert_eq!(engine.inits, 2, "slice 入口与第二行起点各初始化一次");
    assert_eq!(engine.restores, vec![snapshot], "第二行应恢复 CTU 0 解析后的上下文");
    assert_eq!(engine.parse_of(0).ctx_before, fresh);
    assert_eq!(engine.parse_of(3).ctx_before, snapshot);
    assert_eq!(
        engine.parse_of(4).ctx_before,
        mix_context(snapshot, payload_for(3))
    );

    // 行起点重置前序 QP 与调色板, 行内延续
    assert_eq!(engine.parse_of(0).prev_qp_before, [QP, QP]);
    assert_eq!(engine.parse_of(1).prev_qp_before, [QP + 1, QP + 1]);
    assert_eq!(engine.parse_of(3).prev_qp_before, [QP, QP]);
    assert!(engine.parse_of(0).palette_empty);
    assert!(!engine.parse_of(1).palette_empty);
    assert!(engine.parse_of(3).palette_empty, "波前行起点应重置调色板");

    // BCW 顺序表在 slice 第一个 CTU 处按非低延迟重置 (默认为低延迟的 5 个)
    for addr in 0..6 {
        assert_eq!(
            engine.parse_of(addr).bcw_num_codable,
            3,
            "CTU {} 应使用非低延迟的 BCW 顺序表",
            addr
        );
    }

    // 运动向量历史表在 tile 左边界清空
    assert_eq!(engine.parse_of(0).lut_len, 0);
    assert_eq!(engine.parse_of(2).lut_len, 2);
    assert_eq!(engine.parse_of(3).lut_len, 0);
    assert!(engine.parse_of(3).reset_ibc_buffer);
    assert!(!engine.parse_of(4).reset_ibc_buffer);

    assert_eq!(engine.terminating_bits, 2);
    assert_eq!(engine.trailing_checks, vec![true, false]);
    assert_eq!(dec.reconstructor().reconstructed, (0..6).collect::<Vec<_>>());

    assert_eq!(picture.mcts_info.ctu_addr(), Some(5));
    assert_eq!(picture.mcts_info.tile_area(), Area::new(0, 0, 48, 32));
    assert!(bs.is_eof(), "slice 数据应全部分配给子流");
}

#[test]
fn test_wpp_row_start_without_available_top_keeps_fresh_context() {
    let sps = build_test_sps(3, 2);
    let pps = build_test_pps(&sps, &[], &[], true);
    let mut picture = build_test_picture(&sps, &pps);

    // 第一个 slice 只包含 CTU 0
    let mut first = build_test_slice(SliceType::P, QP, &sps, &pps, vec![0]);
    let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[0]]));
    first.substream_sizes = sizes;
    let mut dec = build_test_decoder();
    dec.decode_slice(&mut first, &mut picture, &mut bs, None)
        .expect("第一个 slice 应解码成功");

    // 第二个独立 slice 从 CTU 1 开始, CTU 3 的上方属于另一个 slice
    let mut second = build_test_slice(SliceType::P, QP, &sps, &pps, (1..6).collect());
    second.independent_slice_idx = 1;
    let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[1, 2], &[3, 4, 5]]));
    second.substream_sizes = sizes;
    let mut dec = build_test_decoder();
    let summary = dec
        .decode_slice(&mut second, &mut picture, &mut bs, None)
        .expect("第二个 slice 应解码成功");

    let engine = dec.entropy();
    assert_eq!(summary.wpp_syncs, 0);
    assert!(engine.restores.is_empty(), "上方不可用时不应恢复快照");
    assert_eq!(engine.inits, 2);
    assert_eq!(
        engine.parse_of(3).ctx_before,
        initial_context(SliceType::P, QP),
        "上方不可用时应使用新初始化的上下文"
    );
    assert_eq!(engine.parse_of(3).prev_qp_before, [QP, QP]);
}

#[test]
fn test_wpp_slice_starting_at_second_row_syncs_only_rows_with_decoded_top() {
    let sps = build_test_sps(2, 3);
    let pps = build_test_pps(&sps, &[], &[], true);
    let mut picture = build_test_picture(&sps, &pps);

    // slice 从第二行开始, 第一行未解码: 第二行不同步, 第三行同步
    let mut slice = build_test_slice(SliceType::I, QP, &sps, &pps, (2..6).collect());
    let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[2, 3], &[4, 5]]));
    slice.substream_sizes = sizes;
    let mut dec = build_test_decoder();
    let summary = dec
        .decode_slice(&mut slice, &mut picture, &mut bs, None)
        .expect("slice 应解码成功");

    let engine = dec.entropy();
    let fresh = initial_context(SliceType::I, QP);
    assert_eq!(summary.wpp_syncs, 1);
    assert_eq!(engine.parse_of(2).ctx_before, fresh, "上方未解码时不同步");
    assert_eq!(
        engine.parse_of(4).ctx_before,
        mix_context(fresh, payload_for(2))
    );
    // I slice 且未启用 IBC: 不清空历史表
    assert_eq!(engine.parse_of(4).lut_len, 2);
    assert_eq!(picture.mcts_info.ctu_addr(), None, "帧内 slice 不初始化运动约束信息");
}

#[test]
fn test_reused_picture_needs_reset_before_redecoding() {
    let sps = build_test_sps(2, 2);
    let pps = build_test_pps(&sps, &[], &[], true);
    let mut picture = build_test_picture(&sps, &pps);

    let mut full = build_test_slice(SliceType::I, QP, &sps, &pps, (0..4).collect());
    let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[0, 1], &[2, 3]]));
    full.substream_sizes = sizes;
    build_test_decoder()
        .decode_slice(&mut full, &mut picture, &mut bs, None)
        .expect("整幅图像应解码成功");

    // 只重解第二行: 残留的 CTU 0 归属让上方看似可用, 但本次调用没有快照
    let decode_second_row = |picture: &mut Picture| {
        let mut slice = build_test_slice(SliceType::I, QP, &sps, &pps, vec![2, 3]);
        let (mut bs, sizes) = build_slice_data(&row_substreams(&[&[2, 3]]));
        slice.substream_sizes = sizes;
        let mut dec = build_test_decoder();
        dec.decode_slice(&mut slice, picture, &mut bs, None)
            .map(|summary| (summary, dec.entropy().restores.len()))
    };
    let err = decode_second_row(&mut picture).unwrap_err();
    assert!(matches!(err, VsliceError::Internal(_)));

    picture.reset(1);
    assert_eq!(picture.poc, 1);
    assert!(picture.cs.ctu_owner(0).is_none());
    let (summary, restores) = decode_second_row(&mut picture).expect("重置后应解码成功");
    assert_eq!(summary.ctus_decoded, 2);
    assert_eq!(summary.wpp_syncs, 0);
    assert_eq!(restores, 0);
}
