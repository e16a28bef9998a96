//! CTU 地址映射.
//!
//! 在 CTU 光栅地址、tile 内相对位置与 tile 扫描顺序之间换算.
//! tile 几何在构建时一次性预计算, 之后所有查询均为 O(1) 且无可变状态.

use vslice_core::{VsliceError, VsliceResult};

/// 一个 CTU 的完整位置信息 (单位均为 CTU)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtuPosition {
    /// 光栅扫描地址
    pub rs_addr: u32,
    /// 水平位置
    pub x: u32,
    /// 垂直位置
    pub y: u32,
    /// 所在 tile 列
    pub tile_col: u32,
    /// 所在 tile 行
    pub tile_row: u32,
    /// tile 左上角水平位置
    pub tile_x: u32,
    /// tile 左上角垂直位置
    pub tile_y: u32,
    /// tile 宽度
    pub tile_width: u32,
    /// tile 高度
    pub tile_height: u32,
    /// tile 光栅索引
    pub tile_idx: u32,
}

impl CtuPosition {
    /// 是否为 tile 左上角 CTU
    pub fn is_tile_origin(&self) -> bool {
        self.x == self.tile_x && self.y == self.tile_y
    }

    /// 是否位于 tile 左边界
    pub fn is_tile_left_edge(&self) -> bool {
        self.x == self.tile_x
    }

    /// 是否位于 tile 最后一列
    pub fn is_tile_last_column(&self) -> bool {
        self.x + 1 == self.tile_x + self.tile_width
    }

    /// 是否位于 tile 最后一行
    pub fn is_tile_bottom_row(&self) -> bool {
        self.y + 1 == self.tile_y + self.tile_height
    }
}

/// 图像的 tile 划分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    width_in_ctus: u32,
    height_in_ctus: u32,
    column_widths: Vec<u32>,
    row_heights: Vec<u32>,
    /// 各 tile 列的起始 CTU 列, 末尾附加图像宽度
    column_bd: Vec<u32>,
    /// 各 tile 行的起始 CTU 行, 末尾附加图像高度
    row_bd: Vec<u32>,
    ctu_to_tile_col: Vec<u32>,
    ctu_to_tile_row: Vec<u32>,
}

impl TileLayout {
    /// 按显式列宽/行高构建 tile 划分.
    ///
    /// 显式尺寸不足以覆盖图像时, 按最后一个显式尺寸继续划分,
    /// 最后一个 tile 取剩余部分. 空列表表示整幅图像只有一列 (行).
    pub fn new(
        width_in_ctus: u32,
        height_in_ctus: u32,
        column_widths: &[u32],
        row_heights: &[u32],
    ) -> VsliceResult<Self> {
        let column_widths = derive_tile_sizes("列", width_in_ctus, column_widths)?;
        let row_heights = derive_tile_sizes("行", height_in_ctus, row_heights)?;
        Ok(Self::from_sizes(
            width_in_ctus,
            height_in_ctus,
            column_widths,
            row_heights,
        ))
    }

    /// 均匀划分 `num_cols x num_rows` 个 tile
    pub fn uniform(
        width_in_ctus: u32,
        height_in_ctus: u32,
        num_cols: u32,
        num_rows: u32,
    ) -> VsliceResult<Self> {
        let column_widths = uniform_tile_sizes("列", width_in_ctus, num_cols)?;
        let row_heights = uniform_tile_sizes("行", height_in_ctus, num_rows)?;
        Ok(Self::from_sizes(
            width_in_ctus,
            height_in_ctus,
            column_widths,
            row_heights,
        ))
    }

    /// 单 tile 覆盖整幅图像
    pub fn single(width_in_ctus: u32, height_in_ctus: u32) -> Self {
        Self::from_sizes(
            width_in_ctus,
            height_in_ctus,
            vec![width_in_ctus],
            vec![height_in_ctus],
        )
    }

    fn from_sizes(
        width_in_ctus: u32,
        height_in_ctus: u32,
        column_widths: Vec<u32>,
        row_heights: Vec<u32>,
    ) -> Self {
        let column_bd = boundaries(&column_widths);
        let row_bd = boundaries(&row_heights);
        let ctu_to_tile_col = owner_map(&column_widths);
        let ctu_to_tile_row = owner_map(&row_heights);
        Self {
            width_in_ctus,
            height_in_ctus,
            column_widths,
            row_heights,
            column_bd,
            row_bd,
            ctu_to_tile_col,
            ctu_to_tile_row,
        }
    }

    /// 图像宽度 (CTU 数)
    pub fn width_in_ctus(&self) -> u32 {
        self.width_in_ctus
    }

    /// 图像高度 (CTU 数)
    pub fn height_in_ctus(&self) -> u32 {
        self.height_in_ctus
    }

    /// 图像 CTU 总数
    pub fn size_in_ctus(&self) -> u32 {
        self.width_in_ctus * self.height_in_ctus
    }

    /// tile 列数
    pub fn num_tile_columns(&self) -> u32 {
        self.column_widths.len() as u32
    }

    /// tile 行数
    pub fn num_tile_rows(&self) -> u32 {
        self.row_heights.len() as u32
    }

    /// tile 总数
    pub fn num_tiles(&self) -> u32 {
        self.num_tile_columns() * self.num_tile_rows()
    }

    /// CTU 列所属的 tile 列
    pub fn ctu_to_tile_col(&self, ctu_x: u32) -> u32 {
        self.ctu_to_tile_col[ctu_x as usize]
    }

    /// CTU 行所属的 tile 行
    pub fn ctu_to_tile_row(&self, ctu_y: u32) -> u32 {
        self.ctu_to_tile_row[ctu_y as usize]
    }

    /// tile 列的起始 CTU 列
    pub fn column_bd(&self, tile_col: u32) -> u32 {
        self.column_bd[tile_col as usize]
    }

    /// tile 行的起始 CTU 行
    pub fn row_bd(&self, tile_row: u32) -> u32 {
        self.row_bd[tile_row as usize]
    }

    /// tile 列宽
    pub fn column_width(&self, tile_col: u32) -> u32 {
        self.column_widths[tile_col as usize]
    }

    /// tile 行高
    pub fn row_height(&self, tile_row: u32) -> u32 {
        self.row_heights[tile_row as usize]
    }

    /// CTU 所在 tile 的光栅索引
    pub fn tile_idx(&self, ctu_x: u32, ctu_y: u32) -> u32 {
        self.ctu_to_tile_row(ctu_y) * self.num_tile_columns() + self.ctu_to_tile_col(ctu_x)
    }

    /// 由光栅地址计算完整位置信息
    pub fn position(&self, rs_addr: u32) -> VsliceResult<CtuPosition> {
        if rs_addr >= self.size_in_ctus() {
            return Err(VsliceError::Internal(format!(
                "CTU 地址越界: rs_addr={}, size_in_ctus={}",
                rs_addr,
                self.size_in_ctus()
            )));
        }
        let x = rs_addr % self.width_in_ctus;
        let y = rs_addr / self.width_in_ctus;
        let tile_col = self.ctu_to_tile_col(x);
        let tile_row = self.ctu_to_tile_row(y);
        Ok(CtuPosition {
            rs_addr,
            x,
            y,
            tile_col,
            tile_row,
            tile_x: self.column_bd(tile_col),
            tile_y: self.row_bd(tile_row),
            tile_width: self.column_width(tile_col),
            tile_height: self.row_height(tile_row),
            tile_idx: tile_row * self.num_tile_columns() + tile_col,
        })
    }

    /// 单个 tile 内全部 CTU 的光栅地址 (tile 内光栅顺序)
    pub fn tile_ctu_addrs(&self, tile_idx: u32) -> VsliceResult<Vec<u32>> {
        if tile_idx >= self.num_tiles() {
            return Err(VsliceError::Internal(format!(
                "tile 索引越界: tile_idx={}, num_tiles={}",
                tile_idx,
                self.num_tiles()
            )));
        }
        let tile_col = tile_idx % self.num_tile_columns();
        let tile_row = tile_idx / self.num_tile_columns();
        let x0 = self.column_bd(tile_col);
        let y0 = self.row_bd(tile_row);
        let mut addrs =
            Vec::with_capacity((self.column_width(tile_col) * self.row_height(tile_row)) as usize);
        for y in y0..y0 + self.row_height(tile_row) {
            for x in x0..x0 + self.column_width(tile_col) {
                addrs.push(y * self.width_in_ctus + x);
            }
        }
        Ok(addrs)
    }

    /// 整幅图像按 tile 扫描顺序排列的 CTU 光栅地址
    pub fn tile_scan_addrs(&self) -> Vec<u32> {
        let mut addrs = Vec::with_capacity(self.size_in_ctus() as usize);
        for tile_idx in 0..self.num_tiles() {
            // tile_idx 在范围内, 不会失败
            if let Ok(tile) = self.tile_ctu_addrs(tile_idx) {
                addrs.extend(tile);
            }
        }
        addrs
    }
}

fn derive_tile_sizes(what: &str, total: u32, explicit: &[u32]) -> VsliceResult<Vec<u32>> {
    if total == 0 {
        return Err(VsliceError::InvalidArgument(format!(
            "图像 CTU {}数为 0",
            what
        )));
    }
    let Some(&last) = explicit.last() else {
        return Ok(vec![total]);
    };
    if explicit.contains(&0) {
        return Err(VsliceError::InvalidArgument(format!(
            "tile {}尺寸不能为 0",
            what
        )));
    }
    let explicit_sum: u32 = explicit.iter().sum();
    if explicit_sum > total {
        return Err(VsliceError::InvalidArgument(format!(
            "tile {}尺寸之和 {} 超过图像 {} 个 CTU",
            what, explicit_sum, total
        )));
    }

    let mut sizes = explicit.to_vec();
    let mut remaining = total - explicit_sum;
    while remaining >= last {
        sizes.push(last);
        remaining -= last;
    }
    if remaining > 0 {
        sizes.push(remaining);
    }
    Ok(sizes)
}

fn uniform_tile_sizes(what: &str, total: u32, count: u32) -> VsliceResult<Vec<u32>> {
    if count == 0 || count > total {
        return Err(VsliceError::InvalidArgument(format!(
            "均匀 tile {}数 {} 与图像 {} 个 CTU 不匹配",
            what, count, total
        )));
    }
    Ok((0..count)
        .map(|i| ((i + 1) * total) / count - (i * total) / count)
        .collect())
}

fn boundaries(sizes: &[u32]) -> Vec<u32> {
    let mut bd = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0;
    bd.push(acc);
    for size in sizes {
        acc += size;
        bd.push(acc);
    }
    bd
}

fn owner_map(sizes: &[u32]) -> Vec<u32> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(idx, &size)| std::iter::repeat_n(idx as u32, size as usize))
        .collect()
}
