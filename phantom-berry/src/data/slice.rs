//! 掩膜的二维水平切片视图.

use std::collections::{HashSet, VecDeque};
use std::ops::Index;

use ndarray::ArrayView2;

use crate::consts::gray::*;
use crate::{Area2d, Areas2d, Idx2d, Predicate};

/// 不可变的二维水平模体掩膜切片.
///
/// 该结构是 [`ArrayView2<u8>`] 的轻量封装, 非零值代表模体材料.
#[derive(Debug, Clone)]
pub struct MaskSlice<'a> {
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for MaskSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> MaskSlice<'a> {
    /// 由二维视图直接构建切片.
    #[inline]
    pub fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获取底层二维视图.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// 获取切片形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let s = self.data.shape();
        (s[0], s[1])
    }

    /// 获取切片高度.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获取切片宽度.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 获取切片像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        h < self.height() && w < self.width()
    }

    /// 安全地获取 `pos` 对应的像素值.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 切片是否全为背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().all(|p| is_background(*p))
    }

    /// 获取切片中模体像素的个数.
    #[inline]
    pub fn phantom_count(&self) -> usize {
        self.data.iter().filter(|p| is_phantom(**p)).count()
    }

    /// 获取按行优先序迭代切片全部索引的迭代器.
    #[inline]
    pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
        let (h, w) = self.shape();
        (0..h).flat_map(move |first| (0..w).map(move |second| (first, second)))
    }

    /// 获取按行优先序迭代 (索引, 像素值) 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }

    /// 收集所有模体像素对应的下标. 结果按行优先存储.
    pub fn phantom_pos<B: FromIterator<Idx2d>>(&self) -> B {
        self.indexed_iter()
            .filter_map(|(pos, pixel)| is_phantom(*pixel).then_some(pos))
            .collect()
    }

    /// 返回满足谓词 `pred` 的全部 4-连通域, 每个连通域是一个索引集合.
    ///
    /// 连通域按照其 BFS 种子点的行优先序排列, 对相同输入结果稳定.
    pub fn areas(&self, pred: Predicate) -> Areas2d {
        let mut ans = Areas2d::with_capacity(1);
        let mut bfs_q = VecDeque::with_capacity(4);
        let mut set = HashSet::with_capacity(16);

        for pos in self.pos_iter() {
            if set.contains(&pos) || !pred(self[pos]) {
                continue;
            }
            bfs_q.push_back(pos);
            let mut this_area = Area2d::with_capacity(1);
            while let Some(cur_pos) = bfs_q.pop_front() {
                if set.contains(&cur_pos) {
                    continue;
                }
                set.insert(cur_pos);
                this_area.push(cur_pos);

                // bfs
                let (cur_h, cur_w) = cur_pos;
                if cur_h > 0 && pred(self[(cur_h - 1, cur_w)]) && !set.contains(&(cur_h - 1, cur_w))
                {
                    bfs_q.push_back((cur_h - 1, cur_w));
                }
                if cur_h + 1 < self.height()
                    && pred(self[(cur_h + 1, cur_w)])
                    && !set.contains(&(cur_h + 1, cur_w))
                {
                    bfs_q.push_back((cur_h + 1, cur_w));
                }
                if cur_w > 0 && pred(self[(cur_h, cur_w - 1)]) && !set.contains(&(cur_h, cur_w - 1))
                {
                    bfs_q.push_back((cur_h, cur_w - 1));
                }
                if cur_w + 1 < self.width()
                    && pred(self[(cur_h, cur_w + 1)])
                    && !set.contains(&(cur_h, cur_w + 1))
                {
                    bfs_q.push_back((cur_h, cur_w + 1));
                }
            }
            ans.push(this_area);
        }
        ans
    }

    /// 返回全部模体 4-连通域.
    #[inline]
    pub fn phantom_areas(&self) -> Areas2d {
        self.areas(is_phantom)
    }
}

#[cfg(test)]
mod tests {
    use super::MaskSlice;
    use ndarray::Array2;

    /// 两个互不相邻的模体区域应产生两个连通域.
    #[test]
    fn test_areas_two_components() {
        let mut raw = Array2::<u8>::zeros((5, 5));
        raw[(0, 0)] = 1;
        raw[(0, 1)] = 1;
        raw[(4, 4)] = 1;

        let sli = MaskSlice::new(raw.view());
        let areas = sli.phantom_areas();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0], vec![(0, 0), (0, 1)]);
        assert_eq!(areas[1], vec![(4, 4)]);
        assert_eq!(sli.phantom_count(), 3);
    }

    /// 对角相邻不算 4-连通.
    #[test]
    fn test_areas_diagonal_not_connected() {
        let mut raw = Array2::<u8>::zeros((3, 3));
        raw[(0, 0)] = 1;
        raw[(1, 1)] = 1;

        let sli = MaskSlice::new(raw.view());
        assert_eq!(sli.phantom_areas().len(), 2);
    }

    /// 空切片没有连通域.
    #[test]
    fn test_areas_empty() {
        let raw = Array2::<u8>::zeros((4, 4));
        let sli = MaskSlice::new(raw.view());
        assert!(sli.is_background());
        assert!(sli.phantom_areas().is_empty());
    }
}
