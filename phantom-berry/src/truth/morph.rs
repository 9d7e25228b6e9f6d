//! 二值形态学操作 (质心估计的内部支撑).

use ndarray::{Array2, ArrayView2};

use crate::consts::gray::*;
use crate::Idx2d;

/// 半径为 `radius` 的圆盘结构元, 以相对中心的偏移量集合表示.
fn disk_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let rr = r * r;
    let mut ans = Vec::with_capacity((2 * radius + 1).pow(2));
    for dh in -r..=r {
        for dw in -r..=r {
            if dh * dh + dw * dw <= rr {
                ans.push((dh, dw));
            }
        }
    }
    ans
}

/// `pos + offset`, 越界时返回 `None`.
#[inline]
fn offset_pos((h, w): Idx2d, (dh, dw): (isize, isize), shape: Idx2d) -> Option<Idx2d> {
    let nh = h.checked_add_signed(dh)?;
    let nw = w.checked_add_signed(dw)?;
    (nh < shape.0 && nw < shape.1).then_some((nh, nw))
}

/// 圆盘膨胀. 图像边界外视为背景.
fn binary_dilate(view: ArrayView2<u8>, offsets: &[(isize, isize)]) -> Array2<u8> {
    let shape = (view.nrows(), view.ncols());
    let mut out = Array2::<u8>::zeros(shape);
    for ((h, w), &pix) in view.indexed_iter() {
        if is_background(pix) {
            continue;
        }
        for &off in offsets {
            if let Some(pos) = offset_pos((h, w), off, shape) {
                out[pos] = MASK_PHANTOM;
            }
        }
    }
    out
}

/// 圆盘腐蚀. 图像边界外视为前景, 以免闭运算侵蚀贴边的真实前景.
fn binary_erode(view: ArrayView2<u8>, offsets: &[(isize, isize)]) -> Array2<u8> {
    let shape = (view.nrows(), view.ncols());
    let mut out = Array2::<u8>::zeros(shape);
    for ((h, w), &pix) in view.indexed_iter() {
        if is_background(pix) {
            continue;
        }
        let keep = offsets.iter().all(|&off| match offset_pos((h, w), off, shape) {
            Some(pos) => is_phantom(view[pos]),
            None => true,
        });
        if keep {
            out[(h, w)] = MASK_PHANTOM;
        }
    }
    out
}

/// 圆盘闭运算 (先膨胀后腐蚀).
///
/// 闭运算用来桥合掩膜中被剔除的气泡留下的小空洞,
/// 使模体材料在质心估计前成为单个连通域.
pub(crate) fn binary_close(view: ArrayView2<u8>, radius: usize) -> Array2<u8> {
    let offsets = disk_offsets(radius);
    binary_erode(binary_dilate(view, &offsets).view(), &offsets)
}

#[cfg(test)]
mod tests {
    use super::binary_close;
    use ndarray::Array2;

    /// 闭运算应桥合半径内的空洞, 且不扩张外轮廓.
    #[test]
    fn test_close_bridges_gap() {
        // 两个相距 2 的竖条, 中间的缝隙应被闭合.
        let mut raw = Array2::<u8>::zeros((11, 11));
        for h in 2..9 {
            raw[(h, 3)] = 1;
            raw[(h, 6)] = 1;
        }

        let closed = binary_close(raw.view(), 2);
        assert_eq!(closed[(5, 4)], 1);
        assert_eq!(closed[(5, 5)], 1);

        // 远离结构的角落仍是背景.
        assert_eq!(closed[(0, 0)], 0);
        assert_eq!(closed[(10, 10)], 0);
    }

    /// 空掩膜的闭运算仍为空.
    #[test]
    fn test_close_empty() {
        let raw = Array2::<u8>::zeros((8, 8));
        let closed = binary_close(raw.view(), 3);
        assert!(closed.iter().all(|&p| p == 0));
    }
}
