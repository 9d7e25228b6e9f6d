//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 模体掩膜中, 背景 (水或空气) 的体素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 模体掩膜中, 模体材料的体素值.
    pub const MASK_PHANTOM: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 体素是否是模体材料?
    #[inline]
    pub const fn is_phantom(p: u8) -> bool {
        !is_background(p)
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 估计掩膜质心前, 形态学闭运算所用圆盘结构元的默认半径 (单位: 体素).
///
/// 半径取 6 足以桥合掩膜中被剔除的小气泡留下的空洞.
pub const DEFAULT_CLOSING_RADIUS: usize = 6;
