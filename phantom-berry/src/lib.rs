#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 3D 打印扩散 MRI 模体 (phantom) 扫描数据的结构化信息,
//! 以及把体素级测量值与已知打印几何真值进行对比的基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 假设输入的 nifti 掩膜/派生图均以体素网格按行优先组织,
//!   内部统一转换为 `(z, h, w)` 模式访问.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 功能一览
//!
//! ### infill pattern 几何真值 ✅
//!
//! 平行线 / 同心弧 / 层间交替三种打印填充模式, 以及对应的纤维方向,
//! 交叉角与局部弧半径的逐点闭式计算.
//!
//! 实现位于 `phantom-berry/src/infill.rs`.
//!
//! ### 图像空间到模体空间的刚性变换 ✅
//!
//! 质心平移 + 基准点 (fiducial) 定向旋转. 方向参数以 tagged enum 表示,
//! "既给角度又给基准点" 与 "两者都不给" 两种错误在类型层面即不可表达.
//!
//! 实现位于 `phantom-berry/src/truth`.
//!
//! ### 掩膜质心估计 ✅
//!
//! 圆盘结构元的形态学闭运算 + 4-连通域标记, 取首个连通域的质心.
//!
//! 实现位于 `phantom-berry/src/truth/morph.rs`.
//!
//! ### 几何真值场生成与扫描对比 ✅
//!
//! 沿 z 方向逐切片遍历掩膜, 生成与掩膜同形状的真值场;
//! 或对派生图逐体素生成 (真值, 测量值) 配对序列用于统计分析.
//!
//! ### nifti 体数据封装 ✅
//!
//! 二值模体掩膜与 DWI 派生图 (FA, MD, MK 等) 的加载, 切片视图与持久化.
//!
//! 实现位于 `phantom-berry/src/data`.
//!
//! ### 度量可视化窗口 ✅
//!
//! 将几何度量值映射为 8-bit 灰度以保存切片预览图.
//!
//! 实现位于 `phantom-berry/src/data/window.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 高精度二维坐标. 在模体空间中, 原点位于模体质心,
/// 负 y 轴指向基准点 (fiducial).
pub type Idx2dF = (f64, f64);

type Predicate = fn(u8) -> bool;

type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

/// 3D 模体掩膜与派生图的基础数据结构.
mod data;

pub use data::{
    DerivedMap, FieldSliceVis, ImgWriteRaw, ImgWriteVis, MaskSlice, MetricWindow, NiftiVolumeAttr,
    PhantomMask,
};

pub mod consts;

pub mod infill;

pub mod study;

pub mod truth;

pub mod prelude;
