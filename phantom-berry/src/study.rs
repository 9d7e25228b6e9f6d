//! 模体数据集的结构化描述.
//!
//! 大体上, 这里的层级结构如下:
//!
//! - 一个 [`Study`] 由一组 [`ScanSession`] 构成, 每次 session
//!   检查同一个样品试管.
//! - 一个 [`ScanSession`] 由一组 [`SingleScan`] 构成,
//!   每个 scan 覆盖样品的 (不同区域的) 一个子集.
//! - 样品试管装有一叠 [`TubeEntry`] (模体或纯水占位层).
//! - 每个模体有一个打印填充模式 ([`Pattern`]).
//!
//! 该模块只包含纯数据记录, 不含任何算法.

use std::ops::Range;

use crate::infill::Pattern;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 模体的设计与打印参数的完整描述.
///
/// 该结构没有内在功能, 仅记录一个模体的打印过程.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phantom {
    /// 3D 打印时热端的温度 (摄氏度).
    pub hotend_temp: f64,

    /// 3D 打印速度 (毫米/秒).
    pub print_speed: f64,

    /// 每个打印层的厚度 (毫米).
    pub layer_thickness: f64,

    /// 打印填充密度 (百分比).
    pub infill_density: f64,

    /// 打印填充模式.
    pub infill_pattern: Pattern,
}

/// 试管中的一层: 模体, 或只含水的占位层.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TubeEntry {
    /// 一个 3D 打印模体.
    Phantom(Phantom),

    /// 只含水的占位层, 不含任何打印材料.
    Water,
}

impl TubeEntry {
    /// 该层对应的填充模式. 纯水层返回空模式.
    pub fn infill_pattern(&self) -> &Pattern {
        match self {
            TubeEntry::Phantom(p) => &p.infill_pattern,
            TubeEntry::Water => &Pattern::Empty,
        }
    }
}

/// 完整记录一组模体研究的数据类.
///
/// 这里的 "study" 指针对同一组模体的一系列扫描.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Study {
    /// 研究名称.
    pub name: String,

    /// 被扫描的试管, 从下到上的每一层.
    pub tube: Vec<TubeEntry>,

    /// 全部扫描 session.
    pub sessions: Vec<ScanSession>,
}

/// 单日内覆盖一组模体的扫描 session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanSession {
    /// 扫描日期, ISO-8601 格式 (如 `2019-07-22`).
    pub date: String,

    /// 当日进行的全部扫描.
    pub scans: Vec<SingleScan>,
}

/// 覆盖试管某个子区间的单次扫描.
///
/// 每个 scan 应当恰好对应一个 DWI.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SingleScan {
    /// 该次扫描覆盖的试管层区间.
    pub tube_slice: Range<usize>,
}
