//! 3D 打印填充模式与几何真值函数.
//!
//! 如果已知模体的填充模式, 就已知该模体内扩散几何的若干闭式量:
//! 纤维方向, 纤维交叉角, 以及 (弯曲纤维的) 局部弧半径.
//! 本模块以不可变值对象描述填充模式, 并提供按度量名派发的逐点纯函数.
//!
//! 所有几何函数以模体空间坐标 (原点位于模体质心) 为输入.
//! 模式不支持某个度量时对应查询返回 `None`; "缺失" 与 "常数 0"
//! 严格区分, 后者仅在文档明确规定处出现 (如单纤维群模式的交叉角).

use ordered_float::NotNan;

use crate::Idx2dF;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 填充模式可提供的几何度量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Metric {
    /// 纤维方向角 (度), 折叠在 ±90° 范围内.
    Direction,

    /// 两个纤维群之间的交叉角 (度), 折叠在 \[0°, 90°\] 范围内.
    CrossingAngle,

    /// 局部弧半径. 对交替模式, 0 代表该点无纤维曲率.
    ArcRadius,
}

impl Metric {
    /// 度量的规范名称.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Metric::Direction => "direction",
            Metric::CrossingAngle => "crossing_angle",
            Metric::ArcRadius => "arc_radius",
        }
    }

    /// 按规范名称解析度量. 未知名称返回 `None`.
    pub fn from_name(name: &str) -> Option<Metric> {
        match name {
            "direction" => Some(Metric::Direction),
            "crossing_angle" => Some(Metric::CrossingAngle),
            "arc_radius" => Some(Metric::ArcRadius),
            _ => None,
        }
    }
}

/// 模体的打印填充模式.
///
/// 模式一经构建即不可变, 其全部几何函数都是输入点的纯函数:
/// 相同输入必然产生相同输出.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Pattern {
    /// 空模式. 用于只含水/背景的切片, 不提供任何几何度量.
    Empty,

    /// 平行线填充. 纤维方向与交叉角皆为常数, 不存在任何方向弥散.
    ParallelLine {
        /// 打印切片软件中指定的线方向 (度).
        print_angle: f64,
    },

    /// 同心弧填充, 模拟脑内弯曲纤维.
    ConcentricArc {
        /// 弧的公共圆心在模体空间中的坐标.
        origin: Idx2dF,
    },

    /// 层间交替填充, 由两个子模式逐层交替构成.
    Alternating(Box<Pattern>, Box<Pattern>),
}

impl Pattern {
    /// 构建平行线填充模式.
    #[inline]
    pub const fn parallel_line(print_angle: f64) -> Pattern {
        Pattern::ParallelLine { print_angle }
    }

    /// 构建同心弧填充模式. `origin` 为弧心的模体空间坐标.
    #[inline]
    pub const fn concentric_arc(origin: Idx2dF) -> Pattern {
        Pattern::ConcentricArc { origin }
    }

    /// 构建层间交替填充模式.
    #[inline]
    pub fn alternating(pattern_0: Pattern, pattern_1: Pattern) -> Pattern {
        Pattern::Alternating(Box::new(pattern_0), Box::new(pattern_1))
    }

    /// 该模式是否支持度量 `metric`?
    pub fn supports(&self, metric: Metric) -> bool {
        match (self, metric) {
            (Pattern::Empty, _) => false,
            (Pattern::ParallelLine { .. }, Metric::Direction | Metric::CrossingAngle) => true,
            (Pattern::ParallelLine { .. }, Metric::ArcRadius) => false,
            (Pattern::ConcentricArc { .. }, _) => true,
            (Pattern::Alternating(..), Metric::Direction) => false,
            (Pattern::Alternating(..), Metric::CrossingAngle | Metric::ArcRadius) => true,
        }
    }

    /// 统一的度量查询入口. 模式不支持 `metric` 时返回 `None`.
    pub fn metric(&self, metric: Metric, point: Idx2dF) -> Option<f64> {
        match metric {
            Metric::Direction => self.direction(point),
            Metric::CrossingAngle => self.crossing_angle(point),
            Metric::ArcRadius => self.arc_radius(point),
        }
    }

    /// `point` 处的纤维方向角 (度).
    ///
    /// 平行线填充的方向为常数 `90 - print_angle`; 同心弧填充的方向为过
    /// `point` 的弧的切线方向, 折叠在 ±90° 范围内. 空模式与交替模式
    /// (两个方向同时存在, 含义不唯一) 返回 `None`.
    pub fn direction(&self, point: Idx2dF) -> Option<f64> {
        match self {
            Pattern::ParallelLine { print_angle } => Some(90.0 - print_angle),
            Pattern::ConcentricArc { origin } => Some(arc_tangent_direction(*origin, point)),
            Pattern::Empty | Pattern::Alternating(..) => None,
        }
    }

    /// `point` 处两个纤维群的交叉角 (度), 折叠在 \[0°, 90°\] 范围内.
    ///
    /// 单纤维群模式 (平行线, 同心弧) 的交叉角恒为 0. 交替模式的交叉角
    /// 由两个子模式的方向差给出. 空模式返回 `None`.
    ///
    /// # 注意
    ///
    /// 交替模式的两个子模式必须都支持 `direction` 度量,
    /// 否则属于调用方的编程错误, 程序 panic.
    pub fn crossing_angle(&self, point: Idx2dF) -> Option<f64> {
        match self {
            Pattern::Empty => None,
            Pattern::ParallelLine { .. } | Pattern::ConcentricArc { .. } => Some(0.0),
            Pattern::Alternating(p0, p1) => {
                let directions = [p0, p1].map(|p| {
                    p.direction(point)
                        .expect("交替模式的子模式必须支持 direction 度量")
                });
                let raw = directions[0].max(directions[1]) - directions[0].min(directions[1]);
                Some(if raw > 90.0 { 180.0 - raw } else { raw })
            }
        }
    }

    /// `point` 处的局部弧半径.
    ///
    /// 同心弧填充的弧半径为 `point` 到弧心的欧几里得距离.
    /// 交替模式取支持该度量的子模式中的最小值; 若两个子模式都不支持,
    /// 返回 `Some(0.0)`, 0 代表该体素内无纤维曲率.
    /// 空模式与平行线填充返回 `None`.
    pub fn arc_radius(&self, point: Idx2dF) -> Option<f64> {
        match self {
            Pattern::Empty | Pattern::ParallelLine { .. } => None,
            Pattern::ConcentricArc { origin } => {
                let (dx, dy) = (origin.0 - point.0, origin.1 - point.1);
                Some(dx.hypot(dy))
            }
            Pattern::Alternating(p0, p1) => {
                let min = [p0, p1]
                    .into_iter()
                    .filter_map(|p| p.arc_radius(point))
                    .map(|r| NotNan::new(r).unwrap())
                    .min();
                // 两个子模式都无曲率时, 0 代表该体素内无纤维曲率.
                Some(min.map_or(0.0, NotNan::into_inner))
            }
        }
    }
}

/// 过 `point` 的同心弧 (弧心为 `origin`) 的切线方向 (度).
///
/// 切线方向垂直于半径向量, 折叠在 ±90° 范围内.
fn arc_tangent_direction(origin: Idx2dF, point: Idx2dF) -> f64 {
    let (dx, dy) = (origin.0 - point.0, origin.1 - point.1);
    if dx == 0.0 {
        return 0.0;
    }

    let disp_angle = (dy / dx).atan().to_degrees();
    if disp_angle > 0.0 {
        disp_angle - 90.0
    } else {
        disp_angle + 90.0
    }
}
