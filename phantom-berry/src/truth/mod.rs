//! 扫描数据与几何真值的对比.
//!
//! 填充模式 (`infill`) 的几何定义假设原点位于模体横截面的质心,
//! 而扫描数据从不满足该假设. 因此在对比之前, 需要把图像空间的体素索引
//! 经过刚性变换 (质心平移 + 旋转) 映射到模体空间. 本模块提供:
//!
//! 1. 掩膜质心估计 ([`find_centroid`]);
//! 2. 单点刚性变换 ([`transform_image_point`]);
//! 3. 与掩膜同形状的几何真值场生成 ([`gen_geometry_data`]);
//! 4. 派生图与真值的逐体素配对 ([`compare_to_pattern`]).
//!
//! 所有操作都是确定性的纯计算: 体素之间相互独立,
//! 相同输入必然产生相同输出.

use itertools::izip;
use ndarray::{Array3, ArrayView3, Axis};
use ndarray_npy::{write_npy, WriteNpyError};
use std::path::Path;

use crate::consts::gray::is_phantom;
use crate::consts::DEFAULT_CLOSING_RADIUS;
use crate::data::{DerivedMap, MaskSlice};
use crate::{Idx2dF, NiftiVolumeAttr};

mod morph;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::ArrayView2;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 模体在图像平面内的定向参数.
///
/// 刚性变换需要一个旋转角. 该角度要么直接给出, 要么由基准点
/// (fiducial, 模体上一个可辨认的标记) 的图像坐标推出:
/// 旋转后基准点应落在负 y 轴上. 以 tagged enum 表示后,
/// "两者都给" 与 "两者都不给" 在类型层面即不可表达.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Orientation {
    /// 直接给出旋转角 (度). 即模体需要旋转多少度才能使基准点位于
    /// x-y 平面的正下方.
    Angle(f64),

    /// 给出基准点在图像空间中的坐标, 旋转角由质心与基准点的连线推出.
    Fiducial(Idx2dF),
}

impl Orientation {
    /// 针对质心 `centroid` 解析出实际旋转角 (度).
    pub fn resolve(&self, centroid: Idx2dF) -> f64 {
        match self {
            Orientation::Angle(angle) => *angle,
            Orientation::Fiducial((fx, fy)) => {
                // 把基准点转到负 y 轴所需的旋转角.
                -90.0 - (fy - centroid.1).atan2(fx - centroid.0).to_degrees()
            }
        }
    }
}

/// 估计掩膜切片中模体的质心, 闭运算圆盘半径取
/// [`DEFAULT_CLOSING_RADIUS`].
///
/// 详见 [`find_centroid_with`].
#[inline]
pub fn find_centroid(mask: &MaskSlice) -> Option<Idx2dF> {
    find_centroid_with(mask, DEFAULT_CLOSING_RADIUS)
}

/// 估计掩膜切片中模体的质心.
///
/// 先对二值掩膜做半径为 `radius` 的圆盘闭运算,
/// 以桥合被剔除的气泡留下的小空洞; 然后做 4-连通域标记,
/// 返回首个连通域 (按 BFS 种子点的行优先序) 的质心.
///
/// # 返回值
///
/// 质心的 `(h, w)` 实数坐标. 掩膜无前景时返回 `None`.
/// 期望输入闭运算后恰有一个连通域; 若存在多个,
/// 函数仍按上述规则确定性地返回首个连通域的质心.
pub fn find_centroid_with(mask: &MaskSlice, radius: usize) -> Option<Idx2dF> {
    let closed = morph::binary_close(mask.array_view(), radius);
    let areas = MaskSlice::new(closed.view()).phantom_areas();
    let region = areas.first()?;

    debug_assert!(!region.is_empty());
    let n = region.len() as f64;
    let (sum_h, sum_w) = region
        .iter()
        .fold((0.0, 0.0), |(sh, sw), &(h, w)| (sh + h as f64, sw + w as f64));
    Some((sum_h / n, sum_w / n))
}

/// 对单个点执行刚性变换: 以 `centroid` 为平移基准,
/// 旋转 `orientation` 解析出的角度 (逆时针为正),
/// 得到该点在模体空间中的坐标.
pub fn transform_image_point(
    point: Idx2dF,
    centroid: Idx2dF,
    orientation: &Orientation,
) -> Idx2dF {
    let translated = (point.0 - centroid.0, point.1 - centroid.1);

    let theta = orientation.resolve(centroid).to_radians();
    let (sin, cos) = theta.sin_cos();

    (
        cos * translated.0 - sin * translated.1,
        sin * translated.0 + cos * translated.1,
    )
}

/// 由掩膜生成与其同形状的几何真值场.
///
/// 对每个 z 切片独立处理: 掩膜为真的体素索引经刚性变换映射到模体空间,
/// 乘以各向同性缩放因子 `scaling` (体素到毫米) 后交给 `truth_fn` 求值,
/// 结果写入输出数组的相同位置. 掩膜为假的体素保持为 0.
///
/// 单次调用只应用一个刚性变换; 若不同 z 切片需要不同的质心/角度,
/// 调用方应逐切片调用.
pub fn gen_geometry_data<F>(
    mask: ArrayView3<u8>,
    truth_fn: F,
    centroid: Idx2dF,
    orientation: &Orientation,
    scaling: f64,
) -> Array3<f64>
where
    F: Fn(Idx2dF) -> f64,
{
    let mut geometry_data = Array3::<f64>::zeros(mask.dim());

    for (mask_sl, mut out_sl) in izip!(mask.axis_iter(Axis(0)), geometry_data.axis_iter_mut(Axis(0)))
    {
        for ((h, w), &m_val) in mask_sl.indexed_iter() {
            if is_phantom(m_val) {
                let transformed =
                    transform_image_point((h as f64, w as f64), centroid, orientation);
                let scaled = (transformed.0 * scaling, transformed.1 * scaling);
                out_sl[(h, w)] = truth_fn(scaled);
            }
        }
    }

    geometry_data
}

/// 将真值场保存为 `.npy` 文件.
#[inline]
pub fn save_npy<P: AsRef<Path>>(field: &Array3<f64>, path: P) -> Result<(), WriteNpyError> {
    write_npy(path, field)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 借助 `rayon`, 以 z 切片为并行粒度运行 [`gen_geometry_data`].
        ///
        /// `truth_fn` 是纯函数且各体素互相独立, 因此并行版本与串行版本
        /// 的输出完全一致.
        pub fn par_gen_geometry_data<F>(
            mask: ArrayView3<u8>,
            truth_fn: F,
            centroid: Idx2dF,
            orientation: &Orientation,
            scaling: f64,
        ) -> Array3<f64>
        where
            F: Fn(Idx2dF) -> f64 + Sync,
        {
            let mut geometry_data = Array3::<f64>::zeros(mask.dim());

            geometry_data
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(z, mut out_sl)| {
                    let mask_sl: ArrayView2<u8> = mask.index_axis(Axis(0), z);
                    for ((h, w), &m_val) in mask_sl.indexed_iter() {
                        if is_phantom(m_val) {
                            let transformed =
                                transform_image_point((h as f64, w as f64), centroid, orientation);
                            let scaled = (transformed.0 * scaling, transformed.1 * scaling);
                            out_sl[(h, w)] = truth_fn(scaled);
                        }
                    }
                });

            geometry_data
        }
    }
}

/// 将派生图与某个几何真值逐体素配对.
///
/// 对每个 z 切片, 掩膜为真的体素索引经刚性变换 (角度直接给出) 映射到
/// 模体空间并交给 `truth_fn` 求值; 真值与该体素的测量值分别追加到两个
/// 返回序列中. 派生图未附带掩膜时视为全真.
///
/// # 返回值
///
/// `(真值序列, 测量值序列)`. 两个序列按索引对齐,
/// 长度均等于掩膜为真的体素总数.
pub fn compare_to_pattern<F>(
    map: &DerivedMap,
    truth_fn: F,
    centroid: Idx2dF,
    angle: f64,
) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(Idx2dF) -> f64,
{
    let orientation = Orientation::Angle(angle);
    let mut independent = vec![];
    let mut dependent = vec![];

    let data = map.data();
    for z in 0..map.len_z() {
        let data_sl = data.index_axis(Axis(0), z);
        match map.mask() {
            Some(mask) => {
                let mask_sl = mask.index_axis(Axis(0), z);
                for ((pos, &d_val), &m_val) in izip!(data_sl.indexed_iter(), mask_sl.iter()) {
                    if is_phantom(m_val) {
                        let transformed = transform_image_point(
                            (pos.0 as f64, pos.1 as f64),
                            centroid,
                            &orientation,
                        );
                        independent.push(truth_fn(transformed));
                        dependent.push(d_val as f64);
                    }
                }
            }
            None => {
                for (pos, &d_val) in data_sl.indexed_iter() {
                    let transformed = transform_image_point(
                        (pos.0 as f64, pos.1 as f64),
                        centroid,
                        &orientation,
                    );
                    independent.push(truth_fn(transformed));
                    dependent.push(d_val as f64);
                }
            }
        }
    }

    (independent, dependent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infill::{Metric, Pattern};
    use crate::PhantomMask;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    /// 平移与旋转的基本正确性.
    #[test]
    fn test_transform_image_point() {
        let p = transform_image_point((3.0, 3.0), (2.0, 2.0), &Orientation::Angle(0.0));
        assert!(f64_eq(p.0, 1.0));
        assert!(f64_eq(p.1, 1.0));

        let p = transform_image_point((3.0, 0.0), (2.0, 0.0), &Orientation::Angle(90.0));
        assert!(f64_eq(p.0, 0.0));
        assert!(f64_eq(p.1, 1.0));
    }

    /// 基准点与等价显式角度应产生相同的变换.
    #[test]
    fn test_fiducial_angle_equivalence() {
        let centroid = (10.0, 10.0);
        // 基准点位于质心正右方 (+x), 对应角度 -90°.
        let fiducial = Orientation::Fiducial((14.0, 10.0));
        assert!(f64_eq(fiducial.resolve(centroid), -90.0));

        let angle = Orientation::Angle(-90.0);
        for point in [(3.0, 7.0), (12.0, 12.0), (10.0, 0.0)] {
            let a = transform_image_point(point, centroid, &fiducial);
            let b = transform_image_point(point, centroid, &angle);
            assert!(f64_eq(a.0, b.0));
            assert!(f64_eq(a.1, b.1));
        }

        // 基准点已在正下方 (-y) 时无需旋转.
        let below = Orientation::Fiducial((10.0, 4.0));
        assert!(f64_eq(below.resolve(centroid), 0.0));
    }

    /// 对称十字掩膜的质心应落在其中心.
    #[test]
    fn test_find_centroid() {
        let mut mask_data = Array3::<u8>::zeros((3, 50, 50));
        mask_data[(1, 30, 30)] = 1;
        mask_data[(1, 29, 30)] = 1;
        mask_data[(1, 31, 30)] = 1;
        mask_data[(1, 30, 29)] = 1;
        mask_data[(1, 30, 31)] = 1;

        let mask = PhantomMask::fake(mask_data, [1.0; 3]);
        let centroid = find_centroid(&mask.slice_at(1)).unwrap();
        assert!(f64_eq(centroid.0, 30.0));
        assert!(f64_eq(centroid.1, 30.0));

        // 全空切片没有质心.
        assert_eq!(find_centroid(&mask.slice_at(0)), None);
    }

    /// 真值场与掩膜同形状, 掩膜外恒为 0, 掩膜内为模式函数值.
    #[test]
    fn test_gen_geometry_data() {
        let mut mask = Array3::<u8>::zeros((3, 8, 8));
        mask[(1, 4, 4)] = 1;
        mask[(1, 4, 7)] = 1;
        mask[(2, 0, 0)] = 1;

        let pattern = Pattern::concentric_arc((0.0, 0.0));
        let truth_fn = |p| pattern.metric(Metric::ArcRadius, p).unwrap();
        let centroid = (4.0, 4.0);

        let field = gen_geometry_data(
            mask.view(),
            truth_fn,
            centroid,
            &Orientation::Angle(45.0),
            1.0,
        );

        assert_eq!(field.dim(), mask.dim());
        // 质心处半径为 0.
        assert!(f64_eq(field[(1, 4, 4)], 0.0));
        // 旋转不改变到原点的距离.
        assert!(f64_eq(field[(1, 4, 7)], 3.0));
        // 质心对角偏移 (4, 4), 缩放前距离为 sqrt(32).
        assert!(f64_eq(field[(2, 0, 0)], 32.0f64.sqrt()));
        // 掩膜外恒为 0.
        assert!(f64_eq(field[(0, 0, 0)], 0.0));
        assert!(f64_eq(field[(1, 5, 5)], 0.0));
    }

    /// 缩放因子在变换之后, 求值之前应用.
    #[test]
    fn test_gen_geometry_data_scaling() {
        let mut mask = Array3::<u8>::zeros((1, 4, 4));
        mask[(0, 0, 3)] = 1;

        let pattern = Pattern::concentric_arc((0.0, 0.0));
        let truth_fn = |p| pattern.metric(Metric::ArcRadius, p).unwrap();

        let field = gen_geometry_data(
            mask.view(),
            truth_fn,
            (0.0, 0.0),
            &Orientation::Angle(0.0),
            2.5,
        );
        assert!(f64_eq(field[(0, 0, 3)], 7.5));
    }

    /// 串行与并行版本的输出应完全一致.
    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_gen_geometry_data() {
        let mut mask = Array3::<u8>::zeros((4, 16, 16));
        for z in 0..4 {
            for h in 2..14 {
                for w in 2..14 {
                    if (h + w + z) % 3 != 0 {
                        mask[(z, h, w)] = 1;
                    }
                }
            }
        }

        let pattern = Pattern::alternating(
            Pattern::parallel_line(30.0),
            Pattern::concentric_arc((1.0, -2.0)),
        );
        let truth_fn = |p| pattern.metric(Metric::CrossingAngle, p).unwrap();
        let orientation = Orientation::Fiducial((8.0, 0.0));

        let serial = gen_geometry_data(mask.view(), truth_fn, (8.0, 8.0), &orientation, 1.75);
        let parallel =
            par_gen_geometry_data(mask.view(), truth_fn, (8.0, 8.0), &orientation, 1.75);
        assert_eq!(serial, parallel);
    }

    /// 用模式自身生成的合成图对比时, 真值与测量值应逐点一致.
    #[test]
    fn test_compare_to_pattern_self_consistency() {
        let pattern = Pattern::concentric_arc((0.0, 0.0));
        let truth_fn = |p| pattern.metric(Metric::ArcRadius, p).unwrap();
        let centroid = (8.0, 8.0);
        let angle = 30.0;
        let orientation = Orientation::Angle(angle);

        let shape = (2, 16, 16);
        let mut data = Array3::<f32>::zeros(shape);
        let mut mask = Array3::<u8>::zeros(shape);
        for z in 0..shape.0 {
            for h in 4..12 {
                for w in 4..12 {
                    let p = transform_image_point((h as f64, w as f64), centroid, &orientation);
                    data[(z, h, w)] = truth_fn(p) as f32;
                    mask[(z, h, w)] = 1;
                }
            }
        }

        let map = DerivedMap::fake(data, [1.0; 3], Some(mask));
        let (truth, measured) = compare_to_pattern(&map, truth_fn, centroid, angle);

        assert_eq!(truth.len(), 2 * 8 * 8);
        assert_eq!(truth.len(), measured.len());

        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        let std = |v: &[f64]| {
            let m = mean(v);
            (v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64).sqrt()
        };
        // f32 往返会引入少量舍入.
        assert!((mean(&truth) - mean(&measured)).abs() < 1e-5);
        assert!((std(&truth) - std(&measured)).abs() < 1e-5);
    }

    /// 未附带掩膜的派生图视为全真.
    #[test]
    fn test_compare_without_mask() {
        let map = DerivedMap::fake(Array3::<f32>::ones((2, 3, 3)), [1.0; 3], None);
        let truth_fn = |_p| 1.0;
        let (truth, measured) = compare_to_pattern(&map, truth_fn, (1.0, 1.0), 0.0);
        assert_eq!(truth.len(), 18);
        assert!(measured.iter().all(|&v| f64_eq(v, 1.0)));
    }
}
