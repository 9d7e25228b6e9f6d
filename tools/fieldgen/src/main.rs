//! 由模体掩膜生成几何真值场的命令行工具.
//!
//! 用法:
//!
//! ```text
//! fieldgen <mask.nii> <metric> <pattern> <angle> <out-stem>
//! ```
//!
//! 1. `metric`: `direction`, `crossing_angle` 或 `arc_radius`;
//! 2. `pattern`: `line:<deg>`, `arc:<x>,<y>`, 或 `alt:<simple>+<simple>`;
//! 3. `angle`: 使基准点位于正下方所需的旋转角 (度);
//! 4. 输出: `<out-stem>.npy` 真值场, 以及每个非空切片的
//!    `<out-stem>_z<k>.png` 灰度预览图.
//!
//! 质心从模体体素最多的切片自动估计, 缩放因子取自 nii header
//! 的切片内分辨率.

use ndarray::Axis;
use phantom_berry::prelude::*;
use std::env;
use std::process::exit;

const USAGE: &str = "usage: fieldgen <mask.nii> <metric> <pattern> <angle> <out-stem>
    metric:  direction | crossing_angle | arc_radius
    pattern: line:<deg> | arc:<x>,<y> | alt:<simple>+<simple>";

/// 打印用法并退出.
fn usage() -> ! {
    eprintln!("{USAGE}");
    exit(2)
}

/// 解析 `line:<deg>` 或 `arc:<x>,<y>` 形式的简单模式.
fn parse_simple(s: &str) -> Pattern {
    if let Some(deg) = s.strip_prefix("line:") {
        let deg: f64 = deg.parse().unwrap_or_else(|_| usage());
        return Pattern::parallel_line(deg);
    }
    if let Some(xy) = s.strip_prefix("arc:") {
        let Some((x, y)) = xy.split_once(',') else {
            usage()
        };
        let x: f64 = x.parse().unwrap_or_else(|_| usage());
        let y: f64 = y.parse().unwrap_or_else(|_| usage());
        return Pattern::concentric_arc((x, y));
    }
    usage()
}

/// 解析模式参数.
fn parse_pattern(s: &str) -> Pattern {
    if let Some(pair) = s.strip_prefix("alt:") {
        let Some((p0, p1)) = pair.split_once('+') else {
            usage()
        };
        return Pattern::alternating(parse_simple(p0), parse_simple(p1));
    }
    parse_simple(s)
}

/// 为度量选择合适的可视化窗口.
fn window_for(metric: Metric, field_max: f64) -> MetricWindow {
    match metric {
        Metric::Direction => MetricWindow::from_direction_visual(),
        Metric::CrossingAngle => MetricWindow::from_crossing_angle_visual(),
        // 弧半径没有先验范围, 按照场内最大值拉伸.
        Metric::ArcRadius => {
            MetricWindow::new(field_max as f32 / 2.0, field_max.max(1e-3) as f32).unwrap()
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let [_, mask_path, metric, pattern, angle, out_stem] = args.as_slice() else {
        usage()
    };

    let metric = Metric::from_name(metric).unwrap_or_else(|| usage());
    let pattern = parse_pattern(pattern);
    let angle: f64 = angle.parse().unwrap_or_else(|_| usage());

    assert!(
        pattern.supports(metric),
        "模式 `{pattern:?}` 不支持度量 `{}`",
        metric.as_str()
    );

    let mask = PhantomMask::open(mask_path).expect("Loading mask nii error");
    println!(
        "Mask: {} slices of {:?}, {} phantom voxels",
        mask.len_z(),
        mask.slice_shape(),
        mask.phantom_voxels()
    );

    // 质心从模体体素最多的切片估计.
    let densest = mask.densest_slice().expect("Mask is empty");
    let centroid = find_centroid(&mask.slice_at(densest)).unwrap();
    let scaling = mask.in_plane_mm();
    println!("Centroid (slice {densest}): ({:.2}, {:.2}), {scaling} mm/voxel", centroid.0, centroid.1);

    let truth_fn = |p| pattern.metric(metric, p).unwrap();
    let field = gen_geometry_data(
        mask.data(),
        truth_fn,
        centroid,
        &Orientation::Angle(angle),
        scaling,
    );

    let npy_path = format!("{out_stem}.npy");
    save_npy(&field, &npy_path).expect("Writing npy error");
    println!("Wrote {npy_path}");

    let field_max = field.iter().copied().fold(0.0f64, f64::max);
    let window = window_for(metric, field_max);
    for (z, mask_sl) in mask.slice_iter().enumerate() {
        if mask_sl.is_background() {
            continue;
        }
        let png_path = format!("{out_stem}_z{z}.png");
        FieldSliceVis::new(field.index_axis(Axis(0), z), window)
            .save(&png_path)
            .expect("Writing png error");
        println!("Wrote {png_path}");
    }
}
