//! 几何度量可视化窗口.

/// 度量窗口, 包含窗位 (level) 和窗宽 (width).
///
/// 与 CT 可视化窗口的想法相同: 将某个几何度量 (纤维方向角, 交叉角,
/// 弧半径等) 的取值区间线性映射到 8-bit 灰度, 以便保存切片预览图.
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct MetricWindow {
    level: f32,
    width: f32,
}

impl MetricWindow {
    /// 构建度量窗口.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<MetricWindow> {
        if (-1e5..=1e5).contains(&level) && 0.0 < width && width <= 1e5 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建适合可视化纤维方向角的窗口. 方向角取值于 \[-90°, 90°\],
    /// 因此窗位为 0, 窗宽为 180.
    #[inline]
    pub const fn from_direction_visual() -> MetricWindow {
        Self {
            level: 0.0,
            width: 180.0,
        }
    }

    /// 构建适合可视化交叉角的窗口. 交叉角取值于 \[0°, 90°\],
    /// 因此窗位为 45, 窗宽为 90.
    #[inline]
    pub const fn from_crossing_angle_visual() -> MetricWindow {
        Self {
            level: 45.0,
            width: 90.0,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗口设置下, 度量值 `v` 对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if v <= lb {
            Some(u8::MIN)
        } else if v >= self.upper_bound() {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some((((v - lb) / self.width()) * 255.0) as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MetricWindow;

    fn is_valid_init(level: f32, width: f32) -> bool {
        MetricWindow::new(level, width).is_some()
    }

    #[test]
    fn test_metric_window_invalid_input() {
        assert!(!is_valid_init(0.0, -1.0));
        assert!(!is_valid_init(0.0, 0.0));
    }

    #[test]
    fn test_metric_window_generic() {
        // [0, 90]
        let w = MetricWindow::from_crossing_angle_visual();
        assert_eq!(w.eval(f32::NAN), None);
        assert_eq!(w.eval(-10.0), Some(0));
        assert_eq!(w.eval(0.0), Some(0));
        assert_eq!(w.eval(45.0), Some((255.0 * 0.5) as u8));
        assert_eq!(w.eval(90.0), Some(255));
        assert_eq!(w.eval(100.0), Some(255));

        // [-90, 90]
        let w = MetricWindow::from_direction_visual();
        assert_eq!(w.eval(-90.0), Some(0));
        assert_eq!(w.eval(0.0), Some((255.0 * 0.5) as u8));
        assert_eq!(w.eval(90.0), Some(255));
    }
}
