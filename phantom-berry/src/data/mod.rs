use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView, ArrayView2, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d};

pub mod save;
pub mod slice;
pub mod window;

pub use save::{FieldSliceVis, ImgWriteRaw, ImgWriteVis};
pub use slice::MaskSlice;
pub use window::MetricWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 读取 nii 体数据并统一为 `(z, H, W)` 模式的 3D 数组.
///
/// 4D 输入 (如原始 DWI 派生的掩膜) 会被压缩为其第一个 volume.
fn load_volume<T>(path: &Path) -> nifti::Result<(BoxedHeader, Array3<T>)>
where
    T: nifti::DataElement,
{
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());

    let mut data: ArrayD<T> = obj.into_volume().into_ndarray()?;
    // 掩膜常以 4D 格式保存, 此时只保留第一个 volume.
    while data.ndim() > 3 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data.permuted_axes([2, 1, 0].as_slice());
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    debug_assert!(data.is_standard_layout());

    let shape = (
        data.shape()[0],
        data.shape()[1],
        data.shape()[2],
    );

    // 该操作不会生成 `Err`, 可直接 unwrap.
    let data = Array3::<T>::from_shape_vec(shape, data.into_raw_vec()).unwrap();
    Ok((header, data))
}

/// 由裸数据拼接 "fake" header. `data` 按 `(z, H, W)` 组织,
/// `pix_dim` 按 `[z, H, W]` 顺序给出毫米分辨率.
fn fake_header(shape: Idx3d, pix_dim: [f32; 3]) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    let (z, h, w) = shape;
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [pz, ph, pw] = pix_dim;
    header.pixdim = [1.0, pw, ph, pz, 1.0, 1.0, 1.0, 1.0];
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiVolumeAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取 width 方向 (自然 2D 图像的水平方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.header().pixdim[1] as f64
    }

    /// 获取 height 方向 (自然 2D 图像的垂直方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.header().pixdim[2] as f64
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.header().pixdim[3] as f64
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.pix_dim();
        z == h && z == w
    }

    /// 获取水平切片内的各向同性分辨率 (毫米/体素).
    ///
    /// 该值即从图像体素坐标换算到模体空间物理坐标的缩放因子.
    /// 若切片内两个方向的分辨率不一致, 则程序 panic.
    #[inline]
    fn in_plane_mm(&self) -> f64 {
        assert_eq!(
            self.height_mm(),
            self.width_mm(),
            "切片内分辨率必须各向同性"
        );
        self.width_mm()
    }
}

/// nii 格式 3D 模体掩膜, 包括 header 和二值掩膜数据. 掩膜值以 `u8` 保存,
/// 非零值代表模体材料.
#[derive(Debug, Clone)]
pub struct PhantomMask {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiVolumeAttr for PhantomMask {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for PhantomMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl PhantomMask {
    /// 打开 nii 文件格式的 3D 模体掩膜. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 4D 掩膜 (常见于由原始 DWI 直接生成的掩膜) 会被压缩为第一个 volume.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let (header, data) = load_volume::<u8>(path.as_ref())?;
        Ok(Self { header, data })
    }

    /// 根据裸掩膜数据和体素分辨率直接创建 `PhantomMask` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 `(z, H, W)` 格式存储, 体素值必须为 0 或 1,
    ///   否则程序行为未定义.
    /// 2. `pix_dim` 按照 `[z, H, W]` 顺序给出毫米分辨率.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>, pix_dim: [f32; 3]) -> Self {
        let header = fake_header(data.dim(), pix_dim);
        Self { header, data }
    }

    /// 判断该结构是否是由 `fake` 方法手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获取 3D 掩膜 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> MaskSlice {
        MaskSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 掩膜水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = MaskSlice> {
        self.data.axis_iter(Axis(0)).map(MaskSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获取 3D 掩膜中模体体素的总个数.
    #[inline]
    pub fn phantom_voxels(&self) -> usize {
        self.data.iter().filter(|p| is_phantom(**p)).count()
    }

    /// 收集所有模体体素对应的下标. 结果按行优先存储.
    pub fn phantom_pos(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(ref pos, pixel)| is_phantom(*pixel).then_some(*pos))
            .collect()
    }

    /// 获取模体体素最多的水平切片索引. 掩膜全空时返回 `None`.
    pub fn densest_slice(&self) -> Option<usize> {
        let (z_index, best) = self
            .slice_iter()
            .map(|s| s.phantom_count())
            .enumerate()
            .max_by_key(|(_, cnt)| *cnt)?;
        (best > 0).then_some(z_index)
    }
}

/// nii 格式的 3D DWI 派生图 (如 FA, MD, MK 等标量图),
/// 可选地附带一个同形状的二值掩膜.
///
/// 掩膜与数据保持为两个独立数组, 通过 `data` 和 `masked_values`
/// 分别访问完整视图和掩膜内数据, 避免二者之间的隐式别名.
#[derive(Debug, Clone)]
pub struct DerivedMap {
    header: BoxedHeader,
    data: Array3<f32>,
    mask: Option<Array3<u8>>,
}

impl NiftiVolumeAttr for DerivedMap {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for DerivedMap {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl DerivedMap {
    /// 打开 nii 文件格式的 3D 派生图, 不附带掩膜. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let (header, data) = load_volume::<f32>(path.as_ref())?;
        Ok(Self {
            header,
            data,
            mask: None,
        })
    }

    /// 分别打开 nii 文件格式的 3D 派生图和对应掩膜. 如果任一文件打开失败,
    /// 则返回 `Err`. 若两个文件的数据形状不一致, 则程序 panic.
    pub fn open_with_mask(
        path: impl AsRef<Path>,
        mask_path: impl AsRef<Path>,
    ) -> nifti::Result<Self> {
        let (header, data) = load_volume::<f32>(path.as_ref())?;
        let (_, mask) = load_volume::<u8>(mask_path.as_ref())?;
        assert_eq!(data.dim(), mask.dim(), "派生图和掩膜形状不一致");
        Ok(Self {
            header,
            data,
            mask: Some(mask),
        })
    }

    /// 根据裸数据和体素分辨率直接创建 `DerivedMap` 实体.
    /// 参数约定与 [`PhantomMask::fake`] 相同; 若掩膜存在,
    /// 其形状必须与数据一致, 否则程序 panic.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>, pix_dim: [f32; 3], mask: Option<Array3<u8>>) -> Self {
        if let Some(m) = &mask {
            assert_eq!(data.dim(), m.dim(), "派生图和掩膜形状不一致");
        }
        let header = fake_header(data.dim(), pix_dim);
        Self { header, data, mask }
    }

    /// 获得数据的一份不可变 shallow copy. 该视图无视掩膜.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获取附带的掩膜视图 (如果存在).
    #[inline]
    pub fn mask(&self) -> Option<ArrayView<'_, u8, Ix3>> {
        self.mask.as_ref().map(|m| m.view())
    }

    /// 获取 z 空间第 `z_index` 层数据的不可变切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 按行优先序展平的掩膜内数据. 如果掩膜不存在, 等价于展平全部数据.
    pub fn masked_values(&self) -> Vec<f32> {
        match &self.mask {
            Some(m) => self
                .data
                .iter()
                .zip(m.iter())
                .filter_map(|(&v, &keep)| is_phantom(keep).then_some(v))
                .collect(),
            None => self.data.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// fake 构建的体数据应正确回报形状与分辨率.
    #[test]
    fn test_fake_mask_attrs() {
        let mask = PhantomMask::fake(Array3::zeros((3, 4, 5)), [2.5, 1.5, 1.5]);
        assert!(mask.is_faked());
        assert_eq!(mask.shape(), (3, 4, 5));
        assert_eq!(mask.slice_shape(), (4, 5));
        assert_eq!(mask.len_z(), 3);
        assert_eq!(mask.size(), 60);
        assert!((mask.in_plane_mm() - 1.5).abs() < 1e-9);
        assert!((mask.z_mm() - 2.5).abs() < 1e-9);
        assert!(!mask.is_isotropic());
        assert_eq!(mask.phantom_voxels(), 0);
        assert_eq!(mask.densest_slice(), None);
    }

    /// 掩膜存在时, `masked_values` 只应返回掩膜内数据.
    #[test]
    fn test_masked_values() {
        let mut data = Array3::<f32>::zeros((1, 2, 2));
        data[(0, 0, 0)] = 1.0;
        data[(0, 0, 1)] = 2.0;
        data[(0, 1, 0)] = 3.0;
        data[(0, 1, 1)] = 4.0;

        let mut mask = Array3::<u8>::zeros((1, 2, 2));
        mask[(0, 0, 1)] = 1;
        mask[(0, 1, 1)] = 1;

        let map = DerivedMap::fake(data.clone(), [1.0; 3], Some(mask));
        assert_eq!(map.masked_values(), vec![2.0, 4.0]);

        let map = DerivedMap::fake(data, [1.0; 3], None);
        assert_eq!(map.masked_values(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    /// 模体体素统计与最稠密切片定位.
    #[test]
    fn test_phantom_pos() {
        let mut raw = Array3::<u8>::zeros((2, 3, 3));
        raw[(1, 0, 0)] = 1;
        raw[(1, 2, 2)] = 1;
        let mask = PhantomMask::fake(raw, [1.0; 3]);

        assert_eq!(mask.phantom_voxels(), 2);
        assert_eq!(mask.phantom_pos(), vec![(1, 0, 0), (1, 2, 2)]);
        assert_eq!(mask.densest_slice(), Some(1));
    }
}
