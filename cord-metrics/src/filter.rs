//! 可分离高斯平滑与离散拉普拉斯算子. 边界统一采用 "reflect" 模式 (`d c b a | a b c d | d c b a`).

use ndarray::{Array, Array1, ArrayView, ArrayView1, ArrayViewMut1, Axis, Dimension, Zip};

/// 高斯核截断半径 (以标准差为单位).
const TRUNCATE: f64 = 4.0;

/// 将可能越界的索引按 reflect 模式映射回 `[0, n)`.
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}

/// 高斯核半径 `round(TRUNCATE * sigma)`.
#[inline]
fn kernel_radius(sigma: f64) -> isize {
    (TRUNCATE * sigma + 0.5) as isize
}

/// 归一化的一维高斯核. 调用者保证半径不为 0.
fn gaussian_kernel(sigma: f64) -> Array1<f64> {
    let radius = kernel_radius(sigma);
    let k = Array1::from_iter((-radius..=radius).map(|i| (-0.5 * (i * i) as f64 / (sigma * sigma)).exp()));
    let total = k.sum();
    k / total
}

fn convolve_lane(input: ArrayView1<f64>, mut output: ArrayViewMut1<f64>, kernel: &Array1<f64>) {
    let n = input.len();
    let radius = (kernel.len() / 2) as isize;
    for (i, o) in output.iter_mut().enumerate() {
        *o = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * input[reflect(i as isize + k as isize - radius, n)])
            .sum();
    }
}

/// 沿 `axes` 中每个轴依次做一维高斯卷积. 核半径为 0 (包括 `sigma <= 0`) 时原样复制.
///
/// 当 `axes` 中存在越界轴时 panic.
pub(crate) fn gaussian_filter<D: Dimension>(
    data: ArrayView<f64, D>,
    sigma: f64,
    axes: &[usize],
) -> Array<f64, D> {
    let mut current = data.to_owned();
    if sigma.is_nan() || sigma <= 0.0 || kernel_radius(sigma) == 0 {
        return current;
    }
    let kernel = gaussian_kernel(sigma);
    for &axis in axes {
        let mut next = Array::zeros(current.raw_dim());
        Zip::from(current.lanes(Axis(axis)))
            .and(next.lanes_mut(Axis(axis)))
            .for_each(|i, o| convolve_lane(i, o, &kernel));
        current = next;
    }
    current
}

/// 离散拉普拉斯算子: 沿每个轴的二阶差分 `f(i-1) + f(i+1) - 2f(i)` 之和.
/// 2D 时即 5 点模板, 3D 时即 7 点模板.
pub(crate) fn laplacian<D: Dimension>(data: ArrayView<f64, D>) -> Array<f64, D> {
    let mut out = Array::zeros(data.raw_dim());
    for axis in 0..data.ndim() {
        Zip::from(data.lanes(Axis(axis)))
            .and(out.lanes_mut(Axis(axis)))
            .for_each(|i, mut o| {
                let n = i.len();
                for (k, v) in o.iter_mut().enumerate() {
                    let k = k as isize;
                    *v += i[reflect(k - 1, n)] + i[reflect(k + 1, n)] - 2.0 * i[k as usize];
                }
            });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array2, Array3};

    #[test]
    fn test_reflect() {
        let mapped: Vec<_> = (-3..7).map(|i| reflect(i, 4)).collect();
        assert_eq!(mapped, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);
        assert_eq!(reflect(-5, 1), 0);
    }

    #[test]
    fn test_kernel_is_normalized() {
        let k = gaussian_kernel(1.5);
        assert_eq!(k.len(), 13);
        assert_abs_diff_eq!(k.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(k[0], k[12]);
    }

    #[test]
    fn test_smoothing_preserves_constant_and_sum() {
        let constant = Array3::from_elem((3, 5, 5), 7.0);
        let smoothed = gaussian_filter(constant.view(), 1.0, &[0, 1, 2]);
        assert!(smoothed.iter().all(|v| (v - 7.0).abs() < 1e-12));

        let impulse = {
            let mut a = arr1(&[0.0; 9]);
            a[4] = 1.0;
            a
        };
        let spread = gaussian_filter(impulse.view(), 1.0, &[0]);
        assert_abs_diff_eq!(spread.sum(), 1.0, epsilon = 1e-12);
        assert!(spread[4] < 1.0 && spread[3] > 0.0);
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let a = arr1(&[1.0, 5.0, 2.0]);
        for sigma in [0.0, -1.0, 1e-200, 0.1, f64::NAN] {
            assert_eq!(gaussian_filter(a.view(), sigma, &[0]), a);
        }
    }

    #[test]
    fn test_laplacian() {
        let flat = Array2::from_elem((4, 4), 3.0);
        assert!(laplacian(flat.view()).iter().all(|v| *v == 0.0));

        let mut spike = Array2::<f64>::zeros((3, 3));
        spike[(1, 1)] = 1.0;
        let l = laplacian(spike.view());
        assert_eq!(l[(1, 1)], -4.0);
        assert_eq!(l[(0, 1)], 1.0);
        assert_eq!(l[(0, 0)], 0.0);

        let mut spike = Array3::<f64>::zeros((3, 3, 3));
        spike[(1, 1, 1)] = 1.0;
        let l = laplacian(spike.view());
        assert_eq!(l[(1, 1, 1)], -6.0);
        assert_eq!(l[(0, 1, 1)], 1.0);
        assert_eq!(l[(0, 0, 0)], 0.0);
    }
}
