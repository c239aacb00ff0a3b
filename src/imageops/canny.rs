use ndarray::Array2;

/// Canny-style edge detector over a [0, 1] grayscale plane.
///
/// Smoothing uses a Gaussian of the given `sigma` (kernel radius
/// `ceil(3*sigma)`, minimum 1) with reflected borders, gradients come from
/// 3x3 Sobel kernels, and hysteresis thresholds are chosen automatically as
/// `high = 0.2 * max` and `low = 0.1 * max` of the suppressed magnitudes.
///
/// `visibility` restricts detection: a pixel can only carry an edge when its
/// full 8-neighborhood is visible, so occluded regions neither produce edges
/// nor leak gradients across their boundary.
pub fn canny(image: &Array2<f32>, sigma: f32, visibility: Option<&Array2<bool>>) -> Array2<bool> {
    let (height, width) = image.dim();
    let mut edges = Array2::from_elem((height, width), false);
    if height < 3 || width < 3 {
        return edges;
    }

    let smoothed = gaussian_smooth(image, sigma);

    let mut gx = Array2::<f32>::zeros((height, width));
    let mut gy = Array2::<f32>::zeros((height, width));
    let mut magnitude = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let px = |dy: isize, dx: isize| {
                smoothed[[
                    reflect(y as isize + dy, height),
                    reflect(x as isize + dx, width),
                ]]
            };
            let h = (px(-1, 1) + 2.0 * px(0, 1) + px(1, 1))
                - (px(-1, -1) + 2.0 * px(0, -1) + px(1, -1));
            let v = (px(1, -1) + 2.0 * px(1, 0) + px(1, 1))
                - (px(-1, -1) + 2.0 * px(-1, 0) + px(-1, 1));
            gx[[y, x]] = h;
            gy[[y, x]] = v;
            magnitude[[y, x]] = h.hypot(v);
        }
    }

    if let Some(visible) = visibility {
        for y in 0..height {
            for x in 0..width {
                if !eroded_visible(visible, y, x) {
                    magnitude[[y, x]] = 0.0;
                }
            }
        }
    }

    // non-maximum suppression along the quantized gradient direction
    let mut nms = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let m = magnitude[[y, x]];
            if m == 0.0 {
                continue;
            }
            let ((dy1, dx1), (dy2, dx2)) = nms_offsets(gx[[y, x]], gy[[y, x]]);
            let at = |dy: isize, dx: isize| {
                magnitude[[
                    reflect(y as isize + dy, height),
                    reflect(x as isize + dx, width),
                ]]
            };
            if m >= at(dy1, dx1) && m >= at(dy2, dx2) {
                nms[[y, x]] = m;
            }
        }
    }

    let max_nms = nms.fold(0.0f32, |acc, &v| acc.max(v));
    if max_nms <= 0.0 {
        return edges;
    }
    let high = 0.2 * max_nms;
    let low = 0.1 * max_nms;

    // hysteresis: strong seeds grow through connected weak responses
    let mut stack = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if nms[[y, x]] >= high {
                edges[[y, x]] = true;
                stack.push((y, x));
            }
        }
    }
    while let Some((y, x)) = stack.pop() {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let ny = y as isize + dy;
                let nx = x as isize + dx;
                if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                    continue;
                }
                let (ny, nx) = (ny as usize, nx as usize);
                if !edges[[ny, nx]] && nms[[ny, nx]] >= low {
                    edges[[ny, nx]] = true;
                    stack.push((ny, nx));
                }
            }
        }
    }

    edges
}

/// Suppression neighbors for a gradient `(gx, gy)`, as `(dy, dx)` pairs.
fn nms_offsets(gx: f32, gy: f32) -> ((isize, isize), (isize, isize)) {
    let angle = gy.atan2(gx).to_degrees();
    let a = if angle < 0.0 { angle + 180.0 } else { angle };
    if !(22.5..157.5).contains(&a) {
        ((0, 1), (0, -1))
    } else if a < 67.5 {
        ((1, 1), (-1, -1))
    } else if a < 112.5 {
        ((1, 0), (-1, 0))
    } else {
        ((1, -1), (-1, 1))
    }
}

fn eroded_visible(visible: &Array2<bool>, y: usize, x: usize) -> bool {
    let (height, width) = visible.dim();
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            let ny = reflect(y as isize + dy, height);
            let nx = reflect(x as isize + dx, width);
            if !visible[[ny, nx]] {
                return false;
            }
        }
    }
    true
}

/// Reflected border index: (d c b a | a b c d | d c b a).
fn reflect(i: isize, size: usize) -> usize {
    let s = size as isize;
    if i < 0 {
        (-i - 1).rem_euclid(s) as usize
    } else if i >= s {
        (2 * s - i - 1).rem_euclid(s) as usize
    } else {
        i as usize
    }
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = ((3.0 * sigma).ceil() as usize).max(1);
    let sigma2 = sigma * sigma;
    let mut kernel = vec![0.0f32; 2 * radius + 1];
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = (i as isize - radius as isize) as f32;
        *k = (-(x * x) / (2.0 * sigma2)).exp();
    }
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

fn gaussian_smooth(image: &Array2<f32>, sigma: f32) -> Array2<f32> {
    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() as isize / 2;
    let (height, width) = image.dim();

    let mut rows = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sx = reflect(x as isize + i as isize - radius, width);
                acc += image[[y, sx]] * k;
            }
            rows[[y, x]] = acc;
        }
    }

    let mut out = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sy = reflect(y as isize + i as isize - radius, height);
                acc += rows[[sy, x]] * k;
            }
            out[[y, x]] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image() -> Array2<f32> {
        Array2::from_shape_fn((16, 16), |(_, x)| if x < 8 { 0.0 } else { 1.0 })
    }

    #[test]
    fn constant_image_has_no_edges() {
        let flat = Array2::from_elem((16, 16), 0.5);
        assert!(!canny(&flat, 1.0, None).iter().any(|&e| e));
    }

    #[test]
    fn vertical_step_is_detected_near_the_boundary() {
        let edges = canny(&step_image(), 1.0, None);
        let hits: Vec<_> = edges
            .indexed_iter()
            .filter(|(_, &e)| e)
            .map(|((_, x), _)| x)
            .collect();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|&x| (6..=9).contains(&x)));
    }

    #[test]
    fn visibility_mask_suppresses_occluded_edges() {
        let image = step_image();
        // hide the step entirely: nothing visible to the right of column 5
        let visible = Array2::from_shape_fn((16, 16), |(_, x)| x < 5);
        assert!(!canny(&image, 1.0, Some(&visible)).iter().any(|&e| e));
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(1.5);
        assert_eq!(k.len(), 2 * 5 + 1);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn reflect_matches_scipy_convention() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
    }
}
