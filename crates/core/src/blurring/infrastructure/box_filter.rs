/// ROI rectangle within a frame, already clamped to the frame bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Maps an out-of-range index back into `0..n` by mirroring around the
/// edge pixels without repeating them (`gfedcb|abcdefgh|gfedcba`).
///
/// Handles offsets larger than `n`, which happens whenever the kernel is
/// wider than the region being blurred.
pub fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// Sum of `at(start..start + k)` over a reflected axis of length `n`.
///
/// The reflected sequence repeats every `2 * (n - 1)` samples, so whole
/// periods are counted once and multiplied. Work is bounded by `2 * n`
/// whatever `k` is.
fn window_sum(at: impl Fn(isize) -> u64, start: isize, k: usize, n: usize) -> u64 {
    if n == 1 {
        return k as u64 * at(start);
    }
    let period = 2 * (n - 1);
    let (full, rest) = (k / period, k % period);
    let once: u64 = if full > 0 {
        (0..period as isize).map(|j| at(start + j)).sum()
    } else {
        0
    };
    full as u64 * once + (0..rest as isize).map(|j| at(start + j)).sum::<u64>()
}

/// Normalized box filter with a `kernel_size × kernel_size` window, in place.
///
/// Separable: a horizontal running-sum pass into `temp`, then a vertical
/// running-sum pass back into `data`. Per-pixel cost is constant; seeding
/// each running sum is bounded by the region size. Only pixels of `data`
/// are read; borders are reflected.
pub fn box_blur_with_temp(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel_size: usize,
    temp: &mut Vec<u64>,
) {
    if kernel_size <= 1 || width == 0 || height == 0 {
        return;
    }
    let anchor = (kernel_size / 2) as isize;
    let k = kernel_size as isize;

    temp.resize(width * height * channels, 0);

    // Horizontal pass: data → temp (unnormalized row sums)
    for y in 0..height {
        let row = &data[y * width * channels..(y + 1) * width * channels];
        for c in 0..channels {
            let at = |x: isize| row[reflect_101(x, width) * channels + c] as u64;
            let mut sum = window_sum(&at, -anchor, kernel_size, width);
            for x in 0..width as isize {
                temp[(y * width + x as usize) * channels + c] = sum;
                sum = sum + at(x - anchor + k) - at(x - anchor);
            }
        }
    }

    // Vertical pass: temp → data
    let denom = (kernel_size as u64) * (kernel_size as u64);
    for x in 0..width {
        for c in 0..channels {
            let at = |y: isize| temp[(reflect_101(y, height) * width + x) * channels + c];
            let mut sum = window_sum(&at, -anchor, kernel_size, height);
            for y in 0..height as isize {
                let mean = (sum + denom / 2) / denom;
                data[(y as usize * width + x) * channels + c] = mean.min(255) as u8;
                sum = sum + at(y - anchor + k) - at(y - anchor);
            }
        }
    }
}

/// Copy a rectangular ROI out of frame data into a reusable buffer.
pub fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    roi: &mut Vec<u8>,
) {
    roi.resize(rect.w * rect.h * channels, 0);
    for row in 0..rect.h {
        let src_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        let dst_offset = row * rect.w * channels;
        roi[dst_offset..dst_offset + rect.w * channels]
            .copy_from_slice(&data[src_offset..src_offset + rect.w * channels]);
    }
}

/// Write a blurred ROI buffer back into frame data.
pub fn write_roi_back(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
) {
    for row in 0..rect.h {
        let dst_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        let src_offset = row * rect.w * channels;
        data[dst_offset..dst_offset + rect.w * channels]
            .copy_from_slice(&roi[src_offset..src_offset + rect.w * channels]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 5, 0)]
    #[case(4, 5, 4)]
    #[case(-1, 5, 1)]
    #[case(-4, 5, 4)]
    #[case(5, 5, 3)]
    #[case(8, 5, 0)]
    #[case(9, 5, 1)]
    #[case(-9, 5, 1)]
    #[case(100, 1, 0)]
    fn test_reflect_101(#[case] i: isize, #[case] n: usize, #[case] expected: usize) {
        assert_eq!(reflect_101(i, n), expected);
    }

    #[test]
    fn test_kernel_one_is_identity() {
        let mut data: Vec<u8> = (0..48).collect();
        let original = data.clone();
        box_blur_with_temp(&mut data, 4, 4, 3, 1, &mut Vec::new());
        assert_eq!(data, original);
    }

    #[test]
    fn test_uniform_input_unchanged() {
        let mut data = vec![77u8; 10 * 6 * 3];
        box_blur_with_temp(&mut data, 10, 6, 3, 5, &mut Vec::new());
        assert!(data.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_three_tap_average_single_row() {
        // 1 row, 1 channel: [0, 90, 0] with k=3 → reflected windows
        // x=0: [90, 0, 90] → 60, x=1: [0, 90, 0] → 30, x=2: [90, 0, 90] → 60
        // Vertical pass on a single row reflects to the same row, so the
        // 3x3 mean equals the horizontal mean.
        let mut data = vec![0u8, 90, 0];
        box_blur_with_temp(&mut data, 3, 1, 1, 3, &mut Vec::new());
        assert_eq!(data, vec![60, 30, 60]);
    }

    #[test]
    fn test_kernel_larger_than_region_averages_checkerboard() {
        let (w, h) = (12, 8);
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    data[y * w + x] = 255;
                }
            }
        }
        box_blur_with_temp(&mut data, w, h, 1, 200, &mut Vec::new());
        for &v in &data {
            assert!((100..=155).contains(&v), "value {v} should be near mid-gray");
        }
    }

    #[rstest]
    #[case(2, 1)]
    #[case(5, 3)]
    #[case(1, 4)]
    fn test_huge_kernel_on_uniform_region_does_not_overflow(#[case] w: usize, #[case] h: usize) {
        let mut data = vec![255u8; w * h];
        box_blur_with_temp(&mut data, w, h, 1, 20_000_000, &mut Vec::new());
        assert!(data.iter().all(|&v| v == 255));
    }

    #[rstest]
    #[case(4, 7)]
    #[case(5, 8)]
    #[case(3, 20)]
    #[case(1, 6)]
    fn test_window_sum_matches_direct_sum(#[case] n: usize, #[case] k: usize) {
        let values = [3u64, 10, 7, 1, 9];
        let at = |i: isize| values[reflect_101(i, n)];
        for start in -6..3 {
            let direct: u64 = (0..k as isize).map(|j| at(start + j)).sum();
            assert_eq!(window_sum(&at, start, k, n), direct, "start {start}");
        }
    }

    #[test]
    fn test_extract_and_write_back_roundtrip() {
        let frame_w = 5;
        let data: Vec<u8> = (0..(5 * 4)).collect();
        let rect = RoiRect { x: 1, y: 1, w: 2, h: 2 };
        let mut roi = Vec::new();
        extract_roi(&data, frame_w, 1, rect, &mut roi);
        assert_eq!(roi, vec![6, 7, 11, 12]);

        let mut target = vec![0u8; 20];
        write_roi_back(&mut target, &roi, frame_w, 1, rect);
        assert_eq!(target[6], 6);
        assert_eq!(target[12], 12);
        assert_eq!(target[0], 0);
    }
}
