//! Sample transforms between the callback representation and the device's
//! fixed-point container. All of them work on interleaved samples and never
//! allocate; callers pass exactly `channels * frames` samples.

const FULL_SCALE_32: f32 = 2_147_483_648.0;
const FULL_SCALE_16: f32 = 32_768.0;

/// Scales float samples by `volume` into the 32-bit container, saturating at
/// `±i32::MAX`.
pub fn float_to_linear32(src: &[f32], dst: &mut [i32], volume: f32) {
    for (out, &sample) in dst.iter_mut().zip(src) {
        let scaled = (sample * volume * FULL_SCALE_32) as i64;
        *out = scaled.clamp(-(i32::MAX as i64), i32::MAX as i64) as i32;
    }
}

/// Capture path only, so no volume is applied.
pub fn linear32_to_float(src: &[i32], dst: &mut [f32]) {
    for (out, &sample) in dst.iter_mut().zip(src) {
        *out = (sample as f64 / FULL_SCALE_32 as f64) as f32;
    }
}

pub fn linear16_set_vol(buf: &mut [i16], volume: f32) {
    let multiplier = (volume * FULL_SCALE_16).round() as i32;
    for sample in buf.iter_mut() {
        *sample = ((*sample as i32 * multiplier) >> 15) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn float_path_never_exceeds_i32_max() {
        let src = [-4.0, -1.0, -0.5, 0.0, 0.25, 1.0, 3.5, f32::MAX];
        for volume in [0.0, 0.1, 0.5, 0.99, 1.0] {
            let mut dst = [0_i32; 8];
            float_to_linear32(&src, &mut dst, volume);
            assert!(dst.iter().all(|&s| s.unsigned_abs() <= i32::MAX as u32));
        }
    }

    #[test]
    fn float_path_is_silent_at_zero_volume() {
        let src = [1.0, -1.0, 0.75, -0.3];
        let mut dst = [7_i32; 4];
        float_to_linear32(&src, &mut dst, 0.0);
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn full_scale_saturates_symmetrically() {
        let mut dst = [0_i32; 2];
        float_to_linear32(&[1.0, -1.0], &mut dst, 1.0);
        assert_eq!(dst, [i32::MAX, -i32::MAX]);
    }

    #[test]
    fn fixed_to_float_round_trip_within_quantization() {
        let original = [0.0_f32, 0.5, -0.5, 0.123_456, -0.999, 0.000_01];
        let mut fixed = [0_i32; 6];
        let mut back = [0.0_f32; 6];
        float_to_linear32(&original, &mut fixed, 1.0);
        linear32_to_float(&fixed, &mut back);
        for (a, b) in original.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn fixed_to_float_scales_by_two_pow_31() {
        let mut out = [0.0_f32; 3];
        linear32_to_float(&[1 << 30, -(1 << 30), 0], &mut out);
        assert_abs_diff_eq!(out[0], 0.5);
        assert_abs_diff_eq!(out[1], -0.5);
        assert_abs_diff_eq!(out[2], 0.0);
    }

    #[test]
    fn sixteen_bit_gain() {
        let mut buf = [1000_i16, -1000, i16::MAX, i16::MIN];
        linear16_set_vol(&mut buf, 1.0);
        assert_eq!(buf, [1000, -1000, i16::MAX, i16::MIN]);

        linear16_set_vol(&mut buf, 0.5);
        assert_eq!(buf, [500, -500, 16383, -16384]);

        linear16_set_vol(&mut buf, 0.0);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn only_the_given_samples_are_touched() {
        let mut buf = [100_i16; 4];
        linear16_set_vol(&mut buf[..2], 0.0);
        assert_eq!(buf, [0, 0, 100, 100]);
    }
}
