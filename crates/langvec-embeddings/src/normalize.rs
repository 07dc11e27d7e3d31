//! Vector arithmetic shared by the backends.

/// Euclidean norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Add `src` into `acc` element-wise.
pub fn add_into(acc: &mut [f32], src: &[f32]) {
    for (a, s) in acc.iter_mut().zip(src) {
        *a += s;
    }
}

/// Divide every element by `count`; no-op for a zero count.
pub fn scale_mean(acc: &mut [f32], count: usize) {
    if count == 0 {
        return;
    }
    let inv = 1.0 / count as f32;
    for a in acc.iter_mut() {
        *a *= inv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_of_three_four() {
        assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(l2_norm(&[]), 0.0);
    }

    #[test]
    fn mean_of_two() {
        let mut acc = vec![0.0; 2];
        add_into(&mut acc, &[1.0, 0.0]);
        add_into(&mut acc, &[0.0, 1.0]);
        scale_mean(&mut acc, 2);
        assert_eq!(acc, vec![0.5, 0.5]);
    }
}
