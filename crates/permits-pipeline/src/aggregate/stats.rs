//! Order statistics over approval durations.

/// The `q` quantile of ascending `sorted`, interpolating linearly between
/// the two nearest order statistics. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
  let last = sorted.len().checked_sub(1)?;
  let pos = q.clamp(0.0, 1.0) * last as f64;
  let lo = pos.floor() as usize;
  let hi = pos.ceil() as usize;
  let frac = pos - lo as f64;
  Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(sorted: &[f64]) -> Option<f64> { quantile(sorted, 0.5) }

pub fn mean(values: &[f64]) -> Option<f64> {
  (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_has_no_statistics() {
    assert_eq!(median(&[]), None);
    assert_eq!(quantile(&[], 0.9), None);
    assert_eq!(mean(&[]), None);
  }

  #[test]
  fn median_interpolates_even_lengths() {
    assert_eq!(median(&[5.0]), Some(5.0));
    assert_eq!(median(&[1.0, 2.0, 10.0]), Some(2.0));
    assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), Some(2.5));
  }

  #[test]
  fn p90_interpolates() {
    let v: Vec<f64> = (1..=10).map(f64::from).collect();
    let p90 = quantile(&v, 0.9).unwrap();
    assert!((p90 - 9.1).abs() < 1e-9);
    assert_eq!(quantile(&v, 0.0), Some(1.0));
    assert_eq!(quantile(&v, 1.0), Some(10.0));
  }

  #[test]
  fn mean_of_values() {
    assert_eq!(mean(&[1.0, 2.0, 4.0]), Some(7.0 / 3.0));
  }
}
