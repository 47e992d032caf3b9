//! Reduction of sub-daily station samples into daily values

/// Samples of one measurement collected over a day
#[derive(Debug, Default, Clone)]
pub struct Samples {
    values: Vec<f64>,
}

impl Samples {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.values.push(v);
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn sum(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum())
    }
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * 0.44704
}

pub fn inches_to_mm(inches: f64) -> f64 {
    inches * 25.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_samples_reduce_to_none() {
        let samples = Samples::default();
        assert_eq!(samples.max(), None);
        assert_eq!(samples.mean(), None);
        assert_eq!(samples.sum(), None);
    }

    #[test]
    fn test_reductions_skip_missing_and_non_finite() {
        let mut samples = Samples::default();
        for v in [Some(1.0), None, Some(3.0), Some(f64::NAN), Some(2.0)] {
            samples.push(v);
        }
        assert_eq!(samples.max(), Some(3.0));
        assert_eq!(samples.min(), Some(1.0));
        assert_eq!(samples.mean(), Some(2.0));
        assert_eq!(samples.sum(), Some(6.0));
    }

    #[test]
    fn test_unit_conversions() {
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-9);
        assert!((mph_to_mps(10.0) - 4.4704).abs() < 1e-9);
        assert!((inches_to_mm(1.0) - 25.4).abs() < 1e-9);
    }
}
