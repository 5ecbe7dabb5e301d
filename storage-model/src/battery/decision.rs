use serde::{Deserialize, Serialize};

use crate::battery::Encoding;

/// Hourly battery decisions for a single day.
///
/// With [`Encoding::Split`] the values are
/// `[charge_0, .., charge_H-1, discharge_0, .., discharge_H-1]`.
/// With [`Encoding::Signed`] there is one value per hour, positive when charging and
/// negative when discharging.
///
/// The state of charge is never stored here, it is always derived from the values
/// (see [`DecisionVector::soc_trace`]) and starts empty at hour 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionVector {
    encoding: Encoding,
    values: Vec<f64>,
}

impl DecisionVector {
    /// The idle schedule: no charge and no discharge in any hour.
    pub fn zeros(encoding: Encoding, hours: usize) -> Self {
        Self {
            encoding,
            values: vec![0.0; encoding.len_for(hours)],
        }
    }

    /// Wraps raw solver values. Returns `None` for a split vector of odd length.
    pub fn from_values(encoding: Encoding, values: Vec<f64>) -> Option<Self> {
        if encoding == Encoding::Split && values.len() % 2 != 0 {
            return None;
        }
        Some(Self { encoding, values })
    }

    /// Builds a split vector from separate charge and discharge series of equal length.
    pub fn split(charge: &[f64], discharge: &[f64]) -> Option<Self> {
        if charge.len() != discharge.len() {
            return None;
        }
        let mut values = Vec::with_capacity(charge.len() * 2);
        values.extend_from_slice(charge);
        values.extend_from_slice(discharge);
        Some(Self {
            encoding: Encoding::Split,
            values,
        })
    }

    /// Builds a vector in `encoding` from per-hour charge and discharge amounts.
    ///
    /// For the signed layout each hour becomes `charge - discharge`. Extra entries in
    /// the longer of the two slices are ignored.
    pub fn from_flows(encoding: Encoding, charge: &[f64], discharge: &[f64]) -> Self {
        let hours = charge.len().min(discharge.len());
        let values = match encoding {
            Encoding::Split => charge[..hours]
                .iter()
                .chain(&discharge[..hours])
                .copied()
                .collect(),
            Encoding::Signed => charge[..hours]
                .iter()
                .zip(&discharge[..hours])
                .map(|(&c, &d)| c - d)
                .collect(),
        };
        Self { encoding, values }
    }

    pub fn signed(values: Vec<f64>) -> Self {
        Self {
            encoding: Encoding::Signed,
            values,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn hours(&self) -> usize {
        match self.encoding {
            Encoding::Split => self.values.len() / 2,
            Encoding::Signed => self.values.len(),
        }
    }

    /// Energy put into the battery per hour.
    pub fn charge(&self) -> Vec<f64> {
        match self.encoding {
            Encoding::Split => self.values[..self.hours()].to_vec(),
            Encoding::Signed => self.values.iter().map(|&x| x.max(0.0)).collect(),
        }
    }

    /// Energy taken out of the battery per hour.
    pub fn discharge(&self) -> Vec<f64> {
        match self.encoding {
            Encoding::Split => self.values[self.hours()..].to_vec(),
            Encoding::Signed => self.values.iter().map(|&x| (-x).max(0.0)).collect(),
        }
    }

    /// Net energy flow into the battery per hour (`charge - discharge`).
    pub fn net(&self) -> Vec<f64> {
        match self.encoding {
            Encoding::Split => {
                let hours = self.hours();
                self.values[..hours]
                    .iter()
                    .zip(&self.values[hours..])
                    .map(|(&charge, &discharge)| charge - discharge)
                    .collect()
            }
            Encoding::Signed => self.values.clone(),
        }
    }

    /// State of charge at the end of every hour, starting from an empty battery.
    pub fn soc_trace(&self) -> Vec<f64> {
        self.net()
            .iter()
            .scan(0.0, |soc, &net| {
                *soc += net;
                Some(*soc)
            })
            .collect()
    }

    /// Re-expresses the same schedule in another encoding.
    ///
    /// Split to signed keeps only the net flow, so an hour that both charges and
    /// discharges collapses to its difference.
    pub fn to_encoding(&self, encoding: Encoding) -> Self {
        match (self.encoding, encoding) {
            (Encoding::Split, Encoding::Signed) => Self::signed(self.net()),
            (Encoding::Signed, Encoding::Split) => {
                let mut values = self.charge();
                values.extend(self.discharge());
                Self {
                    encoding: Encoding::Split,
                    values,
                }
            }
            _ => self.clone(),
        }
    }

    pub fn total_charge(&self) -> f64 {
        self.charge().iter().sum()
    }

    pub fn total_discharge(&self) -> f64 {
        self.discharge().iter().sum()
    }

    /// True when every value is within `tolerance` of zero.
    pub fn is_idle(&self, tolerance: f64) -> bool {
        self.values.iter().all(|value| value.abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_views() {
        let decision = DecisionVector::split(&[1.0, 2.0, 0.0], &[0.0, 0.5, 2.0]).unwrap();
        assert_eq!(decision.hours(), 3);
        assert_eq!(decision.charge(), vec![1.0, 2.0, 0.0]);
        assert_eq!(decision.discharge(), vec![0.0, 0.5, 2.0]);
        assert_eq!(decision.net(), vec![1.0, 1.5, -2.0]);
        assert_eq!(decision.soc_trace(), vec![1.0, 2.5, 0.5]);
    }

    #[test]
    fn test_signed_views() {
        let decision = DecisionVector::signed(vec![3.0, -1.0, 0.0, -2.0]);
        assert_eq!(decision.hours(), 4);
        assert_eq!(decision.charge(), vec![3.0, 0.0, 0.0, 0.0]);
        assert_eq!(decision.discharge(), vec![0.0, 1.0, 0.0, 2.0]);
        assert_eq!(decision.soc_trace(), vec![3.0, 2.0, 2.0, 0.0]);
        assert_eq!(decision.total_charge(), 3.0);
        assert_eq!(decision.total_discharge(), 3.0);
    }

    #[test]
    fn test_encoding_conversion() {
        let signed = DecisionVector::signed(vec![2.0, -1.5]);
        let split = signed.to_encoding(Encoding::Split);
        assert_eq!(split.encoding(), Encoding::Split);
        assert_eq!(split.values(), &[2.0, 0.0, 0.0, 1.5]);
        assert_eq!(split.to_encoding(Encoding::Signed), signed);
    }

    #[test]
    fn test_invalid_shapes_are_rejected() {
        assert!(DecisionVector::from_values(Encoding::Split, vec![1.0, 2.0, 3.0]).is_none());
        assert!(DecisionVector::from_values(Encoding::Signed, vec![1.0, 2.0, 3.0]).is_some());
        assert!(DecisionVector::split(&[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_from_flows() {
        let split = DecisionVector::from_flows(Encoding::Split, &[1.0, 0.0], &[0.0, 1.0]);
        assert_eq!(split.values(), &[1.0, 0.0, 0.0, 1.0]);
        let signed = DecisionVector::from_flows(Encoding::Signed, &[1.0, 0.0], &[0.0, 1.0]);
        assert_eq!(signed.values(), &[1.0, -1.0]);
    }

    #[test]
    fn test_zeros_are_idle() {
        let decision = DecisionVector::zeros(Encoding::Split, 24);
        assert_eq!(decision.values().len(), 48);
        assert!(decision.is_idle(0.0));
        assert!(decision.soc_trace().iter().all(|&soc| soc == 0.0));
    }
}
