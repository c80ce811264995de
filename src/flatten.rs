use burn::tensor::DataSerialize;

use crate::error::{Error, Result};

/// Name and shape of one trainable parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            shape: shape.into(),
        }
    }

    /// Number of scalar elements in the parameter
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Converts between an ordered set of shaped parameters and a single flat vector
///
/// Values are flattened row-major and concatenated in the order the specs were given.
/// The same order is used to split a vector back up, so `unpack(pack(x)) == x`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamFlatten {
    specs: Vec<ParamSpec>,
    total_size: usize,
}

impl ParamFlatten {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        let total_size = specs.iter().map(ParamSpec::size).sum();
        Self { specs, total_size }
    }

    /// Length of the flattened vector
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Flatten one value per parameter into a vector of length [`total_size`](Self::total_size)
    ///
    /// **Errors** with [`Error::ParamCount`] if the number of values is wrong and with
    /// [`Error::ShapeMismatch`] if any value disagrees with its recorded shape
    pub fn pack(&self, values: &[DataSerialize<f32>]) -> Result<Vec<f32>> {
        if values.len() != self.specs.len() {
            return Err(Error::ParamCount {
                expected: self.specs.len(),
                found: values.len(),
            });
        }

        let mut vec = Vec::with_capacity(self.total_size);
        for (index, (spec, value)) in self.specs.iter().zip(values).enumerate() {
            // a buffer that disagrees with its own shape is just as unusable
            let consistent = value.value.len() == value.shape.iter().product::<usize>();
            if value.shape != spec.shape || !consistent {
                return Err(Error::ShapeMismatch {
                    index,
                    name: spec.name.clone(),
                    expected: spec.shape.clone(),
                    found: value.shape.clone(),
                });
            }
            vec.extend_from_slice(&value.value);
        }

        Ok(vec)
    }

    /// Split a flat vector back into one value per parameter, restoring the recorded shapes
    ///
    /// **Errors** with [`Error::LengthMismatch`] if `vec.len()` differs from [`total_size`](Self::total_size)
    pub fn unpack(&self, vec: &[f32]) -> Result<Vec<DataSerialize<f32>>> {
        if vec.len() != self.total_size {
            return Err(Error::LengthMismatch {
                expected: self.total_size,
                found: vec.len(),
            });
        }

        let mut offset = 0;
        let values = self
            .specs
            .iter()
            .map(|spec| {
                let size = spec.size();
                let segment = vec[offset..offset + size].to_vec();
                offset += size;
                DataSerialize::new(segment, spec.shape.clone())
            })
            .collect();

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_param_flatten() -> ParamFlatten {
        ParamFlatten::new(vec![
            ParamSpec::new("w", [2, 3]),
            ParamSpec::new("b", [4]),
        ])
    }

    #[test]
    fn total_size_is_sum_of_element_counts() {
        let flatten = two_param_flatten();
        assert_eq!(flatten.total_size(), 10, "6 + 4 elements");
        assert_eq!(flatten.len(), 2, "two parameters recorded");
    }

    #[test]
    fn zero_params_pack_and_unpack() {
        let flatten = two_param_flatten();
        let zeros = vec![
            DataSerialize::new(vec![0.0; 6], vec![2, 3]),
            DataSerialize::new(vec![0.0; 4], vec![4]),
        ];

        let vec = flatten.pack(&zeros).unwrap();
        assert_eq!(vec, vec![0.0; 10], "packed into a length 10 zero vector");

        let unpacked = flatten.unpack(&vec).unwrap();
        assert_eq!(unpacked, zeros, "unpacked into the original shapes");
    }

    #[test]
    fn pack_preserves_order() {
        let flatten = two_param_flatten();
        let values = vec![
            DataSerialize::new((0..6).map(|x| x as f32).collect(), vec![2, 3]),
            DataSerialize::new(vec![10.0, 11.0, 12.0, 13.0], vec![4]),
        ];
        let vec = flatten.pack(&values).unwrap();
        assert_eq!(
            vec,
            [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 10.0, 11.0, 12.0, 13.0],
            "row-major values concatenated in order"
        );

        let repacked = flatten.pack(&flatten.unpack(&vec).unwrap()).unwrap();
        assert_eq!(repacked, vec, "pack(unpack(v)) == v");
    }

    #[test]
    fn pack_rejects_wrong_shape() {
        let flatten = two_param_flatten();
        let values = vec![
            DataSerialize::new(vec![0.0; 6], vec![3, 2]),
            DataSerialize::new(vec![0.0; 4], vec![4]),
        ];
        match flatten.pack(&values) {
            Err(Error::ShapeMismatch { index, found, .. }) => {
                assert_eq!(index, 0, "first parameter reported");
                assert_eq!(found, vec![3, 2], "offending shape reported");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn pack_rejects_inconsistent_buffer() {
        let flatten = two_param_flatten();
        let values = vec![
            DataSerialize::new(vec![0.0; 6], vec![2, 3]),
            DataSerialize::new(vec![0.0; 3], vec![4]),
        ];
        assert!(
            matches!(flatten.pack(&values), Err(Error::ShapeMismatch { index: 1, .. })),
            "buffer shorter than its shape is rejected"
        );
    }

    #[test]
    fn pack_rejects_wrong_count() {
        let flatten = two_param_flatten();
        let values = vec![DataSerialize::new(vec![0.0; 6], vec![2, 3])];
        assert!(
            matches!(
                flatten.pack(&values),
                Err(Error::ParamCount {
                    expected: 2,
                    found: 1
                })
            ),
            "missing parameter is rejected"
        );
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        let flatten = two_param_flatten();
        assert!(
            matches!(
                flatten.unpack(&[0.0; 9]),
                Err(Error::LengthMismatch {
                    expected: 10,
                    found: 9
                })
            ),
            "short vector is rejected"
        );
        assert!(
            flatten.unpack(&[0.0; 11]).is_err(),
            "long vector is rejected"
        );
    }
}
