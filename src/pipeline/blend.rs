use crate::error::Result;
use crate::params::BlendRatio;
use crate::tensor::{ensure_same_shape, Element, Tensor};

/// `original * (1 - r) + shuffled * r`, element-wise
///
/// At `r == 1` the shuffled values are returned bit for bit.
pub fn blend<T: Element>(
    original: &Tensor<T>,
    shuffled: &Tensor<T>,
    ratio: BlendRatio,
) -> Result<Tensor<T>> {
    ensure_same_shape(original, shuffled)?;

    let r = ratio.value();
    if r >= 1.0 {
        return Ok(original.with_data(shuffled.data().to_vec()));
    }

    let keep = T::from_f64(1.0 - r);
    let mix = T::from_f64(r);
    let data = original
        .data()
        .iter()
        .zip(shuffled.data())
        .map(|(&o, &s)| o * keep + s * mix)
        .collect();

    // Output follows the original's device
    Ok(original.with_data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Device, Shape};

    fn pair() -> (Tensor<f64>, Tensor<f64>) {
        let shape = Shape::new(1, 1, 2, 2).unwrap();
        let a = Tensor::new(shape, Device::Cpu, vec![0.0, 1.0, 2.0, -4.0]).unwrap();
        let b = Tensor::new(shape, Device::Cpu, vec![4.0, -1.0, 2.0, 0.5]).unwrap();
        (a, b)
    }

    #[test]
    fn test_blend_linearity() {
        let (a, b) = pair();
        for r in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let out = blend(&a, &b, BlendRatio::new(r).unwrap()).unwrap();
            for ((o, x), y) in out.data().iter().zip(a.data()).zip(b.data()) {
                assert!((o - (x * (1.0 - r) + y * r)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_blend_endpoints_exact() {
        let (a, b) = pair();
        assert!(blend(&a, &b, BlendRatio::OFF).unwrap().bit_eq(&a));
        assert!(blend(&a, &b, BlendRatio::FULL).unwrap().bit_eq(&b));
    }

    #[test]
    fn test_blend_rejects_shape_mismatch() {
        let (a, _) = pair();
        let c = Tensor::<f64>::zeros(Shape::new(1, 1, 1, 4).unwrap(), Device::Cpu);
        assert!(blend(&a, &c, BlendRatio::default()).is_err());
    }

    #[test]
    fn test_blend_keeps_original_device() {
        let shape = Shape::new(1, 1, 1, 2).unwrap();
        let gpu = Device::Accelerator("cuda:1".into());
        let a = Tensor::new(shape, gpu.clone(), vec![1.0f32, 2.0]).unwrap();
        let b = Tensor::new(shape, Device::Cpu, vec![3.0f32, 4.0]).unwrap();
        let out = blend(&a, &b, BlendRatio::FULL).unwrap();
        assert_eq!(out.device(), &gpu);
        assert_eq!(out.data(), &[3.0, 4.0]);
    }
}
