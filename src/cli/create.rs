use crate::error::Result;
use crate::latent_file::write_latent_file;
use crate::pipeline::synthesize_noise;
use crate::tensor::{DType, Device, Latent, Shape};
use std::path::Path;

/// Options for the empty and noise commands
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub shape: Shape,
    pub dtype: DType,
    pub device: Device,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            // SD 1.x latent for a 512×512 image
            shape: Shape {
                batch: 1,
                channels: 4,
                height: 64,
                width: 64,
            },
            dtype: DType::F32,
            device: Device::Cpu,
        }
    }
}

/// Write an all-zero latent
pub fn create_empty_latent(output_path: &Path, options: &CreateOptions) -> Result<Shape> {
    let latent = Latent::zeros(options.shape, options.dtype, options.device.clone());
    write_latent_file(output_path, &latent)?;
    Ok(options.shape)
}

/// Write a standard-normal latent drawn from `seed`
pub fn create_noise_latent(output_path: &Path, seed: u64, options: &CreateOptions) -> Result<Shape> {
    let device = options.device.clone();
    let latent = match options.dtype {
        DType::F32 => Latent::F32(synthesize_noise(seed, options.shape, device)),
        DType::F64 => Latent::F64(synthesize_noise(seed, options.shape, device)),
    };
    write_latent_file(output_path, &latent)?;
    Ok(options.shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent_file::read_latent_file;
    use tempfile::tempdir;

    #[test]
    fn test_create_empty_latent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.cnl");
        create_empty_latent(&path, &CreateOptions::default()).unwrap();

        match read_latent_file(&path).unwrap() {
            Latent::F32(t) => {
                assert_eq!(t.shape().dims(), [1, 4, 64, 64]);
                assert!(t.data().iter().all(|&v| v == 0.0));
            }
            other => panic!("unexpected dtype {:?}", other.dtype()),
        }
    }

    #[test]
    fn test_create_noise_latent_is_reproducible() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.cnl");
        let b = dir.path().join("b.cnl");
        let options = CreateOptions {
            dtype: DType::F64,
            ..Default::default()
        };
        create_noise_latent(&a, 7, &options).unwrap();
        create_noise_latent(&b, 7, &options).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }
}
