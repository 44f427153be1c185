//! Dense 4-D latent tensors with axes (batch, channel, height, width).
//!
//! The engine never interprets the device tag; it is carried from input to
//! output so the host can place the result where the input came from.

use crate::error::{CryptoNoiseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Element type of a latent tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

impl std::str::FromStr for DType {
    type Err = CryptoNoiseError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "f32" | "float32" | "float" => Ok(Self::F32),
            "f64" | "float64" | "double" => Ok(Self::F64),
            _ => Err(CryptoNoiseError::UnsupportedDType(s.to_string())),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// Compute location tag, preserved through every transformation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    /// Named accelerator, e.g. `cuda:0` or `mps`
    Accelerator(String),
}

impl From<String> for Device {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("cpu") || s.is_empty() {
            Self::Cpu
        } else {
            Self::Accelerator(s)
        }
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

impl std::str::FromStr for Device {
    type Err = CryptoNoiseError;
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::from(s.trim().to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Accelerator(name) => write!(f, "{}", name),
        }
    }
}

/// Tensor geometry (B, C, H, W)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 4]", into = "[usize; 4]")]
pub struct Shape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    /// Create a shape; every axis must be non-zero
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Result<Self> {
        if batch == 0 || channels == 0 || height == 0 || width == 0 {
            return Err(CryptoNoiseError::InvalidShape(format!(
                "{}x{}x{}x{} has an empty axis",
                batch, channels, height, width
            )));
        }
        // Payload bytes at the widest dtype must fit in usize
        let bytes = [batch, channels, height, width, DType::F64.size_bytes()]
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n));
        if bytes.is_none() {
            return Err(CryptoNoiseError::InvalidShape(format!(
                "{}x{}x{}x{} is too large",
                batch, channels, height, width
            )));
        }
        Ok(Self {
            batch,
            channels,
            height,
            width,
        })
    }

    /// Total number of elements
    pub fn numel(&self) -> usize {
        self.batch * self.channels * self.slice_len()
    }

    /// Elements in one (batch, channel) plane
    pub fn slice_len(&self) -> usize {
        self.height * self.width
    }

    /// Number of (batch, channel) planes
    pub fn slice_count(&self) -> usize {
        self.batch * self.channels
    }

    pub fn dims(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}

impl TryFrom<[usize; 4]> for Shape {
    type Error = CryptoNoiseError;
    fn try_from(dims: [usize; 4]) -> Result<Self> {
        Self::new(dims[0], dims[1], dims[2], dims[3])
    }
}

impl From<Shape> for [usize; 4] {
    fn from(shape: Shape) -> Self {
        shape.dims()
    }
}

impl std::str::FromStr for Shape {
    type Err = CryptoNoiseError;
    /// Parses `B,C,H,W` or `BxCxHxW`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(|c| c == ',' || c == 'x' || c == '×').collect();
        if parts.len() != 4 {
            return Err(CryptoNoiseError::InvalidShape(format!(
                "expected 4 axes, got '{}'",
                s
            )));
        }
        let mut dims = [0usize; 4];
        for (dim, part) in dims.iter_mut().zip(parts) {
            *dim = part
                .trim()
                .parse()
                .map_err(|_| CryptoNoiseError::InvalidShape(format!("bad axis '{}'", part)))?;
        }
        Self::try_from(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}×{}×{}×{}",
            self.batch, self.channels, self.height, self.width
        )
    }
}

/// Float element types a latent may hold
pub trait Element:
    Copy
    + Default
    + PartialEq
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    const DTYPE: DType;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
    /// Append the little-endian encoding to `out`
    fn write_le(self, out: &mut Vec<u8>);
    /// Decode from exactly `DTYPE.size_bytes()` little-endian bytes
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }
        }
    };
}

impl_element!(f32, DType::F32);
impl_element!(f64, DType::F64);

/// Row-major (B, C, H, W) tensor
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: Element> {
    shape: Shape,
    device: Device,
    data: Vec<T>,
}

impl<T: Element> Tensor<T> {
    /// Wrap existing data; the length must match the shape
    pub fn new(shape: Shape, device: Device, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(CryptoNoiseError::DataLength {
                shape: shape.to_string(),
                expected: shape.numel(),
                actual: data.len(),
            });
        }
        Ok(Self {
            shape,
            device,
            data,
        })
    }

    pub fn zeros(shape: Shape, device: Device) -> Self {
        Self {
            shape,
            device,
            data: vec![T::default(); shape.numel()],
        }
    }

    /// Caller guarantees `data.len() == shape.numel()`
    pub(crate) fn from_parts(shape: Shape, device: Device, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), shape.numel());
        Self {
            shape,
            device,
            data,
        }
    }

    /// Same shape and device as `self`, new contents
    pub(crate) fn with_data(&self, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            shape: self.shape,
            device: self.device.clone(),
            data,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// The H×W plane at (batch, channel)
    pub fn slice(&self, batch: usize, channel: usize) -> &[T] {
        let len = self.shape.slice_len();
        let start = (batch * self.shape.channels + channel) * len;
        &self.data[start..start + len]
    }

    /// Mean of |self - other| over all elements
    pub fn mean_abs_diff(&self, other: &Tensor<T>) -> Result<f64> {
        ensure_same_shape(self, other)?;
        if self.data.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a.to_f64() - b.to_f64()).abs())
            .sum();
        Ok(total / self.data.len() as f64)
    }

    /// Bitwise equality including shape and device
    pub fn bit_eq(&self, other: &Tensor<T>) -> bool {
        self.shape == other.shape
            && self.device == other.device
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_f64().to_bits() == b.to_f64().to_bits())
    }
}

pub(crate) fn ensure_same_shape<T: Element>(a: &Tensor<T>, b: &Tensor<T>) -> Result<()> {
    if a.shape != b.shape {
        return Err(CryptoNoiseError::ShapeMismatch {
            expected: a.shape.to_string(),
            actual: b.shape.to_string(),
        });
    }
    Ok(())
}

/// A latent of either supported dtype, as read from disk
#[derive(Debug, Clone, PartialEq)]
pub enum Latent {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
}

impl Latent {
    pub fn zeros(shape: Shape, dtype: DType, device: Device) -> Self {
        match dtype {
            DType::F32 => Self::F32(Tensor::zeros(shape, device)),
            DType::F64 => Self::F64(Tensor::zeros(shape, device)),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::F32(t) => t.shape(),
            Self::F64(t) => t.shape(),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
        }
    }

    pub fn device(&self) -> &Device {
        match self {
            Self::F32(t) => t.device(),
            Self::F64(t) => t.device(),
        }
    }
}

impl From<Tensor<f32>> for Latent {
    fn from(t: Tensor<f32>) -> Self {
        Self::F32(t)
    }
}

impl From<Tensor<f64>> for Latent {
    fn from(t: Tensor<f64>) -> Self {
        Self::F64(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_parse() {
        let shape: Shape = "1,4,64,64".parse().unwrap();
        assert_eq!(shape.dims(), [1, 4, 64, 64]);
        assert_eq!(shape.numel(), 16384);
        assert_eq!(shape.slice_count(), 4);

        let shape: Shape = "2x4x8x16".parse().unwrap();
        assert_eq!(shape.dims(), [2, 4, 8, 16]);

        assert!("1,4,64".parse::<Shape>().is_err());
        assert!("1,0,64,64".parse::<Shape>().is_err());
        assert!("1,a,64,64".parse::<Shape>().is_err());
    }

    #[test]
    fn test_shape_rejects_overflowing_size() {
        assert!(matches!(
            Shape::new(65536, 65536, 65536, 65536),
            Err(CryptoNoiseError::InvalidShape(_))
        ));
        // Element count fits but the f64 payload would not
        #[cfg(target_pointer_width = "64")]
        assert!(Shape::new(1, 1, 1 << 32, 1 << 30).is_err());
        assert!(serde_json::from_str::<Shape>("[65536,65536,65536,65536]").is_err());
        assert!(Shape::new(1, 4, 128, 128).is_ok());
    }

    #[test]
    fn test_tensor_rejects_wrong_length() {
        let shape = Shape::new(1, 1, 2, 2).unwrap();
        assert!(Tensor::new(shape, Device::Cpu, vec![0.0f32; 3]).is_err());
        assert!(Tensor::new(shape, Device::Cpu, vec![0.0f32; 4]).is_ok());
    }

    #[test]
    fn test_slice_indexing() {
        let shape = Shape::new(2, 3, 2, 2).unwrap();
        let data: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let t = Tensor::new(shape, Device::Cpu, data).unwrap();
        assert_eq!(t.slice(0, 0), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.slice(1, 2), &[20.0, 21.0, 22.0, 23.0]);
    }

    #[test]
    fn test_device_roundtrip() {
        let cuda: Device = "cuda:0".parse().unwrap();
        assert_eq!(cuda, Device::Accelerator("cuda:0".into()));
        assert_eq!(cuda.to_string(), "cuda:0");
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);

        let json = serde_json::to_string(&cuda).unwrap();
        assert_eq!(json, "\"cuda:0\"");
    }

    #[test]
    fn test_shape_serializes_as_list() {
        let shape = Shape::new(1, 4, 64, 64).unwrap();
        assert_eq!(serde_json::to_string(&shape).unwrap(), "[1,4,64,64]");
        assert!(serde_json::from_str::<Shape>("[1,0,64,64]").is_err());
    }

    #[test]
    fn test_mean_abs_diff() {
        let shape = Shape::new(1, 1, 1, 4).unwrap();
        let a = Tensor::new(shape, Device::Cpu, vec![0.0f64, 1.0, 2.0, 3.0]).unwrap();
        let b = Tensor::new(shape, Device::Cpu, vec![1.0f64, 1.0, 0.0, 3.0]).unwrap();
        assert!((a.mean_abs_diff(&b).unwrap() - 0.75).abs() < 1e-12);

        let other = Tensor::<f64>::zeros(Shape::new(1, 1, 2, 2).unwrap(), Device::Cpu);
        assert!(a.mean_abs_diff(&other).is_err());
    }

    #[test]
    fn test_element_le_encoding() {
        let mut buf = Vec::new();
        1.5f32.write_le(&mut buf);
        assert_eq!(buf.len(), 4);
        assert_eq!(f32::read_le(&buf), 1.5);

        buf.clear();
        (-2.25f64).write_le(&mut buf);
        assert_eq!(f64::read_le(&buf), -2.25);
    }
}
