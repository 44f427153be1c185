use crate::error::{CryptoNoiseError, Result};
use crate::tensor::{DType, Device, Element, Latent, Shape, Tensor};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Magic bytes for the latent file format
const LATENT_MAGIC: &[u8; 4] = b"CNL\x01";

/// Current header version
pub const LATENT_FORMAT_VERSION: u32 = 1;

/// Upper bound on the JSON header, guards against garbage lengths
const MAX_HEADER_LEN: usize = 64 * 1024;

/// Latent file header - JSON, describes geometry only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentHeader {
    pub version: u32,
    pub shape: Shape,
    pub dtype: DType,
    #[serde(default)]
    pub device: Device,
}

impl LatentHeader {
    pub fn for_latent(latent: &Latent) -> Self {
        Self {
            version: LATENT_FORMAT_VERSION,
            shape: latent.shape(),
            dtype: latent.dtype(),
            device: latent.device().clone(),
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.shape.numel() * self.dtype.size_bytes()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = serde_json::from_slice(bytes)?;
        if header.version != LATENT_FORMAT_VERSION {
            return Err(CryptoNoiseError::InvalidFormat(format!(
                "Unsupported latent file version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// Write a latent to disk (creates new file or overwrites)
/// Layout: [magic: 4][header_len: 4 LE][header JSON][elements LE, row-major]
pub fn write_latent_file(path: &Path, latent: &Latent) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(LATENT_MAGIC)?;

    let header_bytes = LatentHeader::for_latent(latent).to_bytes()?;
    writer.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&header_bytes)?;

    let payload = match latent {
        Latent::F32(t) => encode_elements(t),
        Latent::F64(t) => encode_elements(t),
    };
    writer.write_all(&payload)?;

    writer.flush()?;
    Ok(())
}

/// Read a latent from disk
pub fn read_latent_file(path: &Path) -> Result<Latent> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let header = read_header(&mut reader)?;

    // Check the declared size against the file before allocating for it
    let available = file_len.saturating_sub(reader.stream_position()?);
    if available != header.payload_len() as u64 {
        return Err(CryptoNoiseError::InvalidFormat(format!(
            "Payload is {} bytes, header {} × {} needs {}",
            available,
            header.shape,
            header.dtype,
            header.payload_len()
        )));
    }

    let mut payload = Vec::with_capacity(header.payload_len());
    reader.read_to_end(&mut payload)?;
    if payload.len() != header.payload_len() {
        return Err(CryptoNoiseError::InvalidFormat(format!(
            "Payload is {} bytes, header {} × {} needs {}",
            payload.len(),
            header.shape,
            header.dtype,
            header.payload_len()
        )));
    }

    Ok(match header.dtype {
        DType::F32 => Latent::F32(decode_elements(&header, &payload)?),
        DType::F64 => Latent::F64(decode_elements(&header, &payload)?),
    })
}

/// Read just the header from a latent file (without loading the payload)
pub fn read_latent_header(path: &Path) -> Result<LatentHeader> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_header(&mut reader)
}

fn read_header<R: Read>(reader: &mut R) -> Result<LatentHeader> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != LATENT_MAGIC {
        return Err(CryptoNoiseError::InvalidFormat(
            "Invalid latent magic bytes".into(),
        ));
    }

    let mut header_len_bytes = [0u8; 4];
    reader.read_exact(&mut header_len_bytes)?;
    let header_len = u32::from_le_bytes(header_len_bytes) as usize;
    if header_len > MAX_HEADER_LEN {
        return Err(CryptoNoiseError::InvalidFormat(format!(
            "Header length {} exceeds {}",
            header_len, MAX_HEADER_LEN
        )));
    }

    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes)?;
    LatentHeader::from_bytes(&header_bytes)
}

fn encode_elements<T: Element>(tensor: &Tensor<T>) -> Vec<u8> {
    let mut out = Vec::with_capacity(tensor.data().len() * T::DTYPE.size_bytes());
    for &value in tensor.data() {
        value.write_le(&mut out);
    }
    out
}

fn decode_elements<T: Element>(header: &LatentHeader, payload: &[u8]) -> Result<Tensor<T>> {
    let data = payload
        .chunks_exact(T::DTYPE.size_bytes())
        .map(T::read_le)
        .collect();
    Tensor::new(header.shape, header.device.clone(), data)
}
