use crate::error::Result;
use crate::latent_file::{read_latent_file, read_latent_header};
use crate::tensor::{Element, Latent, Tensor};
use std::path::Path;

/// Display information about a latent file
pub fn show_info(path: &Path) -> Result<String> {
    let header = read_latent_header(path)?;

    let mut output = String::new();

    output.push_str("CryptoNoise Latent Information\n");
    output.push_str("==============================\n\n");

    output.push_str(&format!("File: {}\n", path.display()));
    output.push_str(&format!("Version: {}\n", header.version));
    output.push_str("\n");

    output.push_str("Tensor:\n");
    output.push_str(&format!("  Shape: {}\n", header.shape));
    output.push_str(&format!("  Dtype: {}\n", header.dtype));
    output.push_str(&format!("  Device: {}\n", header.device));
    output.push_str(&format!("  Elements: {}\n", header.shape.numel()));
    output.push_str(&format!("  Payload: {}\n", format_size(header.payload_len() as u64)));
    output.push_str("\n");

    let (mean, std) = match read_latent_file(path)? {
        Latent::F32(t) => moments(&t),
        Latent::F64(t) => moments(&t),
    };
    output.push_str("Statistics:\n");
    output.push_str(&format!("  Mean: {:.6}\n", mean));
    output.push_str(&format!("  Std: {:.6}\n", std));

    Ok(output)
}

fn moments<T: Element>(tensor: &Tensor<T>) -> (f64, f64) {
    let n = tensor.data().len() as f64;
    let mean = tensor.data().iter().map(|v| v.to_f64()).sum::<f64>() / n;
    let var = tensor
        .data()
        .iter()
        .map(|v| (v.to_f64() - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
