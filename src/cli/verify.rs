use crate::engine::SignOptions;
use crate::error::{CryptoNoiseError, Result};
use crate::events::EventSink;
use crate::identity::SecretKey;
use crate::latent_file::read_latent_file;
use crate::provenance::ProvenanceRecord;
use crate::tensor::Latent;
use crate::verify::{verify_latent, verify_provenance, ProvenanceCheck, VerificationReport};
use std::path::{Path, PathBuf};

/// Options for the verify command
#[derive(Debug, Clone, Default)]
pub struct VerifyFileOptions {
    pub key: String,
    /// Used when no provenance file is given
    pub sign: SignOptions,
    /// Recorded parameters override `sign` when present
    pub provenance: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct VerifyFileReport {
    pub latent: VerificationReport,
    pub provenance: Option<ProvenanceCheck>,
}

impl VerifyFileReport {
    pub fn is_match(&self) -> bool {
        self.latent.matches && self.provenance.as_ref().map_or(true, |p| p.is_valid())
    }
}

/// Regenerate the signed latent from `original_path` and compare it with `candidate_path`
pub fn verify_latent_files(
    original_path: &Path,
    candidate_path: &Path,
    options: &VerifyFileOptions,
    sink: &dyn EventSink,
) -> Result<VerifyFileReport> {
    let key = SecretKey::new(options.key.as_str());

    let (sign, provenance) = match &options.provenance {
        Some(path) => {
            let record = ProvenanceRecord::from_json(&std::fs::read_to_string(path)?)?;
            let check = verify_provenance(&record, &key);
            (options_from_record(&record, &options.sign), Some(check))
        }
        None => (options.sign.clone(), None),
    };

    let original = read_latent_file(original_path)?;
    let candidate = read_latent_file(candidate_path)?;

    let latent = match (&original, &candidate) {
        (Latent::F32(o), Latent::F32(c)) => verify_latent(o, c, &key, &sign, sink)?,
        (Latent::F64(o), Latent::F64(c)) => verify_latent(o, c, &key, &sign, sink)?,
        _ => {
            return Err(CryptoNoiseError::DTypeMismatch {
                expected: original.dtype().to_string(),
                actual: candidate.dtype().to_string(),
            })
        }
    };

    Ok(VerifyFileReport { latent, provenance })
}

fn options_from_record(record: &ProvenanceRecord, fallback: &SignOptions) -> SignOptions {
    let params = &record.crypto_parameters;
    SignOptions {
        blend: params.blend_strength,
        mode: params.shuffle_mode,
        slice_seeding: params.slice_seeding,
        generation: record.generation_parameters.clone(),
        ..fallback.clone()
    }
}

/// Human-readable verification summary
pub fn format_verification(report: &VerifyFileReport) -> String {
    let mut output = String::new();
    output.push_str("CryptoNoise Verification\n");
    output.push_str("========================\n\n");
    output.push_str(&format!("Regenerated signature: {}\n", report.latent.signature));
    output.push_str(&format!("SSIM: {:.6}\n", report.latent.ssim));
    output.push_str(&format!(
        "Mean abs difference: {:.6}\n",
        report.latent.mean_abs_difference
    ));
    output.push_str(&format!("Bit exact: {}\n", report.latent.bit_exact));
    if let Some(check) = &report.provenance {
        output.push_str(&format!("Provenance key hash: {}\n", verdict(check.key_hash_matches)));
        output.push_str(&format!("Provenance seed: {}\n", verdict(check.seed_matches)));
    }
    output.push_str(&format!(
        "\nResult: {}\n",
        if report.is_match() { "MATCH" } else { "NO MATCH" }
    ));
    output
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "match"
    } else {
        "mismatch"
    }
}
