use crate::engine::{sign_any, Diagnostics, SignOptions, Signature};
use crate::error::Result;
use crate::events::EventSink;
use crate::identity::SecretKey;
use crate::latent_file::{read_latent_file, write_latent_file};
use crate::provenance::ProvenanceRecord;
use std::path::{Path, PathBuf};

/// Options for the sign command
#[derive(Debug, Clone, Default)]
pub struct SignFileOptions {
    pub key: String,
    pub sign: SignOptions,
    /// Where to write the provenance JSON, if anywhere
    pub provenance: Option<PathBuf>,
}

/// What the sign command produced
#[derive(Debug, Clone)]
pub struct SignFileReport {
    pub signature: Signature,
    pub provenance: Option<ProvenanceRecord>,
    pub diagnostics: Option<Diagnostics>,
}

/// Sign the latent at `input_path` and write the result to `output_path`
/// Signing problems never fail the command: the input is copied through
/// and the report carries the `error` label. Only I/O errors propagate.
pub fn sign_latent_file(
    input_path: &Path,
    output_path: &Path,
    options: &SignFileOptions,
    sink: &dyn EventSink,
) -> Result<SignFileReport> {
    let latent = read_latent_file(input_path)?;
    let key = SecretKey::new(options.key.as_str());

    let outcome = sign_any(&latent, &key, &options.sign, sink);
    write_latent_file(output_path, &outcome.latent)?;

    if let Some(path) = &options.provenance {
        // Unsigned runs still leave a file so host workflows see a stable artifact
        let json = match &outcome.provenance {
            Some(record) => record.to_json()?,
            None => "{}".to_string(),
        };
        std::fs::write(path, json)?;
    }

    Ok(SignFileReport {
        signature: outcome.signature,
        provenance: outcome.provenance,
        diagnostics: outcome.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::create::{create_noise_latent, CreateOptions};
    use crate::events::NullSink;
    use crate::latent_file::read_latent_file;
    use crate::params::BlendRatio;
    use tempfile::tempdir;

    #[test]
    fn test_sign_latent_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cnl");
        let output = dir.path().join("out.cnl");
        let provenance = dir.path().join("provenance.json");
        create_noise_latent(&input, 3, &CreateOptions::default()).unwrap();

        let options = SignFileOptions {
            key: "alice".into(),
            provenance: Some(provenance.clone()),
            ..Default::default()
        };
        let report = sign_latent_file(&input, &output, &options, &NullSink).unwrap();
        assert_eq!(report.signature.to_string(), "CN-2bd806c97f0e00af");

        let json = std::fs::read_to_string(&provenance).unwrap();
        let record = ProvenanceRecord::from_json(&json).unwrap();
        assert_eq!(record.crypto_parameters.crypto_seed, 2_131_624_111);

        assert_ne!(read_latent_file(&input).unwrap(), read_latent_file(&output).unwrap());
    }

    #[test]
    fn test_sign_latent_file_disabled() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cnl");
        let output = dir.path().join("out.cnl");
        let provenance = dir.path().join("provenance.json");
        create_noise_latent(&input, 3, &CreateOptions::default()).unwrap();

        let options = SignFileOptions {
            key: "alice".into(),
            sign: SignOptions {
                blend: BlendRatio::OFF,
                ..Default::default()
            },
            provenance: Some(provenance.clone()),
        };
        let report = sign_latent_file(&input, &output, &options, &NullSink).unwrap();
        assert_eq!(report.signature, Signature::Unsigned);
        assert_eq!(std::fs::read_to_string(&provenance).unwrap(), "{}");
        assert_eq!(std::fs::read(&input).unwrap(), std::fs::read(&output).unwrap());
    }

    #[test]
    fn test_sign_latent_file_missing_input() {
        let dir = tempdir().unwrap();
        let result = sign_latent_file(
            &dir.path().join("missing.cnl"),
            &dir.path().join("out.cnl"),
            &SignFileOptions::default(),
            &NullSink,
        );
        assert!(result.is_err());
    }
}
