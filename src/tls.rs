//! TLS material loading for the HTTPS listener.
//!
//! CERT and KEY each accept either a PEM file path or inline PEM text (a
//! value containing `-----BEGIN` is used verbatim). Without explicit
//! material, a self-signed "localhost" certificate is generated on the fly;
//! config validation has already guaranteed the host is loopback in that
//! case.

use crate::config::TlsMaterial;
use crate::error::{ConfigError, Result, ServeError};
use axum_server::tls_rustls::RustlsConfig;

const PEM_MARKER: &str = "-----BEGIN";

/// Resolve a CERT/KEY option value to PEM bytes.
///
/// `field` is the option name, used in error messages.
pub fn load_pem(field: &str, value: &str) -> Result<Vec<u8>> {
    if value.contains(PEM_MARKER) {
        return Ok(value.as_bytes().to_vec());
    }
    let text = std::fs::read_to_string(value).map_err(|e| {
        ServeError::Tls(format!(
            "Failure reading the {field} path {value:?}: {e}"
        ))
    })?;
    if !text.contains(PEM_MARKER) {
        return Err(ConfigError::InvalidPem {
            field: field.to_string(),
        }
        .into());
    }
    Ok(text.into_bytes())
}

/// Generate a self-signed certificate for localhost.
///
/// Returns (certificate PEM, key PEM).
pub fn self_signed_localhost() -> Result<(Vec<u8>, Vec<u8>)> {
    let names = vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "::1".to_string(),
    ];
    let certified = rcgen::generate_simple_self_signed(names)
        .map_err(|e| ServeError::Tls(format!("Failed to generate a localhost certificate: {e}")))?;
    Ok((
        certified.cert.pem().into_bytes(),
        certified.key_pair.serialize_pem().into_bytes(),
    ))
}

/// Build the rustls server configuration from the configured material.
pub async fn rustls_config(material: &TlsMaterial) -> Result<RustlsConfig> {
    let (cert, key) = match material {
        TlsMaterial::Pem { cert, key } => {
            tracing::info!("Reading the certificate from CERT and KEY");
            (load_pem("CERT", cert)?, load_pem("KEY", key)?)
        }
        TlsMaterial::LocalProvider => {
            tracing::info!("Generating a self-signed certificate for \"localhost\"");
            self_signed_localhost()?
        }
    };
    RustlsConfig::from_pem(cert, key)
        .await
        .map_err(|e| ServeError::Tls(format!("Invalid certificate or key material: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_pem_used_verbatim() {
        let inline = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";
        let bytes = load_pem("CERT", inline).unwrap();
        assert_eq!(bytes, inline.as_bytes());
    }

    #[test]
    fn test_pem_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        let pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";
        std::fs::write(&path, pem).unwrap();

        let bytes = load_pem("CERT", path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, pem.as_bytes());
    }

    #[test]
    fn test_non_pem_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        std::fs::write(&path, "not a certificate").unwrap();

        let err = load_pem("CERT", path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("CERT"));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = load_pem("KEY", "/no/such/key.pem").unwrap_err();
        assert!(err.to_string().contains("KEY"));
    }

    #[test]
    fn test_self_signed_material_is_pem() {
        let (cert, key) = self_signed_localhost().unwrap();
        assert!(String::from_utf8(cert).unwrap().contains("BEGIN CERTIFICATE"));
        assert!(String::from_utf8(key).unwrap().contains("PRIVATE KEY"));
    }
}
