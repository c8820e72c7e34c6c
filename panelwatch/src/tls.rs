//! Custom CA bundles for panels and wings nodes behind self-signed certificates.

use std::{
    fs,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use rustls::{pki_types::CertificateDer, ClientConfig, RootCertStore};

use crate::error::TlsError;

/// A PEM bundle read once and shared by the REST client and the socket connector.
#[derive(Debug, Clone)]
pub struct CaBundle {
    path: PathBuf,
    certs: Vec<CertificateDer<'static>>,
}

impl CaBundle {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TlsError> {
        let path = path.as_ref().to_path_buf();
        let pem = fs::read(&path).map_err(|e| TlsError::Read(path.clone(), e))?;
        let certs = rustls_pemfile::certs(&mut BufReader::new(pem.as_slice()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Read(path.clone(), e))?;
        if certs.is_empty() {
            return Err(TlsError::Empty(path));
        }
        Ok(Self { path, certs })
    }

    /// rustls client config trusting only this bundle.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, TlsError> {
        let mut roots = RootCertStore::empty();
        for cert in &self.certs {
            roots
                .add(cert.clone())
                .map_err(|e| TlsError::Rustls(self.path.clone(), e))?;
        }
        let cfg = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();
        Ok(Arc::new(cfg))
    }

    pub fn reqwest_certificates(&self) -> Result<Vec<reqwest::Certificate>, TlsError> {
        self.certs
            .iter()
            .map(|c| {
                reqwest::Certificate::from_der(c.as_ref())
                    .map_err(|e| TlsError::Config(e.to_string()))
            })
            .collect()
    }
}
