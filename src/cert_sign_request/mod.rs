use const_oid::{db::rfc5280::ID_KP_SERVER_AUTH, AssociatedOid, ObjectIdentifier};
use der::Encode;
use rcgen::{CertificateParams, CustomExtension, KeyPair};
use thiserror::Error;
use x509_cert::ext::pkix::{ExtendedKeyUsage, KeyUsage, KeyUsages};

use self::{dn::Subject, san::AltNames};

pub mod dn;
pub mod san;

#[derive(Debug, Error)]
pub enum CertError {
    #[error("the subject is empty, at least one field is needed")]
    EmptySubject,
    #[error("{0:?} can't be encoded as a DNS name")]
    InvalidDnsName(String),
    #[error("can't encode the {0} extension")]
    Encode(&'static str, #[source] der::Error),
    #[error("can't sign the request")]
    Sign(#[from] rcgen::Error),
}

fn oid_arcs(oid: ObjectIdentifier) -> Vec<u64> {
    oid.arcs().map(u64::from).collect()
}

/// Key Usage: digitalSignature and keyEncipherment, nothing else.
pub fn key_usage_extension() -> Result<CustomExtension, CertError> {
    let usage = KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment);
    let content = usage
        .to_der()
        .map_err(|err| CertError::Encode("key usage", err))?;
    let mut ext = CustomExtension::from_oid_content(&oid_arcs(KeyUsage::OID), content);
    ext.set_criticality(false);
    Ok(ext)
}

/// Extended Key Usage: TLS server authentication only.
pub fn extended_key_usage_extension() -> Result<CustomExtension, CertError> {
    let usage = ExtendedKeyUsage(vec![ID_KP_SERVER_AUTH]);
    let content = usage
        .to_der()
        .map_err(|err| CertError::Encode("extended key usage", err))?;
    let mut ext =
        CustomExtension::from_oid_content(&oid_arcs(ExtendedKeyUsage::OID), content);
    ext.set_criticality(false);
    Ok(ext)
}

/// Everything a request is made of before it gets signed.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    subject: Subject,
    alt_names: AltNames,
}

impl RequestBuilder {
    pub fn new(subject: Subject, alt_names: AltNames) -> Self {
        Self { subject, alt_names }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn alt_names(&self) -> &AltNames {
        &self.alt_names
    }

    pub fn params(&self) -> Result<CertificateParams, CertError> {
        if self.subject.is_empty() {
            return Err(CertError::EmptySubject);
        }
        let mut params = CertificateParams::default();
        params.distinguished_name = (&self.subject).into();
        params.subject_alt_names = self.alt_names.to_san_types()?;
        // rcgen marks key usage critical, so both usages go in as custom
        // extensions instead.
        params.custom_extensions =
            vec![key_usage_extension()?, extended_key_usage_extension()?];
        Ok(params)
    }

    /// Signs with SHA-256 and returns the request as PEM.
    pub fn sign(&self, key: &KeyPair) -> Result<String, CertError> {
        let params = self.params()?;
        let csr = params.serialize_request(key)?;
        Ok(csr.pem()?)
    }
}
