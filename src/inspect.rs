//! Reads a request back and reports what actually went into it.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use log::debug;
use thiserror::Error;
use x509_parser::{
    certification_request::X509CertificationRequest,
    cri_attributes::ParsedCriAttribute,
    extensions::{GeneralName, ParsedExtension, X509Extension},
    oid_registry::{
        Oid, OID_PKCS1_SHA256WITHRSA, OID_X509_COMMON_NAME, OID_X509_COUNTRY_NAME,
        OID_X509_LOCALITY_NAME, OID_X509_ORGANIZATION_NAME,
        OID_X509_STATE_OR_PROVINCE_NAME,
    },
    pem::parse_x509_pem,
    prelude::FromDer,
};

use crate::cert_sign_request::{
    dn::{SubjectField, SubjectKind},
    san::AltName,
};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("not a PEM document: {0}")]
    Pem(String),
    #[error("not a certificate request: {0}")]
    Der(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageBits {
    pub digital_signature: bool,
    pub content_commitment: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
}

impl KeyUsageBits {
    fn names(&self) -> Vec<&'static str> {
        [
            (self.digital_signature, "digitalSignature"),
            (self.content_commitment, "contentCommitment"),
            (self.key_encipherment, "keyEncipherment"),
            (self.data_encipherment, "dataEncipherment"),
            (self.key_agreement, "keyAgreement"),
            (self.key_cert_sign, "keyCertSign"),
            (self.crl_sign, "cRLSign"),
            (self.encipher_only, "encipherOnly"),
            (self.decipher_only, "decipherOnly"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSummary {
    pub oid: String,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub subject: Vec<SubjectField>,
    pub alt_names: Vec<AltName>,
    pub key_usage: Option<KeyUsageBits>,
    pub extended_key_usage: Vec<String>,
    pub extensions: Vec<ExtensionSummary>,
    pub sha256_with_rsa: bool,
    pub signature_valid: bool,
}

fn kind_oid(kind: SubjectKind) -> Oid<'static> {
    match kind {
        SubjectKind::Country => OID_X509_COUNTRY_NAME,
        SubjectKind::State => OID_X509_STATE_OR_PROVINCE_NAME,
        SubjectKind::City => OID_X509_LOCALITY_NAME,
        SubjectKind::Organization => OID_X509_ORGANIZATION_NAME,
        SubjectKind::CommonName => OID_X509_COMMON_NAME,
    }
}

fn subject_kind(oid: &Oid) -> Option<SubjectKind> {
    SubjectKind::ALL
        .into_iter()
        .find(|kind| &kind_oid(*kind) == oid)
}

fn alt_name(name: &GeneralName) -> Option<AltName> {
    match name {
        GeneralName::DNSName(name) => Some(AltName::Dns(name.to_string())),
        GeneralName::IPAddress(bytes) => match bytes.len() {
            4 => <[u8; 4]>::try_from(*bytes)
                .ok()
                .map(|octets| IpAddr::V4(Ipv4Addr::from(octets)).into()),
            16 => <[u8; 16]>::try_from(*bytes)
                .ok()
                .map(|octets| IpAddr::V6(Ipv6Addr::from(octets)).into()),
            _ => None,
        },
        other => {
            debug!("ignoring alternative name {other:?}");
            None
        }
    }
}

impl RequestSummary {
    pub fn from_pem(pem: &str) -> Result<Self, InspectError> {
        let (_, pem) = parse_x509_pem(pem.as_bytes())
            .map_err(|err| InspectError::Pem(err.to_string()))?;
        Self::from_der(&pem.contents)
    }

    pub fn from_der(der: &[u8]) -> Result<Self, InspectError> {
        let (_, csr) = X509CertificationRequest::from_der(der)
            .map_err(|err| InspectError::Der(err.to_string()))?;
        let info = &csr.certification_request_info;

        let subject = info
            .subject
            .iter()
            .flat_map(|rdn| rdn.iter())
            .filter_map(|attr| {
                let kind = subject_kind(attr.attr_type())?;
                let value = attr.as_str().ok()?.to_owned();
                Some(SubjectField { kind, value })
            })
            .collect();

        let requested: &[X509Extension] = info
            .iter_attributes()
            .find_map(|attr| match attr.parsed_attribute() {
                ParsedCriAttribute::ExtensionRequest(request) => {
                    Some(request.extensions.as_slice())
                }
                _ => None,
            })
            .unwrap_or_default();

        let mut summary = RequestSummary {
            subject,
            alt_names: Vec::new(),
            key_usage: None,
            extended_key_usage: Vec::new(),
            extensions: Vec::new(),
            sha256_with_rsa: csr.signature_algorithm.algorithm
                == OID_PKCS1_SHA256WITHRSA,
            signature_valid: csr.verify_signature().is_ok(),
        };

        for ext in requested {
            summary.extensions.push(ExtensionSummary {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
            });
            match ext.parsed_extension() {
                ParsedExtension::SubjectAlternativeName(san) => summary
                    .alt_names
                    .extend(san.general_names.iter().filter_map(alt_name)),
                ParsedExtension::KeyUsage(usage) => {
                    summary.key_usage = Some(KeyUsageBits {
                        digital_signature: usage.digital_signature(),
                        content_commitment: usage.non_repudiation(),
                        key_encipherment: usage.key_encipherment(),
                        data_encipherment: usage.data_encipherment(),
                        key_agreement: usage.key_agreement(),
                        key_cert_sign: usage.key_cert_sign(),
                        crl_sign: usage.crl_sign(),
                        encipher_only: usage.encipher_only(),
                        decipher_only: usage.decipher_only(),
                    })
                }
                ParsedExtension::ExtendedKeyUsage(usage) => {
                    let known = [
                        (usage.any, "anyExtendedKeyUsage"),
                        (usage.server_auth, "serverAuth"),
                        (usage.client_auth, "clientAuth"),
                        (usage.code_signing, "codeSigning"),
                        (usage.email_protection, "emailProtection"),
                        (usage.time_stamping, "timeStamping"),
                        (usage.ocsp_signing, "OCSPSigning"),
                    ];
                    summary.extended_key_usage.extend(
                        known
                            .into_iter()
                            .filter_map(|(set, name)| set.then(|| name.to_string())),
                    );
                    summary
                        .extended_key_usage
                        .extend(usage.other.iter().map(Oid::to_id_string));
                }
                _ => (),
            }
        }

        Ok(summary)
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subject:")?;
        for field in &self.subject {
            writeln!(f, "    {}: {}", field.kind.label(), field.value)?;
        }
        writeln!(f, "Alternative names:")?;
        for name in &self.alt_names {
            writeln!(f, "    {name}")?;
        }
        if let Some(usage) = &self.key_usage {
            writeln!(f, "Key usage: {}", usage.names().join(", "))?;
        }
        writeln!(f, "Extended key usage: {}", self.extended_key_usage.join(", "))?;
        writeln!(f, "Requested extensions:")?;
        for ext in &self.extensions {
            let critical = if ext.critical { " (critical)" } else { "" };
            writeln!(f, "    {}{critical}", ext.oid)?;
        }
        write!(
            f,
            "Signature: {}{}",
            if self.sha256_with_rsa {
                "sha256WithRSAEncryption"
            } else {
                "unexpected algorithm"
            },
            if self.signature_valid { "" } else { " (does not verify)" }
        )
    }
}
