use pkcs8::{
    der::pem::{LineEnding, PemLabel},
    pkcs5::pbes2,
    EncodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo,
};
use rand_core::{OsRng, RngCore};
use rsa::{traits::PublicKeyParts, RsaPrivateKey};
use thiserror::Error;

pub const DEFAULT_KEY_BITS: usize = 4096;
pub const MIN_KEY_BITS: usize = 2048;
/// The largest RSA key the request signer will load.
pub const MAX_KEY_BITS: usize = 8192;

const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("RSA keys must be between {MIN_KEY_BITS} and {MAX_KEY_BITS} bits, got {0}")]
    InvalidKeySize(usize),
    #[error("RSA key generation failed")]
    Generation(#[from] rsa::Error),
    #[error("can't encode the private key")]
    Encoding(#[from] pkcs8::Error),
    #[error("can't encode the private key")]
    Pem(#[from] pkcs8::der::Error),
    #[error("can't encrypt the private key: {0}")]
    Encryption(String),
    #[error("the signer rejected the private key")]
    Signer(#[from] rcgen::Error),
}

/// The RSA key a request is signed with. Public exponent is 65537.
pub struct RequestKey {
    private: RsaPrivateKey,
}

impl RequestKey {
    pub fn generate(bits: usize) -> Result<Self, KeyError> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
            return Err(KeyError::InvalidKeySize(bits));
        }
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        Ok(Self { private })
    }

    pub fn bits(&self) -> usize {
        self.private.size() * 8
    }

    /// The same key in the shape the request signer wants.
    pub fn signing_key(&self) -> Result<rcgen::KeyPair, KeyError> {
        let pem = self.private.to_pkcs8_pem(LineEnding::LF)?;
        Ok(rcgen::KeyPair::from_pem(&pem)?)
    }

    /// PKCS#8 `ENCRYPTED PRIVATE KEY` PEM, PBES2 with PBKDF2-SHA256 and
    /// AES-256-CBC, readable by `openssl pkey`.
    pub fn to_encrypted_pem(&self, passphrase: &str) -> Result<String, KeyError> {
        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params =
            pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
                .map_err(|err| KeyError::Encryption(err.to_string()))?;

        let der = self.private.to_pkcs8_der()?;
        let info = PrivateKeyInfo::try_from(der.as_bytes())?;
        let encrypted = info.encrypt_with_params(params, passphrase)?;
        let pem = encrypted.to_pem(EncryptedPrivateKeyInfo::PEM_LABEL, LineEnding::LF)?;
        Ok(pem.to_string())
    }
}
