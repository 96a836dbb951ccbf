use super::AuthError;
use anyhow::{anyhow, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use md2::Md2;
use md4::Md4;
use md5::Md5;
use ripemd::{Ripemd128, Ripemd160, Ripemd256, Ripemd320};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use whirlpool::Whirlpool;

/// Plain digests, compared as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md2,
    Md4,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Ripemd128,
    Ripemd160,
    Ripemd256,
    Ripemd320,
    Whirlpool,
}

/// Password hashing schemes that carry their own salt and cost in the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveScheme {
    Bcrypt,
    Argon2i,
    Argon2id,
}

/// The verification strategy configured for a deployment.
///
/// Parsed once from configuration; requests never pick their own algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    Digest(DigestAlgorithm),
    Adaptive(AdaptiveScheme),
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Adaptive(AdaptiveScheme::Bcrypt)
    }
}

const NAMES: &[(&str, HashAlgorithm)] = &[
    ("md2", HashAlgorithm::Digest(DigestAlgorithm::Md2)),
    ("md4", HashAlgorithm::Digest(DigestAlgorithm::Md4)),
    ("md5", HashAlgorithm::Digest(DigestAlgorithm::Md5)),
    ("sha1", HashAlgorithm::Digest(DigestAlgorithm::Sha1)),
    ("sha224", HashAlgorithm::Digest(DigestAlgorithm::Sha224)),
    ("sha256", HashAlgorithm::Digest(DigestAlgorithm::Sha256)),
    ("sha384", HashAlgorithm::Digest(DigestAlgorithm::Sha384)),
    ("sha512", HashAlgorithm::Digest(DigestAlgorithm::Sha512)),
    ("sha512/224", HashAlgorithm::Digest(DigestAlgorithm::Sha512_224)),
    ("sha512/256", HashAlgorithm::Digest(DigestAlgorithm::Sha512_256)),
    ("sha3-224", HashAlgorithm::Digest(DigestAlgorithm::Sha3_224)),
    ("sha3-256", HashAlgorithm::Digest(DigestAlgorithm::Sha3_256)),
    ("sha3-384", HashAlgorithm::Digest(DigestAlgorithm::Sha3_384)),
    ("sha3-512", HashAlgorithm::Digest(DigestAlgorithm::Sha3_512)),
    ("ripemd128", HashAlgorithm::Digest(DigestAlgorithm::Ripemd128)),
    ("ripemd160", HashAlgorithm::Digest(DigestAlgorithm::Ripemd160)),
    ("ripemd256", HashAlgorithm::Digest(DigestAlgorithm::Ripemd256)),
    ("ripemd320", HashAlgorithm::Digest(DigestAlgorithm::Ripemd320)),
    ("whirlpool", HashAlgorithm::Digest(DigestAlgorithm::Whirlpool)),
    ("bcrypt", HashAlgorithm::Adaptive(AdaptiveScheme::Bcrypt)),
    ("argon2i", HashAlgorithm::Adaptive(AdaptiveScheme::Argon2i)),
    ("argon2id", HashAlgorithm::Adaptive(AdaptiveScheme::Argon2id)),
];

impl HashAlgorithm {
    /// Every supported identifier, in the order they are documented.
    pub fn supported() -> impl Iterator<Item = HashAlgorithm> {
        NAMES.iter().map(|(_, algorithm)| *algorithm)
    }

    pub fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, algorithm)| algorithm == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, HashAlgorithm::Adaptive(_))
    }

    /// Check `plaintext` against a stored digest.
    ///
    /// The adaptive schemes share one verifier that reads the scheme from the
    /// stored hash, so any of them accepts bcrypt and argon2 hashes alike.
    /// Digests are recomputed and compared in constant time, so empty inputs
    /// take the same path as any other.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        match self {
            HashAlgorithm::Adaptive(_) => verify_adaptive(plaintext, stored),
            HashAlgorithm::Digest(digest) => {
                let computed = digest.hex_digest(plaintext);
                constant_time_eq(computed.as_bytes(), stored.as_bytes())
            }
        }
    }

    /// Produce the stored form of `plaintext` for this algorithm.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        match self {
            HashAlgorithm::Digest(digest) => Ok(digest.hex_digest(plaintext)),
            HashAlgorithm::Adaptive(AdaptiveScheme::Bcrypt) => {
                bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
                    .map_err(|e| anyhow!("Failed to hash password: {}", e))
            }
            HashAlgorithm::Adaptive(AdaptiveScheme::Argon2i) => {
                hash_argon2(Algorithm::Argon2i, plaintext)
            }
            HashAlgorithm::Adaptive(AdaptiveScheme::Argon2id) => {
                hash_argon2(Algorithm::Argon2id, plaintext)
            }
        }
    }
}

impl DigestAlgorithm {
    fn hex_digest(&self, input: &str) -> String {
        let bytes = input.as_bytes();
        match self {
            DigestAlgorithm::Md2 => hex::encode(Md2::digest(bytes)),
            DigestAlgorithm::Md4 => hex::encode(Md4::digest(bytes)),
            DigestAlgorithm::Md5 => hex::encode(Md5::digest(bytes)),
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
            DigestAlgorithm::Sha224 => hex::encode(Sha224::digest(bytes)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
            DigestAlgorithm::Sha384 => hex::encode(Sha384::digest(bytes)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
            DigestAlgorithm::Sha512_224 => hex::encode(Sha512_224::digest(bytes)),
            DigestAlgorithm::Sha512_256 => hex::encode(Sha512_256::digest(bytes)),
            DigestAlgorithm::Sha3_224 => hex::encode(Sha3_224::digest(bytes)),
            DigestAlgorithm::Sha3_256 => hex::encode(Sha3_256::digest(bytes)),
            DigestAlgorithm::Sha3_384 => hex::encode(Sha3_384::digest(bytes)),
            DigestAlgorithm::Sha3_512 => hex::encode(Sha3_512::digest(bytes)),
            DigestAlgorithm::Ripemd128 => hex::encode(Ripemd128::digest(bytes)),
            DigestAlgorithm::Ripemd160 => hex::encode(Ripemd160::digest(bytes)),
            DigestAlgorithm::Ripemd256 => hex::encode(Ripemd256::digest(bytes)),
            DigestAlgorithm::Ripemd320 => hex::encode(Ripemd320::digest(bytes)),
            DigestAlgorithm::Whirlpool => hex::encode(Whirlpool::digest(bytes)),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, algorithm)| *algorithm)
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(value: HashAlgorithm) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verify with an algorithm given by name.
///
/// Unknown names fail with [`AuthError::UnsupportedAlgorithm`].
pub fn verify(algorithm: &str, plaintext: &str, stored: &str) -> Result<bool, AuthError> {
    let algorithm: HashAlgorithm = algorithm.parse()?;
    Ok(algorithm.verify(plaintext, stored))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // Length is public (it is fixed by the digest), contents are not.
    a.len() == b.len() && a.ct_eq(b).into()
}

/// Picks the scheme from the stored hash's prefix: `$argon2i$` / `$argon2id$`
/// (PHC) or `$2a$` / `$2b$` / `$2x$` / `$2y$` (bcrypt).
fn verify_adaptive(password: &str, hash: &str) -> bool {
    if hash.starts_with("$argon2") {
        verify_argon2(password, hash)
    } else if hash.starts_with("$2") {
        verify_bcrypt(password, hash)
    } else {
        false
    }
}

fn verify_bcrypt(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

fn verify_argon2(password: &str, hash: &str) -> bool {
    if let Ok(parsed_hash) = PasswordHash::new(hash) {
        Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok()
    } else {
        false
    }
}

fn hash_argon2(algorithm: Algorithm, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(algorithm, argon2::Version::V0x13, argon2::Params::default());
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    Ok(password_hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vector() {
        let algorithm: HashAlgorithm = "sha256".parse().unwrap();
        assert_eq!(
            algorithm.hash("secret").unwrap(),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
        assert!(algorithm.verify(
            "secret",
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        ));
    }

    #[test]
    fn known_legacy_vectors() {
        let ripemd160: HashAlgorithm = "ripemd160".parse().unwrap();
        assert!(ripemd160.verify("secret", "cd98bf0202ef07e38e87f6bd9445e5e7331e2c78"));
        assert!(ripemd160.verify("", "9c1185a5c5e9fc54612808977ee8f548b2258d31"));

        let md4: HashAlgorithm = "md4".parse().unwrap();
        assert!(md4.verify("", "31d6cfe0d16ae931b73c59d7e0c089c0"));

        let whirlpool: HashAlgorithm = "whirlpool".parse().unwrap();
        assert_eq!(whirlpool.hash("secret").unwrap().len(), 128);
    }

    #[test]
    fn adaptive_names_accept_each_others_hashes() {
        let bcrypt_hash = bcrypt::hash("secret", 4).unwrap();
        let argon2i_hash = hash_argon2(Algorithm::Argon2i, "secret").unwrap();
        let argon2id_hash = hash_argon2(Algorithm::Argon2id, "secret").unwrap();

        for name in ["bcrypt", "argon2i", "argon2id"] {
            let algorithm: HashAlgorithm = name.parse().unwrap();
            for stored in [&bcrypt_hash, &argon2i_hash, &argon2id_hash] {
                assert!(algorithm.verify("secret", stored), "{} vs {}", name, &stored[..8]);
                assert!(!algorithm.verify("wrong", stored), "{} vs {}", name, &stored[..8]);
            }
        }
    }

    #[test]
    fn known_md5_vector() {
        let algorithm: HashAlgorithm = "md5".parse().unwrap();
        assert!(algorithm.verify("", "d41d8cd98f00b204e9800998ecf8427e"));
    }

    #[test]
    fn every_digest_round_trips_and_rejects_other_inputs() {
        for algorithm in HashAlgorithm::supported().filter(|a| !a.is_adaptive()) {
            for (p, other) in [("secret", "Secret"), ("", " "), ("pässwörd", "passwort")] {
                let stored = algorithm.hash(p).unwrap();
                assert!(algorithm.verify(p, &stored), "{} should accept", algorithm);
                assert!(!algorithm.verify(other, &stored), "{} should reject", algorithm);
            }
        }
    }

    #[test]
    fn digest_comparison_is_case_sensitive_and_length_checked() {
        let algorithm: HashAlgorithm = "sha1".parse().unwrap();
        let stored = algorithm.hash("secret").unwrap();
        assert!(!algorithm.verify("secret", &stored.to_uppercase()));
        assert!(!algorithm.verify("secret", &stored[..10]));
        assert!(!algorithm.verify("secret", ""));
    }

    #[test]
    fn bcrypt_round_trip() {
        let algorithm = HashAlgorithm::default();
        assert_eq!(algorithm.name(), "bcrypt");
        let stored = bcrypt::hash("secret", 4).unwrap();
        assert!(algorithm.verify("secret", &stored));
        assert!(!algorithm.verify("wrong", &stored));
    }

    #[test]
    fn bcrypt_accepts_2y_prefix() {
        let stored = bcrypt::hash("secret", 4).unwrap().replacen("$2b$", "$2y$", 1);
        assert!(HashAlgorithm::default().verify("secret", &stored));
    }

    #[test]
    fn argon2_variants_round_trip() {
        for name in ["argon2i", "argon2id"] {
            let algorithm: HashAlgorithm = name.parse().unwrap();
            let stored = algorithm.hash("secret").unwrap();
            assert!(stored.starts_with(&format!("${}$", name)));
            assert!(algorithm.verify("secret", &stored));
            assert!(!algorithm.verify("wrong", &stored));
        }
    }

    #[test]
    fn malformed_adaptive_hash_is_a_mismatch() {
        for name in ["bcrypt", "argon2i", "argon2id"] {
            let algorithm: HashAlgorithm = name.parse().unwrap();
            assert!(!algorithm.verify("secret", "not-a-hash"));
            assert!(!algorithm.verify("", ""));
        }
    }

    #[test]
    fn unsupported_names_are_rejected() {
        for name in ["rot13", "SHA256", "", "crc32", "scrypt", "RIPEMD160"] {
            assert_eq!(
                name.parse::<HashAlgorithm>(),
                Err(AuthError::UnsupportedAlgorithm(name.to_string()))
            );
            assert!(verify(name, "a", "b").is_err());
        }
    }

    #[test]
    fn names_round_trip_through_parse() {
        for algorithm in HashAlgorithm::supported() {
            assert_eq!(algorithm.name().parse::<HashAlgorithm>(), Ok(algorithm));
        }
    }
}
