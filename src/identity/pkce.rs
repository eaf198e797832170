use oauth2::{PkceCodeChallenge, PkceCodeVerifier};

/// PKCE code verifier kept in the short-lived verifier cookie until the
/// callback exchanges it.
pub struct PkceVerifier(PkceCodeVerifier);

/// S256 code challenge derived from a [`PkceVerifier`].
#[derive(Debug, Clone)]
pub struct PkceChallenge(PkceCodeChallenge);

impl PkceVerifier {
    /// 32 random bytes, base64url encoded (43 characters).
    pub fn generate() -> Self {
        let (_, verifier) = PkceCodeChallenge::new_random_sha256();
        Self(verifier)
    }

    pub fn new(secret: impl Into<String>) -> Self {
        Self(PkceCodeVerifier::new(secret.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.secret()
    }

    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge(PkceCodeChallenge::from_code_verifier_sha256(&self.0))
    }
}

impl PkceChallenge {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The auth service expects the method name in lower case.
    pub fn method(&self) -> &'static str {
        "s256"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_shape() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        assert!(verifier
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(verifier.as_str(), PkceVerifier::generate().as_str());
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        let verifier = PkceVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(verifier.challenge().as_str(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSl31-cM");
    }

    #[test]
    fn test_challenge_matches_crate_pair() {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let ours = PkceVerifier(verifier).challenge();
        assert_eq!(ours.as_str(), challenge.as_str());
        assert_eq!(challenge.method().as_str(), "S256");
    }
}
