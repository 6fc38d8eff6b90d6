use std::fmt;

use serde::{Deserialize, Serialize};

/// An account token in its stored (encrypted) form.
///
/// The plaintext only exists transiently while a request client is built.
/// `Debug` never prints the stored value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn stored(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to encrypt token: {0}")]
    Encrypt(String),
    #[error("Failed to decrypt token: {0}")]
    Decrypt(String),
}

/// Platform secret store used to protect account tokens at rest.
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<Token, CredentialError>;
    fn decrypt(&self, token: &Token) -> Result<String, CredentialError>;
}

/// Cipher for tokens supplied through the environment or the command line,
/// where there is no platform secret store to defer to.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCipher;

impl TokenCipher for PassthroughCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Token, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::Encrypt("token is empty".to_string()));
        }
        Ok(Token::from_stored(plaintext))
    }

    fn decrypt(&self, token: &Token) -> Result<String, CredentialError> {
        if token.stored().is_empty() {
            return Err(CredentialError::Decrypt("token is empty".to_string()));
        }
        Ok(token.stored().to_string())
    }
}
