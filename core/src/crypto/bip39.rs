//! BIP39 mnemonic generation, validation, and seed derivation.

use thiserror::Error;

/// The supported mnemonic lengths (BIP39 entropy sizes of 128-256 bits in
/// 32-bit steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour,
}

impl WordCount {
    fn count(self) -> usize {
        match self {
            WordCount::Twelve => 12,
            WordCount::Fifteen => 15,
            WordCount::Eighteen => 18,
            WordCount::TwentyOne => 21,
            WordCount::TwentyFour => 24,
        }
    }
}

/// Errors raised while generating or parsing mnemonics.
#[derive(Debug, Error)]
pub enum MnemonicError {
    /// A word in the phrase was not in the BIP39 English wordlist, the
    /// phrase had an unsupported word count, or the checksum did not
    /// match the entropy.
    #[error("invalid mnemonic phrase: {0}")]
    InvalidPhrase(String),
}

/// A BIP39 mnemonic phrase, with entropy+checksum recoverable and a
/// PBKDF2-HMAC-SHA512 seed derivable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// Draws fresh entropy from the system CSPRNG and encodes it as a
    /// mnemonic of the requested length.
    pub fn generate(word_count: WordCount) -> Self {
        let inner = bip39::Mnemonic::generate_in(bip39::Language::English, word_count.count())
            .expect("word_count is always one of BIP39's five supported lengths");
        Self { inner }
    }

    /// Parses and checksum-validates a space-separated phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, MnemonicError> {
        let inner = bip39::Mnemonic::parse_in(bip39::Language::English, phrase)
            .map_err(|e| MnemonicError::InvalidPhrase(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The phrase as a space-separated string.
    pub fn phrase(&self) -> String {
        self.inner.to_string()
    }

    /// `PBKDF2-HMAC-SHA512(mnemonic_normalized, "mnemonic" ∥ passphrase,
    /// 2048, 64)`, unchanged from BIP39.
    pub fn to_seed(&self, passphrase: &str) -> [u8; 64] {
        self.inner.to_seed(passphrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(WordCount::Twelve, 12)]
    #[test_case(WordCount::Fifteen, 15)]
    #[test_case(WordCount::Eighteen, 18)]
    #[test_case(WordCount::TwentyOne, 21)]
    #[test_case(WordCount::TwentyFour, 24)]
    fn generates_requested_word_count(word_count: WordCount, expected: usize) {
        let mnemonic = Mnemonic::generate(word_count);
        assert_eq!(mnemonic.phrase().split_whitespace().count(), expected);
    }

    #[test]
    fn round_trips_through_phrase() {
        let mnemonic = Mnemonic::generate(WordCount::Twelve);
        let phrase = mnemonic.phrase();
        let parsed = Mnemonic::from_phrase(&phrase).unwrap();
        assert_eq!(parsed.phrase(), phrase);
    }

    #[test]
    fn rejects_bad_checksum() {
        // 12 repeats of "abandon" fails the checksum (it's a valid
        // wordlist entry, but not a valid mnemonic on its own).
        let bogus = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(Mnemonic::from_phrase(bogus).is_err());
    }

    #[test]
    fn known_vector_seed() {
        // BIP39 standard test vector: "abandon ... about" entropy
        // 00000000000000000000000000000000 with empty passphrase.
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let mnemonic = Mnemonic::from_phrase(phrase).unwrap();
        let seed = mnemonic.to_seed("");
        assert_eq!(
            hex::encode(seed),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e"
        );
    }
}
