//! Constrained JWT parser for bearer tokens issued by the API.
//!
//! Two backends sit behind [`TokenVerifier`]: `jsonwebtoken` for the algorithms it implements,
//! and an `aws-lc-rs` ECDSA P-521 path for `ES512`, which is what the API signs with.

// crates.io
use aws_lc_rs::signature::{ECDSA_P521_SHA512_FIXED, UnparsedPublicKey};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
// self
use crate::{_prelude::*, auth::Claims, error::ConfigError};

/// Signature scheme accepted by a [`TokenVerifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningAlgorithm {
	/// Any algorithm implemented by `jsonwebtoken`.
	Jwt(Algorithm),
	/// ECDSA over P-521 with SHA-512.
	Es512,
}
impl Display for SigningAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Jwt(algorithm) => write!(f, "{algorithm:?}"),
			Self::Es512 => f.write_str(ES512),
		}
	}
}

const ES512: &str = "ES512";

#[derive(Clone)]
enum VerificationKey {
	Jwt { key: DecodingKey, validation: Box<Validation> },
	Es512(UnparsedPublicKey<Vec<u8>>),
}

#[derive(Deserialize)]
struct JoseHeader {
	alg: String,
}

/// Verifies token signatures against one public key and exactly one signing algorithm.
///
/// Expiry is enforced with a fixed clock-skew leeway (two minutes unless overridden), so a token
/// that expired within the leeway is still accepted while anything older, anything signed with a
/// different algorithm, and anything malformed is rejected with [`Error::InvalidToken`].
#[derive(Clone)]
pub struct TokenVerifier {
	key: VerificationKey,
	leeway: Duration,
}
impl TokenVerifier {
	/// Clock-skew tolerance applied to `exp` checks by default.
	pub const DEFAULT_LEEWAY: Duration = Duration::minutes(2);

	/// Creates a verifier for `key` that only accepts `algorithm`.
	pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
		let mut validation = Validation::new(algorithm);

		validation.validate_aud = false;
		validation.set_required_spec_claims(&["exp"]);

		Self {
			key: VerificationKey::Jwt { key, validation: Box::new(validation) },
			leeway: Duration::ZERO,
		}
		.with_leeway(Self::DEFAULT_LEEWAY)
	}

	/// Creates a verifier from a PEM-encoded EC public key (`ES256`/`ES384`).
	pub fn from_ec_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self> {
		let key = DecodingKey::from_ec_pem(pem)
			.map_err(|source| ConfigError::InvalidVerificationKey { source })?;

		Ok(Self::new(key, algorithm))
	}

	/// Creates a verifier from a PEM-encoded RSA public key (`RS*`/`PS*`).
	pub fn from_rsa_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self> {
		let key = DecodingKey::from_rsa_pem(pem)
			.map_err(|source| ConfigError::InvalidVerificationKey { source })?;

		Ok(Self::new(key, algorithm))
	}

	/// Creates an `ES512` verifier from a P-521 public key, either an uncompressed SEC1 point or
	/// a DER `SubjectPublicKeyInfo`.
	///
	/// The key is parsed lazily; a malformed key rejects every token with
	/// [`ErrorKind::InvalidSignature`].
	pub fn es512(public_key: impl Into<Vec<u8>>) -> Self {
		Self {
			key: VerificationKey::Es512(UnparsedPublicKey::new(
				&ECDSA_P521_SHA512_FIXED,
				public_key.into(),
			)),
			leeway: Self::DEFAULT_LEEWAY,
		}
	}

	/// Creates an `ES512` verifier from a PEM-encoded P-521 public key.
	pub fn es512_from_pem(pem: &[u8]) -> Result<Self> {
		let key = DecodingKey::from_ec_pem(pem)
			.map_err(|source| ConfigError::InvalidVerificationKey { source })?;

		Ok(Self::es512(key.as_bytes()))
	}

	/// Overrides the clock-skew leeway; negative values clamp to zero.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		if let VerificationKey::Jwt { validation, .. } = &mut self.key {
			validation.leeway = u64::try_from(self.leeway.whole_seconds()).unwrap_or(0);
		}

		self
	}

	/// Returns the single accepted signing algorithm.
	pub fn algorithm(&self) -> SigningAlgorithm {
		match &self.key {
			VerificationKey::Jwt { validation, .. } =>
				SigningAlgorithm::Jwt(validation.algorithms.first().copied().unwrap_or_default()),
			VerificationKey::Es512(_) => SigningAlgorithm::Es512,
		}
	}

	/// Returns the configured leeway.
	pub fn leeway(&self) -> Duration {
		self.leeway
	}

	/// Parses and verifies `token`, returning its claims.
	pub fn verify(&self, token: &str) -> Result<Claims> {
		match &self.key {
			VerificationKey::Jwt { key, validation } =>
				Ok(jsonwebtoken::decode::<Claims>(token, key, validation)?.claims),
			VerificationKey::Es512(key) => self.verify_es512(key, token),
		}
	}

	fn verify_es512(&self, key: &UnparsedPublicKey<Vec<u8>>, token: &str) -> Result<Claims> {
		let (message, signature) =
			token.rsplit_once('.').ok_or_else(|| rejected(ErrorKind::InvalidToken))?;
		let (header, payload) =
			message.split_once('.').ok_or_else(|| rejected(ErrorKind::InvalidToken))?;
		let header = decode_segment::<JoseHeader>(header)?;

		if header.alg != ES512 {
			return Err(rejected(ErrorKind::InvalidAlgorithm));
		}

		let signature =
			URL_SAFE_NO_PAD.decode(signature).map_err(|_| rejected(ErrorKind::InvalidToken))?;

		key.verify(message.as_bytes(), &signature)
			.map_err(|_| rejected(ErrorKind::InvalidSignature))?;

		let claims = decode_segment::<Claims>(payload)?;

		if claims.exp.saturating_add(self.leeway.whole_seconds())
			< OffsetDateTime::now_utc().unix_timestamp()
		{
			return Err(rejected(ErrorKind::ExpiredSignature));
		}

		Ok(claims)
	}
}
impl Debug for TokenVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenVerifier")
			.field("algorithm", &self.algorithm())
			.field("leeway", &self.leeway())
			.finish()
	}
}

fn decode_segment<T>(segment: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| rejected(ErrorKind::InvalidToken))?;

	serde_json::from_slice(&bytes).map_err(|e| rejected(ErrorKind::Json(Arc::new(e))))
}

fn rejected(kind: ErrorKind) -> Error {
	jsonwebtoken::errors::Error::from(kind).into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use aws_lc_rs::{
		rand::SystemRandom,
		signature::{ECDSA_P521_SHA512_FIXED_SIGNING, EcdsaKeyPair, KeyPair},
	};
	use jsonwebtoken::{EncodingKey, Header};
	// self
	use super::*;

	const SECRET: &[u8] = b"verifier-test-secret";
	// P-521 key pair generated with `openssl genpkey -algorithm EC -pkeyopt ec_paramgen_curve:P-521`.
	const P521_PKCS8: &str = "MIHuAgEAMBAGByqGSM49AgEGBSuBBAAjBIHWMIHTAgEBBEIA1KDCeIZA2rKdIHC8JdXu79V5bl9cQpbDcHBU7/kIvn86UZEcPSm/S9aG+FXf4pTvDFRjHilp3nUcrEf87by0FsKhgYkDgYYABABawkrqcDrokyvnE6a6Qun6BYQ3yz1KMSwGfm2u+ORENjCTZol95gzPMVKwS8GrpQV1bFHQStbxA3WiTr53DKMekAFrjtnG6QV1LOHbWvXBiODlaCFmGQogcM68eJc+FrijXS97XbjWcb8Ia4FLz4EG0za1KA+nZGdpB5Cp+yF1/ekeZg==";
	const P521_PUBLIC_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIGbMBAGByqGSM49AgEGBSuBBAAjA4GGAAQAWsJK6nA66JMr5xOmukLp+gWEN8s9
SjEsBn5trvjkRDYwk2aJfeYMzzFSsEvBq6UFdWxR0ErW8QN1ok6+dwyjHpABa47Z
xukFdSzh21r1wYjg5WghZhkKIHDOvHiXPha4o10ve1241nG/CGuBS8+BBtM2tSgP
p2RnaQeQqfshdf3pHmY=
-----END PUBLIC KEY-----
";

	fn sign(algorithm: Algorithm, claims: &Claims) -> String {
		jsonwebtoken::encode(&Header::new(algorithm), claims, &EncodingKey::from_secret(SECRET))
			.expect("Test token should sign.")
	}

	fn sign_es512(key_pair: &EcdsaKeyPair, alg: &str, claims: &Claims) -> String {
		let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#));
		let payload =
			URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("Claims should encode."));
		let message = format!("{header}.{payload}");
		let signature = key_pair
			.sign(&SystemRandom::new(), message.as_bytes())
			.expect("P-521 signing should succeed.");

		format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature))
	}

	fn fixture_key_pair() -> EcdsaKeyPair {
		let der = base64::engine::general_purpose::STANDARD
			.decode(P521_PKCS8)
			.expect("Fixture key should decode.");

		EcdsaKeyPair::from_pkcs8(&ECDSA_P521_SHA512_FIXED_SIGNING, &der)
			.expect("Fixture key should parse.")
	}

	fn verifier() -> TokenVerifier {
		TokenVerifier::new(DecodingKey::from_secret(SECRET), Algorithm::HS256)
	}

	fn claims_expiring_in(offset: Duration) -> Claims {
		let mut claims = Claims::expiring_at(OffsetDateTime::now_utc() + offset);

		claims.fsa_id = Some("test-fsa-id".into());
		claims.uniq_id = Some("test-uniq-id".into());

		claims
	}

	fn error_kind(err: Error) -> ErrorKind {
		match err {
			Error::InvalidToken { source } => source.into_kind(),
			other => panic!("Expected an invalid token error, got {other:?}."),
		}
	}

	#[test]
	fn accepts_valid_token() {
		let claims = claims_expiring_in(Duration::hours(1));
		let verified =
			verifier().verify(&sign(Algorithm::HS256, &claims)).expect("Valid token should verify.");

		assert_eq!(verified, claims);
	}

	#[test]
	fn tolerates_expiry_within_leeway() {
		let token = sign(Algorithm::HS256, &claims_expiring_in(Duration::minutes(-1)));

		verifier().verify(&token).expect("Token expired within the leeway should verify.");
	}

	#[test]
	fn rejects_expiry_beyond_leeway() {
		let token = sign(Algorithm::HS256, &claims_expiring_in(Duration::minutes(-5)));
		let err = verifier().verify(&token).expect_err("Stale token should be rejected.");

		assert!(matches!(error_kind(err), ErrorKind::ExpiredSignature));
	}

	#[test]
	fn rejects_other_algorithms() {
		let token = sign(Algorithm::HS384, &claims_expiring_in(Duration::hours(1)));
		let err = verifier().verify(&token).expect_err("Wrong algorithm should be rejected.");

		assert!(matches!(error_kind(err), ErrorKind::InvalidAlgorithm));
	}

	#[test]
	fn rejects_foreign_signatures() {
		let token = jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&claims_expiring_in(Duration::hours(1)),
			&EncodingKey::from_secret(b"someone-else"),
		)
		.expect("Foreign token should sign.");
		let err = verifier().verify(&token).expect_err("Foreign signature should be rejected.");

		assert!(matches!(error_kind(err), ErrorKind::InvalidSignature));
	}

	#[test]
	fn rejects_malformed_input() {
		for token in ["", "not-a-jwt", "a.b.c"] {
			let err = verifier().verify(token).expect_err("Malformed token should be rejected.");

			assert!(matches!(err, Error::InvalidToken { .. }), "{token}: {err:?}");
		}
	}

	#[test]
	fn leeway_is_configurable() {
		let strict = verifier().with_leeway(Duration::ZERO);
		let token = sign(Algorithm::HS256, &claims_expiring_in(Duration::minutes(-1)));

		assert_eq!(strict.leeway(), Duration::ZERO);
		assert!(strict.verify(&token).is_err());
		assert_eq!(verifier().leeway(), TokenVerifier::DEFAULT_LEEWAY);
		assert_eq!(verifier().algorithm(), SigningAlgorithm::Jwt(Algorithm::HS256));
	}

	#[test]
	fn es512_accepts_p521_tokens_from_pem_key() {
		let verifier = TokenVerifier::es512_from_pem(P521_PUBLIC_PEM.as_bytes())
			.expect("P-521 public key should parse.");
		let claims = claims_expiring_in(Duration::hours(1));
		let verified = verifier
			.verify(&sign_es512(&fixture_key_pair(), ES512, &claims))
			.expect("ES512 token should verify.");

		assert_eq!(verified, claims);
		assert_eq!(verifier.algorithm(), SigningAlgorithm::Es512);
		assert_eq!(verifier.algorithm().to_string(), "ES512");
	}

	#[test]
	fn es512_accepts_generated_key_pair() {
		let key_pair = EcdsaKeyPair::generate(&ECDSA_P521_SHA512_FIXED_SIGNING)
			.expect("P-521 key pair should generate.");
		let public_key: &[u8] = key_pair.public_key().as_ref();
		let verifier = TokenVerifier::es512(public_key);
		let within_leeway = claims_expiring_in(Duration::minutes(-1));

		verifier
			.verify(&sign_es512(&key_pair, ES512, &within_leeway))
			.expect("Token expired within the leeway should verify.");
	}

	#[test]
	fn es512_rejects_invalid_tokens() {
		let key_pair = fixture_key_pair();
		let verifier = TokenVerifier::es512_from_pem(P521_PUBLIC_PEM.as_bytes())
			.expect("P-521 public key should parse.");
		let other = EcdsaKeyPair::generate(&ECDSA_P521_SHA512_FIXED_SIGNING)
			.expect("P-521 key pair should generate.");
		let fresh = claims_expiring_in(Duration::hours(1));
		let stale = claims_expiring_in(Duration::minutes(-5));
		let mut tampered = sign_es512(&key_pair, ES512, &fresh);

		tampered.insert(tampered.find('.').map_or(0, |at| at + 1), 'A');

		let cases = [
			(sign_es512(&key_pair, ES512, &stale), ErrorKind::ExpiredSignature),
			(sign_es512(&other, ES512, &fresh), ErrorKind::InvalidSignature),
			(sign_es512(&key_pair, "ES384", &fresh), ErrorKind::InvalidAlgorithm),
			(sign(Algorithm::HS256, &fresh), ErrorKind::InvalidAlgorithm),
			(tampered, ErrorKind::InvalidSignature),
		];

		for (token, expected) in cases {
			let err = verifier.verify(&token).expect_err("Token should be rejected.");

			assert_eq!(error_kind(err), expected);
		}
		for token in ["", "not-a-jwt", "a.b.c"] {
			let err = verifier.verify(token).expect_err("Malformed token should be rejected.");

			assert!(matches!(err, Error::InvalidToken { .. }), "{token}: {err:?}");
		}
	}

	#[test]
	fn es512_rejects_non_ec_pem() {
		let err = TokenVerifier::es512_from_pem(b"not a pem").expect_err("Garbage is not a key.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidVerificationKey { .. })));
	}
}
