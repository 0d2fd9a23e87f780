//! Strongly typed account identifiers shared by the registry and throttlers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ACCOUNT_ID_MAX_LEN: usize = 128;

/// Error returned when account identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum AccountIdError {
	/// The identifier was empty.
	#[error("Account identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Account identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Account identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Opaque identifier for the account whose quota a call consumes.
///
/// Identifiers are validated once at construction so registry keys never carry
/// empty or whitespace-bearing values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);
impl AccountId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, AccountIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for AccountId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AccountId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<AccountId> for String {
	fn from(value: AccountId) -> Self {
		value.0
	}
}
impl TryFrom<String> for AccountId {
	type Error = AccountIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for AccountId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for AccountId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Account({})", self.0)
	}
}
impl Display for AccountId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AccountId {
	type Err = AccountIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), AccountIdError> {
	if view.is_empty() {
		return Err(AccountIdError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(AccountIdError::ContainsWhitespace);
	}
	if view.len() > ACCOUNT_ID_MAX_LEN {
		return Err(AccountIdError::TooLong { max: ACCOUNT_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace() {
		assert!(AccountId::new(" shop-123").is_err(), "Leading whitespace must be rejected.");
		assert!(AccountId::new("shop-123 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(AccountId::new("shop 123").is_err(), "Embedded whitespace must be rejected.");

		let account =
			AccountId::new("shop-123").expect("Account fixture should be considered valid.");

		assert_eq!(account.as_ref(), "shop-123");
		assert!(AccountId::new("").is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let payload = "\"shop-42\"";
		let account: AccountId =
			serde_json::from_str(payload).expect("Account should deserialize successfully.");

		assert_eq!(account.as_ref(), "shop-42");
		assert!(serde_json::from_str::<AccountId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<AccountId>("\"\"").is_err());
	}

	#[test]
	fn unicode_whitespace_and_length_limits() {
		let nbsp = format!("shop{}id", '\u{00A0}');

		assert!(AccountId::new(&nbsp).is_err());

		let exact = "a".repeat(ACCOUNT_ID_MAX_LEN);

		AccountId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(ACCOUNT_ID_MAX_LEN + 1);

		assert!(AccountId::new(&too_long).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<AccountId, u8> = HashMap::from_iter([(
			AccountId::new("shop-123").expect("Account used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("shop-123"), Some(&7));
	}
}
