//! Process-wide registry mapping accounts to tracked quota state and call
//! gates.

// self
use crate::{_prelude::*, account::AccountId, quota::QuotaState};

/// Cloneable handle to the mutex serializing one account's calls.
pub type AccountGate = Arc<AsyncMutex<()>>;

type SlotMap = Arc<RwLock<HashMap<AccountId, AccountSlot>>>;

#[derive(Debug, Default)]
struct AccountSlot {
	gate: AccountGate,
	state: Option<QuotaState>,
}

/// Shared registry of per-account throttling state.
///
/// Cloning is cheap and every clone observes the same accounts, so one
/// registry can back any number of throttlers across tasks. Entries are
/// created lazily on first touch and live for the registry's lifetime;
/// call [`forget`](Self::forget) to drop an account that is no longer in
/// use.
#[derive(Clone, Debug, Default)]
pub struct QuotaRegistry(SlotMap);
impl QuotaRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns (and creates on demand) the gate serializing calls for one
	/// account.
	///
	/// Every caller asking for the same account receives a handle to the
	/// same underlying mutex.
	pub fn gate(&self, account: &AccountId) -> AccountGate {
		let mut slots = self.0.write();

		slots.entry(account.clone()).or_default().gate.clone()
	}

	/// Returns the tracked quota state for `account`, if any call has
	/// recorded one.
	pub fn state(&self, account: &AccountId) -> Option<QuotaState> {
		self.0.read().get(account).and_then(|slot| slot.state)
	}

	/// Returns the tracked quota state for `account`, or `default` when none
	/// has been recorded yet.
	///
	/// Reading never persists the default; the account stays untracked until
	/// [`set_state`](Self::set_state) runs.
	pub fn state_or(&self, account: &AccountId, default: QuotaState) -> QuotaState {
		self.state(account).unwrap_or(default)
	}

	/// Overwrites the tracked state for `account`.
	///
	/// Writes are unconditional; the per-account gate orders them, so the
	/// most recently completed call wins.
	pub fn set_state(&self, account: &AccountId, state: QuotaState) {
		let mut slots = self.0.write();

		slots.entry(account.clone()).or_default().state = Some(state);
	}

	/// Drops the tracked entry for `account`, returning its last state.
	///
	/// Tasks already holding the account's gate keep their handle; the next
	/// call for the account starts from a fresh slot.
	pub fn forget(&self, account: &AccountId) -> Option<QuotaState> {
		self.0.write().remove(account).and_then(|slot| slot.state)
	}

	/// Returns the number of accounts currently tracked.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no account has been seen yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
