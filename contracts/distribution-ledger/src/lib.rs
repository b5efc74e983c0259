//! Tributary - Distribution Ledger (Soroban)
//! Source of truth for one revenue-based-financing deal: splits every incoming
//! payment between capital providers and the beneficiary, enforces the lifetime
//! repayment cap and the per-payment / rolling daily safety rails.

#![no_std]
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, Address, Env, IntoVal, Symbol,
    Vec as SdkVec,
};

// ============================================================
// Data Types
// ============================================================

/// Immutable deal terms, fixed at initialization.
#[contracttype]
#[derive(Clone)]
pub struct Deal {
    pub beneficiary: Address,
    pub claims_vault: Address,
    pub share_bps: u32, // basis points of each payment routed to providers
    pub cap: i128,      // lifetime ceiling on cumulative provider routing
    pub start_time: u64,
    pub end_time: u64,
}

/// Outcome of one accepted payment. The two legs always sum to the
/// payment amount exactly.
#[contracttype]
#[derive(Clone)]
pub struct SplitResult {
    pub to_providers: i128,
    pub to_beneficiary: i128,
}

// ============================================================
// Storage Keys
// ============================================================

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    PendingAdmin,
    Deal,
    Adapter,
    TotalPaid,
    Paused,
    PerPaymentLimit, // 0 = unconfigured
    DailyLimit,      // 0 = unconfigured
    AllowedAsset(Address),
    DailyVolume(u64), // provider-side volume per window index
}

// ============================================================
// Contract
// ============================================================

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 120_960;
const PERSISTENT_BUMP_AMOUNT: u32 = 1_051_200;

const SECONDS_PER_DAY: u64 = 86_400;
const BPS_DENOMINATOR: i128 = 10_000;

#[contract]
pub struct DistributionLedgerContract;

#[contractimpl]
impl DistributionLedgerContract {
    /// Create the deal. Terms are immutable afterwards; only the safety rails,
    /// the asset allowlist and the pause flag can be tuned by the admin.
    pub fn initialize(
        env: Env,
        admin: Address,
        beneficiary: Address,
        claims_vault: Address,
        share_bps: u32,
        cap: i128,
        start_time: u64,
        end_time: u64,
        per_payment_limit: i128,
        daily_limit: i128,
    ) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();

        if share_bps == 0 || share_bps > 10_000 {
            panic!("invalid share rate");
        }
        if cap <= 0 {
            panic!("invalid cap");
        }
        if end_time <= start_time {
            panic!("invalid term");
        }
        if per_payment_limit < 0 || daily_limit < 0 {
            panic!("invalid limit");
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(
            &DataKey::Deal,
            &Deal {
                beneficiary,
                claims_vault,
                share_bps,
                cap,
                start_time,
                end_time,
            },
        );
        env.storage().instance().set(&DataKey::TotalPaid, &0i128);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage()
            .instance()
            .set(&DataKey::PerPaymentLimit, &per_payment_limit);
        env.storage().instance().set(&DataKey::DailyLimit, &daily_limit);
    }

    /// Bind the ingress adapter allowed to call `apply`.
    pub fn set_adapter(env: Env, admin: Address, adapter: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Adapter, &adapter);
    }

    /// Split one incoming payment. Pure accounting: the caller (the ingress
    /// adapter) moves the tokens in the same transaction after this returns.
    /// Every precondition is a distinct rejection with zero state change.
    pub fn apply(env: Env, caller: Address, asset: Address, amount: i128) -> SplitResult {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        caller.require_auth();
        let adapter: Address = env
            .storage()
            .instance()
            .get(&DataKey::Adapter)
            .expect("not initialized");
        if caller != adapter {
            panic!("unauthorized adapter");
        }

        let deal: Deal = env
            .storage()
            .instance()
            .get(&DataKey::Deal)
            .expect("not initialized");

        if amount <= 0 {
            panic!("invalid amount");
        }
        if Self::is_paused(env.clone()) {
            panic!("ledger paused");
        }
        let now = env.ledger().timestamp();
        if now >= deal.end_time {
            panic!("deal ended");
        }
        let total_paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalPaid)
            .unwrap_or(0);
        if total_paid >= deal.cap {
            panic!("cap reached");
        }
        if !Self::is_asset_allowed(env.clone(), asset.clone()) {
            panic!("asset not allowed");
        }
        let per_payment_limit: i128 = env
            .storage()
            .instance()
            .get(&DataKey::PerPaymentLimit)
            .unwrap_or(0);
        if per_payment_limit > 0 && amount > per_payment_limit {
            panic!("payment limit exceeded");
        }

        // The rail is checked against the unclamped share; only the clamped
        // share actually accrues to the window below.
        let share = amount * deal.share_bps as i128 / BPS_DENOMINATOR;
        let daily_limit: i128 = env
            .storage()
            .instance()
            .get(&DataKey::DailyLimit)
            .unwrap_or(0);
        let window = now / SECONDS_PER_DAY;
        let daily_key = DataKey::DailyVolume(window);
        let daily_vol: i128 = env.storage().temporary().get(&daily_key).unwrap_or(0);
        if daily_limit > 0 && daily_vol + share > daily_limit {
            panic!("daily limit exceeded");
        }

        // Clamp so the deal completes exactly at the cap, never beyond it.
        let remaining = deal.cap - total_paid;
        let to_providers = if share > remaining { remaining } else { share };
        let to_beneficiary = amount - to_providers;

        let new_total = total_paid + to_providers;
        env.storage().instance().set(&DataKey::TotalPaid, &new_total);
        env.storage()
            .temporary()
            .set(&daily_key, &(daily_vol + to_providers));

        if to_providers > 0 {
            env.invoke_contract::<()>(
                &deal.claims_vault,
                &Symbol::new(&env, "credit"),
                SdkVec::from_array(
                    &env,
                    [
                        env.current_contract_address().into_val(&env),
                        asset.clone().into_val(&env),
                        to_providers.into_val(&env),
                    ],
                ),
            );
        }

        env.events().publish(
            (symbol_short!("dist"), symbol_short!("done")),
            (asset, to_providers, to_beneficiary, new_total),
        );
        // Fires exactly once: once total_paid == cap, every later apply
        // rejects with "cap reached" above.
        if new_total == deal.cap {
            env.events()
                .publish((symbol_short!("cap"), symbol_short!("reached")), new_total);
        }

        SplitResult {
            to_providers,
            to_beneficiary,
        }
    }

    /// Read-only mirror of `apply`'s preconditions, so batch callers can skip
    /// a payment that would reject instead of aborting their whole batch.
    pub fn can_apply(env: Env, asset: Address, amount: i128) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let deal: Deal = match env.storage().instance().get(&DataKey::Deal) {
            Some(d) => d,
            None => return false,
        };
        if amount <= 0 {
            return false;
        }
        if Self::is_paused(env.clone()) {
            return false;
        }
        let now = env.ledger().timestamp();
        if now >= deal.end_time {
            return false;
        }
        let total_paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalPaid)
            .unwrap_or(0);
        if total_paid >= deal.cap {
            return false;
        }
        if !Self::is_asset_allowed(env.clone(), asset) {
            return false;
        }
        let per_payment_limit: i128 = env
            .storage()
            .instance()
            .get(&DataKey::PerPaymentLimit)
            .unwrap_or(0);
        if per_payment_limit > 0 && amount > per_payment_limit {
            return false;
        }
        let share = amount * deal.share_bps as i128 / BPS_DENOMINATOR;
        let daily_limit: i128 = env
            .storage()
            .instance()
            .get(&DataKey::DailyLimit)
            .unwrap_or(0);
        let daily_vol: i128 = env
            .storage()
            .temporary()
            .get(&DataKey::DailyVolume(now / SECONDS_PER_DAY))
            .unwrap_or(0);
        if daily_limit > 0 && daily_vol + share > daily_limit {
            return false;
        }
        true
    }

    // ============================================================
    // Admin Operations
    // ============================================================

    /// Pause blocks `apply` only; vault withdrawals stay available.
    pub fn pause(env: Env, admin: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Paused, &true);
    }

    pub fn unpause(env: Env, admin: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Paused, &false);
    }

    pub fn set_per_payment_limit(env: Env, admin: Address, limit: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        if limit < 0 {
            panic!("invalid limit");
        }
        env.storage().instance().set(&DataKey::PerPaymentLimit, &limit);
    }

    pub fn set_daily_limit(env: Env, admin: Address, limit: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        if limit < 0 {
            panic!("invalid limit");
        }
        env.storage().instance().set(&DataKey::DailyLimit, &limit);
    }

    pub fn add_asset(env: Env, admin: Address, asset: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        let _ttl_key = DataKey::AllowedAsset(asset);
        env.storage().persistent().set(&_ttl_key, &true);
        env.storage().persistent().extend_ttl(
            &_ttl_key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );
    }

    pub fn remove_asset(env: Env, admin: Address, asset: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        env.storage()
            .persistent()
            .remove(&DataKey::AllowedAsset(asset));
    }

    // ============================================================
    // Read-Only Functions
    // ============================================================

    pub fn is_complete(env: Env) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let deal: Deal = match env.storage().instance().get(&DataKey::Deal) {
            Some(d) => d,
            None => return false,
        };
        let total_paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalPaid)
            .unwrap_or(0);
        total_paid >= deal.cap
    }

    pub fn is_paused(env: Env) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::Paused)
            .unwrap_or(false)
    }

    pub fn is_ended(env: Env) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let deal: Deal = match env.storage().instance().get(&DataKey::Deal) {
            Some(d) => d,
            None => return false,
        };
        env.ledger().timestamp() >= deal.end_time
    }

    /// The vault provider shares are routed to. Read by the ingress adapter so
    /// its token leg always targets the same vault `apply` accounts in.
    pub fn get_claims_vault(env: Env) -> Address {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let deal: Deal = env
            .storage()
            .instance()
            .get(&DataKey::Deal)
            .expect("not initialized");
        deal.claims_vault
    }

    pub fn remaining_cap(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        let deal: Deal = env
            .storage()
            .instance()
            .get(&DataKey::Deal)
            .expect("not initialized");
        let total_paid: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalPaid)
            .unwrap_or(0);
        deal.cap - total_paid
    }

    pub fn get_total_paid(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::TotalPaid)
            .unwrap_or(0)
    }

    pub fn get_deal(env: Env) -> Deal {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::Deal)
            .expect("not initialized")
    }

    pub fn is_asset_allowed(env: Env, asset: Address) -> bool {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .persistent()
            .get(&DataKey::AllowedAsset(asset))
            .unwrap_or(false)
    }

    /// Provider-side volume accrued in a window (window = timestamp / 86 400).
    pub fn get_daily_volume(env: Env, window: u64) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .temporary()
            .get(&DataKey::DailyVolume(window))
            .unwrap_or(0)
    }

    pub fn propose_admin(env: Env, current_admin: Address, new_admin: Address) {
        tributary_common_admin::propose_admin(
            &env,
            &DataKey::Admin,
            &DataKey::PendingAdmin,
            current_admin,
            new_admin,
        );
    }

    pub fn accept_admin(env: Env, new_admin: Address) {
        tributary_common_admin::accept_admin(
            &env,
            &DataKey::Admin,
            &DataKey::PendingAdmin,
            new_admin,
        );
    }
}
