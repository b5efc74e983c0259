//! Tributary - Collateral Escrow (Soroban)
//! Holds collateral posted by the beneficiary and pays capital providers the
//! remaining cap if revenue stops flowing for too long. Payment activity is
//! observed by polling the distribution ledger's running total, so anyone can
//! keep the escrow honest.

#![no_std]
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, IntoVal, Symbol,
    Vec as SdkVec,
};

// ============================================================
// Data Types
// ============================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EscrowStatus {
    Normal,
    CureStarted,
    Defaulted,
    Released,
}

#[contracttype]
#[derive(Clone)]
pub struct EscrowConfig {
    pub distribution_ledger: Address,
    pub token: Address,
    pub beneficiary: Address,
    pub payout: Address, // the claims vault, credited on default
    pub inactivity_threshold: u64,
    pub cure_period: u64,
}

// ============================================================
// Storage Keys
// ============================================================

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    PendingAdmin,
    Config,
    Status,
    Balance,
    LastPaymentAt,
    LastObservedTotal,
    CureStartedAt, // 0 = not started
}

// ============================================================
// Contract
// ============================================================

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;

#[contract]
pub struct CollateralEscrowContract;

#[contractimpl]
impl CollateralEscrowContract {
    pub fn initialize(
        env: Env,
        admin: Address,
        distribution_ledger: Address,
        token: Address,
        beneficiary: Address,
        payout: Address,
        inactivity_threshold: u64,
        cure_period: u64,
    ) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(
            &DataKey::Config,
            &EscrowConfig {
                distribution_ledger,
                token,
                beneficiary,
                payout,
                inactivity_threshold,
                cure_period,
            },
        );
        env.storage()
            .instance()
            .set(&DataKey::Status, &EscrowStatus::Normal);
        env.storage().instance().set(&DataKey::Balance, &0i128);
        env.storage()
            .instance()
            .set(&DataKey::LastPaymentAt, &env.ledger().timestamp());
        env.storage()
            .instance()
            .set(&DataKey::LastObservedTotal, &0i128);
        env.storage().instance().set(&DataKey::CureStartedAt, &0u64);
    }

    /// Post collateral. Only meaningful while the deal is live.
    pub fn deposit_collateral(env: Env, from: Address, amount: i128) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        from.require_auth();
        Self::_require_active(&env);
        if amount <= 0 {
            panic!("invalid amount");
        }
        let cfg: EscrowConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");

        let balance: i128 = env.storage().instance().get(&DataKey::Balance).unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::Balance, &(balance + amount));

        let token_client = token::Client::new(&env, &cfg.token);
        token_client.transfer(&from, &env.current_contract_address(), &amount);

        env.events().publish(
            (symbol_short!("escrow"), symbol_short!("deposit")),
            (from, amount),
        );
    }

    /// Permissionless poke: reads the ledger's running total and records any
    /// progress as payment activity. A payment observed during a running cure
    /// resets the escrow to Normal.
    pub fn record_payment(env: Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        Self::_sync(&env);
    }

    /// Open the cure window. Only valid once no payment has been observed for
    /// longer than the inactivity threshold.
    pub fn start_cure(env: Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        Self::_sync(&env);
        Self::_require_active(&env);
        let status: EscrowStatus = env
            .storage()
            .instance()
            .get(&DataKey::Status)
            .expect("not initialized");
        if status == EscrowStatus::CureStarted {
            panic!("cure already started");
        }
        let cfg: EscrowConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        let last_payment_at: u64 = env
            .storage()
            .instance()
            .get(&DataKey::LastPaymentAt)
            .unwrap_or(0);
        let now = env.ledger().timestamp();
        if now <= last_payment_at + cfg.inactivity_threshold {
            panic!("payments current");
        }

        env.storage()
            .instance()
            .set(&DataKey::Status, &EscrowStatus::CureStarted);
        env.storage().instance().set(&DataKey::CureStartedAt, &now);

        env.events()
            .publish((symbol_short!("escrow"), symbol_short!("cure")), now);
    }

    /// Irreversible: pays capital providers min(remaining cap, collateral)
    /// through the claims vault. Payment activity is re-checked first, so a
    /// cure satisfied at the last minute cancels the default.
    pub fn declare_default(env: Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        Self::_sync(&env);
        Self::_require_active(&env);
        let status: EscrowStatus = env
            .storage()
            .instance()
            .get(&DataKey::Status)
            .expect("not initialized");
        if status != EscrowStatus::CureStarted {
            panic!("cure not started");
        }
        let cfg: EscrowConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        let cure_started_at: u64 = env
            .storage()
            .instance()
            .get(&DataKey::CureStartedAt)
            .unwrap_or(0);
        if env.ledger().timestamp() < cure_started_at + cfg.cure_period {
            panic!("cure period not elapsed");
        }

        let remaining: i128 = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(&env, "remaining_cap"),
            SdkVec::new(&env),
        );
        let balance: i128 = env.storage().instance().get(&DataKey::Balance).unwrap_or(0);
        let amount = if remaining < balance { remaining } else { balance };

        env.storage()
            .instance()
            .set(&DataKey::Status, &EscrowStatus::Defaulted);
        env.storage()
            .instance()
            .set(&DataKey::Balance, &(balance - amount));

        if amount > 0 {
            let token_client = token::Client::new(&env, &cfg.token);
            token_client.transfer(&env.current_contract_address(), &cfg.payout, &amount);
            // Account the payout in the claims vault so holders can withdraw
            // it pro-rata; the escrow must be an authorized creditor there.
            env.invoke_contract::<()>(
                &cfg.payout,
                &Symbol::new(&env, "credit"),
                SdkVec::from_array(
                    &env,
                    [
                        env.current_contract_address().into_val(&env),
                        cfg.token.clone().into_val(&env),
                        amount.into_val(&env),
                    ],
                ),
            );
        }

        env.events()
            .publish((symbol_short!("default"), symbol_short!("declared")), amount);
    }

    /// Return unused collateral to the beneficiary once the cap is reached.
    pub fn release_collateral(env: Env, admin: Address) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        tributary_common_admin::require_admin(&env, &DataKey::Admin, &admin);
        Self::_require_active(&env);
        let cfg: EscrowConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");

        let complete: bool = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(&env, "is_complete"),
            SdkVec::new(&env),
        );
        if !complete {
            panic!("deal not complete");
        }

        let balance: i128 = env.storage().instance().get(&DataKey::Balance).unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::Status, &EscrowStatus::Released);
        env.storage().instance().set(&DataKey::Balance, &0i128);

        if balance > 0 {
            let token_client = token::Client::new(&env, &cfg.token);
            token_client.transfer(&env.current_contract_address(), &cfg.beneficiary, &balance);
        }

        env.events().publish(
            (symbol_short!("escrow"), symbol_short!("released")),
            balance,
        );
    }

    // ============================================================
    // Read-Only Functions
    // ============================================================

    pub fn get_status(env: Env) -> EscrowStatus {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::Status)
            .expect("not initialized")
    }

    pub fn get_balance(env: Env) -> i128 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage().instance().get(&DataKey::Balance).unwrap_or(0)
    }

    pub fn get_last_payment_at(env: Env) -> u64 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::LastPaymentAt)
            .unwrap_or(0)
    }

    pub fn get_cure_started_at(env: Env) -> u64 {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
        env.storage()
            .instance()
            .get(&DataKey::CureStartedAt)
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

    // ============================================================
    // Internal Helpers
    // ============================================================

    fn _require_active(env: &Env) {
        let status: EscrowStatus = env
            .storage()
            .instance()
            .get(&DataKey::Status)
            .expect("not initialized");
        match status {
            EscrowStatus::Defaulted => panic!("already defaulted"),
            EscrowStatus::Released => panic!("collateral released"),
            _ => (),
        }
    }

    /// Pull the ledger's running total; any advance counts as a payment.
    fn _sync(env: &Env) {
        let cfg: EscrowConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .expect("not initialized");
        let total: i128 = env.invoke_contract(
            &cfg.distribution_ledger,
            &Symbol::new(env, "get_total_paid"),
            SdkVec::new(env),
        );
        let observed: i128 = env
            .storage()
            .instance()
            .get(&DataKey::LastObservedTotal)
            .unwrap_or(0);
        if total <= observed {
            return;
        }

        env.storage()
            .instance()
            .set(&DataKey::LastObservedTotal, &total);
        env.storage()
            .instance()
            .set(&DataKey::LastPaymentAt, &env.ledger().timestamp());

        let status: EscrowStatus = env
            .storage()
            .instance()
            .get(&DataKey::Status)
            .expect("not initialized");
        if status == EscrowStatus::CureStarted {
            env.storage()
                .instance()
                .set(&DataKey::Status, &EscrowStatus::Normal);
            env.storage().instance().set(&DataKey::CureStartedAt, &0u64);
            env.events().publish(
                (symbol_short!("escrow"), symbol_short!("reset")),
                env.ledger().timestamp(),
            );
        }
    }
}
