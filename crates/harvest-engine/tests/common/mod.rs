//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use harvest_config::{EngineConfig, RoutingConfig};
use harvest_core::Vault;
use harvest_engine::{RoutingTable, YieldEngine};
use harvest_ext_file::SnapshotCollaborators;
use harvest_traits::{
    Address, CallArg, Collaborators, ContractCall, ContractReader, ContractValue, TraitError,
};

pub const WEI: u128 = 1_000_000_000_000_000_000;

pub const CHEF: &str = "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd";
pub const LP_A: &str = "0xc3f279090a47e80990fe3a9c30d24cb117ef91a8";
pub const LP_B: &str = "0xc3d03e4f041fd4cd388c549ee2a29a9e5075882f";
pub const MIC_REWARDS: &str = "0x9d9418803f042ccd7647209b0ffd617981d5c619";
pub const MIC_LP: &str = "0xc9cb53b48a2f3a9e75982685644c1870f1405ccb";
pub const POOLS: &str = "0xab8e74017a8cc7c15ffccd726603790d26d7deca";
pub const ALCX: &str = "0xdbdb4d16eda451d0503b854cf79d55697f90c8df";

pub const ROUTING: &str = r#"
[[sources]]
id = "sushi-a"
kind = "master_chef"
label = "sushi"
chef = "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd"
pool_id = 0
lp_token = "0xc3f279090a47e80990fe3a9c30d24cb117ef91a8"
reward_token = "sushi"

[[sources]]
id = "sushi-b"
kind = "master_chef"
label = "sushi"
chef = "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd"
pool_id = 1
lp_token = "0xc3d03e4f041fd4cd388c549ee2a29a9e5075882f"
reward_token = "sushi"

[[sources]]
id = "mith-mic-usdt"
kind = "staking_rewards"
label = "mis"
contract = "0x9d9418803f042ccd7647209b0ffd617981d5c619"
staking_token_method = "lpt"
reward_token = "mis"

[[sources]]
id = "yearn-usdc"
kind = "pass_through"
label = "yearn"
key = "yearn-usdc"

[[sources]]
id = "alusd-base"
kind = "pass_through"
label = "base ALCX"
key = "alusd"
fee_discount = 0.8

[[sources]]
id = "alcx-pool"
kind = "weighted_pool"
label = "alcx"
pools = "0xab8e74017a8cc7c15ffccd726603790d26d7deca"
pool_id = 1
staked_token = "0xdbdb4d16eda451d0503b854cf79d55697f90c8df"
reward_token = "alcx"
staked_symbol = "alcx"

[[sources]]
id = "alcx-naked"
kind = "reinvestment"
label = "staked ALCX"
feed = "alusd-base"
reinvest = "alcx-pool"

[[vaults]]
vault = "pSLP A"
items = [
    { source = "sushi-a" },
    { fee_pool = "0xc3f279090a47e80990fe3a9c30d24cb117ef91a8" },
]

[[vaults]]
vault = "pSLP A2"
items = [{ source = "sushi-a" }]

[[vaults]]
vault = "pSLP B"
items = [
    { source = "sushi-b" },
    { fee_pool = "0xc3d03e4f041fd4cd388c549ee2a29a9e5075882f" },
]

[[vaults]]
vault = "pSLP MIC/USDT"
items = [{ source = "mith-mic-usdt" }]

[[vaults]]
vault = "pyUSDC"
items = [
    { source = "yearn-usdc" },
    { fee_pool = "yearn-usdc-fees" },
]
total_override = { kind = "apr_of", source = "yearn-usdc" }

[[vaults]]
vault = "pALCX"
items = [{ source = "alcx-naked" }]
total_override = { kind = "label_of", source = "alcx-naked", label = "staked ALCX" }
"#;

/// Install a test subscriber once.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn routing() -> RoutingConfig {
    RoutingConfig::from_toml_str(ROUTING).unwrap()
}

pub fn vaults() -> Vec<Vault> {
    [
        ("pSLP A", LP_A),
        ("pSLP A2", LP_A),
        ("pSLP B", LP_B),
        ("pSLP MIC/USDT", MIC_LP),
        ("pyUSDC", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
        ("pALCX", ALCX),
    ]
    .into_iter()
    .map(|(name, token)| Vault::new(name, token))
    .collect()
}

fn uint(snapshot: &SnapshotCollaborators, call: ContractCall, value: u128) {
    snapshot.set_contract(&call, ContractValue::Uint(value));
}

/// A snapshot with every input of [`ROUTING`] populated.
pub fn snapshot() -> Arc<SnapshotCollaborators> {
    let s = SnapshotCollaborators::empty();
    let chef = Address::new(CHEF);

    s.set_price("sushi", 10.0);
    s.set_price("mis", 2.0);
    s.set_price("alcx", 200.0);

    uint(&s, ContractCall::new(chef.clone(), "sushiPerBlock"), 100 * WEI);
    uint(&s, ContractCall::new(chef.clone(), "totalAllocPoint"), 10_000);
    for (pid, lp, alloc, staked) in [(0, LP_A, 500, 2_000), (1, LP_B, 250, 4_000)] {
        uint(
            &s,
            ContractCall::new(chef.clone(), "poolInfo.allocPoint").arg(CallArg::Uint(pid)),
            alloc,
        );
        uint(
            &s,
            ContractCall::new(Address::new(lp), "balanceOf").arg(CallArg::Address(chef.clone())),
            staked * WEI,
        );
        s.set_pair_price(lp, 250.0);
        s.set_fee_apr(lp, 4.0);
    }

    let rewards = Address::new(MIC_REWARDS);
    uint(&s, ContractCall::new(rewards.clone(), "rewardRate"), WEI / 100);
    s.set_contract(
        &ContractCall::new(rewards.clone(), "lpt"),
        ContractValue::Address(Address::new(MIC_LP)),
    );
    uint(&s, ContractCall::new(rewards, "totalSupply"), 1_000 * WEI);
    s.set_pair_price(MIC_LP, 500.0);

    s.set_external_yield("yearn-usdc", 0.042);
    s.set_fee_apr("yearn-usdc-fees", 1.5);
    s.set_external_yield("alusd", 0.5);

    let pools = Address::new(POOLS);
    uint(&s, ContractCall::new(pools.clone(), "rewardRate"), 2 * WEI);
    uint(&s, ContractCall::new(pools.clone(), "totalRewardWeight"), 100);
    uint(
        &s,
        ContractCall::new(pools.clone(), "getPoolRewardWeight").arg(CallArg::Uint(1)),
        25,
    );
    uint(
        &s,
        ContractCall::new(Address::new(ALCX), "balanceOf").arg(CallArg::Address(pools)),
        50_000 * WEI,
    );

    Arc::new(s)
}

/// Collaborators backed by `snapshot`, with contract reads going through
/// `reader` when given.
pub fn collaborators(
    snapshot: &Arc<SnapshotCollaborators>,
    reader: Option<Arc<dyn ContractReader>>,
) -> Collaborators {
    let mut collaborators = Arc::clone(snapshot).into_collaborators();
    if let Some(reader) = reader {
        collaborators.contracts = reader;
    }
    collaborators
}

pub fn engine(collaborators: Collaborators, config: EngineConfig) -> YieldEngine {
    YieldEngine::new(
        config,
        collaborators,
        RoutingTable::from_config(routing()).unwrap(),
        vaults(),
    )
}

// =============================================================================
// FAILURE INJECTION
// =============================================================================

/// How an injected read misbehaves.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// The read is rejected
    Reject,
    /// The read panics
    Panic,
    /// The read never completes in time
    Stall(Duration),
}

/// Misbehaves on every read of one contract, delegates the rest.
pub struct FaultyReader {
    pub inner: Arc<dyn ContractReader>,
    pub contract: Address,
    pub fault: Fault,
}

impl FaultyReader {
    pub fn new(inner: Arc<dyn ContractReader>, contract: &str, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner,
            contract: Address::new(contract),
            fault,
        })
    }
}

#[async_trait]
impl ContractReader for FaultyReader {
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError> {
        if call.contract == self.contract {
            match self.fault {
                Fault::Reject => {
                    return Err(TraitError::ConnectionFailed("injected".into()));
                }
                Fault::Panic => panic!("injected panic reading {call}"),
                Fault::Stall(d) => tokio::time::sleep(d).await,
            }
        }
        self.inner.read(call).await
    }
}

/// Counts reads per call key.
pub struct CountingReader {
    pub inner: Arc<dyn ContractReader>,
    pub total: AtomicUsize,
    pub per_call: Mutex<HashMap<String, usize>>,
}

impl CountingReader {
    pub fn new(inner: Arc<dyn ContractReader>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            total: AtomicUsize::new(0),
            per_call: Mutex::new(HashMap::new()),
        })
    }

    pub fn count(&self, call: &ContractCall) -> usize {
        self.per_call.lock().get(&call.key()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractReader for CountingReader {
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.per_call.lock().entry(call.key()).or_insert(0) += 1;
        self.inner.read(call).await
    }
}
